//! Likelihood evaluators and the registry of evaluator kinds.
//!
//! An evaluator binds the variable parameters, the prior and, for the
//! gravitational-wave kinds, the observed data with its noise model. It is
//! shared read-only between sampler worker threads.

use std::{collections::BTreeMap, sync::Arc, sync::OnceLock};

use itertools::Itertools;

use crate::{
    detector::Detector,
    distributions::JointDistribution,
    error::{GwinError, Result},
    parameters::{Parameter, ParameterValues},
    registry::Registry,
    series::{ComplexFrequencySeries, RealFrequencySeries},
    waveform::FDomainDetFrameGenerator,
};

mod analytic;
mod gaussian;

pub use analytic::{TestEggbox, TestNormal, TestRosenbrock, TestVolcano};
pub use gaussian::{GaussianLikelihood, MarginalizedPhaseGaussianLikelihood};

/// Names starting with this prefix are analytic densities for testing
/// samplers, not models of detector data.
pub const TEST_PREFIX: &str = "test_";

/// Extra output of the data-driven evaluators.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    /// Log likelihood ratio against the noise-only hypothesis.
    pub loglr: f64,
    /// Log likelihood of the noise-only hypothesis.
    pub lognl: f64,
    /// `<h, h>` for each detector.
    pub optimal_snrsq: BTreeMap<Detector, f64>,
}

/// The result of evaluating the posterior at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub logprior: f64,
    /// `-inf` when the point lies outside the prior support.
    pub loglikelihood: f64,
    /// Only filled in when the evaluator was built with `return_meta`.
    pub meta: Option<Meta>,
}

impl Evaluation {
    pub fn outside_prior() -> Self {
        Self {
            logprior: f64::NEG_INFINITY,
            loglikelihood: f64::NEG_INFINITY,
            meta: None,
        }
    }

    pub fn logposterior(&self) -> f64 {
        self.tempered(1.)
    }

    /// `beta * loglikelihood + logprior`, `-inf` outside the prior.
    pub fn tempered(&self, beta: f64) -> f64 {
        if self.logprior == f64::NEG_INFINITY || self.loglikelihood == f64::NEG_INFINITY {
            return f64::NEG_INFINITY;
        }
        beta * self.loglikelihood + self.logprior
    }
}

pub trait LikelihoodEvaluator: Send + Sync {
    fn name(&self) -> &'static str;

    /// The parameters a point is laid out in.
    fn variable_params(&self) -> &[Parameter];

    fn prior(&self) -> &JointDistribution;

    fn return_meta(&self) -> bool;

    /// Log likelihood at a point known to be inside the prior support.
    fn loglikelihood_in_support(&self, point: &[f64]) -> Result<(f64, Option<Meta>)>;

    fn point_values(&self, point: &[f64]) -> Result<ParameterValues> {
        ParameterValues::from_point(self.variable_params(), point)
    }

    fn logprior(&self, point: &[f64]) -> Result<f64> {
        self.prior().logpdf(&self.point_values(point)?)
    }

    fn evaluate(&self, point: &[f64]) -> Result<Evaluation> {
        let logprior = self.logprior(point)?;
        if logprior == f64::NEG_INFINITY {
            return Ok(Evaluation::outside_prior());
        }
        let (loglikelihood, meta) = self.loglikelihood_in_support(point)?;
        Ok(Evaluation {
            logprior,
            loglikelihood,
            meta: if self.return_meta() { meta } else { None },
        })
    }

    fn loglikelihood(&self, point: &[f64]) -> Result<f64> {
        Ok(self.evaluate(point)?.loglikelihood)
    }

    fn logposterior(&self, point: &[f64]) -> Result<f64> {
        Ok(self.evaluate(point)?.logposterior())
    }
}

/// Observed data and the model used to explain it.
#[derive(Debug, Clone)]
pub struct DataArgs {
    pub data: BTreeMap<Detector, ComplexFrequencySeries>,
    pub generator: FDomainDetFrameGenerator,
    /// Low frequency cutoff of the inner products, in Hz.
    pub f_lower: f64,
    pub psds: BTreeMap<Detector, RealFrequencySeries>,
}

/// Everything a registered evaluator kind can be built from.
#[derive(Debug, Clone)]
pub struct LikelihoodArgs {
    pub variable_params: Vec<Parameter>,
    pub prior: JointDistribution,
    pub return_meta: bool,
    /// Required by the data-driven kinds, ignored by the analytic ones.
    pub data: Option<DataArgs>,
}

impl LikelihoodArgs {
    pub fn new(
        variable_params: Vec<Parameter>,
        data: BTreeMap<Detector, ComplexFrequencySeries>,
        generator: FDomainDetFrameGenerator,
        f_lower: f64,
        psds: BTreeMap<Detector, RealFrequencySeries>,
        prior: JointDistribution,
        return_meta: bool,
    ) -> Self {
        Self {
            variable_params,
            prior,
            return_meta,
            data: Some(DataArgs {
                data,
                generator,
                f_lower,
                psds,
            }),
        }
    }

    pub fn analytic(variable_params: Vec<Parameter>, prior: JointDistribution) -> Self {
        Self {
            variable_params,
            prior,
            return_meta: false,
            data: None,
        }
    }

    /// The prior must be defined over exactly the variable parameters.
    pub(crate) fn check_prior(&self) -> Result<()> {
        let variable = self.variable_params.iter().sorted().collect_vec();
        let prior = self.prior.parameters().iter().sorted().collect_vec();
        if variable != prior {
            return Err(GwinError::Config(format!(
                "prior parameters [{}] do not match variable parameters [{}]",
                prior.iter().join(", "),
                variable.iter().join(", "),
            )));
        }
        if let Some(dup) = self.variable_params.iter().duplicates().next() {
            return Err(GwinError::DuplicateParameter(*dup));
        }
        Ok(())
    }
}

pub type LikelihoodConstructor = fn(LikelihoodArgs) -> Result<Arc<dyn LikelihoodEvaluator>>;

fn boxed<L, F>(build: F, args: LikelihoodArgs) -> Result<Arc<dyn LikelihoodEvaluator>>
where
    L: LikelihoodEvaluator + 'static,
    F: FnOnce(LikelihoodArgs) -> Result<L>,
{
    Ok(Arc::new(build(args)?))
}

/// All evaluator kinds, registered on first use.
pub fn likelihood_evaluators() -> &'static Registry<LikelihoodConstructor> {
    static REGISTRY: OnceLock<Registry<LikelihoodConstructor>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry: Registry<LikelihoodConstructor> = Registry::new();
        registry.register(GaussianLikelihood::NAME, |args| {
            boxed(GaussianLikelihood::new, args)
        });
        registry.register(MarginalizedPhaseGaussianLikelihood::NAME, |args| {
            boxed(MarginalizedPhaseGaussianLikelihood::new, args)
        });
        registry.register(TestNormal::NAME, |args| boxed(TestNormal::new, args));
        registry.register(TestEggbox::NAME, |args| boxed(TestEggbox::new, args));
        registry.register(TestRosenbrock::NAME, |args| boxed(TestRosenbrock::new, args));
        registry.register(TestVolcano::NAME, |args| boxed(TestVolcano::new, args));
        registry
    })
}

/// Names of the evaluator kinds that model detector data.
pub fn data_likelihood_names() -> Vec<&'static str> {
    likelihood_evaluators()
        .names()
        .filter(|name| !name.starts_with(TEST_PREFIX))
        .collect()
}

pub fn new_likelihood(name: &str, args: LikelihoodArgs) -> Result<Arc<dyn LikelihoodEvaluator>> {
    let build = likelihood_evaluators()
        .get(name)
        .ok_or_else(|| GwinError::UnknownLikelihood(name.to_string()))?;
    build(args)
}
