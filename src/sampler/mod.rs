//! Samplers and the registry they are discovered through.
//!
//! Every sampler goes through the same lifecycle: it is built from a
//! [`SamplerConfig`] and a shared likelihood evaluator, given starting
//! positions drawn from the prior with [`Sampler::set_p0`], and then advanced
//! with [`Sampler::run`].

use std::sync::{Arc, OnceLock};

use log::{debug, info};
use rand::{rngs::SmallRng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    config::SamplerConfig,
    error::{GwinError, Result},
    likelihood::{Evaluation, LikelihoodEvaluator},
    registry::Registry,
    trace::{ArrowDrawStorage, DrawStorage, TraceOutput},
};

mod emcee;
mod emcee_pt;
mod ensemble;
mod mcmc;
mod nested;
mod pool;

pub use emcee::Emcee;
pub use emcee_pt::EmceePt;
pub use mcmc::Mcmc;
pub use nested::Nested;

use pool::EvaluationPool;

pub trait Sampler: Send {
    fn name(&self) -> &'static str;

    fn config(&self) -> &SamplerConfig;

    fn likelihood(&self) -> &Arc<dyn LikelihoodEvaluator>;

    /// Draw starting positions from the prior.
    ///
    /// Fails if the likelihood is undefined at any of them. Calling it again
    /// starts over, discarding the iterations run so far.
    fn set_p0(&mut self) -> Result<()>;

    /// Advance by exactly `niterations` iterations.
    fn run(&mut self, niterations: u64) -> Result<()>;

    /// Iterations completed since the last [`Sampler::set_p0`].
    fn niterations(&self) -> u64;

    /// Fraction of accepted proposals for each walker of the coldest chain.
    ///
    /// Samplers without persistent walkers report a single value.
    fn acceptance_fraction(&self) -> Vec<f64>;

    /// Stored samples, one entry per temperature starting with the coldest.
    fn trace(&self) -> Vec<TraceOutput>;
}

pub trait FromConfig: Sampler + Sized {
    const NAME: &'static str;

    fn from_config(config: SamplerConfig, likelihood: Arc<dyn LikelihoodEvaluator>)
        -> Result<Self>;
}

pub type SamplerConstructor =
    fn(SamplerConfig, Arc<dyn LikelihoodEvaluator>) -> Result<Box<dyn Sampler>>;

fn boxed<S: FromConfig + 'static>(
    config: SamplerConfig,
    likelihood: Arc<dyn LikelihoodEvaluator>,
) -> Result<Box<dyn Sampler>> {
    Ok(Box::new(S::from_config(config, likelihood)?))
}

/// All sampler variants, registered on first use.
pub fn samplers() -> &'static Registry<SamplerConstructor> {
    static REGISTRY: OnceLock<Registry<SamplerConstructor>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry: Registry<SamplerConstructor> = Registry::new();
        registry.register(Emcee::NAME, boxed::<Emcee>);
        registry.register(EmceePt::NAME, boxed::<EmceePt>);
        registry.register(Mcmc::NAME, boxed::<Mcmc>);
        registry.register(Nested::NAME, boxed::<Nested>);
        registry
    })
}

pub fn sampler_names() -> Vec<&'static str> {
    samplers().names().collect()
}

pub fn new_sampler(
    name: &str,
    config: SamplerConfig,
    likelihood: Arc<dyn LikelihoodEvaluator>,
) -> Result<Box<dyn Sampler>> {
    let build = samplers()
        .get(name)
        .ok_or_else(|| GwinError::UnknownSampler(name.to_string()))?;
    build(config, likelihood)
}

/// State every sampler variant carries.
pub(crate) struct SamplerCore {
    name: &'static str,
    pub(crate) config: SamplerConfig,
    pub(crate) likelihood: Arc<dyn LikelihoodEvaluator>,
    pub(crate) pool: EvaluationPool,
    pub(crate) rng: SmallRng,
    pub(crate) niterations: u64,
    traces: Vec<ArrowDrawStorage>,
    ntraces: usize,
}

impl SamplerCore {
    /// `stream` keeps the random streams of different variants apart for
    /// the same seed.
    pub(crate) fn new(
        name: &'static str,
        stream: u64,
        config: SamplerConfig,
        likelihood: Arc<dyn LikelihoodEvaluator>,
        ntraces: usize,
    ) -> Result<Self> {
        config.validate()?;
        let ndim = likelihood.variable_params().len();
        if ndim == 0 {
            return Err(GwinError::Config(format!(
                "{name} needs at least one variable parameter"
            )));
        }

        let mut seed_rng = ChaCha8Rng::seed_from_u64(config.seed);
        seed_rng.set_stream(stream);
        let rng = SmallRng::from_rng(&mut seed_rng);

        let pool = EvaluationPool::new(config.nprocesses)?;
        info!(
            "{name}: {ndim} parameters, {} walkers, {} temperatures, likelihood {}, {} threads",
            config.nwalkers,
            config.ntemps,
            likelihood.name(),
            pool.num_threads()
        );

        Ok(Self {
            name,
            config,
            likelihood,
            pool,
            rng,
            niterations: 0,
            traces: (0..ntraces)
                .map(|temp| ArrowDrawStorage::new(temp, ndim))
                .collect(),
            ntraces,
        })
    }

    pub(crate) fn ndim(&self) -> usize {
        self.likelihood.variable_params().len()
    }

    /// Forget the iterations and samples of a previous start.
    pub(crate) fn reset(&mut self) {
        let ndim = self.ndim();
        self.niterations = 0;
        self.traces = (0..self.ntraces)
            .map(|temp| ArrowDrawStorage::new(temp, ndim))
            .collect();
    }

    pub(crate) fn check_run(&self, initialized: bool, niterations: u64) -> Result<()> {
        if niterations < 1 {
            return Err(GwinError::InvalidIterations(niterations));
        }
        if !initialized {
            return Err(GwinError::Uninitialized);
        }
        Ok(())
    }

    /// Draw `count` points from the prior and evaluate them.
    ///
    /// Every point must have a finite log likelihood.
    pub(crate) fn initial_points(
        &mut self,
        count: usize,
        temperature: usize,
    ) -> Result<(Vec<Vec<f64>>, Vec<Evaluation>)> {
        let params = self.likelihood.variable_params().to_vec();
        let points = (0..count)
            .map(|_| {
                let values = self.likelihood.prior().rvs(&mut self.rng);
                params
                    .iter()
                    .map(|&param| values.get(param).ok_or(GwinError::MissingParameter(param)))
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let results = self.pool.map(&*self.likelihood, &points);
        let mut evals = Vec::with_capacity(count);
        for (walker, result) in results.into_iter().enumerate() {
            let reason = match result {
                Ok(eval) if eval.loglikelihood.is_finite() => {
                    evals.push(eval);
                    continue;
                }
                Ok(eval) => format!("log likelihood is {}", eval.loglikelihood),
                Err(err) => err.to_string(),
            };
            return Err(GwinError::SupportMismatch {
                walker,
                temperature,
                reason,
            });
        }
        Ok((points, evals))
    }

    pub(crate) fn evaluate(&self, points: &[Vec<f64>]) -> Result<Vec<Evaluation>> {
        self.pool.evaluate(&*self.likelihood, points)
    }

    pub(crate) fn record<'a>(
        &mut self,
        temperature: usize,
        samples: impl IntoIterator<Item = (&'a Vec<f64>, &'a Evaluation)>,
    ) {
        let storage = &mut self.traces[temperature];
        for (point, eval) in samples {
            storage.append_value(point, eval);
        }
    }

    pub(crate) fn trace(&self) -> Vec<TraceOutput> {
        self.traces.iter().map(|storage| storage.inspect()).collect()
    }

    /// Count a finished iteration and report progress every
    /// `update_interval` iterations.
    pub(crate) fn finish_iteration(&mut self, status: impl FnOnce() -> String) {
        self.niterations += 1;
        if self.niterations % self.config.update_interval == 0 {
            debug!("{}: iteration {}, {}", self.name, self.niterations, status());
        }
    }
}

/// Accepted over proposed, zero before the first proposal.
pub(crate) fn fraction(accepted: u64, proposed: u64) -> f64 {
    if proposed == 0 {
        0.
    } else {
        accepted as f64 / proposed as f64
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::{
        distributions::{JointDistribution, Primitive},
        likelihood::{new_likelihood, LikelihoodArgs, LikelihoodEvaluator},
        parameters::Parameter,
    };

    pub(crate) const PARAMS: [Parameter; 2] = [Parameter::Ra, Parameter::Polarization];

    /// An analytic likelihood over two parameters with prior `U(-5, 5)`.
    pub(crate) fn analytic(name: &str) -> Arc<dyn LikelihoodEvaluator> {
        let prior = JointDistribution::new(
            PARAMS
                .iter()
                .map(|&p| (p, Primitive::uniform(-5., 5.).unwrap())),
        )
        .unwrap();
        new_likelihood(name, LikelihoodArgs::analytic(PARAMS.to_vec(), prior)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        distributions::JointDistribution,
        likelihood::{new_likelihood, LikelihoodArgs},
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn registry_is_stable() {
        assert_eq!(sampler_names(), vec!["emcee", "emcee_pt", "mcmc", "nested"]);
        assert_eq!(sampler_names(), sampler_names());
    }

    #[test]
    fn unknown_sampler() {
        let likelihood = test_support::analytic("test_normal");
        let err = new_sampler("kombine", SamplerConfig::default(), likelihood);
        assert!(matches!(err, Err(GwinError::UnknownSampler(_))));
    }

    #[test]
    fn lifecycle_errors() {
        for name in sampler_names() {
            let config = SamplerConfig {
                nwalkers: 10,
                ..Default::default()
            };
            let mut sampler = new_sampler(name, config, test_support::analytic("test_normal")).unwrap();
            assert!(matches!(sampler.run(1), Err(GwinError::Uninitialized)), "{name}");
            sampler.set_p0().unwrap();
            assert!(matches!(sampler.run(0), Err(GwinError::InvalidIterations(0))), "{name}");
            assert_eq!(sampler.niterations(), 0);
            sampler.run(2).unwrap();
            assert_eq!(sampler.niterations(), 2, "{name}");
            // Nested sampling stores one dead point per iteration.
            let per_iteration = if name == Nested::NAME { 1 } else { config.nwalkers };
            assert_eq!(sampler.trace()[0].len(), 2 * per_iteration, "{name}");
        }
    }

    #[test]
    fn empty_parameter_list_is_rejected() {
        let prior = JointDistribution::new(Vec::new()).unwrap();
        let likelihood = new_likelihood("test_normal", LikelihoodArgs::analytic(vec![], prior)).unwrap();
        for name in sampler_names() {
            let err = new_sampler(name, SamplerConfig::default(), likelihood.clone());
            assert!(matches!(err, Err(GwinError::Config(_))), "{name}");
        }
    }

    #[test]
    fn zero_counts_are_rejected() {
        let config = SamplerConfig {
            niterations: 0,
            ..Default::default()
        };
        for name in sampler_names() {
            let err = new_sampler(name, config, test_support::analytic("test_normal"));
            assert!(matches!(err, Err(GwinError::Config(_))), "{name}");
        }
    }

    #[test]
    fn same_seed_same_chain_for_any_thread_count() {
        for name in sampler_names() {
            let run = |nprocesses| {
                let config = SamplerConfig {
                    nwalkers: 8,
                    ntemps: 2,
                    nprocesses,
                    seed: 17,
                    ..Default::default()
                };
                let mut sampler =
                    new_sampler(name, config, test_support::analytic("test_rosenbrock")).unwrap();
                sampler.set_p0().unwrap();
                sampler.run(5).unwrap();
                (sampler.acceptance_fraction(), sampler.trace()[0].draws.to_data())
            };
            assert_eq!(run(1), run(3), "{name}");
        }
    }
}
