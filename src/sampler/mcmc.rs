use std::sync::Arc;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::{
    config::SamplerConfig,
    error::{GwinError, Result},
    likelihood::{Evaluation, LikelihoodEvaluator},
    trace::TraceOutput,
};

use super::{fraction, FromConfig, Sampler, SamplerCore};

const TARGET_ACCEPTANCE: f64 = 0.234;
const INITIAL_SCALE: f64 = 0.01;

/// Independent random walk Metropolis chains, one per walker.
///
/// Each walker proposes a Gaussian step with a per-parameter scale that
/// starts at a hundredth of the prior width. Every `update_interval`
/// iterations the scale is multiplied by `exp(acceptance - 0.234)`,
/// using the walker's acceptance rate since the previous update.
pub struct Mcmc {
    core: SamplerCore,
    widths: Vec<f64>,
    chains: Option<Chains>,
}

struct Chains {
    points: Vec<Vec<f64>>,
    evals: Vec<Evaluation>,
    scales: Vec<f64>,
    accepted: Vec<u64>,
    /// Accepted since the last scale update.
    recent: Vec<u64>,
    proposed: u64,
}

impl Mcmc {
    /// Current proposal scale of each walker, as a multiple of the prior
    /// widths.
    pub fn proposal_scales(&self) -> Vec<f64> {
        self.chains
            .as_ref()
            .map(|chains| chains.scales.clone())
            .unwrap_or_default()
    }

    fn step(&mut self) -> Result<()> {
        let Some(chains) = self.chains.as_mut() else {
            return Err(GwinError::Uninitialized);
        };
        let proposals = chains
            .points
            .iter()
            .zip(chains.scales.iter())
            .map(|(point, &scale)| {
                point
                    .iter()
                    .zip(self.widths.iter())
                    .map(|(&x, &width)| {
                        let z: f64 = self.core.rng.sample(StandardNormal);
                        x + scale * width * z
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let evals = self.core.evaluate(&proposals)?;
        for (i, (proposal, eval)) in proposals.into_iter().zip(evals).enumerate() {
            let log_ratio = eval.logposterior() - chains.evals[i].logposterior();
            let u: f64 = self.core.rng.random();
            if u.ln() < log_ratio {
                chains.points[i] = proposal;
                chains.evals[i] = eval;
                chains.accepted[i] += 1;
                chains.recent[i] += 1;
            }
        }
        chains.proposed += 1;

        let interval = self.core.config.update_interval;
        if chains.proposed % interval == 0 {
            for (scale, recent) in chains.scales.iter_mut().zip(chains.recent.iter_mut()) {
                let rate = fraction(*recent, interval);
                *scale *= (rate - TARGET_ACCEPTANCE).exp();
                *recent = 0;
            }
        }
        Ok(())
    }
}

impl FromConfig for Mcmc {
    const NAME: &'static str = "mcmc";

    fn from_config(
        config: SamplerConfig,
        likelihood: Arc<dyn LikelihoodEvaluator>,
    ) -> Result<Self> {
        let widths = likelihood
            .variable_params()
            .iter()
            .map(|&param| {
                likelihood
                    .prior()
                    .marginal(param)
                    .map(|dist| dist.width())
                    .ok_or(GwinError::MissingParameter(param))
            })
            .collect::<Result<Vec<_>>>()?;
        let core = SamplerCore::new(Self::NAME, 2, config, likelihood, 1)?;
        Ok(Self {
            core,
            widths,
            chains: None,
        })
    }
}

impl Sampler for Mcmc {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn config(&self) -> &SamplerConfig {
        &self.core.config
    }

    fn likelihood(&self) -> &Arc<dyn LikelihoodEvaluator> {
        &self.core.likelihood
    }

    fn set_p0(&mut self) -> Result<()> {
        let nwalkers = self.core.config.nwalkers;
        let (points, evals) = self.core.initial_points(nwalkers, 0)?;
        self.core.reset();
        self.chains = Some(Chains {
            points,
            evals,
            scales: vec![INITIAL_SCALE; nwalkers],
            accepted: vec![0; nwalkers],
            recent: vec![0; nwalkers],
            proposed: 0,
        });
        Ok(())
    }

    fn run(&mut self, niterations: u64) -> Result<()> {
        self.core.check_run(self.chains.is_some(), niterations)?;
        for _ in 0..niterations {
            self.step()?;
            if let Some(chains) = self.chains.as_ref() {
                self.core
                    .record(0, chains.points.iter().zip(chains.evals.iter()));
                let acceptance = self.acceptance_fraction();
                self.core.finish_iteration(|| {
                    format!(
                        "mean acceptance {:.3}",
                        acceptance.iter().sum::<f64>() / acceptance.len() as f64
                    )
                });
            }
        }
        Ok(())
    }

    fn niterations(&self) -> u64 {
        self.core.niterations
    }

    fn acceptance_fraction(&self) -> Vec<f64> {
        self.chains
            .as_ref()
            .map(|chains| {
                chains
                    .accepted
                    .iter()
                    .map(|&acc| fraction(acc, chains.proposed))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn trace(&self) -> Vec<TraceOutput> {
        self.core.trace()
    }
}
