use std::sync::Arc;

use crate::{
    config::SamplerConfig,
    error::Result,
    likelihood::LikelihoodEvaluator,
    trace::TraceOutput,
};

use super::{
    ensemble::{check_ensemble_size, stretch_sweep, StretchMove, Walkers},
    FromConfig, Sampler, SamplerCore,
};

/// Affine invariant ensemble sampler (Goodman & Weare 2010) on the posterior.
pub struct Emcee {
    core: SamplerCore,
    stretch: StretchMove,
    walkers: Option<Walkers>,
}

impl FromConfig for Emcee {
    const NAME: &'static str = "emcee";

    fn from_config(
        config: SamplerConfig,
        likelihood: Arc<dyn LikelihoodEvaluator>,
    ) -> Result<Self> {
        let core = SamplerCore::new(Self::NAME, 0, config, likelihood, 1)?;
        check_ensemble_size(Self::NAME, config.nwalkers, core.ndim())?;
        Ok(Self {
            core,
            stretch: StretchMove::default(),
            walkers: None,
        })
    }
}

impl Sampler for Emcee {
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
        let (points, evals) = self.core.initial_points(self.core.config.nwalkers, 0)?;
        self.core.reset();
        self.walkers = Some(Walkers::new(points, evals));
        Ok(())
    }

    fn run(&mut self, niterations: u64) -> Result<()> {
        self.core.check_run(self.walkers.is_some(), niterations)?;
        let Some(walkers) = self.walkers.as_mut() else {
            return Ok(());
        };
        for _ in 0..niterations {
            stretch_sweep(&mut self.core, self.stretch, walkers, 1.)?;
            self.core.record(0, walkers.samples());
            self.core
                .finish_iteration(|| format!("mean acceptance {:.3}", walkers.mean_acceptance()));
        }
        Ok(())
    }

    fn niterations(&self) -> u64 {
        self.core.niterations
    }

    fn acceptance_fraction(&self) -> Vec<f64> {
        self.walkers
            .as_ref()
            .map(|walkers| walkers.acceptance_fraction())
            .unwrap_or_default()
    }

    fn trace(&self) -> Vec<TraceOutput> {
        self.core.trace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::GwinError, sampler::test_support};

    #[test]
    fn odd_walker_count_is_rejected() {
        let config = SamplerConfig {
            nwalkers: 9,
            ..Default::default()
        };
        let err = Emcee::from_config(config, test_support::analytic("test_normal"));
        assert!(matches!(err, Err(GwinError::Config(_))));
    }

    #[test]
    fn walkers_move() {
        let config = SamplerConfig {
            nwalkers: 20,
            seed: 5,
            ..Default::default()
        };
        let mut sampler = Emcee::from_config(config, test_support::analytic("test_normal")).unwrap();
        sampler.set_p0().unwrap();
        sampler.run(20).unwrap();
        let acceptance = sampler.acceptance_fraction();
        assert_eq!(acceptance.len(), 20);
        let mean = acceptance.iter().sum::<f64>() / 20.;
        assert!(mean > 0.2 && mean < 0.95, "acceptance {mean}");
        assert_eq!(sampler.trace()[0].len(), 400);
    }
}
