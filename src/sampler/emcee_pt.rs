use std::sync::Arc;

use itertools::Itertools;
use rand::{seq::SliceRandom, Rng};

use crate::{
    config::SamplerConfig,
    error::Result,
    likelihood::LikelihoodEvaluator,
    trace::TraceOutput,
};

use super::{
    ensemble::{check_ensemble_size, stretch_sweep, StretchMove, Walkers},
    fraction, FromConfig, Sampler, SamplerCore,
};

/// Inverse temperatures `c^-i` for `i = 0..ntemps`, where the spacing
/// `c = 1 + 2 sqrt(ln 4 / ndim)` keeps swaps between neighbours likely for
/// Gaussian posteriors.
pub fn geometric_ladder(ntemps: usize, ndim: usize) -> Vec<f64> {
    let step = 1. + 2. * (4f64.ln() / ndim as f64).sqrt();
    (0..ntemps).map(|i| step.powi(-(i as i32))).collect()
}

/// Parallel tempered ensemble sampler: one affine invariant ensemble per
/// temperature, with walkers exchanged between neighbouring temperatures
/// after every iteration.
pub struct EmceePt {
    core: SamplerCore,
    stretch: StretchMove,
    betas: Vec<f64>,
    /// Coldest first.
    ensembles: Option<Vec<Walkers>>,
    /// Accepted swaps between temperature `i` and `i + 1`.
    swaps_accepted: Vec<u64>,
    swaps_proposed: Vec<u64>,
}

impl EmceePt {
    pub fn betas(&self) -> &[f64] {
        &self.betas
    }

    /// Fraction of accepted exchanges between each pair of neighbouring
    /// temperatures, coldest pair first.
    pub fn tswap_acceptance_fraction(&self) -> Vec<f64> {
        self.swaps_accepted
            .iter()
            .zip(self.swaps_proposed.iter())
            .map(|(&acc, &prop)| fraction(acc, prop))
            .collect()
    }

    /// Propose exchanging every walker with a randomly paired walker one
    /// temperature colder, starting from the hottest pair.
    fn swap_temperatures(&mut self) {
        let Some(ensembles) = self.ensembles.as_mut() else {
            return;
        };
        let nwalkers = self.core.config.nwalkers;
        let mut pairing = (0..nwalkers).collect_vec();

        for hot in (1..self.betas.len()).rev() {
            let dbeta = self.betas[hot - 1] - self.betas[hot];
            pairing.shuffle(&mut self.core.rng);
            let (colder, hotter) = ensembles.split_at_mut(hot);
            let cold_walkers = &mut colder[hot - 1];
            let hot_walkers = &mut hotter[0];

            for (k, &j) in pairing.iter().enumerate() {
                let log_ratio = dbeta
                    * (hot_walkers.evals[k].loglikelihood - cold_walkers.evals[j].loglikelihood);
                let u: f64 = self.core.rng.random();
                self.swaps_proposed[hot - 1] += 1;
                if u.ln() < log_ratio {
                    hot_walkers.swap_walker(k, cold_walkers, j);
                    self.swaps_accepted[hot - 1] += 1;
                }
            }
        }
    }
}

impl FromConfig for EmceePt {
    const NAME: &'static str = "emcee_pt";

    fn from_config(
        config: SamplerConfig,
        likelihood: Arc<dyn LikelihoodEvaluator>,
    ) -> Result<Self> {
        let core = SamplerCore::new(Self::NAME, 1, config, likelihood, config.ntemps)?;
        check_ensemble_size(Self::NAME, config.nwalkers, core.ndim())?;
        let betas = geometric_ladder(config.ntemps, core.ndim());
        let npairs = config.ntemps - 1;
        Ok(Self {
            core,
            stretch: StretchMove::default(),
            betas,
            ensembles: None,
            swaps_accepted: vec![0; npairs],
            swaps_proposed: vec![0; npairs],
        })
    }
}

impl Sampler for EmceePt {
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
        let ensembles = (0..self.betas.len())
            .map(|temp| {
                let (points, evals) = self.core.initial_points(nwalkers, temp)?;
                Ok(Walkers::new(points, evals))
            })
            .collect::<Result<Vec<_>>>()?;
        self.core.reset();
        self.swaps_accepted.fill(0);
        self.swaps_proposed.fill(0);
        self.ensembles = Some(ensembles);
        Ok(())
    }

    fn run(&mut self, niterations: u64) -> Result<()> {
        self.core.check_run(self.ensembles.is_some(), niterations)?;
        for _ in 0..niterations {
            if let Some(ensembles) = self.ensembles.as_mut() {
                for (walkers, &beta) in ensembles.iter_mut().zip(self.betas.iter()) {
                    stretch_sweep(&mut self.core, self.stretch, walkers, beta)?;
                }
            }
            self.swap_temperatures();

            if let Some(ensembles) = self.ensembles.as_ref() {
                for (temp, walkers) in ensembles.iter().enumerate() {
                    self.core.record(temp, walkers.samples());
                }
            }
            let swaps = self.tswap_acceptance_fraction();
            let acceptance = self.acceptance_fraction();
            self.core.finish_iteration(|| {
                format!(
                    "mean acceptance {:.3}, swap acceptance {:.3?}",
                    acceptance.iter().sum::<f64>() / acceptance.len() as f64,
                    swaps
                )
            });
        }
        Ok(())
    }

    fn niterations(&self) -> u64 {
        self.core.niterations
    }

    fn acceptance_fraction(&self) -> Vec<f64> {
        self.ensembles
            .as_ref()
            .and_then(|ensembles| ensembles.first())
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
    use crate::sampler::test_support;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn ladder_spacing() {
        let betas = geometric_ladder(3, 4);
        let step = 1. + 2. * (4f64.ln() / 4.).sqrt();
        assert_eq!(betas[0], 1.);
        assert_relative_eq!(betas[1], 1. / step);
        assert_relative_eq!(betas[2], 1. / (step * step));
    }

    #[test]
    fn one_trace_per_temperature() {
        let config = SamplerConfig {
            ntemps: 3,
            nwalkers: 10,
            seed: 2,
            ..Default::default()
        };
        let mut sampler = EmceePt::from_config(config, test_support::analytic("test_normal")).unwrap();
        sampler.set_p0().unwrap();
        sampler.run(10).unwrap();

        let traces = sampler.trace();
        assert_eq!(traces.len(), 3);
        assert_eq!(
            traces.iter().map(|t| (t.temperature, t.len())).collect_vec(),
            vec![(0, 100), (1, 100), (2, 100)]
        );
        let swaps = sampler.tswap_acceptance_fraction();
        assert_eq!(swaps.len(), 2);
        assert!(swaps.iter().all(|&f| f > 0. && f <= 1.), "{swaps:?}");
    }
}
