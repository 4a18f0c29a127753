//! Goodman & Weare affine invariant ensemble moves shared by the ensemble
//! samplers.

use rand::Rng;

use crate::{
    error::{GwinError, Result},
    likelihood::Evaluation,
};

use super::{fraction, SamplerCore};

/// Walker counts must be even and at least twice the dimension.
pub(crate) fn check_ensemble_size(name: &str, nwalkers: usize, ndim: usize) -> Result<()> {
    if nwalkers % 2 != 0 || nwalkers < 2 * ndim {
        return Err(GwinError::Config(format!(
            "{name} needs an even number of walkers, at least {}, got {nwalkers}",
            2 * ndim
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StretchMove {
    a: f64,
}

impl Default for StretchMove {
    fn default() -> Self {
        Self { a: 2. }
    }
}

impl StretchMove {
    /// `z` with density `1/sqrt(z)` on `[1/a, a]`.
    pub(crate) fn sample_z<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.random();
        ((self.a - 1.) * u + 1.).powi(2) / self.a
    }
}

/// Positions and evaluations of one ensemble of walkers.
#[derive(Debug, Clone)]
pub(crate) struct Walkers {
    pub(crate) points: Vec<Vec<f64>>,
    pub(crate) evals: Vec<Evaluation>,
    pub(crate) accepted: Vec<u64>,
    pub(crate) proposed: u64,
}

impl Walkers {
    pub(crate) fn new(points: Vec<Vec<f64>>, evals: Vec<Evaluation>) -> Self {
        let accepted = vec![0; points.len()];
        Self {
            points,
            evals,
            accepted,
            proposed: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }

    pub(crate) fn acceptance_fraction(&self) -> Vec<f64> {
        self.accepted
            .iter()
            .map(|&acc| fraction(acc, self.proposed))
            .collect()
    }

    pub(crate) fn mean_acceptance(&self) -> f64 {
        let fractions = self.acceptance_fraction();
        fractions.iter().sum::<f64>() / fractions.len() as f64
    }

    pub(crate) fn samples(&self) -> impl Iterator<Item = (&Vec<f64>, &Evaluation)> {
        self.points.iter().zip(self.evals.iter())
    }

    /// Exchange walker `i` of `self` with walker `j` of `other`.
    pub(crate) fn swap_walker(&mut self, i: usize, other: &mut Walkers, j: usize) {
        std::mem::swap(&mut self.points[i], &mut other.points[j]);
        std::mem::swap(&mut self.evals[i], &mut other.evals[j]);
    }
}

/// Update both halves of the ensemble in turn, each against the other
/// half, targeting `beta * loglikelihood + logprior`.
pub(crate) fn stretch_sweep(
    core: &mut SamplerCore,
    stretch: StretchMove,
    walkers: &mut Walkers,
    beta: f64,
) -> Result<()> {
    let nwalkers = walkers.len();
    let half = nwalkers / 2;
    let ndim = core.ndim() as f64;

    for (active, complement) in [(0..half, half..nwalkers), (half..nwalkers, 0..half)] {
        let mut proposals = Vec::with_capacity(active.len());
        let mut stretches = Vec::with_capacity(active.len());
        for i in active.clone() {
            let j = core.rng.random_range(complement.clone());
            let z = stretch.sample_z(&mut core.rng);
            let proposal = walkers.points[i]
                .iter()
                .zip(walkers.points[j].iter())
                .map(|(&x, &c)| c + z * (x - c))
                .collect::<Vec<_>>();
            proposals.push(proposal);
            stretches.push(z);
        }

        let evals = core.evaluate(&proposals)?;
        for (((i, proposal), eval), z) in active
            .zip(proposals)
            .zip(evals)
            .zip(stretches)
        {
            let log_ratio =
                (ndim - 1.) * z.ln() + eval.tempered(beta) - walkers.evals[i].tempered(beta);
            let u: f64 = core.rng.random();
            if log_ratio > u.ln() {
                walkers.points[i] = proposal;
                walkers.evals[i] = eval;
                walkers.accepted[i] += 1;
            }
        }
    }
    walkers.proposed += 1;
    Ok(())
}
