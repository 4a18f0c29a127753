use std::{collections::VecDeque, sync::Arc};

use itertools::Itertools;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{
    config::SamplerConfig,
    error::{GwinError, Result},
    likelihood::{Evaluation, LikelihoodEvaluator},
    math::{logaddexp, logsubexp},
    trace::TraceOutput,
};

use super::{fraction, FromConfig, Sampler, SamplerCore};

/// Random walk steps taken to replace a live point.
const WALK_STEPS: usize = 20;
/// Walks advanced together, one proposal each per pool batch.
const WALK_BATCH: usize = 8;
const TARGET_ACCEPTANCE: f64 = 0.5;

/// Nested sampling (Skilling 2006) with `nwalkers` live points.
///
/// Each iteration retires the live point with the lowest likelihood,
/// adds its share of the prior volume to the evidence and replaces it by
/// a constrained random walk started from another live point. Step sizes
/// follow the spread of the live points and are re-estimated every
/// `update_interval` iterations.
///
/// Walks run `WALK_BATCH` at a time so the worker pool evaluates their
/// proposals together. Finished walks wait in a queue and are used by
/// later iterations if they still lie above the likelihood threshold.
pub struct Nested {
    core: SamplerCore,
    live: Option<LivePoints>,
    queue: VecDeque<(Vec<f64>, Evaluation)>,
    /// Log evidence accumulated from retired points.
    logz: f64,
    information: f64,
    /// Log of the expected prior volume inside the current contour.
    logx: f64,
    dead_logwt: Vec<f64>,
    step_factor: f64,
    steps: Vec<f64>,
    accepted: u64,
    proposed: u64,
    recent_accepted: u64,
    recent_proposed: u64,
}

struct LivePoints {
    points: Vec<Vec<f64>>,
    evals: Vec<Evaluation>,
}

impl LivePoints {
    fn worst(&self) -> usize {
        self.evals
            .iter()
            .position_min_by(|a, b| a.loglikelihood.total_cmp(&b.loglikelihood))
            .unwrap_or(0)
    }

    /// Standard deviation of the live points along each parameter.
    fn spread(&self) -> Vec<f64> {
        let n = self.points.len() as f64;
        let ndim = self.points.first().map_or(0, |p| p.len());
        (0..ndim)
            .map(|d| {
                let mean = self.points.iter().map(|p| p[d]).sum::<f64>() / n;
                let var = self.points.iter().map(|p| (p[d] - mean).powi(2)).sum::<f64>() / n;
                var.sqrt()
            })
            .collect()
    }
}

impl Nested {
    /// Evidence including the points still alive, each weighted by an
    /// equal share of the remaining prior volume.
    pub fn log_evidence(&self) -> f64 {
        let Some(live) = self.live.as_ref() else {
            return self.logz;
        };
        let logn = (live.points.len() as f64).ln();
        live.evals.iter().fold(self.logz, |logz, eval| {
            logaddexp(logz, self.logx - logn + eval.loglikelihood)
        })
    }

    /// Kullback-Leibler divergence of the posterior from the prior, in nats,
    /// from the retired points.
    pub fn information(&self) -> f64 {
        self.information
    }

    /// Log weights of the retired points, in the order they appear in the
    /// trace.
    pub fn dead_log_weights(&self) -> &[f64] {
        &self.dead_logwt
    }

    fn update_steps(&mut self) {
        if let Some(live) = self.live.as_ref() {
            if self.recent_proposed > 0 {
                let rate = fraction(self.recent_accepted, self.recent_proposed);
                self.step_factor *= (rate - TARGET_ACCEPTANCE).exp();
                self.recent_accepted = 0;
                self.recent_proposed = 0;
            }
            self.steps = live
                .spread()
                .into_iter()
                .map(|s| self.step_factor * s)
                .collect();
        }
    }

    /// Advance `WALK_BATCH` random walks, each started from a live point
    /// other than `worst`, and queue their end points. Walks only move to
    /// points inside the prior with likelihood above `threshold`.
    fn walk_batch(&mut self, worst: usize, threshold: f64) -> Result<()> {
        let Some(live) = self.live.as_ref() else {
            return Err(GwinError::Uninitialized);
        };
        let nlive = live.points.len();
        let rng = &mut self.core.rng;
        let (mut points, mut evals): (Vec<_>, Vec<_>) = (0..WALK_BATCH)
            .map(|_| {
                let mut other = rng.random_range(0..nlive - 1);
                if other >= worst {
                    other += 1;
                }
                (live.points[other].clone(), live.evals[other].clone())
            })
            .unzip();

        for _ in 0..WALK_STEPS {
            let mut proposals = Vec::with_capacity(points.len());
            for point in points.iter() {
                let proposal = point
                    .iter()
                    .zip(self.steps.iter())
                    .map(|(&x, &step)| {
                        let z: f64 = self.core.rng.sample(StandardNormal);
                        x + step * z
                    })
                    .collect_vec();
                proposals.push(proposal);
            }
            let results = self.core.evaluate(&proposals)?;
            for (walk, (proposal, new)) in proposals.into_iter().zip(results).enumerate() {
                self.proposed += 1;
                self.recent_proposed += 1;
                if new.logprior > f64::NEG_INFINITY && new.loglikelihood > threshold {
                    points[walk] = proposal;
                    evals[walk] = new;
                    self.accepted += 1;
                    self.recent_accepted += 1;
                }
            }
        }
        self.queue.extend(points.into_iter().zip(evals));
        Ok(())
    }

    /// Next queued point above `threshold`, refilling the queue when it
    /// runs dry.
    fn replacement(&mut self, worst: usize, threshold: f64) -> Result<(Vec<f64>, Evaluation)> {
        while let Some((point, eval)) = self.queue.pop_front() {
            if eval.loglikelihood > threshold {
                return Ok((point, eval));
            }
        }
        self.walk_batch(worst, threshold)?;
        // Fresh walks start at or above the threshold; on a likelihood
        // plateau none may be strictly above it.
        let idx = self
            .queue
            .iter()
            .position(|(_, eval)| eval.loglikelihood > threshold)
            .unwrap_or(0);
        self.queue
            .remove(idx)
            .ok_or_else(|| GwinError::Config(format!("{} produced no walks", Self::NAME)))
    }

    fn step(&mut self) -> Result<()> {
        let Some(live) = self.live.as_ref() else {
            return Err(GwinError::Uninitialized);
        };
        let nlive = live.points.len();
        let worst = live.worst();
        let threshold = live.evals[worst].loglikelihood;

        // Each retirement shrinks the prior volume by exp(-1 / nlive) on average.
        let logw = self.logx + logsubexp(0., -1. / nlive as f64);
        let logwt = logw + threshold;
        let logz_new = logaddexp(self.logz, logwt);
        self.information = if self.logz == f64::NEG_INFINITY {
            (logwt - logz_new).exp() * threshold - logz_new
        } else {
            (logwt - logz_new).exp() * threshold
                + (self.logz - logz_new).exp() * (self.information + self.logz)
                - logz_new
        };
        self.logz = logz_new;
        self.logx -= 1. / nlive as f64;
        self.dead_logwt.push(logwt);
        self.core
            .record(0, [(&live.points[worst], &live.evals[worst])]);

        let (point, eval) = self.replacement(worst, threshold)?;

        if let Some(live) = self.live.as_mut() {
            live.points[worst] = point;
            live.evals[worst] = eval;
        }
        Ok(())
    }
}

impl FromConfig for Nested {
    const NAME: &'static str = "nested";

    fn from_config(
        config: SamplerConfig,
        likelihood: Arc<dyn LikelihoodEvaluator>,
    ) -> Result<Self> {
        let core = SamplerCore::new(Self::NAME, 3, config, likelihood, 1)?;
        if config.nwalkers <= core.ndim() {
            return Err(GwinError::Config(format!(
                "{} needs more live points than parameters, got {} for {}",
                Self::NAME,
                config.nwalkers,
                core.ndim()
            )));
        }
        Ok(Self {
            core,
            live: None,
            queue: VecDeque::new(),
            logz: f64::NEG_INFINITY,
            information: 0.,
            logx: 0.,
            dead_logwt: Vec::new(),
            step_factor: 1.,
            steps: Vec::new(),
            accepted: 0,
            proposed: 0,
            recent_accepted: 0,
            recent_proposed: 0,
        })
    }
}

impl Sampler for Nested {
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
        self.live = Some(LivePoints { points, evals });
        self.queue.clear();
        self.logz = f64::NEG_INFINITY;
        self.information = 0.;
        self.logx = 0.;
        self.dead_logwt.clear();
        self.step_factor = 1.;
        self.accepted = 0;
        self.proposed = 0;
        self.recent_accepted = 0;
        self.recent_proposed = 0;
        self.update_steps();
        Ok(())
    }

    fn run(&mut self, niterations: u64) -> Result<()> {
        self.core.check_run(self.live.is_some(), niterations)?;
        for _ in 0..niterations {
            self.step()?;
            if (self.core.niterations + 1) % self.core.config.update_interval == 0 {
                self.update_steps();
            }
            let (logz, logx) = (self.log_evidence(), self.logx);
            self.core
                .finish_iteration(|| format!("log evidence {logz:.3}, log volume {logx:.3}"));
        }
        Ok(())
    }

    fn niterations(&self) -> u64 {
        self.core.niterations
    }

    /// A single value: the fraction of accepted random walk steps.
    fn acceptance_fraction(&self) -> Vec<f64> {
        vec![fraction(self.accepted, self.proposed)]
    }

    fn trace(&self) -> Vec<TraceOutput> {
        self.core.trace()
    }
}
