use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::{
    error::Result,
    likelihood::{Evaluation, LikelihoodEvaluator},
};

/// Evaluates batches of points, on worker threads if more than one
/// process was requested.
///
/// Results come back in the order of the points, so a sampler sees the
/// same values whatever the number of threads.
pub(crate) struct EvaluationPool {
    pool: Option<ThreadPool>,
}

impl EvaluationPool {
    pub(crate) fn new(nprocesses: usize) -> Result<Self> {
        if nprocesses <= 1 {
            return Ok(Self { pool: None });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(nprocesses)
            .thread_name(|i| format!("gwin-worker-{}", i))
            .build()?;
        Ok(Self { pool: Some(pool) })
    }

    pub(crate) fn num_threads(&self) -> usize {
        self.pool.as_ref().map_or(1, |pool| pool.current_num_threads())
    }

    /// One result per point.
    pub(crate) fn map(
        &self,
        likelihood: &dyn LikelihoodEvaluator,
        points: &[Vec<f64>],
    ) -> Vec<Result<Evaluation>> {
        match &self.pool {
            None => points.iter().map(|p| likelihood.evaluate(p)).collect(),
            Some(pool) => pool.install(|| {
                points
                    .par_iter()
                    .map(|p| likelihood.evaluate(p))
                    .collect()
            }),
        }
    }

    /// Like [`EvaluationPool::map`], failing on the first error.
    pub(crate) fn evaluate(
        &self,
        likelihood: &dyn LikelihoodEvaluator,
        points: &[Vec<f64>],
    ) -> Result<Vec<Evaluation>> {
        self.map(likelihood, points).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        distributions::{JointDistribution, Primitive},
        likelihood::{new_likelihood, LikelihoodArgs},
        parameters::Parameter,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn threads_do_not_change_results() {
        let prior = JointDistribution::new([
            (Parameter::Ra, Primitive::uniform(0., 1.).unwrap()),
            (Parameter::Dec, Primitive::uniform(0., 1.).unwrap()),
        ])
        .unwrap();
        let likelihood = new_likelihood(
            "test_rosenbrock",
            LikelihoodArgs::analytic(vec![Parameter::Ra, Parameter::Dec], prior),
        )
        .unwrap();
        let points = (0..64)
            .map(|i| vec![i as f64 / 64., 1. - i as f64 / 64.])
            .collect::<Vec<_>>();

        let serial = EvaluationPool::new(1).unwrap();
        let parallel = EvaluationPool::new(3).unwrap();
        assert_eq!(serial.num_threads(), 1);
        assert_eq!(parallel.num_threads(), 3);
        assert_eq!(
            serial.evaluate(&*likelihood, &points).unwrap(),
            parallel.evaluate(&*likelihood, &points).unwrap()
        );

        let results = serial.map(&*likelihood, &[vec![0.5]]);
        assert!(results[0].is_err());
    }
}
