//! Analytic densities for exercising samplers without detector data.
//!
//! Each density is defined on a fixed box; points are mapped onto it
//! linearly from the prior bounds of the variable parameters.

use std::f64::consts::PI;

use crate::{
    distributions::JointDistribution,
    error::{GwinError, Result},
    parameters::Parameter,
};

use super::{LikelihoodArgs, LikelihoodEvaluator, Meta};

#[derive(Debug, Clone)]
struct Domain {
    variable_params: Vec<Parameter>,
    prior: JointDistribution,
    bounds: Vec<(f64, f64)>,
}

impl Domain {
    fn new(args: LikelihoodArgs) -> Result<Self> {
        args.check_prior()?;
        let bounds = args
            .variable_params
            .iter()
            .map(|&param| {
                args.prior
                    .marginal(param)
                    .map(|dist| dist.bounds())
                    .ok_or(GwinError::MissingParameter(param))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            variable_params: args.variable_params,
            prior: args.prior,
            bounds,
        })
    }

    /// Map each coordinate from its prior range onto `[low, high]`.
    fn rescale(&self, point: &[f64], low: f64, high: f64) -> Vec<f64> {
        point
            .iter()
            .zip(self.bounds.iter())
            .map(|(&x, &(lo, hi))| low + (high - low) * (x - lo) / (hi - lo))
            .collect()
    }
}

macro_rules! analytic_evaluator {
    ($ty:ident) => {
        impl LikelihoodEvaluator for $ty {
            fn name(&self) -> &'static str {
                Self::NAME
            }

            fn variable_params(&self) -> &[Parameter] {
                &self.domain.variable_params
            }

            fn prior(&self) -> &JointDistribution {
                &self.domain.prior
            }

            fn return_meta(&self) -> bool {
                false
            }

            fn loglikelihood_in_support(&self, point: &[f64]) -> Result<(f64, Option<Meta>)> {
                if point.len() != self.domain.variable_params.len() {
                    return Err(GwinError::Dimension {
                        expected: self.domain.variable_params.len(),
                        actual: point.len(),
                    });
                }
                Ok((self.logdensity(point), None))
            }
        }
    };
}

/// Independent normals centred in the prior box, with standard deviation a
/// sixth of each prior width.
#[derive(Debug, Clone)]
pub struct TestNormal {
    domain: Domain,
}

impl TestNormal {
    pub const NAME: &'static str = "test_normal";

    pub fn new(args: LikelihoodArgs) -> Result<Self> {
        Ok(Self {
            domain: Domain::new(args)?,
        })
    }

    pub fn mean(&self) -> Vec<f64> {
        self.domain
            .bounds
            .iter()
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    pub fn std(&self) -> Vec<f64> {
        self.domain
            .bounds
            .iter()
            .map(|(lo, hi)| (hi - lo) / 6.)
            .collect()
    }

    fn logdensity(&self, point: &[f64]) -> f64 {
        let norm = 0.5 * (2. * PI).ln();
        point
            .iter()
            .zip(self.mean())
            .zip(self.std())
            .map(|((&x, mu), sigma)| {
                let z = (x - mu) / sigma;
                -0.5 * z * z - sigma.ln() - norm
            })
            .sum()
    }
}

analytic_evaluator!(TestNormal);

/// `(2 + Π cos(x_i / 2))^5` on `[0, 10π]^n`.
#[derive(Debug, Clone)]
pub struct TestEggbox {
    domain: Domain,
}

impl TestEggbox {
    pub const NAME: &'static str = "test_eggbox";

    pub fn new(args: LikelihoodArgs) -> Result<Self> {
        Ok(Self {
            domain: Domain::new(args)?,
        })
    }

    fn logdensity(&self, point: &[f64]) -> f64 {
        let x = self.domain.rescale(point, 0., 10. * PI);
        let prod: f64 = x.iter().map(|xi| (0.5 * xi).cos()).product();
        (2. + prod).powi(5)
    }
}

analytic_evaluator!(TestEggbox);

/// Negative Rosenbrock function on `[-5, 5]^n`.
#[derive(Debug, Clone)]
pub struct TestRosenbrock {
    domain: Domain,
}

impl TestRosenbrock {
    pub const NAME: &'static str = "test_rosenbrock";

    pub fn new(args: LikelihoodArgs) -> Result<Self> {
        Ok(Self {
            domain: Domain::new(args)?,
        })
    }

    fn logdensity(&self, point: &[f64]) -> f64 {
        let x = self.domain.rescale(point, -5., 5.);
        -x.windows(2)
            .map(|w| 100. * (w[1] - w[0] * w[0]).powi(2) + (1. - w[0]).powi(2))
            .sum::<f64>()
    }
}

analytic_evaluator!(TestRosenbrock);

/// A ring shaped ridge around a broad central peak, in two dimensions on
/// `[-15, 15]^2`.
#[derive(Debug, Clone)]
pub struct TestVolcano {
    domain: Domain,
}

impl TestVolcano {
    pub const NAME: &'static str = "test_volcano";

    const RING_RADIUS: f64 = 5.5;
    const RING_WIDTH: f64 = 0.5;

    pub fn new(args: LikelihoodArgs) -> Result<Self> {
        if args.variable_params.len() != 2 {
            return Err(GwinError::Config(format!(
                "{} is only defined in two dimensions, got {} parameters",
                Self::NAME,
                args.variable_params.len()
            )));
        }
        Ok(Self {
            domain: Domain::new(args)?,
        })
    }

    fn logdensity(&self, point: &[f64]) -> f64 {
        let x = self.domain.rescale(point, -15., 15.);
        let r = x[0].hypot(x[1]);
        let z = (r - Self::RING_RADIUS) / Self::RING_WIDTH;
        25. * (-r / 35.).exp() + (-0.5 * z * z).exp() / (Self::RING_WIDTH * (2. * PI).sqrt())
    }
}

analytic_evaluator!(TestVolcano);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{distributions::Primitive, likelihood::new_likelihood};
    use approx::assert_relative_eq;

    fn args(params: &[Parameter]) -> LikelihoodArgs {
        let prior = JointDistribution::new(
            params
                .iter()
                .map(|&p| (p, Primitive::uniform(-1., 1.).unwrap())),
        )
        .unwrap();
        LikelihoodArgs::analytic(params.to_vec(), prior)
    }

    const PARAMS: [Parameter; 2] = [Parameter::Ra, Parameter::Polarization];

    #[test]
    fn normal_peaks_at_prior_centre() {
        let normal = TestNormal::new(args(&PARAMS)).unwrap();
        let sigma: f64 = 2. / 6.;
        let peak = -2. * (sigma.ln() + 0.5 * (2. * PI).ln());
        assert_relative_eq!(normal.loglikelihood(&[0., 0.]).unwrap(), peak, epsilon = 1e-12);
        assert_relative_eq!(
            normal.loglikelihood(&[sigma, 0.]).unwrap(),
            peak - 0.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn eggbox_and_rosenbrock_values() {
        let eggbox = TestEggbox::new(args(&PARAMS)).unwrap();
        // The lower corner maps to the origin, where every cosine is one.
        assert_relative_eq!(eggbox.loglikelihood(&[-1., -1.]).unwrap(), 243., epsilon = 1e-9);

        let rosenbrock = TestRosenbrock::new(args(&PARAMS)).unwrap();
        // 0.2 maps onto 1, the global maximum.
        assert_relative_eq!(rosenbrock.loglikelihood(&[0.2, 0.2]).unwrap(), 0., epsilon = 1e-12);
        assert!(rosenbrock.loglikelihood(&[0., 0.]).unwrap() < 0.);
    }

    #[test]
    fn volcano_needs_two_dimensions() {
        assert!(TestVolcano::new(args(&[Parameter::Ra])).is_err());
        let volcano = new_likelihood("test_volcano", args(&PARAMS)).unwrap();
        let rim = volcano.loglikelihood(&[5.5 / 15., 0.]).unwrap();
        let ridge = 1. / (0.5 * (2. * PI).sqrt());
        assert_relative_eq!(rim, 25. * (-5.5f64 / 35.).exp() + ridge, epsilon = 1e-9);
        assert_relative_eq!(volcano.loglikelihood(&[0., 0.]).unwrap(), 25., epsilon = 1e-9);
    }

    #[test]
    fn outside_prior_skips_the_density() {
        let normal = new_likelihood("test_normal", args(&PARAMS)).unwrap();
        let eval = normal.evaluate(&[2., 0.]).unwrap();
        assert_eq!(eval.loglikelihood, f64::NEG_INFINITY);
        assert!(normal.evaluate(&[0.]).is_err());
    }
}
