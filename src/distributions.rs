use std::f64::consts::{FRAC_PI_2, LN_2, PI};

use itertools::Itertools;
use rand::{distr::Open01, Rng};

use crate::{
    error::{GwinError, Result},
    parameters::{Parameter, ParameterValues},
};

/// Upper edge of the periodic angle priors on ra, polarization and
/// coa_phase.
const TWO_PI_APPROX: f64 = 2. * 3.1415;

/// A one dimensional prior on a bounded support.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// Flat on `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// Density proportional to `sin(x)` on `[0, π]`.
    SinAngle,
    /// Density proportional to `cos(x)` on `[-π/2, π/2]`.
    CosAngle,
    /// Density proportional to `r²` on `[low, high]`.
    UniformRadius { low: f64, high: f64 },
}

impl Primitive {
    pub fn uniform(low: f64, high: f64) -> Result<Self> {
        check_bounds(low, high)?;
        Ok(Primitive::Uniform { low, high })
    }

    pub fn uniform_radius(low: f64, high: f64) -> Result<Self> {
        check_bounds(low, high)?;
        if low < 0. {
            return Err(GwinError::Config(format!(
                "uniform-in-radius prior needs a non-negative lower bound, got {low}"
            )));
        }
        Ok(Primitive::UniformRadius { low, high })
    }

    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Primitive::Uniform { low, high } => (low, high),
            Primitive::SinAngle => (0., PI),
            Primitive::CosAngle => (-FRAC_PI_2, FRAC_PI_2),
            Primitive::UniformRadius { low, high } => (low, high),
        }
    }

    pub fn width(&self) -> f64 {
        let (low, high) = self.bounds();
        high - low
    }

    /// Whether the density is positive at `x`.
    pub fn contains(&self, x: f64) -> bool {
        let (low, high) = self.bounds();
        match *self {
            Primitive::Uniform { .. } => (low <= x) & (x < high),
            // The density vanishes at both edges.
            Primitive::SinAngle | Primitive::CosAngle => (low < x) & (x < high),
            Primitive::UniformRadius { .. } if low == 0. => (low < x) & (x <= high),
            Primitive::UniformRadius { .. } => (low <= x) & (x <= high),
        }
    }

    /// Log density at `x`, `-inf` outside the support.
    pub fn logpdf(&self, x: f64) -> f64 {
        if !self.contains(x) {
            return f64::NEG_INFINITY;
        }
        match *self {
            Primitive::Uniform { low, high } => -(high - low).ln(),
            Primitive::SinAngle => x.sin().ln() - LN_2,
            Primitive::CosAngle => x.cos().ln() - LN_2,
            Primitive::UniformRadius { low, high } => {
                (3. * x * x / (high.powi(3) - low.powi(3))).ln()
            }
        }
    }

    /// Draw by inverting the cumulative distribution.
    ///
    /// Never lands on an edge with zero density.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Primitive::Uniform { low, high } => rng.random_range(low..high),
            Primitive::SinAngle => (1. - 2. * rng.sample::<f64, _>(Open01)).acos(),
            Primitive::CosAngle => (2. * rng.sample::<f64, _>(Open01) - 1.).asin(),
            Primitive::UniformRadius { low, high } => {
                let u: f64 = rng.sample(Open01);
                let (low3, high3) = (low.powi(3), high.powi(3));
                (low3 + u * (high3 - low3)).cbrt()
            }
        }
    }
}

fn check_bounds(low: f64, high: f64) -> Result<()> {
    if !(low.is_finite() & high.is_finite()) || low >= high {
        return Err(GwinError::Config(format!(
            "prior bounds must be finite with low < high, got ({low}, {high})"
        )));
    }
    Ok(())
}

/// The prior each parameter gets when a prior is built around a set of
/// reference values.
///
/// Every parameter of the vocabulary must be handled here. Declination
/// departs from the usual sine-angle table entry and gets [`Primitive::CosAngle`],
/// the isotropic density for a latitude.
pub fn reference_prior(param: Parameter, value: f64) -> Result<Primitive> {
    match param {
        Parameter::Mass1 | Parameter::Mass2 => Primitive::uniform(6., 50.),
        Parameter::Inclination => Ok(Primitive::SinAngle),
        Parameter::Dec => Ok(Primitive::CosAngle),
        Parameter::Polarization | Parameter::Ra | Parameter::CoaPhase => {
            Primitive::uniform(0., TWO_PI_APPROX)
        }
        Parameter::Distance => Primitive::uniform_radius((value - 100.).max(0.), value + 300.),
        Parameter::Spin1x
        | Parameter::Spin1y
        | Parameter::Spin1z
        | Parameter::Spin2x
        | Parameter::Spin2y
        | Parameter::Spin2z => Primitive::uniform(-0.1, 0.1),
        Parameter::Tc => Primitive::uniform(value - 0.2, value + 0.2),
    }
}

/// Independent priors over a list of parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct JointDistribution {
    params: Vec<Parameter>,
    marginals: Vec<Primitive>,
}

impl JointDistribution {
    pub fn new(entries: impl IntoIterator<Item = (Parameter, Primitive)>) -> Result<Self> {
        let (params, marginals): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        if let Some(dup) = params.iter().duplicates().next() {
            return Err(GwinError::DuplicateParameter(*dup));
        }
        Ok(Self { params, marginals })
    }

    /// Build the reference prior around `values`, one marginal per parameter.
    pub fn from_reference(values: &ParameterValues) -> Result<Self> {
        let entries: Vec<_> = values
            .iter()
            .map(|(param, value)| Ok((param, reference_prior(param, value)?)))
            .collect::<Result<_>>()?;
        Self::new(entries)
    }

    /// Like [`JointDistribution::from_reference`], for parameters given by name.
    pub fn from_names<S: AsRef<str>>(names: &[S], values: &[f64]) -> Result<Self> {
        let params = Parameter::parse_all(names)?;
        Self::from_reference(&ParameterValues::from_point(&params, values)?)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub fn marginal(&self, param: Parameter) -> Option<Primitive> {
        self.params
            .iter()
            .position(|&p| p == param)
            .map(|idx| self.marginals[idx])
    }

    pub fn logpdf(&self, values: &ParameterValues) -> Result<f64> {
        let mut logp = 0f64;
        for (&param, marginal) in self.params.iter().zip(self.marginals.iter()) {
            let x = values
                .get(param)
                .ok_or(GwinError::MissingParameter(param))?;
            logp += marginal.logpdf(x);
            if logp == f64::NEG_INFINITY {
                break;
            }
        }
        Ok(logp)
    }

    pub fn contains(&self, values: &ParameterValues) -> bool {
        self.params
            .iter()
            .zip(self.marginals.iter())
            .all(|(&param, marginal)| values.get(param).is_some_and(|x| marginal.contains(x)))
    }

    /// Draw one point, in the order of [`JointDistribution::parameters`].
    pub fn rvs<R: Rng + ?Sized>(&self, rng: &mut R) -> ParameterValues {
        self.params
            .iter()
            .zip(self.marginals.iter())
            .map(|(&param, marginal)| (param, marginal.sample(rng)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rand::{rngs::SmallRng, SeedableRng};

    fn integrate(primitive: &Primitive, steps: usize) -> f64 {
        let (low, high) = primitive.bounds();
        let dx = (high - low) / steps as f64;
        (0..steps)
            .map(|i| primitive.logpdf(low + (i as f64 + 0.5) * dx).exp() * dx)
            .sum()
    }

    #[test]
    fn densities_are_normalized() {
        let primitives = [
            Primitive::uniform(-0.1, 0.1).unwrap(),
            Primitive::SinAngle,
            Primitive::CosAngle,
            Primitive::uniform_radius(200., 800.).unwrap(),
        ];
        for primitive in primitives.iter() {
            assert_relative_eq!(integrate(primitive, 20_000), 1., epsilon = 1e-6);
        }
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(Primitive::uniform(1., 1.).is_err());
        assert!(Primitive::uniform(f64::NAN, 1.).is_err());
        assert!(Primitive::uniform_radius(-5., 10.).is_err());
    }

    #[test]
    fn outside_support_is_neg_infinity() {
        let uniform = Primitive::uniform(6., 50.).unwrap();
        assert_eq!(uniform.logpdf(50.), f64::NEG_INFINITY);
        assert_eq!(uniform.logpdf(5.9), f64::NEG_INFINITY);
        assert_eq!(Primitive::SinAngle.logpdf(-0.1), f64::NEG_INFINITY);
    }

    /// Replays one word forever, to pin `u` to the ends of its range.
    struct Constant(u64);

    impl rand::RngCore for Constant {
        fn next_u32(&mut self) -> u32 {
            self.0 as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for (i, byte) in dst.iter_mut().enumerate() {
                *byte = self.0.to_le_bytes()[i % 8];
            }
        }
    }

    #[test]
    fn extreme_draws_have_positive_density() {
        let primitives = [
            Primitive::SinAngle,
            Primitive::CosAngle,
            Primitive::uniform_radius(0., 400.).unwrap(),
            Primitive::uniform_radius(200., 800.).unwrap(),
        ];
        for word in [0, u64::MAX] {
            for primitive in primitives.iter() {
                let x = primitive.sample(&mut Constant(word));
                assert!(primitive.contains(x), "{primitive:?} drew {x}");
                assert!(primitive.logpdf(x).is_finite(), "{primitive:?} drew {x}");
            }
        }
        let uniform = Primitive::uniform(6., 50.).unwrap();
        assert_eq!(uniform.sample(&mut Constant(0)), 6.);
    }

    #[test]
    fn zero_density_edges_are_outside_support() {
        assert!(!Primitive::SinAngle.contains(0.));
        assert_eq!(Primitive::SinAngle.logpdf(0.), f64::NEG_INFINITY);
        assert!(!Primitive::CosAngle.contains(-FRAC_PI_2));
        let radius = Primitive::uniform_radius(0., 10.).unwrap();
        assert!(!radius.contains(0.));
        assert!(radius.contains(10.));
        assert!(Primitive::uniform_radius(2., 10.).unwrap().contains(2.));
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        let flat = Primitive::uniform(0., 1.).unwrap();
        let err = JointDistribution::new([(Parameter::Ra, flat), (Parameter::Ra, flat)]).unwrap_err();
        assert!(matches!(err, GwinError::DuplicateParameter(Parameter::Ra)));
    }

    #[test]
    fn reference_prior_covers_vocabulary() {
        let values: ParameterValues = Parameter::ALL.iter().map(|&p| (p, 400.)).collect();
        let prior = JointDistribution::from_reference(&values).unwrap();
        assert_eq!(prior.parameters(), &Parameter::ALL[..]);
        assert_eq!(
            prior.marginal(Parameter::Distance),
            Some(Primitive::UniformRadius {
                low: 300.,
                high: 700.
            })
        );
        let (low, high) = prior.marginal(Parameter::Tc).unwrap().bounds();
        assert_relative_eq!(low, 399.8);
        assert_relative_eq!(high, 400.2);
    }

    #[test]
    fn unknown_names_fail_before_building() {
        let err = JointDistribution::from_names(&["mass1", "lambda1"], &[10., 0.]).unwrap_err();
        assert!(matches!(err, GwinError::UnrecognizedParameter(_)));
    }

    #[test]
    fn missing_values_are_reported() {
        let prior = JointDistribution::from_names(&["mass1", "mass2"], &[10., 10.]).unwrap();
        let values: ParameterValues = [(Parameter::Mass1, 10.)].into_iter().collect();
        assert!(matches!(
            prior.logpdf(&values),
            Err(GwinError::MissingParameter(Parameter::Mass2))
        ));
        assert!(!prior.contains(&values));
    }

    proptest! {
        #[test]
        fn draws_stay_in_support(seed in any::<u64>(), distance in 50f64..5000.) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let values: ParameterValues = Parameter::ALL
                .iter()
                .map(|&p| (p, if p == Parameter::Distance { distance } else { 1. }))
                .collect();
            let prior = JointDistribution::from_reference(&values).unwrap();
            for _ in 0..20 {
                let draw = prior.rvs(&mut rng);
                prop_assert!(prior.contains(&draw));
                prop_assert!(prior.logpdf(&draw).unwrap().is_finite());
            }
        }
    }
}
