use std::{fmt, str::FromStr};

use itertools::Itertools;

use crate::error::{GwinError, Result};

/// The compact-binary parameters a sampler can vary.
///
/// Masses are in solar masses, distance in Mpc, angles in radians and `tc`
/// is a GPS time in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parameter {
    Mass1,
    Mass2,
    Spin1x,
    Spin1y,
    Spin1z,
    Spin2x,
    Spin2y,
    Spin2z,
    Ra,
    Dec,
    Distance,
    Inclination,
    Polarization,
    CoaPhase,
    Tc,
}

impl Parameter {
    pub const ALL: [Parameter; 15] = [
        Parameter::Mass1,
        Parameter::Mass2,
        Parameter::Spin1x,
        Parameter::Spin1y,
        Parameter::Spin1z,
        Parameter::Spin2x,
        Parameter::Spin2y,
        Parameter::Spin2z,
        Parameter::Ra,
        Parameter::Dec,
        Parameter::Distance,
        Parameter::Inclination,
        Parameter::Polarization,
        Parameter::CoaPhase,
        Parameter::Tc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Mass1 => "mass1",
            Parameter::Mass2 => "mass2",
            Parameter::Spin1x => "spin1x",
            Parameter::Spin1y => "spin1y",
            Parameter::Spin1z => "spin1z",
            Parameter::Spin2x => "spin2x",
            Parameter::Spin2y => "spin2y",
            Parameter::Spin2z => "spin2z",
            Parameter::Ra => "ra",
            Parameter::Dec => "dec",
            Parameter::Distance => "distance",
            Parameter::Inclination => "inclination",
            Parameter::Polarization => "polarization",
            Parameter::CoaPhase => "coa_phase",
            Parameter::Tc => "tc",
        }
    }

    /// Parse a list of names, failing on the first one outside the vocabulary.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Parameter>> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }
}

impl FromStr for Parameter {
    type Err = GwinError;

    fn from_str(s: &str) -> Result<Self> {
        Parameter::ALL
            .iter()
            .copied()
            .find(|param| param.name() == s)
            .ok_or_else(|| GwinError::UnrecognizedParameter(s.to_string()))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered assignment of values to parameters.
///
/// Insertion order is kept, so a set built from the reference values of an
/// injection lines up with the variable parameters derived from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValues {
    values: Vec<(Parameter, f64)>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip a point with the parameter order it was laid out in.
    pub fn from_point(params: &[Parameter], point: &[f64]) -> Result<Self> {
        if params.len() != point.len() {
            return Err(GwinError::Dimension {
                expected: params.len(),
                actual: point.len(),
            });
        }
        Ok(Self {
            values: params.iter().copied().zip(point.iter().copied()).collect(),
        })
    }

    /// Set a value, replacing an earlier one for the same parameter.
    pub fn insert(&mut self, param: Parameter, value: f64) {
        match self.values.iter_mut().find(|(p, _)| *p == param) {
            Some((_, v)) => *v = value,
            None => self.values.push((param, value)),
        }
    }

    pub fn get(&self, param: Parameter) -> Option<f64> {
        self.values
            .iter()
            .find(|(p, _)| *p == param)
            .map(|&(_, v)| v)
    }

    pub fn contains(&self, param: Parameter) -> bool {
        self.get(param).is_some()
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        self.values.iter().map(|&(p, _)| p).collect_vec()
    }

    /// The values in insertion order, as a sampler point.
    pub fn to_point(&self) -> Vec<f64> {
        self.values.iter().map(|&(_, v)| v).collect_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, f64)> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(Parameter, f64)> for ParameterValues {
    fn from_iter<I: IntoIterator<Item = (Parameter, f64)>>(iter: I) -> Self {
        let mut values = ParameterValues::new();
        for (param, value) in iter {
            values.insert(param, value);
        }
        values
    }
}
