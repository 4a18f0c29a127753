use std::str::FromStr;

use crate::{
    error::{GwinError, Result},
    series::RealFrequencySeries,
};

/// Closed form noise power spectral densities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalyticalPsd {
    /// Advanced LIGO design sensitivity, zero-detuned high-power
    /// configuration, using the broadband fit of Ajith (2011).
    ZeroDetHighPower,
    /// White noise with a constant one-sided density.
    Flat(f64),
}

impl AnalyticalPsd {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticalPsd::ZeroDetHighPower => "aLIGOZeroDetHighPower",
            AnalyticalPsd::Flat(_) => "flat",
        }
    }

    /// One-sided density in 1/Hz at frequency `f`.
    pub fn evaluate(&self, f: f64) -> f64 {
        match *self {
            AnalyticalPsd::ZeroDetHighPower => {
                if f <= 0. {
                    return 0.;
                }
                let x = f / 215.;
                let x2 = x * x;
                1e-49 * (x.powf(-4.14) - 5. / x2 + 111. * (1. - x2 + x2 * x2 / 2.) / (1. + x2 / 2.))
            }
            AnalyticalPsd::Flat(level) => level,
        }
    }

    /// Sample the density on `len` bins spaced by `delta_f`.
    ///
    /// Bins below `low_freq_cutoff` are zero and drop out of every inner
    /// product weighted by this series.
    pub fn generate(
        &self,
        len: usize,
        delta_f: f64,
        low_freq_cutoff: f64,
    ) -> Result<RealFrequencySeries> {
        let mut psd = RealFrequencySeries::zeros(len, delta_f, 0.)?;
        let kmin = psd.bin_at(low_freq_cutoff).max(1);
        for (idx, value) in psd.data_mut().iter_mut().enumerate().skip(kmin) {
            *value = self.evaluate(idx as f64 * delta_f);
        }
        Ok(psd)
    }
}

impl FromStr for AnalyticalPsd {
    type Err = GwinError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aLIGOZeroDetHighPower" => Ok(AnalyticalPsd::ZeroDetHighPower),
            "flat" => Ok(AnalyticalPsd::Flat(1.)),
            _ => Err(GwinError::Config(format!("unknown analytical psd {s}"))),
        }
    }
}
