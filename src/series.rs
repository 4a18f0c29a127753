use num::complex::Complex64;

use crate::error::{GwinError, Result};

/// A uniformly sampled frequency-domain series starting at zero frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencySeries<T> {
    data: Vec<T>,
    delta_f: f64,
    /// GPS time of the first sample of the corresponding time series.
    epoch: f64,
}

pub type ComplexFrequencySeries = FrequencySeries<Complex64>;
pub type RealFrequencySeries = FrequencySeries<f64>;

impl<T: Copy + Default> FrequencySeries<T> {
    pub fn zeros(len: usize, delta_f: f64, epoch: f64) -> Result<Self> {
        Self::new(vec![T::default(); len], delta_f, epoch)
    }
}

impl<T> FrequencySeries<T> {
    pub fn new(data: Vec<T>, delta_f: f64, epoch: f64) -> Result<Self> {
        if !(delta_f.is_finite() && delta_f > 0.) {
            return Err(GwinError::Config(format!(
                "frequency step must be positive, got {delta_f}"
            )));
        }
        Ok(Self {
            data,
            delta_f,
            epoch,
        })
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn delta_f(&self) -> f64 {
        self.delta_f
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn frequency(&self, idx: usize) -> f64 {
        idx as f64 * self.delta_f
    }

    pub fn sample_frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |idx| self.frequency(idx))
    }

    /// First bin at or above `freq`, clamped to the length of the series.
    pub fn bin_at(&self, freq: f64) -> usize {
        ((freq / self.delta_f).ceil().max(0.) as usize).min(self.len())
    }

    /// Fail unless `other` has the same length and frequency step.
    pub fn check_compatible<U>(&self, other: &FrequencySeries<U>) -> Result<()> {
        if self.len() != other.len() {
            return Err(GwinError::Dimension {
                expected: self.len(),
                actual: other.len(),
            });
        }
        if (self.delta_f - other.delta_f).abs() > 1e-12 * self.delta_f {
            return Err(GwinError::Config(format!(
                "frequency steps differ: {} and {}",
                self.delta_f, other.delta_f
            )));
        }
        Ok(())
    }
}

impl RealFrequencySeries {
    /// One past the last bin with a non-zero value.
    pub fn last_nonzero_bin(&self) -> usize {
        self.data
            .iter()
            .rposition(|&x| x > 0.)
            .map_or(0, |idx| idx + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bins_and_frequencies() {
        let series = RealFrequencySeries::zeros(9, 0.25, 0.).unwrap();
        assert_eq!(series.frequency(4), 1.);
        assert_eq!(series.bin_at(1.1), 5);
        assert_eq!(series.bin_at(100.), 9);
        assert_eq!(series.sample_frequencies().last(), Some(2.));
    }

    #[test]
    fn last_nonzero() {
        let series = RealFrequencySeries::new(vec![0., 1., 2., 0., 0.], 1., 0.).unwrap();
        assert_eq!(series.last_nonzero_bin(), 3);
        assert_eq!(RealFrequencySeries::zeros(4, 1., 0.).unwrap().last_nonzero_bin(), 0);
    }

    #[test]
    fn incompatible_series() {
        let a = RealFrequencySeries::zeros(4, 1., 0.).unwrap();
        let b = ComplexFrequencySeries::zeros(5, 1., 0.).unwrap();
        let c = ComplexFrequencySeries::zeros(4, 0.5, 0.).unwrap();
        assert!(a.check_compatible(&b).is_err());
        assert!(a.check_compatible(&c).is_err());
        assert!(a.check_compatible(&ComplexFrequencySeries::zeros(4, 1., 0.).unwrap()).is_ok());
    }

    #[test]
    fn frequency_step_must_be_positive() {
        for delta_f in [0., -0.25, f64::NAN, f64::INFINITY] {
            let err = RealFrequencySeries::zeros(4, delta_f, 0.).unwrap_err();
            assert!(matches!(err, GwinError::Config(_)), "{delta_f}");
        }
    }
}
