use std::collections::BTreeMap;

use log::debug;
use num::complex::Complex64;

use crate::{
    detector::Detector,
    distributions::JointDistribution,
    error::{GwinError, Result},
    math::{log_i0, weighted_norm, weighted_overlap},
    parameters::Parameter,
    series::ComplexFrequencySeries,
    waveform::FDomainDetFrameGenerator,
};

use super::{LikelihoodArgs, LikelihoodEvaluator, Meta};

/// Data of one detector, whitened by its PSD over `[kmin, kmax)`.
#[derive(Debug, Clone)]
struct DetectorData {
    data: ComplexFrequencySeries,
    psd: Vec<f64>,
    kmin: usize,
    kmax: usize,
}

impl DetectorData {
    fn overlap(&self, h: &ComplexFrequencySeries) -> Complex64 {
        weighted_overlap(
            h.data(),
            self.data.data(),
            &self.psd,
            self.kmin,
            self.kmax,
            self.data.delta_f(),
        )
    }

    fn norm(&self, h: &ComplexFrequencySeries) -> f64 {
        weighted_norm(h.data(), &self.psd, self.kmin, self.kmax, self.data.delta_f())
    }
}

/// Sums of the inner products of a template with the data.
struct Overlaps {
    hd: Complex64,
    hh: f64,
    optimal_snrsq: BTreeMap<Detector, f64>,
}

/// State shared by the Gaussian noise models.
#[derive(Debug, Clone)]
struct GaussianNoise {
    variable_params: Vec<Parameter>,
    prior: JointDistribution,
    return_meta: bool,
    generator: FDomainDetFrameGenerator,
    detectors: BTreeMap<Detector, DetectorData>,
    lognl: f64,
}

impl GaussianNoise {
    fn new(name: &str, args: LikelihoodArgs) -> Result<Self> {
        args.check_prior()?;
        let LikelihoodArgs {
            variable_params,
            prior,
            return_meta,
            data,
        } = args;
        let Some(data) = data else {
            return Err(GwinError::Config(format!(
                "{name} needs data, a waveform generator and PSDs"
            )));
        };

        if data.generator.variable_params() != variable_params.as_slice() {
            return Err(GwinError::Config(
                "waveform generator and likelihood disagree on the variable parameters".to_string(),
            ));
        }
        if data.data.is_empty() {
            return Err(GwinError::Config(format!("{name} needs data from at least one detector")));
        }

        let settings = *data.generator.settings();
        let mut detectors = BTreeMap::new();
        for (det, series) in data.data {
            if !data.generator.detectors().contains(&det) {
                return Err(GwinError::Config(format!(
                    "waveform generator does not produce a signal for {det}"
                )));
            }
            let psd = data
                .psds
                .get(&det)
                .ok_or_else(|| GwinError::Config(format!("no PSD given for {det}")))?;
            series.check_compatible(psd)?;
            if series.len() != settings.len || series.delta_f() != settings.delta_f {
                return Err(GwinError::Config(format!(
                    "data for {det} does not match the waveform sampling"
                )));
            }
            let kmin = psd.bin_at(data.f_lower);
            let kmax = psd.last_nonzero_bin().max(kmin);
            detectors.insert(
                det,
                DetectorData {
                    data: series,
                    psd: psd.data().to_vec(),
                    kmin,
                    kmax,
                },
            );
        }

        let lognl = -0.5
            * detectors
                .values()
                .map(|det| det.norm(&det.data))
                .sum::<f64>();
        debug!("{name}: noise log likelihood {lognl:.3}");

        Ok(Self {
            variable_params,
            prior,
            return_meta,
            generator: data.generator,
            detectors,
            lognl,
        })
    }

    /// `None` when no waveform exists for the point.
    fn overlaps(&self, point: &[f64]) -> Result<Option<Overlaps>> {
        let signals = match self.generator.generate(point) {
            Ok(signals) => signals,
            Err(GwinError::Waveform(reason)) => {
                debug!("no waveform at {point:?}: {reason}");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let mut out = Overlaps {
            hd: Complex64::new(0., 0.),
            hh: 0.,
            optimal_snrsq: BTreeMap::new(),
        };
        for (det, data) in self.detectors.iter() {
            let h = signals
                .get(det)
                .ok_or_else(|| GwinError::Config(format!("no signal generated for {det}")))?;
            let hh = data.norm(h);
            out.hd += data.overlap(h);
            out.hh += hh;
            out.optimal_snrsq.insert(*det, hh);
        }
        Ok(Some(out))
    }

    fn meta(&self, loglr: f64, overlaps: Overlaps) -> Option<Meta> {
        self.return_meta.then(|| Meta {
            loglr,
            lognl: self.lognl,
            optimal_snrsq: overlaps.optimal_snrsq,
        })
    }
}

/// Stationary Gaussian noise:
/// `log L = -1/2 Σ <d - h, d - h>`, split as `lognl + loglr`.
#[derive(Debug, Clone)]
pub struct GaussianLikelihood {
    noise: GaussianNoise,
}

impl GaussianLikelihood {
    pub const NAME: &'static str = "gaussian";

    pub fn new(args: LikelihoodArgs) -> Result<Self> {
        Ok(Self {
            noise: GaussianNoise::new(Self::NAME, args)?,
        })
    }

    /// Log likelihood of the data being pure noise.
    pub fn lognl(&self) -> f64 {
        self.noise.lognl
    }

    /// `Σ Re<h, d> - 1/2 <h, h>`
    pub fn loglr(&self, point: &[f64]) -> Result<f64> {
        Ok(self
            .noise
            .overlaps(point)?
            .map_or(f64::NEG_INFINITY, |o| o.hd.re - 0.5 * o.hh))
    }
}

impl LikelihoodEvaluator for GaussianLikelihood {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn variable_params(&self) -> &[Parameter] {
        &self.noise.variable_params
    }

    fn prior(&self) -> &JointDistribution {
        &self.noise.prior
    }

    fn return_meta(&self) -> bool {
        self.noise.return_meta
    }

    fn loglikelihood_in_support(&self, point: &[f64]) -> Result<(f64, Option<Meta>)> {
        let Some(overlaps) = self.noise.overlaps(point)? else {
            return Ok((f64::NEG_INFINITY, None));
        };
        let loglr = overlaps.hd.re - 0.5 * overlaps.hh;
        Ok((self.noise.lognl + loglr, self.noise.meta(loglr, overlaps)))
    }
}

/// Gaussian noise with the coalescence phase integrated out analytically:
/// `log L = lognl + ln I0(|Σ <h, d>|) - 1/2 Σ <h, h>`.
///
/// The template phase drops out, so `coa_phase` only needs a static value.
#[derive(Debug, Clone)]
pub struct MarginalizedPhaseGaussianLikelihood {
    noise: GaussianNoise,
}

impl MarginalizedPhaseGaussianLikelihood {
    pub const NAME: &'static str = "marginalized_phase";

    pub fn new(args: LikelihoodArgs) -> Result<Self> {
        Ok(Self {
            noise: GaussianNoise::new(Self::NAME, args)?,
        })
    }

    pub fn lognl(&self) -> f64 {
        self.noise.lognl
    }
}

impl LikelihoodEvaluator for MarginalizedPhaseGaussianLikelihood {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn variable_params(&self) -> &[Parameter] {
        &self.noise.variable_params
    }

    fn prior(&self) -> &JointDistribution {
        &self.noise.prior
    }

    fn return_meta(&self) -> bool {
        self.noise.return_meta
    }

    fn loglikelihood_in_support(&self, point: &[f64]) -> Result<(f64, Option<Meta>)> {
        let Some(overlaps) = self.noise.overlaps(point)? else {
            return Ok((f64::NEG_INFINITY, None));
        };
        let loglr = log_i0(overlaps.hd.norm()) - 0.5 * overlaps.hh;
        Ok((self.noise.lognl + loglr, self.noise.meta(loglr, overlaps)))
    }
}
