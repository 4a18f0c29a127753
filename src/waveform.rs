use std::{
    collections::BTreeMap,
    f64::consts::{PI, TAU},
    str::FromStr,
};

use num::complex::Complex64;

use crate::{
    detector::{Detector, SPEED_OF_LIGHT},
    error::{GwinError, Result},
    parameters::{Parameter, ParameterValues},
    series::ComplexFrequencySeries,
};

/// Solar mass in seconds, `G M☉ / c³`.
const MTSUN_SI: f64 = 4.925_490_947_641_267e-6;
const MPC_SI: f64 = 3.085_677_581_491_367e22;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Frequency-domain waveform models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approximant {
    /// Stationary-phase inspiral with 3.5PN phasing and Newtonian amplitude.
    TaylorF2,
}

impl Approximant {
    pub fn name(&self) -> &'static str {
        match self {
            Approximant::TaylorF2 => "TaylorF2",
        }
    }
}

impl FromStr for Approximant {
    type Err = GwinError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TaylorF2" => Ok(Approximant::TaylorF2),
            _ => Err(GwinError::Waveform(format!("unknown approximant {s}"))),
        }
    }
}

/// The intrinsic and orientation parameters of a binary, in source units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CbcParams {
    pub mass1: f64,
    pub mass2: f64,
    pub spin1z: f64,
    pub spin2z: f64,
    pub distance: f64,
    pub inclination: f64,
    pub coa_phase: f64,
}

impl CbcParams {
    fn check(&self) -> Result<()> {
        if !(self.mass1 > 0. && self.mass2 > 0.) {
            return Err(GwinError::Waveform(format!(
                "masses must be positive, got ({}, {})",
                self.mass1, self.mass2
            )));
        }
        if !(self.distance > 0.) {
            return Err(GwinError::Waveform(format!(
                "distance must be positive, got {}",
                self.distance
            )));
        }
        if self.spin1z.abs() > 1. || self.spin2z.abs() > 1. {
            return Err(GwinError::Waveform(format!(
                "aligned spins must lie in [-1, 1], got ({}, {})",
                self.spin1z, self.spin2z
            )));
        }
        Ok(())
    }

    pub fn total_mass(&self) -> f64 {
        self.mass1 + self.mass2
    }

    pub fn symmetric_mass_ratio(&self) -> f64 {
        self.mass1 * self.mass2 / self.total_mass().powi(2)
    }

    pub fn chirp_mass(&self) -> f64 {
        self.total_mass() * self.symmetric_mass_ratio().powf(0.6)
    }

    /// Gravitational-wave frequency at the Schwarzschild ISCO.
    pub fn isco_frequency(&self) -> f64 {
        1. / (6f64.powf(1.5) * PI * self.total_mass() * MTSUN_SI)
    }
}

/// Coefficients of the TaylorF2 phase expansion in `v = (π M f)^(1/3)`.
struct PhaseCoefficients {
    eta: f64,
    total_mass_s: f64,
    pn2: f64,
    pn3: f64,
    pn4: f64,
    pn5: f64,
    pn6: f64,
    pn6_log: f64,
    pn7: f64,
}

impl PhaseCoefficients {
    fn new(params: &CbcParams) -> Self {
        let m = params.total_mass();
        let eta = params.symmetric_mass_ratio();
        let (x1, x2) = (params.mass1 / m, params.mass2 / m);
        let (chi1, chi2) = (params.spin1z, params.spin2z);

        let beta = (chi1 * (113. * x1 * x1 + 75. * eta) + chi2 * (113. * x2 * x2 + 75. * eta)) / 12.;
        let sigma = eta * (721. / 48. - 247. / 48.) * chi1 * chi2;

        let pn2 = 3715. / 756. + 55. * eta / 9.;
        let pn3 = -16. * PI + 4. * beta;
        let pn4 = 15_293_365. / 508_032. + 27_145. * eta / 504. + 3085. * eta * eta / 72. - 10. * sigma;
        let pn5 = PI * (38_645. / 756. - 65. * eta / 9.);
        let pn6 = 11_583_231_236_531. / 4_694_215_680. - 640. * PI * PI / 3. - 6848. * EULER_GAMMA / 21.
            + (-15_737_765_635. / 3_048_192. + 2255. * PI * PI / 12.) * eta
            + 76_055. * eta * eta / 1728.
            - 127_825. * eta.powi(3) / 1296.;
        let pn6_log = -6848. / 21.;
        let pn7 = PI * (77_096_675. / 254_016. + 378_515. * eta / 1512. - 74_045. * eta * eta / 756.);

        Self {
            eta,
            total_mass_s: m * MTSUN_SI,
            pn2,
            pn3,
            pn4,
            pn5,
            pn6,
            pn6_log,
            pn7,
        }
    }

    fn phase(&self, f: f64) -> f64 {
        let v = (PI * self.total_mass_s * f).cbrt();
        let v_lso = 6f64.sqrt().recip();
        let v2 = v * v;
        let v5 = v2 * v2 * v;
        let series = 1.
            + self.pn2 * v2
            + self.pn3 * v2 * v
            + self.pn4 * v2 * v2
            + self.pn5 * (1. + 3. * (v / v_lso).ln()) * v5
            + (self.pn6 + self.pn6_log * (4. * v).ln()) * v5 * v
            + self.pn7 * v5 * v2;
        3. / (128. * self.eta * v5) * series
    }
}

/// Plus and cross polarizations of a TaylorF2 inspiral merging at `t = 0`.
///
/// Bins below `f_lower` and above the ISCO frequency are zero.
pub fn taylor_f2(
    params: &CbcParams,
    len: usize,
    delta_f: f64,
    f_lower: f64,
) -> Result<(ComplexFrequencySeries, ComplexFrequencySeries)> {
    params.check()?;

    let mut hplus = ComplexFrequencySeries::zeros(len, delta_f, 0.)?;
    let mut hcross = ComplexFrequencySeries::zeros(len, delta_f, 0.)?;

    let coeffs = PhaseCoefficients::new(params);
    let chirp_mass_s = params.chirp_mass() * MTSUN_SI;
    let distance_s = params.distance * MPC_SI / SPEED_OF_LIGHT;
    let amp0 = (5f64 / 24.).sqrt() * PI.powf(-2. / 3.) * chirp_mass_s.powf(5. / 6.) / distance_s;

    let cosi = params.inclination.cos();
    let plus_factor = 0.5 * (1. + cosi * cosi);
    let cross_factor = cosi;

    let kmin = hplus.bin_at(f_lower).max(1);
    let kmax = hplus.bin_at(params.isco_frequency());

    let hp = hplus.data_mut();
    let hc = hcross.data_mut();
    for k in kmin..kmax {
        let f = k as f64 * delta_f;
        let amp = amp0 * f.powf(-7. / 6.);
        let psi = -2. * params.coa_phase - PI / 4. + coeffs.phase(f);
        let h = Complex64::from_polar(amp, -psi);
        hp[k] = h * plus_factor;
        hc[k] = h * Complex64::new(0., -cross_factor);
    }

    Ok((hplus, hcross))
}

/// Fixed sampling settings shared by every waveform a generator produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformSettings {
    pub approximant: Approximant,
    /// Number of frequency bins, including zero frequency.
    pub len: usize,
    pub delta_f: f64,
    pub f_lower: f64,
    /// GPS start time of the analysed segment.
    pub epoch: f64,
}

impl Default for WaveformSettings {
    fn default() -> Self {
        Self {
            approximant: Approximant::TaylorF2,
            len: 4097,
            delta_f: 0.25,
            f_lower: 20.,
            epoch: 0.,
        }
    }
}

/// Parameters every detector-frame waveform needs. Spins default to zero.
const REQUIRED: [Parameter; 9] = [
    Parameter::Mass1,
    Parameter::Mass2,
    Parameter::Distance,
    Parameter::Inclination,
    Parameter::CoaPhase,
    Parameter::Tc,
    Parameter::Ra,
    Parameter::Dec,
    Parameter::Polarization,
];

/// Generates the strain each detector sees for a point in the variable
/// parameters, with the remaining parameters held fixed.
#[derive(Debug, Clone)]
pub struct FDomainDetFrameGenerator {
    settings: WaveformSettings,
    variable_params: Vec<Parameter>,
    static_params: ParameterValues,
    detectors: Vec<Detector>,
}

impl FDomainDetFrameGenerator {
    pub fn new(
        settings: WaveformSettings,
        variable_params: Vec<Parameter>,
        static_params: ParameterValues,
        detectors: Vec<Detector>,
    ) -> Result<Self> {
        if let Some(missing) = REQUIRED
            .iter()
            .find(|&&p| !variable_params.contains(&p) && !static_params.contains(p))
        {
            return Err(GwinError::Config(format!(
                "waveform parameter {missing} is neither variable nor static"
            )));
        }
        if detectors.is_empty() {
            return Err(GwinError::Config("no detectors given".to_string()));
        }
        if !(settings.delta_f > 0.) || settings.len < 2 {
            return Err(GwinError::Config(format!(
                "need a positive frequency step and at least two bins, got {} and {}",
                settings.delta_f, settings.len
            )));
        }
        Ok(Self {
            settings,
            variable_params,
            static_params,
            detectors,
        })
    }

    pub fn variable_params(&self) -> &[Parameter] {
        &self.variable_params
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub fn settings(&self) -> &WaveformSettings {
        &self.settings
    }

    /// Merge a point in the variable parameters with the static ones.
    pub fn current_params(&self, point: &[f64]) -> Result<ParameterValues> {
        let variable = ParameterValues::from_point(&self.variable_params, point)?;
        let mut values = self.static_params.clone();
        for (param, value) in variable.iter() {
            values.insert(param, value);
        }
        Ok(values)
    }

    pub fn generate(&self, point: &[f64]) -> Result<BTreeMap<Detector, ComplexFrequencySeries>> {
        let values = self.current_params(point)?;
        let get = |param| values.get(param).ok_or(GwinError::MissingParameter(param));
        let cbc = CbcParams {
            mass1: get(Parameter::Mass1)?,
            mass2: get(Parameter::Mass2)?,
            spin1z: values.get(Parameter::Spin1z).unwrap_or(0.),
            spin2z: values.get(Parameter::Spin2z).unwrap_or(0.),
            distance: get(Parameter::Distance)?,
            inclination: get(Parameter::Inclination)?,
            coa_phase: get(Parameter::CoaPhase)?,
        };
        let (tc, ra, dec, pol) = (
            get(Parameter::Tc)?,
            get(Parameter::Ra)?,
            get(Parameter::Dec)?,
            get(Parameter::Polarization)?,
        );

        let WaveformSettings {
            approximant,
            len,
            delta_f,
            f_lower,
            epoch,
        } = self.settings;
        let (hplus, hcross) = match approximant {
            Approximant::TaylorF2 => taylor_f2(&cbc, len, delta_f, f_lower)?,
        };

        let mut out = BTreeMap::new();
        for &det in self.detectors.iter() {
            let (fplus, fcross) = det.antenna_pattern(ra, dec, pol, tc);
            let shift = tc + det.time_delay_from_earth_center(ra, dec, tc) - epoch;
            let mut strain = ComplexFrequencySeries::zeros(len, delta_f, epoch)?;
            for (k, (h, (hp, hc))) in strain
                .data_mut()
                .iter_mut()
                .zip(hplus.data().iter().zip(hcross.data()))
                .enumerate()
            {
                if hp.re == 0. && hp.im == 0. && hc.re == 0. && hc.im == 0. {
                    continue;
                }
                let phasor = Complex64::from_polar(1., -TAU * k as f64 * delta_f * shift);
                *h = (*hp * fplus + *hc * fcross) * phasor;
            }
            out.insert(det, strain);
        }
        Ok(out)
    }
}
