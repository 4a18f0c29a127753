use std::{
    f64::consts::{PI, TAU},
    fmt,
    str::FromStr,
};

use crate::error::{GwinError, Result};

pub const SPEED_OF_LIGHT: f64 = 299_792_458.;

/// GPS time 0 as a Julian date.
const GPS_EPOCH_JD: f64 = 2_444_244.5;
/// Leap seconds between GPS and UTC, valid from 2017 onwards.
const GPS_LEAP_SECONDS: f64 = 18.;

/// Ground-based interferometers with their Earth-fixed geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Detector {
    H1,
    L1,
    V1,
}

struct Geometry {
    /// Vertex position in metres, Earth-centred Earth-fixed frame.
    vertex: [f64; 3],
    xarm: [f64; 3],
    yarm: [f64; 3],
}

const H1_GEOMETRY: Geometry = Geometry {
    vertex: [-2.161_414_926_36e6, -3.834_695_178_89e6, 4.600_350_226_64e6],
    xarm: [-0.223_892_661_54, 0.799_830_627_46, 0.556_904_878_31],
    yarm: [-0.913_978_185_74, 0.026_094_039_89, -0.404_923_421_25],
};

const L1_GEOMETRY: Geometry = Geometry {
    vertex: [-7.427_604_472_38e4, -5.496_283_719_71e6, 3.224_257_017_44e6],
    xarm: [-0.954_574_121_53, -0.141_580_773_40, -0.262_189_113_24],
    yarm: [0.297_741_568_94, -0.487_910_336_47, -0.820_544_612_86],
};

const V1_GEOMETRY: Geometry = Geometry {
    vertex: [4.546_374_099e6, 8.429_896_976_26e5, 4.378_576_962_41e6],
    xarm: [-0.700_458_214_79, 0.208_489_486_19, 0.682_561_662_77],
    yarm: [-0.053_792_553_68, -0.969_081_805_49, 0.240_804_517_08],
};

impl Detector {
    pub const ALL: [Detector; 3] = [Detector::H1, Detector::L1, Detector::V1];

    pub fn name(&self) -> &'static str {
        match self {
            Detector::H1 => "H1",
            Detector::L1 => "L1",
            Detector::V1 => "V1",
        }
    }

    fn geometry(&self) -> &'static Geometry {
        match self {
            Detector::H1 => &H1_GEOMETRY,
            Detector::L1 => &L1_GEOMETRY,
            Detector::V1 => &V1_GEOMETRY,
        }
    }

    pub fn location(&self) -> [f64; 3] {
        self.geometry().vertex
    }

    /// Response tensor `(x xᵀ - y yᵀ) / 2` built from the arm directions.
    pub fn response(&self) -> [[f64; 3]; 3] {
        let Geometry { xarm, yarm, .. } = self.geometry();
        let mut out = [[0f64; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, val) in row.iter_mut().enumerate() {
                *val = 0.5 * (xarm[i] * xarm[j] - yarm[i] * yarm[j]);
            }
        }
        out
    }

    /// Plus and cross antenna pattern for a source at `(ra, dec)` with
    /// polarization angle `psi`, observed at GPS time `gps_time`.
    pub fn antenna_pattern(&self, ra: f64, dec: f64, psi: f64, gps_time: f64) -> (f64, f64) {
        let gha = greenwich_mean_sidereal_time(gps_time) - ra;
        let (singha, cosgha) = gha.sin_cos();
        let (sindec, cosdec) = dec.sin_cos();
        let (sinpsi, cospsi) = psi.sin_cos();

        let x = [
            -cospsi * singha - sinpsi * cosgha * sindec,
            -cospsi * cosgha + sinpsi * singha * sindec,
            sinpsi * cosdec,
        ];
        let y = [
            sinpsi * singha - cospsi * cosgha * sindec,
            sinpsi * cosgha + cospsi * singha * sindec,
            cospsi * cosdec,
        ];

        let response = self.response();
        let dx = mat_vec(&response, &x);
        let dy = mat_vec(&response, &y);

        let fplus = dot(&x, &dx) - dot(&y, &dy);
        let fcross = dot(&x, &dy) + dot(&y, &dx);
        (fplus, fcross)
    }

    /// Arrival time at the detector minus arrival time at the geocentre.
    pub fn time_delay_from_earth_center(&self, ra: f64, dec: f64, gps_time: f64) -> f64 {
        let gha = greenwich_mean_sidereal_time(gps_time) - ra;
        let (sindec, cosdec) = dec.sin_cos();
        let ehat = [cosdec * gha.cos(), -cosdec * gha.sin(), sindec];
        -dot(&ehat, &self.location()) / SPEED_OF_LIGHT
    }
}

impl FromStr for Detector {
    type Err = GwinError;

    fn from_str(s: &str) -> Result<Self> {
        Detector::ALL
            .iter()
            .copied()
            .find(|det| det.name() == s)
            .ok_or_else(|| GwinError::Config(format!("unknown detector {s}")))
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Greenwich mean sidereal time in radians, in `[0, 2π)`.
pub fn greenwich_mean_sidereal_time(gps_time: f64) -> f64 {
    let jd = GPS_EPOCH_JD + (gps_time - GPS_LEAP_SECONDS) / 86_400.;
    let days = jd - 2_451_545.;
    let hours = 18.697_374_558 + 24.065_709_824_419_08 * days;
    (hours / 24. * TAU).rem_euclid(2. * PI)
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b.iter()).map(|(a, b)| a * b).sum()
}

fn mat_vec(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [dot(&m[0], v), dot(&m[1], v), dot(&m[2], v)]
}
