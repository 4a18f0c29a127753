use serde::Deserialize;

use crate::error::{GwinError, Result};

/// Settings shared by every sampler.
///
/// Each sampler reads the fields that apply to it and ignores the rest,
/// e.g. only the tempered sampler uses `ntemps`. All counts must be at
/// least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    /// Number of temperatures in the tempering ladder.
    pub ntemps: usize,
    /// Number of walkers per temperature, or live points for nested sampling.
    pub nwalkers: usize,
    /// Number of iterations a full run is expected to take.
    pub niterations: u64,
    /// Iterations between proposal updates and progress reports.
    pub update_interval: u64,
    /// Number of worker threads evaluating the likelihood.
    pub nprocesses: usize,
    /// Seed for the sampler's random number generator.
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            ntemps: 1,
            nwalkers: 50,
            niterations: 1000,
            update_interval: 10,
            nprocesses: 1,
            seed: 0,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("ntemps", self.ntemps as u64),
            ("nwalkers", self.nwalkers as u64),
            ("niterations", self.niterations),
            ("update_interval", self.update_interval),
            ("nprocesses", self.nprocesses as u64),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(GwinError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}
