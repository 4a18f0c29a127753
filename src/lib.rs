//! Samplers for compact binary coalescence parameter estimation.
//!
//! A likelihood evaluator binds frequency domain detector data, a waveform
//! model, per detector noise PSDs and a prior. Samplers are built from a
//! [`SamplerConfig`] and a shared evaluator, and run for a number of
//! iterations:
//!
//! ```no_run
//! use std::sync::Arc;
//! use gwin::{new_likelihood, new_sampler, JointDistribution, LikelihoodArgs, Parameter, SamplerConfig};
//!
//! let params = vec![Parameter::Ra, Parameter::Dec];
//! let prior = JointDistribution::from_names(&["ra", "dec"], &[0., 0.])?;
//! let likelihood = new_likelihood("test_normal", LikelihoodArgs::analytic(params, prior))?;
//!
//! let config = SamplerConfig { nwalkers: 10, ..Default::default() };
//! let mut sampler = new_sampler("emcee", config, likelihood)?;
//! sampler.set_p0()?;
//! sampler.run(100)?;
//! # Ok::<(), gwin::GwinError>(())
//! ```
//!
//! Sampler variants and likelihood kinds are discovered by name through
//! [`sampler_names`] and [`likelihood_evaluators`].

pub(crate) mod config;
pub(crate) mod detector;
pub(crate) mod distributions;
pub(crate) mod error;
pub(crate) mod likelihood;
pub(crate) mod math;
pub(crate) mod parameters;
pub(crate) mod psd;
pub(crate) mod registry;
pub(crate) mod sampler;
pub(crate) mod series;
pub(crate) mod trace;
pub(crate) mod waveform;

pub use config::SamplerConfig;
pub use detector::{greenwich_mean_sidereal_time, Detector};
pub use distributions::{reference_prior, JointDistribution, Primitive};
pub use error::{GwinError, Result};
pub use likelihood::{
    data_likelihood_names, likelihood_evaluators, new_likelihood, DataArgs, Evaluation,
    GaussianLikelihood, LikelihoodArgs, LikelihoodConstructor, LikelihoodEvaluator,
    MarginalizedPhaseGaussianLikelihood, Meta, TestEggbox, TestNormal, TestRosenbrock,
    TestVolcano, TEST_PREFIX,
};
pub use parameters::{Parameter, ParameterValues};
pub use psd::AnalyticalPsd;
pub use registry::Registry;
pub use sampler::{
    new_sampler, sampler_names, samplers, Emcee, EmceePt, FromConfig, Mcmc, Nested, Sampler,
    SamplerConstructor,
};
pub use series::{ComplexFrequencySeries, FrequencySeries, RealFrequencySeries};
pub use trace::{ArrowDrawStorage, DrawStorage, TraceOutput};
pub use waveform::{
    taylor_f2, Approximant, CbcParams, FDomainDetFrameGenerator, WaveformSettings,
};
