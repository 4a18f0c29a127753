use thiserror::Error;

use crate::parameters::Parameter;

#[derive(Error, Debug)]
pub enum GwinError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Do not recognize parameter {0}")]
    UnrecognizedParameter(String),

    #[error("Parameter {0} appears more than once")]
    DuplicateParameter(Parameter),

    /// An initial point drawn from the prior has no defined likelihood.
    #[error("Walker {walker} (temperature {temperature}) starts at a point with undefined likelihood: {reason}")]
    SupportMismatch {
        walker: usize,
        temperature: usize,
        reason: String,
    },

    #[error("No value given for parameter {0}")]
    MissingParameter(Parameter),

    #[error("Sampler has not been initialized, call set_p0 before run")]
    Uninitialized,

    #[error("Number of iterations must be at least 1, got {0}")]
    InvalidIterations(u64),

    #[error("No sampler registered under the name {0}")]
    UnknownSampler(String),

    #[error("No likelihood evaluator registered under the name {0}")]
    UnknownLikelihood(String),

    #[error("Could not generate waveform: {0}")]
    Waveform(String),

    #[error("Expected a point with {expected} values, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Could not start worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, GwinError>;
