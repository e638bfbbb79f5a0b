//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration, missing host collaborators (mesh container, navigation, resources),
//! descriptor cursor overruns, load timeouts, bounded-driver deadlines, IO, and generic errors.
use thiserror::Error;

use crate::scatter::ScatterPhase;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("mesh container unavailable")]
    ContainerUnavailable,

    #[error("missing context: {0}")]
    MissingContext(String),

    #[error("missing resource '{reference}'")]
    MissingResource { reference: String },

    #[error("{mode} descriptor index {index} out of range (len {len})")]
    IndexOutOfRange {
        mode: &'static str,
        index: usize,
        len: usize,
    },

    #[error("resource '{reference}' did not load within {waited:.2} time units")]
    LoadTimeout { reference: String, waited: f32 },

    #[error("scatter run still in {phase} after {elapsed:.2} time units")]
    DeadlineExceeded { phase: ScatterPhase, elapsed: f32 },

    #[error("scatter run cancelled")]
    Cancelled,

    #[error("background island build panicked")]
    BuildPanicked,

    #[error("config decode error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
