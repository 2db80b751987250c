//! Error taxonomy shared by the encoder, the assembler and the container I/O.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by all library crates.
pub type Result<T, E = EncodeError> = std::result::Result<T, E>;

/// Every condition a conversion run can end in, short of success.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Input path missing or unreadable. Terminal, raised before any processing.
    #[error("input unavailable: {path}: {source}")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Context size or another knob outside its permitted range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Granularity selector other than `unigram`, `bigram` or `trigram`.
    #[error("unsupported granularity '{0}' (expected unigram, bigram or trigram)")]
    UnsupportedGranularity(String),

    /// Destination not writable. No partial file is left behind.
    #[error("output unwritable: {path}: {source}")]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stream was too short to yield a single example.
    #[error("conversion produced no examples")]
    EmptyResult,

    /// A persisted container failed validation on load.
    #[error("corrupt container: {0}")]
    CorruptContainer(String),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EncodeError {
    /// Configuration problems are detected before the pipeline starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EncodeError::InvalidConfiguration(_)
                | EncodeError::UnsupportedGranularity(_)
                | EncodeError::Config(_)
        )
    }
}
