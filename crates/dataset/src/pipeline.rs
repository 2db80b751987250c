//! End-to-end conversion: input file → `.bwds` container.
//!
//! A single linear pass: `Reading → Encoding (pad, expand, window + label) →
//! Assembling → Writing → Done`. Configuration is validated before anything
//! is read; a failed run leaves no output file behind.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use bitwin_common::{read_byte_stream, EncodeError, EncoderConfig, Granularity, Result};
use bitwin_core::{Encoder, ProgressObserver};

use crate::assembler::assemble;
use crate::container::DatasetContainer;
use crate::format::write_container;

/// Pipeline stage, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reading,
    Encoding,
    Assembling,
    Writing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Reading => "reading",
            Stage::Encoding => "encoding",
            Stage::Assembling => "assembling",
            Stage::Writing => "writing",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Whether the run produced any examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    /// At least one example was written.
    Written,
    /// The stream yielded no examples; an empty container was written.
    Empty,
}

/// Summary of a finished conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_bytes: usize,
    pub examples: usize,
    pub feature_width: usize,
    pub context_size: usize,
    pub granularity: Granularity,
    pub bytes_written: u64,
    pub status: ConversionStatus,
}

impl ConversionReport {
    pub fn is_empty(&self) -> bool {
        self.status == ConversionStatus::Empty
    }

    /// Treat an empty result as a failure. The (empty) container has
    /// already been written at this point.
    pub fn ensure_nonempty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(EncodeError::EmptyResult);
        }
        Ok(())
    }
}

/// Encode and assemble in memory, without touching the filesystem.
pub fn convert_bytes(
    bytes: &[u8],
    config: &EncoderConfig,
    observer: &dyn ProgressObserver,
) -> Result<DatasetContainer> {
    let encoder = Encoder::new(config)?;
    tracing::debug!(stage = %Stage::Encoding);
    let encoded = encoder.encode(bytes, observer);
    tracing::debug!(stage = %Stage::Assembling, examples = encoded.len());
    assemble(&encoded)
}

/// Convert the file at `input` into a container at `output`.
pub fn convert(
    input: &Path,
    output: &Path,
    config: &EncoderConfig,
    observer: &dyn ProgressObserver,
) -> Result<ConversionReport> {
    config.validate()?;

    tracing::debug!(stage = %Stage::Reading, path = %input.display());
    let stream = read_byte_stream(input)?;

    let container = convert_bytes(&stream, config, observer)?;

    tracing::debug!(stage = %Stage::Writing, path = %output.display());
    let bytes_written = write_container(output, &container)?;

    let status = if container.is_empty() {
        tracing::warn!(
            input = %input.display(),
            bytes = stream.len(),
            "stream too short for a single example; wrote an empty dataset"
        );
        ConversionStatus::Empty
    } else {
        ConversionStatus::Written
    };

    tracing::info!(
        examples = container.len(),
        width = container.feature_width(),
        granularity = %config.granularity,
        output = %output.display(),
        "conversion complete"
    );
    tracing::debug!(stage = %Stage::Done);

    Ok(ConversionReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        input_bytes: stream.len(),
        examples: container.len(),
        feature_width: container.feature_width(),
        context_size: container.context_size(),
        granularity: container.granularity(),
        bytes_written,
        status,
    })
}
