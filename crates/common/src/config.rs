//! Encoder configuration for bitwin.
//!
//! Serialised as JSON, both as a standalone config file and inside every
//! container header so the encoder and any consumer agree on the context size.
//! Every field has a default, so `{}` is a valid config.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EncodeError, Result};

/// Context size of the fixed 784-bit (28 x 28) window variant.
pub const DEFAULT_CONTEXT_SIZE: usize = 98;

/// Largest accepted context size (1 MiB of context, an 8 Mibit window).
pub const MAX_CONTEXT_SIZE: usize = 1 << 20;

// ── Granularity ─────────────────────────────────────────────────────────────

/// How many bytes following a window are packed into its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One byte, top bit masked off (7-bit ASCII range).
    #[default]
    Unigram,
    /// Two bytes, big-endian packed.
    Bigram,
    /// Three bytes, big-endian packed.
    Trigram,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Self::Unigram, Self::Bigram, Self::Trigram];

    /// Number of stream bytes that contribute to one label.
    pub fn label_bytes(self) -> usize {
        match self {
            Self::Unigram => 1,
            Self::Bigram => 2,
            Self::Trigram => 3,
        }
    }

    /// Effective label width in bits.
    pub fn label_bits(self) -> u32 {
        match self {
            Self::Unigram => 7,
            Self::Bigram => 16,
            Self::Trigram => 24,
        }
    }

    /// Largest label this granularity can produce.
    pub fn max_label(self) -> u32 {
        (1u32 << self.label_bits()) - 1
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unigram => "unigram",
            Self::Bigram => "bigram",
            Self::Trigram => "trigram",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unigram" => Ok(Self::Unigram),
            "bigram" => Ok(Self::Bigram),
            "trigram" => Ok(Self::Trigram),
            other => Err(EncodeError::UnsupportedGranularity(other.to_string())),
        }
    }
}

// ── ContextSize ─────────────────────────────────────────────────────────────

/// Validated context size `C`: number of zero bytes prepended to the stream
/// and the window width in bytes. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextSize(usize);

impl ContextSize {
    pub fn new(bytes: usize) -> Result<Self> {
        if bytes == 0 {
            return Err(EncodeError::InvalidConfiguration(
                "context size must be positive".into(),
            ));
        }
        if bytes > MAX_CONTEXT_SIZE {
            return Err(EncodeError::InvalidConfiguration(format!(
                "context size {bytes} exceeds the maximum of {MAX_CONTEXT_SIZE}"
            )));
        }
        Ok(Self(bytes))
    }

    /// Window width in bytes.
    pub fn bytes(self) -> usize {
        self.0
    }

    /// Window width in bits (`C * 8`).
    pub fn bits(self) -> usize {
        self.0 * 8
    }
}

impl TryFrom<i64> for ContextSize {
    type Error = EncodeError;

    fn try_from(value: i64) -> Result<Self> {
        if value < 0 {
            return Err(EncodeError::InvalidConfiguration(format!(
                "context size must not be negative (got {value})"
            )));
        }
        let bytes = usize::try_from(value).map_err(|_| {
            EncodeError::InvalidConfiguration(format!("context size {value} is too large"))
        })?;
        Self::new(bytes)
    }
}

impl Default for ContextSize {
    fn default() -> Self {
        Self(DEFAULT_CONTEXT_SIZE)
    }
}

// ── EncoderConfig ───────────────────────────────────────────────────────────

/// Knobs for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Context size `C` in bytes; the window is `C * 8` bits wide.
    #[serde(default = "default_context_size")]
    pub context_size: usize,
    /// Label granularity.
    #[serde(default)]
    pub granularity: Granularity,
    /// Progress observers are notified every this many examples.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
    /// Compute windows and labels across a rayon pool (output order is unchanged).
    #[serde(default)]
    pub parallel: bool,
}

fn default_context_size() -> usize {
    DEFAULT_CONTEXT_SIZE
}
fn default_progress_every() -> usize {
    10_000
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            context_size: DEFAULT_CONTEXT_SIZE,
            granularity: Granularity::Unigram,
            progress_every: 10_000,
            parallel: false,
        }
    }
}

impl EncoderConfig {
    pub fn new(context_size: usize, granularity: Granularity) -> Self {
        Self {
            context_size,
            granularity,
            ..Default::default()
        }
    }

    /// Validated context size.
    pub fn context(&self) -> Result<ContextSize> {
        ContextSize::new(self.context_size)
    }

    /// Window width in bits.
    pub fn window_bits(&self) -> usize {
        self.context_size.saturating_mul(8)
    }

    /// Check every knob; called before the pipeline leaves `Idle`.
    pub fn validate(&self) -> Result<()> {
        self.context()?;
        if self.progress_every == 0 {
            return Err(EncodeError::InvalidConfiguration(
                "progress_every must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Save config to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_json_round_trip() {
        let config = EncoderConfig {
            context_size: 4,
            granularity: Granularity::Trigram,
            progress_every: 7,
            parallel: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"trigram\""));
        let loaded: EncoderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let loaded: EncoderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded, EncoderConfig::default());
        assert_eq!(loaded.window_bits(), 784);
    }

    #[test]
    fn granularity_parsing() {
        for g in Granularity::ALL {
            assert_eq!(g.as_str().parse::<Granularity>().unwrap(), g);
        }
        let err = "Unigram".parse::<Granularity>().unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedGranularity(s) if s == "Unigram"));
        assert!("".parse::<Granularity>().is_err());
    }

    #[test]
    fn granularity_label_ranges() {
        assert_eq!(Granularity::Unigram.max_label(), 127);
        assert_eq!(Granularity::Bigram.max_label(), 65_535);
        assert_eq!(Granularity::Trigram.max_label(), 16_777_215);
    }

    #[test]
    fn context_size_rejects_non_positive() {
        assert!(matches!(
            ContextSize::try_from(-1),
            Err(EncodeError::InvalidConfiguration(_))
        ));
        assert!(ContextSize::try_from(0).is_err());
        let c = ContextSize::try_from(3).unwrap();
        assert_eq!(c.bytes(), 3);
        assert_eq!(c.bits(), 24);
    }

    #[test]
    fn context_size_is_capped() {
        assert_eq!(ContextSize::new(MAX_CONTEXT_SIZE).unwrap().bytes(), MAX_CONTEXT_SIZE);
        assert!(matches!(
            ContextSize::new(MAX_CONTEXT_SIZE + 1),
            Err(EncodeError::InvalidConfiguration(_))
        ));
        assert!(ContextSize::try_from(4_611_686_018_427_387_903i64).is_err());

        let config = EncoderConfig::new(usize::MAX / 4, Granularity::Unigram);
        assert!(config.validate().is_err());
        assert_eq!(config.window_bits(), usize::MAX);
    }

    #[test]
    fn validate_checks_progress_interval() {
        let mut config = EncoderConfig::default();
        assert!(config.validate().is_ok());
        config.progress_every = 0;
        assert!(config.validate().is_err());
        config.progress_every = 1;
        config.context_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bitwin.json");
        let config = EncoderConfig::new(2, Granularity::Bigram);
        config.save(&path).unwrap();
        assert_eq!(EncoderConfig::load(&path).unwrap(), config);
    }
}
