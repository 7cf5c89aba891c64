//! Pipeline configuration.
//!
//! Every stream receives its own `DebiasConfig`; nothing here is global.
//! The chunk size and cycle length only shape buffering and key rotation,
//! never the debiased bit sequence itself.

use crate::kaminsky::DiscardPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default input bytes consumed per Kaminsky cipher cycle.
pub const DEFAULT_BLOCK_SIZE: u64 = 512;

/// Default upper bound on a buffered output chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1024;

/// Output processing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Packed debiased bits, unencrypted.
    #[default]
    VonNeumann,
    /// Debiased bits encrypted under keys hashed from the discarded bits.
    Kaminsky,
}

impl Mode {
    /// Suffix appended to the input file name to form the output name.
    pub fn output_suffix(self) -> &'static str {
        match self {
            Mode::VonNeumann => "-neumann-debiased.bin",
            Mode::Kaminsky => "-kaminsky-debiased.bin",
        }
    }
}

/// What the producer does once the input is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// Flush, close the channel and cancel the stream token.
    #[default]
    CloseOnExhaustion,
    /// Keep the channel open until the stream token is cancelled externally.
    HoldOpen,
}

/// Configuration for one debiasing stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebiasConfig {
    /// Plain or Kaminsky output.
    pub mode: Mode,
    /// End-of-input behavior.
    pub termination: Termination,
    /// Input bytes per cipher cycle (Kaminsky only).
    pub block_size: u64,
    /// Maximum bytes buffered before a chunk is handed to the consumer.
    pub max_chunk_size: usize,
    /// Whether key material restarts every cycle (Kaminsky only).
    pub discard_policy: DiscardPolicy,
}

impl Default for DebiasConfig {
    fn default() -> Self {
        Self {
            mode: Mode::VonNeumann,
            termination: Termination::CloseOnExhaustion,
            block_size: DEFAULT_BLOCK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            discard_policy: DiscardPolicy::ResetPerCycle,
        }
    }
}

impl DebiasConfig {
    /// Creates a Kaminsky-mode configuration with default tunables.
    pub fn kaminsky() -> Self {
        Self {
            mode: Mode::Kaminsky,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        if self.max_chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// `block_size` was zero.
    #[error("block size must be at least one byte")]
    InvalidBlockSize,
    /// `max_chunk_size` was zero.
    #[error("max chunk size must be at least one byte")]
    InvalidChunkSize,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file was not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[pipeline]` section.
    #[serde(default)]
    pub pipeline: DebiasConfig,
    /// `[input]` section.
    #[serde(default)]
    pub input: InputConfig,
}

/// Input selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// File extension to process, with or without the leading dot.
    pub extension: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extension: "bin".to_string(),
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.pipeline.validate()?;
        Ok(config)
    }
}
