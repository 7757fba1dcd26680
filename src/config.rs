//! Engine configuration.
//!
//! Everything has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! encoding = "cl100k_base"
//! max_reduce_passes = 20
//! concurrency = 8
//!
//! [map]
//! max_total_tokens = 1768
//! reserved_for_completion = 1024
//!
//! [reduce]
//! max_total_tokens = 1768
//! reserved_for_completion = 1000
//! min_tokens = 500
//!
//! [openai]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! ```
//!
//! The API key is deliberately absent: it is handed to the generator
//! constructor by whoever owns the secret.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::generator::GenerationParams;
use crate::tokenizer::Encoding;
use crate::{Error, Result};

/// Default bound on reduce passes.
pub const DEFAULT_MAX_REDUCE_PASSES: usize = 20;

/// Budget and sampling for one kind of pass (map or reduce).
#[derive(Debug, Clone, PartialEq)]
pub struct PassConfig {
    /// Model context size: prompt plus completion.
    pub max_total_tokens: usize,
    /// Tokens held back for the completion. Also sent as `max_tokens`.
    pub reserved_for_completion: usize,
    /// Advisory minimum completion length.
    pub min_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// Stop sequences.
    pub stop: Vec<String>,
}

impl PassConfig {
    /// Defaults for per-chunk map passes.
    #[must_use]
    pub fn map() -> Self {
        Self {
            max_total_tokens: 1768,
            reserved_for_completion: 1024,
            min_tokens: 5,
            temperature: 0.2,
            top_p: 0.9,
            stop: Vec::new(),
        }
    }

    /// Defaults for reduce passes over joined completions.
    #[must_use]
    pub fn reduce() -> Self {
        Self {
            reserved_for_completion: 1000,
            min_tokens: 500,
            ..Self::map()
        }
    }

    /// Generator parameters for calls made under this pass.
    #[must_use]
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            min_tokens: self.min_tokens,
            max_tokens: self.reserved_for_completion,
            temperature: self.temperature,
            top_p: self.top_p,
            stop: self.stop.clone(),
        }
    }
}

/// A `[map]` or `[reduce]` table; unset keys keep the pass profile's value.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PassOverrides {
    max_total_tokens: Option<usize>,
    reserved_for_completion: Option<usize>,
    min_tokens: Option<usize>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    stop: Option<Vec<String>>,
}

impl PassOverrides {
    fn over(self, base: PassConfig) -> PassConfig {
        PassConfig {
            max_total_tokens: self.max_total_tokens.unwrap_or(base.max_total_tokens),
            reserved_for_completion: self
                .reserved_for_completion
                .unwrap_or(base.reserved_for_completion),
            min_tokens: self.min_tokens.unwrap_or(base.min_tokens),
            temperature: self.temperature.unwrap_or(base.temperature),
            top_p: self.top_p.unwrap_or(base.top_p),
            stop: self.stop.unwrap_or(base.stop),
        }
    }
}

fn map_pass<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<PassConfig, D::Error> {
    Ok(PassOverrides::deserialize(d)?.over(PassConfig::map()))
}

fn reduce_pass<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<PassConfig, D::Error> {
    Ok(PassOverrides::deserialize(d)?.over(PassConfig::reduce()))
}

/// Where and how to reach an OpenAI-compatible service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API root, up to and including the version segment.
    pub base_url: String,
    /// Model name sent with each request.
    pub model: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 180,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tokenizer vocabulary used for all budget accounting.
    pub encoding: Encoding,
    /// Per-chunk pass settings.
    #[serde(deserialize_with = "map_pass")]
    pub map: PassConfig,
    /// Reduce pass settings.
    #[serde(deserialize_with = "reduce_pass")]
    pub reduce: PassConfig,
    /// Give up after this many reduce passes.
    pub max_reduce_passes: usize,
    /// Cap on in-flight generator calls per pass. `None` sends every chunk
    /// at once.
    pub concurrency: Option<usize>,
    /// Generator endpoint.
    pub openai: OpenAiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            encoding: Encoding::default(),
            map: PassConfig::map(),
            reduce: PassConfig::reduce(),
            max_reduce_passes: DEFAULT_MAX_REDUCE_PASSES,
            concurrency: None,
            openai: OpenAiConfig::default(),
        }
    }
}

impl Config {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML, unknown enum values, or
    /// settings that can never work (zero passes, zero concurrency).
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.max_reduce_passes == 0 {
            return Err(Error::Config("max_reduce_passes must be at least 1".into()));
        }
        if self.concurrency == Some(0) {
            return Err(Error::Config("concurrency must be at least 1".into()));
        }
        Ok(())
    }
}
