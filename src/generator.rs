//! Text-generation adapter.
//!
//! The map and reduce stages only need "prompt in, completion out". Which
//! service answers, how it authenticates, and whether it retries are the
//! adapter's business. [`OpenAiGenerator`](crate::OpenAiGenerator) (feature
//! `openai`) talks to any OpenAI-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;

/// Length and sampling parameters for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Lower bound on completion length. Advisory; many services ignore it.
    pub min_tokens: usize,
    /// Upper bound on completion length.
    pub max_tokens: usize,
    /// Sampling temperature. `0.0` is greedy.
    pub temperature: f32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// Sequences that end generation.
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            min_tokens: 1,
            max_tokens: 256,
            temperature: 0.0,
            top_p: 1.0,
            stop: Vec::new(),
        }
    }
}

/// Produces a completion for a rendered prompt.
///
/// Implementations must tolerate concurrent calls: a map pass issues one
/// call per chunk at the same time.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Complete `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerateError>;
}

/// Failures reported by a generator.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The service asked us to slow down.
    #[error("rate limited{}", retry_hint(.retry_after))]
    RateLimited {
        /// Server-suggested wait, if any.
        retry_after: Option<Duration>,
    },

    /// The service answered with a non-success status.
    #[error("server returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Transport failure.
    #[cfg(feature = "openai")]
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response could not be understood.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The service returned no completion at all.
    #[error("response contained no completion")]
    EmptyCompletion,

    /// Any other adapter-specific failure.
    #[error("{0}")]
    Other(String),
}

#[allow(clippy::ref_option)]
fn retry_hint(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(" (retry after {d:?})"))
        .unwrap_or_default()
}

impl GenerateError {
    /// Whether the same request might succeed later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Status { status, .. } => matches!(status, 500 | 502 | 503 | 504 | 529),
            #[cfg(feature = "openai")]
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Decode(_) | Self::EmptyCompletion | Self::Other(_) => false,
        }
    }
}
