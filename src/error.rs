//! Error types for condense.

use crate::generator::GenerateError;

/// Errors that can occur while chunking, mapping, or reducing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Window size was negative.
    #[error("chunk_size must be non-negative")]
    NegativeChunkSize,

    /// Window overlap was negative.
    #[error("chunk_overlap must be non-negative")]
    NegativeOverlap,

    /// Overlap must leave a positive stride. Also rejects `size == 0`.
    #[error("chunk_overlap must be less than chunk_size")]
    OverlapNotLessThanSize {
        /// The window size.
        size: usize,
        /// The overlap that was too large.
        overlap: usize,
    },

    /// The template plus the completion reserve leaves no room for text.
    #[error(
        "no token budget left for text: max_total_tokens {max_total_tokens} \
         - reserved_for_completion {reserved} - template {template_tokens} <= 0"
    )]
    NoTokenBudget {
        /// Total context size of the model.
        max_total_tokens: usize,
        /// Tokens held back for the completion.
        reserved: usize,
        /// Tokens taken by the template itself.
        template_tokens: usize,
    },

    /// Tokenizer failed to encode or decode.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Template could not be rendered.
    #[error("template error: {0}")]
    Template(String),

    /// A generator call failed. `chunk` is the index of the chunk whose
    /// prompt was being completed.
    #[error("generation failed for chunk {chunk}: {source}")]
    Generation {
        /// Index of the failing chunk within its map pass.
        chunk: usize,
        /// The underlying generator failure.
        #[source]
        source: GenerateError,
    },

    /// The reduce loop ran out of passes before reaching a single completion.
    #[error("failed to converge after {passes} reduce passes ({remaining} completions remain)")]
    DidNotConverge {
        /// Passes executed.
        passes: usize,
        /// Completions left after the last pass.
        remaining: usize,
    },

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether retrying the same call could succeed.
    ///
    /// Only generator failures the generator itself classifies as transient
    /// (rate limits, timeouts) qualify.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Generation { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// Result type for condense operations.
pub type Result<T> = std::result::Result<T, Error>;
