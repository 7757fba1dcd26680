//! # condense
//!
//! Push arbitrarily long text through a text-generation model that only
//! accepts a bounded number of tokens per call.
//!
//! ## The Problem
//!
//! A model has a context window: prompt plus completion must fit in N
//! tokens. A codebase, a call transcript, or a book does not. You have to
//! cut the text into pieces, run your prompt over each piece, and then
//! combine the answers, which may themselves be too long to combine in one
//! call.
//!
//! Two pieces of machinery do the work:
//!
//! - **Chunkers** cut text by *token* budget, not bytes, because that is
//!   what the model counts.
//! - **Map-reduce** runs a template over every chunk concurrently, then
//!   repeatedly folds the outputs together until one is left.
//!
//! ## Chunking Strategies
//!
//! ### Token Windows
//!
//! Slide a window of N tokens with M tokens of overlap and decode each
//! window back into text:
//!
//! ```text
//! Text:   "Hello world! This is a test."
//! Size 2, overlap 1
//!
//! ["Hello world", " world!", "! This", " This is", " is a", " a test", " test."]
//! ```
//!
//! **When to use**: Embedding inputs, fixed-size model inputs.
//! **Weakness**: Cuts mid-line and mid-sentence.
//!
//! ### Line Packing
//!
//! Fill each chunk with whole lines until the next line would exceed what
//! is left after the prompt template and the completion reserve:
//!
//! ```text
//! budget = max_total_tokens - reserved_for_completion - tokens(template)
//! ```
//!
//! **When to use**: Anything line-oriented: code, logs, transcripts. This is
//! what map-reduce uses.
//! **Weakness**: A single very long line becomes an oversized chunk.
//!
//! ## Map-Reduce
//!
//! ```text
//! text ─▶ pack ─▶ [c0 c1 c2 c3 c4] ─▶ generate ×5 ─▶ [o0 o1 o2 o3 o4]
//!                                                       │ join "\n\n"
//!                                                       ▼
//!                          pack ─▶ [r0 r1] ─▶ generate ×2 ─▶ [p0 p1]
//!                                                       │ join "\n\n"
//!                                                       ▼
//!                          pack ─▶ [r0] ─▶ generate ×1 ─▶ "final"
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use condense::{chunk_by_tokens, BpeTokenizer, Chunker, Encoding, LinePacker};
//!
//! let tokenizer = Arc::new(BpeTokenizer::new(Encoding::Cl100kBase).unwrap());
//!
//! // Token windows
//! let windows = chunk_by_tokens(tokenizer.as_ref(), "Hello world! This is a test.", 3, 1).unwrap();
//! assert_eq!(windows[0], "Hello world!");
//!
//! // Whole lines, at most 50 tokens per chunk
//! let packer = LinePacker::with_budget(tokenizer, 50);
//! let slabs = packer.chunk("line one\nline two\nline three").unwrap();
//! assert_eq!(slabs.len(), 1);
//! ```
//!
//! Generation needs a [`Generator`]; with the `openai` feature,
//! [`OpenAiGenerator`] talks to any OpenAI-compatible endpoint. See
//! [`MapReduce`] and the [`recipes`] module.

mod config;
mod engine;
mod error;
mod generator;
#[cfg(feature = "openai")]
mod openai;
mod packer;
pub mod recipes;
mod slab;
mod template;
mod tokenizer;
mod window;

pub use config::{Config, OpenAiConfig, PassConfig, DEFAULT_MAX_REDUCE_PASSES};
pub use engine::{Completion, MapReduce, Reduction, NOTHING_TO_REDUCE, REDUCE_SEPARATOR};
pub use error::{Error, Result};
pub use generator::{GenerateError, GenerationParams, Generator};
#[cfg(feature = "openai")]
pub use openai::OpenAiGenerator;
pub use packer::{pack_by_lines, LinePacker};
pub use slab::{Slab, Span};
pub use template::{MustacheRenderer, Renderer, CHUNK_VAR};
pub use tokenizer::{BpeTokenizer, Encoding, Tokenizer};
pub use window::{chunk_by_tokens, TokenWindow};

/// A token-budgeted chunking strategy.
///
/// Both chunkers implement this trait, so callers can hold either:
///
/// ```rust
/// use std::sync::Arc;
/// use condense::{BpeTokenizer, Chunker, Encoding, LinePacker, Slab, TokenWindow};
///
/// fn chunk_document(chunker: &dyn Chunker, text: &str) -> Vec<Slab> {
///     chunker.chunk(text).unwrap()
/// }
///
/// let tokenizer = Arc::new(BpeTokenizer::new(Encoding::Cl100kBase).unwrap());
/// let window = TokenWindow::new(tokenizer.clone(), 100, 20).unwrap();
/// let lines = LinePacker::with_budget(tokenizer, 100);
///
/// let text = "Hello world.\nThis is a test.";
/// let slabs1 = chunk_document(&window, text);
/// let slabs2 = chunk_document(&lines, text);
/// ```
pub trait Chunker: Send + Sync {
    /// Split text into chunks, in source order.
    ///
    /// Empty text yields no chunks.
    fn chunk(&self, text: &str) -> Result<Vec<Slab>>;
}
