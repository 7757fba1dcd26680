//! Map and reduce passes over text that does not fit in one prompt.
//!
//! ## Map
//!
//! Pack the text into whole-line chunks that fit next to the template,
//! render the template once per chunk, and ask the generator for every
//! chunk at once:
//!
//! ```text
//! text ──pack──▶ [c0, c1, c2, c3] ──render+generate (concurrently)──▶ [o0, o1, o2, o3]
//! ```
//!
//! Calls finish in any order. Outputs are put back by chunk index, so `oN`
//! always answers `cN`. One failed call fails the pass; calls still in
//! flight are dropped.
//!
//! ## Reduce
//!
//! Join the outputs with blank lines and run a map pass over that with the
//! reduce template. Repeat until one output is left:
//!
//! ```text
//! pass 1: [o0, o1, o2, o3] ──join──▶ "o0\n\no1\n\no2\n\no3" ──map──▶ [r0, r1]
//! pass 2: [r0, r1]         ──join──▶ "r0\n\nr1"             ──map──▶ [s0]   done
//! ```
//!
//! A pass shrinks the set only if the packer can fit two outputs into one
//! chunk. An output larger than the reduce budget stays alone every pass, so
//! the loop is bounded by `max_reduce_passes` and reports
//! [`Error::DidNotConverge`] instead of spinning.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::config::{Config, PassConfig};
use crate::generator::Generator;
use crate::template::{MustacheRenderer, Renderer, CHUNK_VAR};
use crate::{Chunker, Error, LinePacker, Result, Slab, Tokenizer};

/// Separator placed between completions before a reduce pass.
pub const REDUCE_SEPARATOR: &str = "\n\n";

/// Text returned by [`Reduction::into_text`] when there was nothing to reduce.
pub const NOTHING_TO_REDUCE: &str = "<Nothing to summarize.>";

/// One generator output and the chunk it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The chunk that was pasted into the template.
    pub source: Slab,
    /// What the generator returned.
    pub output: String,
}

/// Result of collapsing a set of completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    /// No completions were given.
    Empty,
    /// The single remaining completion.
    Reduced {
        /// Final text.
        text: String,
        /// Reduce passes run. `0` when a single completion was passed in.
        passes: usize,
    },
}

impl Reduction {
    /// The reduced text, or `None` for [`Reduction::Empty`].
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Reduced { text, .. } => Some(text),
        }
    }

    /// Reduce passes run.
    #[must_use]
    pub const fn passes(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Reduced { passes, .. } => *passes,
        }
    }

    /// The reduced text, with [`NOTHING_TO_REDUCE`] standing in for `Empty`.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Empty => NOTHING_TO_REDUCE.to_string(),
            Self::Reduced { text, .. } => text,
        }
    }
}

/// Runs templates over arbitrarily long text through a bounded-context
/// generator.
///
/// ```rust,no_run
/// # async fn run() -> condense::Result<()> {
/// use std::sync::Arc;
/// use condense::{BpeTokenizer, Config, MapReduce, OpenAiGenerator};
///
/// let config = Config::default();
/// let tokenizer = Arc::new(BpeTokenizer::new(config.encoding)?);
/// let generator = Arc::new(OpenAiGenerator::new(&config.openai, "sk-...").unwrap());
/// let engine = MapReduce::new(tokenizer, generator, config);
///
/// let notes = engine
///     .map_template("long text...", "Take notes:\n\n{{{chunk}}}\n\nNotes:")
///     .await?;
/// let summary = engine
///     .reduce_completions(notes, "Merge these notes:\n\n{{{chunk}}}\n\nMerged:")
///     .await?;
/// println!("{}", summary.into_text());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MapReduce {
    tokenizer: Arc<dyn Tokenizer>,
    generator: Arc<dyn Generator>,
    renderer: Arc<dyn Renderer>,
    config: Config,
}

impl MapReduce {
    /// Create an engine that renders templates with [`MustacheRenderer`].
    #[must_use]
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        generator: Arc<dyn Generator>,
        config: Config,
    ) -> Self {
        Self {
            tokenizer,
            generator,
            renderer: Arc::new(MustacheRenderer),
            config,
        }
    }

    /// Replace the template renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The tokenizer used for budget accounting.
    #[must_use]
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// The template renderer.
    #[must_use]
    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    /// The packer a pass with `template` under `pass` would use.
    pub fn packer(&self, template: &str, pass: &PassConfig) -> Result<LinePacker> {
        LinePacker::for_template(
            Arc::clone(&self.tokenizer),
            template,
            pass.max_total_tokens,
            pass.reserved_for_completion,
        )
    }

    /// Run `template` over every chunk of `text` under the `[map]` settings.
    ///
    /// Returns one output per chunk in chunk order. Empty text makes no
    /// generator calls and returns an empty vector.
    pub async fn map_template(&self, text: &str, template: &str) -> Result<Vec<String>> {
        let completions = self.map_pass(text, template, &self.config.map).await?;
        Ok(completions.into_iter().map(|c| c.output).collect())
    }

    /// Run `template` over every chunk of `text` under explicit settings,
    /// keeping each output paired with its source chunk.
    pub async fn map_pass(
        &self,
        text: &str,
        template: &str,
        pass: &PassConfig,
    ) -> Result<Vec<Completion>> {
        let packer = self.packer(template, pass)?;
        let slabs = packer.chunk(text)?;
        if slabs.is_empty() {
            return Ok(vec![]);
        }

        let prompts = slabs
            .iter()
            .map(|slab| self.renderer.render(template, &[(CHUNK_VAR, slab.text.as_str())]))
            .collect::<Result<Vec<_>>>()?;

        let limit = self.config.concurrency.unwrap_or(slabs.len()).max(1);
        tracing::info!(
            chunks = slabs.len(),
            template_tokens = packer.template_tokens(),
            budget = packer.budget(),
            in_flight = limit.min(slabs.len()),
            "map pass"
        );

        let params = pass.params();
        let generator = self.generator.as_ref();
        let params = &params;
        let mut calls = stream::iter(prompts.into_iter().enumerate())
            .map(move |(index, prompt)| async move {
                tracing::debug!(chunk = index, prompt_len = prompt.len(), "generate");
                (index, generator.generate(&prompt, params).await)
            })
            .buffer_unordered(limit);

        let mut outputs = Vec::with_capacity(slabs.len());
        while let Some((index, result)) = calls.next().await {
            let output = result.map_err(|source| {
                tracing::warn!(chunk = index, error = %source, "generation failed");
                Error::Generation {
                    chunk: index,
                    source,
                }
            })?;
            outputs.push((index, output));
        }

        // Completion order is arbitrary; restore chunk order.
        outputs.sort_unstable_by_key(|(index, _)| *index);

        Ok(slabs
            .into_iter()
            .zip(outputs)
            .map(|(source, (_, output))| Completion { source, output })
            .collect())
    }

    /// Collapse `completions` into one with repeated `[reduce]` passes.
    ///
    /// Zero completions give [`Reduction::Empty`] and one is returned as is;
    /// neither calls the generator.
    ///
    /// # Errors
    ///
    /// [`Error::DidNotConverge`] after `max_reduce_passes` passes without
    /// reaching one completion, or any error from a pass.
    pub async fn reduce_completions(
        &self,
        completions: Vec<String>,
        reduce_template: &str,
    ) -> Result<Reduction> {
        let mut current = completions;
        let mut passes = 0;

        loop {
            match current.len() {
                0 => return Ok(Reduction::Empty),
                1 => {
                    return Ok(Reduction::Reduced {
                        text: current.swap_remove(0),
                        passes,
                    })
                }
                remaining if passes >= self.config.max_reduce_passes => {
                    tracing::error!(passes, remaining, "reduce did not converge");
                    return Err(Error::DidNotConverge { passes, remaining });
                }
                remaining => {
                    passes += 1;
                    tracing::info!(pass = passes, remaining, "reduce pass");
                    let joined = current.join(REDUCE_SEPARATOR);
                    current = self
                        .map_pass(&joined, reduce_template, &self.config.reduce)
                        .await?
                        .into_iter()
                        .map(|c| c.output)
                        .collect();
                }
            }
        }
    }

    /// Map `text` with `map_template`, then reduce with `reduce_template`.
    pub async fn map_reduce(
        &self,
        text: &str,
        map_template: &str,
        reduce_template: &str,
    ) -> Result<Reduction> {
        let completions = self.map_template(text, map_template).await?;
        self.reduce_completions(completions, reduce_template).await
    }
}

impl std::fmt::Debug for MapReduce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapReduce")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
