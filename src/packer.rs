//! Line-aligned packing under a token budget.
//!
//! Source code, transcripts, and logs read badly when a chunk ends mid-line.
//! The packer fills each chunk with whole lines until the next line would
//! overflow the budget, then starts a new chunk with that line.
//!
//! ## The Budget
//!
//! A chunk is pasted into a prompt template and the model must still have
//! room to answer, so the space for text is what is left over:
//!
//! ```text
//! budget = max_total_tokens - reserved_for_completion - tokens(template)
//! ```
//!
//! ## Oversized Lines
//!
//! Lines are never split. A line that alone exceeds the budget becomes its
//! own chunk and the caller gets a prompt that is too long for the model.
//!
//! ```text
//! budget = 10
//!
//! line 0:  4 tokens  ┐
//! line 1:  5 tokens  ┘ chunk 0 (9 tokens)
//! line 2: 14 tokens    chunk 1 (14 tokens, oversized)
//! line 3:  2 tokens  ┐
//! line 4:  3 tokens  ┘ chunk 2 (5 tokens)
//! ```
//!
//! Lines with no tokens (blank lines) always join the current chunk, even an
//! oversized one. Otherwise the blank line separating two oversized
//! paragraphs would become an empty chunk of its own.

use std::sync::Arc;

use crate::{Chunker, Error, Result, Slab, Span, Tokenizer};

/// Packs whole lines into chunks bounded by a token budget.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use condense::{BpeTokenizer, Chunker, Encoding, LinePacker};
///
/// let tokenizer = Arc::new(BpeTokenizer::new(Encoding::Cl100kBase).unwrap());
/// let packer = LinePacker::with_budget(tokenizer, 3);
/// let slabs = packer.chunk("one two\nthree four\nfive").unwrap();
///
/// assert_eq!(slabs.len(), 2);
/// assert_eq!(slabs[0].text, "one two");
/// assert_eq!(slabs[1].lines(), Some(&[1, 2][..]));
/// ```
#[derive(Clone)]
pub struct LinePacker {
    tokenizer: Arc<dyn Tokenizer>,
    budget: usize,
    template_tokens: usize,
}

impl LinePacker {
    /// Create a packer with an explicit text budget.
    #[must_use]
    pub fn with_budget(tokenizer: Arc<dyn Tokenizer>, budget: usize) -> Self {
        Self {
            tokenizer,
            budget,
            template_tokens: 0,
        }
    }

    /// Create a packer whose budget leaves room for `template` and a
    /// completion of `reserved_for_completion` tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoTokenBudget`] if nothing is left for text.
    pub fn for_template(
        tokenizer: Arc<dyn Tokenizer>,
        template: &str,
        max_total_tokens: usize,
        reserved_for_completion: usize,
    ) -> Result<Self> {
        let template_tokens = tokenizer.count(template)?;
        let budget = max_total_tokens
            .checked_sub(reserved_for_completion)
            .and_then(|left| left.checked_sub(template_tokens))
            .filter(|&left| left > 0)
            .ok_or(Error::NoTokenBudget {
                max_total_tokens,
                reserved: reserved_for_completion,
                template_tokens,
            })?;

        tracing::debug!(template_tokens, budget, "line packer budget");
        Ok(Self {
            tokenizer,
            budget,
            template_tokens,
        })
    }

    /// Tokens available for text in each chunk.
    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    /// Tokens the template costs. `0` for [`LinePacker::with_budget`].
    #[must_use]
    pub const fn template_tokens(&self) -> usize {
        self.template_tokens
    }
}

impl Chunker for LinePacker {
    fn chunk(&self, text: &str) -> Result<Vec<Slab>> {
        if text.is_empty() {
            return Ok(vec![]);
        }

        let mut slabs = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0;
        let mut lines = Vec::new();

        for (lineno, line) in text.split('\n').enumerate() {
            let line_tokens = self.tokenizer.count(line)?;

            // Blank lines cost nothing and never start a chunk of their own.
            let overflows = line_tokens > 0 && current_tokens + line_tokens > self.budget;
            if !lines.is_empty() && overflows {
                let index = slabs.len();
                slabs.push(Slab::new(
                    std::mem::take(&mut current),
                    index,
                    current_tokens,
                    Span::Lines(std::mem::take(&mut lines)),
                ));
                current_tokens = 0;
            }

            if !lines.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            current_tokens += line_tokens;
            lines.push(lineno);
        }

        if !lines.is_empty() {
            let index = slabs.len();
            slabs.push(Slab::new(current, index, current_tokens, Span::Lines(lines)));
        }

        Ok(slabs)
    }
}

impl std::fmt::Debug for LinePacker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinePacker")
            .field("budget", &self.budget)
            .field("template_tokens", &self.template_tokens)
            .finish()
    }
}

/// Pack `text` into whole-line chunks that fit alongside `template`.
///
/// Convenience over [`LinePacker::for_template`] followed by
/// [`Chunker::chunk`].
pub fn pack_by_lines(
    tokenizer: Arc<dyn Tokenizer>,
    text: &str,
    template: &str,
    max_total_tokens: usize,
    reserved_for_completion: usize,
) -> Result<Vec<Slab>> {
    LinePacker::for_template(tokenizer, template, max_total_tokens, reserved_for_completion)?
        .chunk(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BpeTokenizer, Encoding};

    /// One token per whitespace-separated word; enough to reason about budgets.
    struct Words;

    impl Tokenizer for Words {
        fn encode(&self, text: &str) -> Result<Vec<u32>> {
            Ok(text.split_whitespace().map(|w| w.len() as u32).collect())
        }

        fn decode(&self, _tokens: &[u32]) -> Result<String> {
            Err(Error::Tokenizer("counting only".into()))
        }
    }

    fn packer(budget: usize) -> LinePacker {
        LinePacker::with_budget(Arc::new(Words), budget)
    }

    #[test]
    fn test_packs_until_budget() {
        let text = "a b\nc d\ne f\ng";
        let slabs = packer(4).chunk(text).unwrap();

        assert_eq!(slabs.len(), 2);
        assert_eq!(slabs[0].text, "a b\nc d");
        assert_eq!(slabs[0].lines(), Some(&[0, 1][..]));
        assert_eq!(slabs[0].tokens, 4);
        assert_eq!(slabs[1].text, "e f\ng");
        assert_eq!(slabs[1].lines(), Some(&[2, 3][..]));
    }

    #[test]
    fn test_line_that_does_not_fit_starts_next_chunk() {
        let slabs = packer(3).chunk("a b\nc d\ne").unwrap();
        let texts: Vec<_> = slabs.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["a b", "c d\ne"]);
    }

    #[test]
    fn test_oversized_line_is_alone() {
        let text = "a b\nc d e f g h\ni";
        let slabs = packer(3).chunk(text).unwrap();

        let texts: Vec<_> = slabs.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["a b", "c d e f g h", "i"]);
        assert_eq!(slabs[1].tokens, 6);
        assert_eq!(slabs[1].lines(), Some(&[1][..]));
    }

    #[test]
    fn test_oversized_first_line() {
        let slabs = packer(1).chunk("a b c\nd").unwrap();
        assert_eq!(slabs.len(), 2);
        assert_eq!(slabs[0].lines(), Some(&[0][..]));
        assert!(slabs.iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn test_blank_line_after_oversized_line_stays_with_it() {
        let text = "a b c d e\n\nf g h i j";
        let slabs = packer(3).chunk(text).unwrap();

        let texts: Vec<_> = slabs.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["a b c d e\n", "f g h i j"]);
        assert_eq!(slabs[0].lines(), Some(&[0, 1][..]));
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(packer(10).chunk("").unwrap().is_empty());
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let slabs = packer(10).chunk("a\n\nb\n").unwrap();
        assert_eq!(slabs.len(), 1);
        assert_eq!(slabs[0].text, "a\n\nb\n");
        assert_eq!(slabs[0].lines(), Some(&[0, 1, 2, 3][..]));
    }

    #[test]
    fn test_every_line_once_in_order() {
        let text = (0..50)
            .map(|i| "w ".repeat(i % 7 + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let slabs = packer(12).chunk(&text).unwrap();

        let lines: Vec<usize> = slabs
            .iter()
            .flat_map(|s| s.lines().unwrap().iter().copied())
            .collect();
        assert_eq!(lines, (0..50).collect::<Vec<_>>());

        let rejoined = slabs
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(rejoined, text);

        for slab in &slabs {
            assert!(slab.tokens <= 12);
        }
    }

    #[test]
    fn test_template_budget() {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(Words);
        let packer =
            LinePacker::for_template(tokenizer.clone(), "Summarize: {{{chunk}}}", 100, 40).unwrap();
        assert_eq!(packer.budget(), 58);
        assert_eq!(packer.template_tokens(), 2);
        assert_eq!(self::packer(5).template_tokens(), 0);

        let err = LinePacker::for_template(tokenizer.clone(), "a b", 10, 8).unwrap_err();
        assert!(matches!(
            err,
            Error::NoTokenBudget {
                template_tokens: 2,
                ..
            }
        ));
        assert!(LinePacker::for_template(tokenizer, "a", 10, 20).is_err());
    }

    #[test]
    fn test_pack_by_lines_with_bpe() {
        let tokenizer = Arc::new(BpeTokenizer::new(Encoding::Cl100kBase).unwrap());
        let text = "fn main() {\n    println!(\"hi\");\n}";
        let slabs = pack_by_lines(tokenizer, text, "Explain:\n{{{chunk}}}", 2048, 1024).unwrap();

        assert_eq!(slabs.len(), 1);
        assert_eq!(slabs[0].text, text);
        assert_eq!(slabs[0].lines(), Some(&[0, 1, 2][..]));
    }
}
