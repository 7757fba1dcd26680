//! The Slab type: a chunk of text sized for one generator call.

use std::ops::Range;

/// Where a slab came from in its source.
///
/// The two chunkers describe their output differently: the token window
/// knows the exact token range it decoded, the line packer knows which
/// whole lines it concatenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    /// `[start, end)` into the token sequence of the source text.
    Tokens(Range<usize>),
    /// Zero-based source line indices, consecutive and ascending.
    Lines(Vec<usize>),
}

/// A chunk of text with its position in the original document.
///
/// ## Token Counts
///
/// `tokens` is the budget cost of the slab as the chunker saw it. For token
/// windows it equals the span width. For line slabs it is the sum of the
/// per-line counts and is only used for packing decisions; the newlines
/// joining lines are not counted, so re-encoding `text` may give a slightly
/// different number.
///
/// ```rust
/// use condense::{Slab, Span};
///
/// let slab = Slab::new("fn main() {}", 0, 4, Span::Lines(vec![0]));
/// assert_eq!(slab.lines(), Some(&[0][..]));
/// assert_eq!(slab.token_range(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slab {
    /// The chunk text.
    pub text: String,
    /// Zero-based index of this chunk in the sequence.
    pub index: usize,
    /// Budget cost in tokens.
    pub tokens: usize,
    /// Source position.
    pub span: Span,
}

impl Slab {
    /// Create a new slab.
    #[must_use]
    pub fn new(text: impl Into<String>, index: usize, tokens: usize, span: Span) -> Self {
        Self {
            text: text.into(),
            index,
            tokens,
            span,
        }
    }

    /// Whether this chunk is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The token range, for slabs cut by the token window.
    #[must_use]
    pub fn token_range(&self) -> Option<Range<usize>> {
        match &self.span {
            Span::Tokens(range) => Some(range.clone()),
            Span::Lines(_) => None,
        }
    }

    /// The covered line indices, for slabs built by the line packer.
    #[must_use]
    pub fn lines(&self) -> Option<&[usize]> {
        match &self.span {
            Span::Lines(lines) => Some(lines),
            Span::Tokens(_) => None,
        }
    }
}

impl std::fmt::Display for Slab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Span::Tokens(range) => write!(
                f,
                "Slab {{ index: {}, tokens: {}..{} }}",
                self.index, range.start, range.end
            ),
            Span::Lines(lines) => match (lines.first(), lines.last()) {
                (Some(first), Some(last)) => write!(
                    f,
                    "Slab {{ index: {}, lines: {}..={}, tokens: {} }}",
                    self.index, first, last, self.tokens
                ),
                _ => write!(f, "Slab {{ index: {}, lines: none }}", self.index),
            },
        }
    }
}
