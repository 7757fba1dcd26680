//! Fixed-size token windows with overlap.
//!
//! The token counterpart of a fixed-size byte splitter: encode once, slide a
//! window of `size` tokens forward by `size - overlap`, decode each window.
//!
//! ## How It Works
//!
//! ```text
//! size = 3, overlap = 1
//!
//! Tokens:  ["Hello", " world", "!", " This", " is", " a", " test", "."]
//!            0        1        2     3       4      5     6       7
//!
//! Window 0: [0..3)  "Hello world!"
//! Window 1: [2..5)  "! This is"      <- starts at 3 - 1 = 2
//! Window 2: [4..7)  " is a test"
//! Window 3: [6..8)  " test."         <- final window may be shorter
//! ```
//!
//! Sliding stops as soon as a window reaches the last token, so the last
//! token is covered once by the final window's own tokens and never spawns a
//! trailing window made only of overlap.
//!
//! A window edge can fall inside a multi-byte character (CJK, most emoji).
//! Those windows decode with U+FFFD for the partial bytes rather than failing.
//!
//! ## Validation
//!
//! Arguments are signed so that callers passing through untrusted integers
//! get a descriptive error instead of a wrap-around. Checks run in this order
//! before the tokenizer is touched:
//!
//! 1. `size < 0` → [`Error::NegativeChunkSize`]
//! 2. `overlap < 0` → [`Error::NegativeOverlap`]
//! 3. `overlap >= size` → [`Error::OverlapNotLessThanSize`] (this also
//!    rejects `size == 0`)

use std::sync::Arc;

use crate::{Chunker, Error, Result, Slab, Span, Tokenizer};

/// Sliding token-window chunker.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use condense::{BpeTokenizer, Chunker, Encoding, TokenWindow};
///
/// let tokenizer = Arc::new(BpeTokenizer::new(Encoding::Cl100kBase).unwrap());
/// let chunker = TokenWindow::new(tokenizer, 2, 1).unwrap();
/// let slabs = chunker.chunk("Hello world! This is a test.").unwrap();
///
/// assert_eq!(slabs.len(), 7);
/// assert_eq!(slabs[0].text, "Hello world");
/// assert_eq!(slabs[1].text, " world!");
/// ```
#[derive(Clone)]
pub struct TokenWindow {
    tokenizer: Arc<dyn Tokenizer>,
    size: usize,
    overlap: usize,
}

impl TokenWindow {
    /// Create a new window chunker.
    ///
    /// # Arguments
    ///
    /// * `size` - Tokens per window
    /// * `overlap` - Tokens repeated at the start of the next window
    ///
    /// # Errors
    ///
    /// See the module docs for the validation order.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, size: i64, overlap: i64) -> Result<Self> {
        let (size, overlap) = validate(size, overlap)?;
        Ok(Self {
            tokenizer,
            size,
            overlap,
        })
    }

    /// Create a chunker with no overlap.
    pub fn no_overlap(tokenizer: Arc<dyn Tokenizer>, size: i64) -> Result<Self> {
        Self::new(tokenizer, size, 0)
    }

    /// The step between window starts.
    fn stride(&self) -> usize {
        self.size - self.overlap
    }

    /// Number of windows for a sequence of `token_len` tokens.
    #[must_use]
    pub fn estimate_windows(&self, token_len: usize) -> usize {
        if token_len == 0 {
            return 0;
        }
        if token_len <= self.size {
            return 1;
        }
        1 + (token_len - self.size).div_ceil(self.stride())
    }
}

fn validate(size: i64, overlap: i64) -> Result<(usize, usize)> {
    if size < 0 {
        return Err(Error::NegativeChunkSize);
    }
    if overlap < 0 {
        return Err(Error::NegativeOverlap);
    }
    let (size, overlap) = (size as usize, overlap as usize);
    if overlap >= size {
        return Err(Error::OverlapNotLessThanSize { size, overlap });
    }
    Ok((size, overlap))
}

impl Chunker for TokenWindow {
    fn chunk(&self, text: &str) -> Result<Vec<Slab>> {
        slide(self.tokenizer.as_ref(), text, self.size, self.overlap)
    }
}

/// Encode once, then decode each window. `size > overlap` must hold.
fn slide(tokenizer: &dyn Tokenizer, text: &str, size: usize, overlap: usize) -> Result<Vec<Slab>> {
    let tokens = tokenizer.encode(text)?;
    let len = tokens.len();
    let mut slabs = Vec::new();
    let mut start = 0;

    while start < len {
        let end = (start + size).min(len);
        let window = tokenizer.decode_lossy(&tokens[start..end])?;
        slabs.push(Slab::new(
            window,
            slabs.len(),
            end - start,
            Span::Tokens(start..end),
        ));

        if end == len {
            break;
        }
        start += size - overlap;
    }

    Ok(slabs)
}

impl std::fmt::Debug for TokenWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenWindow")
            .field("size", &self.size)
            .field("overlap", &self.overlap)
            .finish()
    }
}

/// Split `text` into decoded token windows.
///
/// Validation happens before the text is encoded, so an invalid call never
/// reaches the tokenizer.
///
/// ```rust
/// use condense::{chunk_by_tokens, BpeTokenizer, Encoding};
///
/// let tokenizer = BpeTokenizer::new(Encoding::Cl100kBase).unwrap();
/// let chunks = chunk_by_tokens(&tokenizer, "Hello world! This is a test.", 7, 6).unwrap();
/// assert_eq!(chunks, vec!["Hello world! This is a test", " world! This is a test."]);
/// ```
pub fn chunk_by_tokens(
    tokenizer: &dyn Tokenizer,
    text: &str,
    chunk_size: i64,
    chunk_overlap: i64,
) -> Result<Vec<String>> {
    let (size, overlap) = validate(chunk_size, chunk_overlap)?;
    let slabs = slide(tokenizer, text, size, overlap)?;
    Ok(slabs.into_iter().map(|slab| slab.text).collect())
}
