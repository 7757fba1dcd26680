//! Tokenizer adapter.
//!
//! Budgets are counted in model tokens, not bytes or words. The chunkers only
//! need text-to-ids and ids-to-text from a tokenizer; counting falls out of
//! encoding. [`BpeTokenizer`] covers the OpenAI BPE vocabularies via
//! `tiktoken-rs`.
//!
//! ## Round Trips
//!
//! Decoding a window of ids is not the same as slicing the source string.
//! A BPE token can end in the middle of a multi-byte character, and leading
//! spaces belong to the following word:
//!
//! ```text
//! "Hello world!"  ->  ["Hello", " world", "!"]
//!                            ^ the space travels with "world"
//! ```
//!
//! The window chunker therefore decodes every window from ids.

use std::str::FromStr;

use serde::Deserialize;
use tiktoken_rs::CoreBPE;

use crate::{Error, Result};

/// Text ⇄ token ids.
///
/// Implementations must be deterministic and safe to call concurrently.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token ids.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token ids back into text.
    fn decode(&self, tokens: &[u32]) -> Result<String>;

    /// Decode ids that may start or end inside a multi-byte character.
    ///
    /// Incomplete sequences become U+FFFD instead of an error. `tokens` must
    /// be a slice of this tokenizer's own [`encode`](Tokenizer::encode)
    /// output. The default is strict [`decode`](Tokenizer::decode).
    fn decode_lossy(&self, tokens: &[u32]) -> Result<String> {
        self.decode(tokens)
    }

    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> Result<usize> {
        Ok(self.encode(text)?.len())
    }
}

/// BPE vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// GPT-2 / GPT-3 base models.
    R50kBase,
    /// Codex and `text-davinci-002/003`.
    P50kBase,
    /// GPT-3.5 and GPT-4.
    #[default]
    Cl100kBase,
    /// GPT-4o family.
    O200kBase,
}

impl Encoding {
    /// The vocabulary's canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::R50kBase => "r50k_base",
            Self::P50kBase => "p50k_base",
            Self::Cl100kBase => "cl100k_base",
            Self::O200kBase => "o200k_base",
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r50k_base" => Ok(Self::R50kBase),
            "p50k_base" => Ok(Self::P50kBase),
            "cl100k_base" => Ok(Self::Cl100kBase),
            "o200k_base" => Ok(Self::O200kBase),
            other => Err(Error::Config(format!("unknown encoding: {other}"))),
        }
    }
}

/// A `tiktoken` BPE tokenizer.
///
/// ```rust
/// use condense::{BpeTokenizer, Encoding, Tokenizer};
///
/// let tokenizer = BpeTokenizer::new(Encoding::Cl100kBase).unwrap();
/// let ids = tokenizer.encode("Hello world!").unwrap();
/// assert_eq!(ids.len(), 3);
/// assert_eq!(tokenizer.decode(&ids).unwrap(), "Hello world!");
/// ```
pub struct BpeTokenizer {
    bpe: CoreBPE,
    encoding: Encoding,
}

impl BpeTokenizer {
    /// Load the vocabulary for `encoding`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled vocabulary fails to load.
    pub fn new(encoding: Encoding) -> Result<Self> {
        let bpe = match encoding {
            Encoding::R50kBase => tiktoken_rs::r50k_base(),
            Encoding::P50kBase => tiktoken_rs::p50k_base(),
            Encoding::Cl100kBase => tiktoken_rs::cl100k_base(),
            Encoding::O200kBase => tiktoken_rs::o200k_base(),
        }
        .map_err(|e| Error::Tokenizer(e.to_string()))?;

        Ok(Self { bpe, encoding })
    }

    /// The vocabulary this tokenizer was built from.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Tokenizer for BpeTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        // Ordinary encoding: "<|endoftext|>" in user text is just text.
        Ok(self.bpe.encode_ordinary(text))
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| Error::Tokenizer(e.to_string()))
    }

    /// # Panics
    ///
    /// On an id outside the vocabulary, when the strict decode fails.
    fn decode_lossy(&self, tokens: &[u32]) -> Result<String> {
        if let Ok(text) = self.bpe.decode(tokens.to_vec()) {
            return Ok(text);
        }
        // A token boundary fell inside a character; keep the bytes we have.
        let bytes: Vec<u8> = self
            .bpe
            ._decode_native_and_split(tokens.to_vec())
            .flatten()
            .collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl std::fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeTokenizer")
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let tokenizer = BpeTokenizer::new(Encoding::Cl100kBase).unwrap();
        for text in ["", "Hello world! This is a test.", " \n ", "日本語のテキスト"] {
            let ids = tokenizer.encode(text).unwrap();
            assert_eq!(tokenizer.decode(&ids).unwrap(), text);
        }
    }

    #[test]
    fn test_lossy_decode_of_split_character() {
        let tokenizer = BpeTokenizer::new(Encoding::Cl100kBase).unwrap();
        // The first cl100k token of this text ends inside "日".
        let text = "日本語のテキスト";
        let ids = tokenizer.encode(text).unwrap();

        assert!(tokenizer.decode(&ids[..1]).is_err());
        let head = tokenizer.decode_lossy(&ids[..1]).unwrap();
        assert!(head.contains('\u{FFFD}'));
        assert_eq!(tokenizer.decode_lossy(&ids).unwrap(), text);
    }

    #[test]
    fn test_count_matches_encode() {
        let tokenizer = BpeTokenizer::new(Encoding::Cl100kBase).unwrap();
        assert_eq!(tokenizer.count("Hello world! This is a test.").unwrap(), 8);
        assert_eq!(tokenizer.count("").unwrap(), 0);
    }

    #[test]
    fn test_special_token_text_is_ordinary() {
        let tokenizer = BpeTokenizer::new(Encoding::Cl100kBase).unwrap();
        let ids = tokenizer.encode("<|endoftext|>").unwrap();
        assert!(ids.len() > 1);
        assert_eq!(tokenizer.decode(&ids).unwrap(), "<|endoftext|>");
    }

    #[test]
    fn test_encoding_names_parse() {
        for encoding in [
            Encoding::R50kBase,
            Encoding::P50kBase,
            Encoding::Cl100kBase,
            Encoding::O200kBase,
        ] {
            assert_eq!(encoding.name().parse::<Encoding>().unwrap(), encoding);
        }
        assert!("gpt2".parse::<Encoding>().is_err());
    }
}
