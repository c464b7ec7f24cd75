//! Tokenizer - Text Tokenization for Scoring
//!
//! Tokenizers used to split references and predictions before n-gram
//! matching. The default is the `13a` scheme of the WMT `mteval` script.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MetricResult;

// =============================================================================
// Tokenizer Trait
// =============================================================================

/// Trait for text tokenization.
pub trait Tokenizer: Send + Sync {
    /// Tokenizes a string into tokens.
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Serializable choice of a built-in tokenizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// [`Bleu13aTokenizer`]
    #[default]
    Bleu13a,
    /// [`ByteTokenizer`]
    Byte,
    /// [`WhitespaceTokenizer`]
    Whitespace,
    /// [`CharTokenizer`]
    Char,
}

impl TokenizerKind {
    /// Builds the tokenizer.
    pub fn build(self) -> MetricResult<Box<dyn Tokenizer>> {
        Ok(match self {
            TokenizerKind::Bleu13a => Box::new(Bleu13aTokenizer::new()?),
            TokenizerKind::Byte => Box::new(ByteTokenizer),
            TokenizerKind::Whitespace => Box::new(WhitespaceTokenizer),
            TokenizerKind::Char => Box::new(CharTokenizer),
        })
    }
}

// =============================================================================
// Bleu13aTokenizer
// =============================================================================

const ENTITY_REPLACEMENTS: [(&str, &str); 7] = [
    ("<skipped>", ""),
    ("-\n", ""),
    ("\n", " "),
    ("&quot;", "\""),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
];

const PUNCTUATION_RULES: [(&str, &str); 5] = [
    // Punctuation and symbols.
    (r"([\{-~\[-` -&\(-\+:-@/])", " ${1} "),
    // Period and comma unless preceded by a digit.
    (r"([^0-9])([\.,])", "${1} ${2} "),
    // Period and comma unless followed by a digit.
    (r"([\.,])([^0-9])", " ${1} ${2}"),
    // Dash when preceded by a digit.
    (r"([0-9])(-)", "${1} ${2} "),
    // Trailing period or comma.
    (r"[\.,]$", " ${0} "),
];

/// Tokenizer of the `13a` scheme.
#[derive(Debug, Clone)]
pub struct Bleu13aTokenizer {
    rules: Vec<(Regex, &'static str)>,
}

impl Bleu13aTokenizer {
    /// Compiles the tokenization rules.
    pub fn new() -> MetricResult<Self> {
        let rules = PUNCTUATION_RULES
            .iter()
            .map(|&(pattern, replacement)| Ok((Regex::new(pattern)?, replacement)))
            .collect::<MetricResult<Vec<_>>>()?;
        Ok(Self { rules })
    }
}

impl Tokenizer for Bleu13aTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut text = text.to_string();
        for (from, to) in ENTITY_REPLACEMENTS {
            text = text.replace(from, to);
        }
        for (regex, replacement) in &self.rules {
            text = regex.replace_all(&text, *replacement).into_owned();
        }
        text.split_whitespace().map(str::to_string).collect()
    }
}

// =============================================================================
// ByteTokenizer
// =============================================================================

/// UTF-8 bytes as tokens, each rendered as its decimal value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteTokenizer;

impl Tokenizer for ByteTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.bytes().map(|b| b.to_string()).collect()
    }
}

// =============================================================================
// WhitespaceTokenizer
// =============================================================================

/// Splits on whitespace only.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

// =============================================================================
// CharTokenizer
// =============================================================================

/// One token per character, whitespace excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_string())
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        Bleu13aTokenizer::new().unwrap().tokenize(text)
    }

    #[test]
    fn test_13a_splits_punctuation() {
        assert_eq!(
            tokens("I love Silicon Valley, it's one of my favourite shows."),
            vec![
                "I", "love", "Silicon", "Valley", ",", "it's", "one", "of", "my",
                "favourite", "shows", "."
            ]
        );
        assert_eq!(tokens("Hello!"), vec!["Hello", "!"]);
    }

    #[test]
    fn test_13a_keeps_numbers_together() {
        assert_eq!(tokens("It costs 3.50, or 1,000."), vec!["It", "costs", "3.50", ",", "or", "1,000", "."]);
        assert_eq!(tokens("pages 10-12"), vec!["pages", "10", "-", "12"]);
    }

    #[test]
    fn test_13a_entities() {
        assert_eq!(tokens("a &amp; b"), vec!["a", "&", "b"]);
        assert_eq!(tokens("x<skipped>y"), vec!["xy"]);
        assert_eq!(tokens("line\nbreak"), vec!["line", "break"]);
    }

    #[test]
    fn test_byte_tokenizer() {
        assert_eq!(ByteTokenizer.tokenize("Hi!"), vec!["72", "105", "33"]);
        assert_eq!(ByteTokenizer.tokenize("é").len(), 2);
    }

    #[test]
    fn test_whitespace_and_char() {
        assert_eq!(WhitespaceTokenizer.tokenize(" a  b\tc "), vec!["a", "b", "c"]);
        assert_eq!(CharTokenizer.tokenize("a b"), vec!["a", "b"]);
    }

    #[test]
    fn test_kind_builds_and_serializes() {
        let json = serde_json::to_string(&TokenizerKind::Byte).unwrap();
        assert_eq!(json, "\"byte\"");
        let tokenizer = TokenizerKind::default().build().unwrap();
        assert_eq!(tokenizer.tokenize("a."), vec!["a", "."]);
    }
}
