//! Content-stream tokenizer boundary.
//!
//! The repair driver only needs a flat token sequence per page.
//! [`ContentTokenizer`] produces one with the crate's own lexer; tests
//! substitute their own [`Tokenizer`] implementations.

use thiserror::Error;

use crate::canonical;
use crate::lexer;
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("malformed content at byte {offset}: {reason}")]
    Syntax { offset: usize, reason: &'static str },
    #[error("{0} is not a content-stream operand")]
    UnsupportedOperand(&'static str),
    #[error("inline image starting at byte {0} has no `EI` after its data")]
    UnterminatedInlineImage(usize),
    #[error("inline image marker at byte {0} outside a `BI` block")]
    DetachedInlineImage(usize),
}

pub trait Tokenizer: Sync {
    /// Tokenize a whole decoded stream. Input that is not consumed completely
    /// is an error, never a shorter token sequence.
    fn tokenize(&self, raw: &[u8]) -> Result<Vec<Token>, TokenizeError>;
}

/// The production tokenizer, see [`crate::lexer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTokenizer;

impl Tokenizer for ContentTokenizer {
    fn tokenize(&self, raw: &[u8]) -> Result<Vec<Token>, TokenizeError> {
        lexer::tokenize(raw)
    }
}

/// Tokenize `raw` and render it canonically.
pub fn canonicalize_content<T: Tokenizer + ?Sized>(tokenizer: &T, raw: &[u8]) -> Result<Vec<u8>, TokenizeError> {
    let tokens = tokenizer.tokenize(raw)?;
    Ok(canonical::canonicalize(&tokens))
}
