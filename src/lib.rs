//! Rewrites PDF page content streams in canonical content-stream syntax.
//!
//! Each page stream is tokenized, rendered back with uniform whitespace,
//! minimal numbers, fully escaped strings and well-formed inline-image blocks,
//! and written over the original stream. Pages whose stream cannot be read
//! are left exactly as they were.

pub mod canonical;
pub mod error;
pub mod lexer;
pub mod repair;
pub mod token;
pub mod tokenizer;

pub use canonical::canonicalize;
pub use error::{Error, Result};
pub use repair::{RepairOptions, RepairReport, SkipReason, repair_document, repair_file};
pub use token::{InlineImage, Operand, OperandMap, Operator, Token};
pub use tokenizer::{ContentTokenizer, TokenizeError, Tokenizer, canonicalize_content};
