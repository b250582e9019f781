//! Front end for the C++ declaration subset used by binding files and
//! library headers.
//!
//! ```text
//! text ──tokenize──▶ [Token] ──parse──▶ SourceFile
//! ```
//!
//! Parsing is all-or-nothing: the first malformed construct aborts the file
//! with a [`ParseError`].

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::SourceFile;
pub use parser::parse;

use thiserror::Error;

use crate::base::TextRange;

/// Prefix of the annotation macros understood by the binding compiler.
pub const ATTRIBUTE_PREFIX: &str = "CPPMM_";

/// A malformed construct, located by byte range.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

impl ParseError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}
