//! Foundation types shared by every layer of the binding compiler.
//!
//! - [`QualifiedName`] - `a::b::C` style symbol paths
//! - [`FileId`], [`SourceLocation`] - where a declaration came from
//! - [`TextRange`], [`TextSize`], [`LineIndex`] - byte offsets and their
//!   line/column conversion
//!
//! This module has NO dependencies on other cppmm modules.

mod location;
mod qualified;
mod span;

pub use location::{FileId, SourceLocation};
pub use qualified::QualifiedName;
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
