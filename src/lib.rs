//! # cppmm-base
//!
//! Core library of the cppmm binding compiler: reads binding declaration
//! files, resolves them against the wrapped C++ library, and produces the
//! binding model consumed by code emitters.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! session      → BindSession: Load → Parse → Resolve → Build → Report
//!   ↓
//! project      → File discovery and loading (walkdir, FileSet)
//!   ↓
//! hir          → Symbol table, binding requests, resolver, binding model,
//!                diagnostics
//!   ↓
//! syntax       → Lexer + parser for the C++ declaration subset
//!   ↓
//! base         → Primitives (QualifiedName, FileId, SourceLocation, LineIndex)
//! ```
//!
//! `interchange` (feature `interchange`) reads CastXML and JSON symbol
//! dumps and writes the binding model and diagnostics as JSON.
//!
//! ## Usage
//!
//! ```ignore
//! use cppmm::{BindConfig, BindSession};
//!
//! let config = BindConfig::default();
//! let mut session = BindSession::new(config.clone());
//! session.add_header_dir("thirdparty/include")?;
//! session.add_binding_dir("bind")?;
//!
//! let output = session.run()?;
//! eprint!("{}", output.report().render(&output.sources));
//! let model = output.finish(&config)?;
//! ```

// ============================================================================
// FOUNDATION
// ============================================================================

/// Foundation types: QualifiedName, FileId, SourceLocation, LineIndex
pub mod base;

/// Lexer and parser for binding files and library headers
pub mod syntax;

/// Symbols, requests, resolution and the binding model
pub mod hir;

// ============================================================================
// PIPELINE
// ============================================================================

pub mod config;
pub mod project;
pub mod session;

#[cfg(feature = "interchange")]
pub mod interchange;

// Re-export the types most callers need
pub use base::{FileId, LineIndex, QualifiedName, SourceLocation, TextRange, TextSize};
pub use config::{BindConfig, EscalationPolicy};
pub use hir::{
    BindingModel, Diagnostic, DiagnosticKind, DiagnosticReport, RealSymbol, ReprPolicy, Severity, SymbolTable,
};
pub use project::ProjectError;
pub use session::{BindOutput, BindSession, RunError};
