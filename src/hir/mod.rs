//! Semantic layer: from parsed declarations to the binding model.
//!
//! ```text
//! headers ──LibraryBuilder──▶ [RealSymbol] ──load──▶ SymbolTable ─┐
//!                                                                 ├─▶ Resolver ──▶ BindingModel
//! binding files ──lower_bindings──▶ [ParsedFile] ──▶ AliasTable ──┘        │
//!                                                                          ▼
//!                                                              [Diagnostic] ──▶ DiagnosticReport
//! ```
//!
//! Every stage is a pure function of its inputs; the only shared state is
//! the read-only [`SymbolTable`].

mod alias;
mod diagnostics;
mod ids;
mod input;
mod library;
mod lower;
mod model;
mod print;
mod report;
mod request;
mod resolve;
mod source;
mod symbols;
mod table;
mod types;

pub use alias::{AliasTable, NamespaceAlias};
pub use diagnostics::{codes, Diagnostic, DiagnosticCollector, DiagnosticKind, RelatedInfo, Severity};
pub use ids::{EntryId, SymbolId};
pub use input::{SourceKind, SourceRoot};
pub use library::LibraryBuilder;
pub use lower::{lower_bindings, IGNORE_UNBOUND, RENAME};
pub use model::{BindingEntry, BindingModel, BuildError, EntryKind, MemberEntry, TypeLink};
pub use print::print_bindings;
pub use report::{render_diagnostic, DiagnosticReport};
pub use request::{BindDecl, BindingRequest, MemberKind, MemberSelection, ParsedFile, ReprPolicy, RequestKind};
pub use resolve::{collect_aliases, Resolution, ResolveResult, ResolvedBinding, ResolvedKind, ResolvedMember, Resolver};
pub use source::FileSet;
pub use symbols::{Access, EnumVariant, Layout, Param, RealSymbol, Signature, SymbolKind};
pub use table::{LoadError, SymbolTable};
pub use types::{is_primitive_name, normalize_fundamental, Passing, Reference, TypeRef};
