//! Diagnostics: recoverable problems found while parsing and resolving.
//!
//! Nothing here aborts a run. Problems are collected in the order they are
//! found; whether any of them fails the run is decided by the caller (see
//! [`crate::config::EscalationPolicy`]).

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "interchange")]
use serde::Serialize;

use crate::base::{QualifiedName, SourceLocation};

use super::symbols::RealSymbol;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// What went wrong. Variants are in canonical reporting order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "interchange", derive(Serialize, serde::Deserialize))]
pub enum DiagnosticKind {
    /// Malformed binding file; the whole file is skipped.
    SyntaxError,
    /// No real symbol with the requested name.
    UnresolvedSymbol,
    /// Several overloads fit and nothing disambiguates them.
    AmbiguousOverload,
    /// A member selection that cannot be bound.
    SignatureMismatch,
    /// A second request for an already bound symbol with another policy.
    DuplicateBinding,
    /// A value type whose fields are not all selected.
    IncompleteValueType,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 6] = [
        DiagnosticKind::SyntaxError,
        DiagnosticKind::UnresolvedSymbol,
        DiagnosticKind::AmbiguousOverload,
        DiagnosticKind::SignatureMismatch,
        DiagnosticKind::DuplicateBinding,
        DiagnosticKind::IncompleteValueType,
    ];

    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => codes::SYNTAX_ERROR,
            DiagnosticKind::UnresolvedSymbol => codes::UNRESOLVED_SYMBOL,
            DiagnosticKind::AmbiguousOverload => codes::AMBIGUOUS_OVERLOAD,
            DiagnosticKind::SignatureMismatch => codes::SIGNATURE_MISMATCH,
            DiagnosticKind::DuplicateBinding => codes::DUPLICATE_BINDING,
            DiagnosticKind::IncompleteValueType => codes::INCOMPLETE_VALUE_TYPE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => "SyntaxError",
            DiagnosticKind::UnresolvedSymbol => "UnresolvedSymbol",
            DiagnosticKind::AmbiguousOverload => "AmbiguousOverload",
            DiagnosticKind::SignatureMismatch => "SignatureMismatch",
            DiagnosticKind::DuplicateBinding => "DuplicateBinding",
            DiagnosticKind::IncompleteValueType => "IncompleteValueType",
        }
    }

    /// Duplicate bindings lose nothing the first request did not already
    /// bind, so they only warn.
    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::DuplicateBinding => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize))]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

/// A located diagnostic message.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize))]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Stable code, e.g. `E0102`.
    pub code: &'static str,
    pub message: Arc<str>,
    /// The offending name, when there is one.
    pub symbol: Option<QualifiedName>,
    pub location: SourceLocation,
    pub related: Vec<RelatedInfo>,
}

/// Secondary location attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize))]
pub struct RelatedInfo {
    pub location: Option<SourceLocation>,
    pub message: Arc<str>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: SourceLocation, message: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            code: kind.code(),
            message: message.into(),
            symbol: None,
            location,
            related: Vec::new(),
        }
    }

    pub fn with_symbol(mut self, symbol: QualifiedName) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_related(mut self, location: Option<SourceLocation>, message: impl Into<Arc<str>>) -> Self {
        self.related.push(RelatedInfo {
            location,
            message: message.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}[{}]: {}",
            self.location,
            self.severity.as_str(),
            self.code,
            self.message
        )
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable diagnostic codes.
pub mod codes {
    pub const SYNTAX_ERROR: &str = "E0101";
    pub const UNRESOLVED_SYMBOL: &str = "E0102";
    pub const AMBIGUOUS_OVERLOAD: &str = "E0103";
    pub const SIGNATURE_MISMATCH: &str = "E0104";
    pub const DUPLICATE_BINDING: &str = "W0105";
    pub const INCOMPLETE_VALUE_TYPE: &str = "E0106";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics in the order they are found.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn syntax_error(&mut self, location: SourceLocation, message: &str) {
        self.add(Diagnostic::new(
            DiagnosticKind::SyntaxError,
            location,
            format!("syntax error: {}", message),
        ));
    }

    pub fn unresolved_symbol(&mut self, location: SourceLocation, what: &str, name: &QualifiedName) {
        self.add(
            Diagnostic::new(
                DiagnosticKind::UnresolvedSymbol,
                location,
                format!("unresolved {}: no declaration of '{}' in the library", what, name),
            )
            .with_symbol(name.clone()),
        );
    }

    pub fn ambiguous_overload(
        &mut self,
        location: SourceLocation,
        name: &QualifiedName,
        candidates: &[&RealSymbol],
    ) {
        let mut diag = Diagnostic::new(
            DiagnosticKind::AmbiguousOverload,
            location,
            format!(
                "ambiguous overload: '{}' matches {} declarations; write the full signature to pick one",
                name,
                candidates.len()
            ),
        )
        .with_symbol(name.clone());
        for candidate in candidates {
            diag = diag.with_related(candidate.location, format!("candidate: {}", candidate.describe()));
        }
        self.add(diag);
    }

    pub fn signature_mismatch(&mut self, location: SourceLocation, name: &QualifiedName, reason: impl fmt::Display) {
        self.add(
            Diagnostic::new(
                DiagnosticKind::SignatureMismatch,
                location,
                format!("cannot bind '{}': {}", name, reason),
            )
            .with_symbol(name.clone()),
        );
    }

    pub fn duplicate_binding(
        &mut self,
        location: SourceLocation,
        name: &QualifiedName,
        message: impl fmt::Display,
        first: SourceLocation,
    ) {
        self.add(
            Diagnostic::new(
                DiagnosticKind::DuplicateBinding,
                location,
                format!("duplicate binding of '{}': {}", name, message),
            )
            .with_symbol(name.clone())
            .with_related(Some(first), "first bound here"),
        );
    }

    pub fn incomplete_value_type(&mut self, location: SourceLocation, name: &QualifiedName, missing: &[String]) {
        self.add(
            Diagnostic::new(
                DiagnosticKind::IncompleteValueType,
                location,
                format!(
                    "value type '{}' does not bind every field; missing: {}",
                    name,
                    missing.join(", ")
                ),
            )
            .with_symbol(name.clone()),
        );
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FileId;

    fn at(line: u32) -> SourceLocation {
        SourceLocation::new(FileId::new(0), line, 0)
    }

    #[test]
    fn test_kind_codes_are_distinct() {
        let mut codes: Vec<&str> = DiagnosticKind::ALL.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), DiagnosticKind::ALL.len());
    }

    #[test]
    fn test_display_format() {
        let diag = Diagnostic::new(DiagnosticKind::UnresolvedSymbol, at(2), "unresolved class");
        assert_eq!(diag.to_string(), "file#0:3:1: error[E0102]: unresolved class");
    }

    #[test]
    fn test_collector_counts() {
        let mut collector = DiagnosticCollector::new();
        collector.syntax_error(at(0), "expected ';'");
        collector.unresolved_symbol(at(1), "class", &QualifiedName::parse("Foo"));
        collector.duplicate_binding(
            at(5),
            &QualifiedName::parse("Foo"),
            "policy OpaqueBytes conflicts with OpaquePointer",
            at(1),
        );

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.error_count(), 2);
        assert_eq!(collector.warning_count(), 1);
        assert!(collector.has_errors());
        assert_eq!(collector.diagnostics()[2].related[0].location, Some(at(1)));
    }

    #[test]
    fn test_ambiguous_overload_lists_candidates() {
        use crate::hir::symbols::{Param, Signature};
        use crate::hir::types::TypeRef;

        let a = RealSymbol::method("Foo::Set", Signature::new(vec![Param::new(TypeRef::named("int"))], None));
        let b = RealSymbol::method("Foo::Set", Signature::new(vec![Param::new(TypeRef::named("float"))], None));
        let mut collector = DiagnosticCollector::new();
        collector.ambiguous_overload(at(3), &QualifiedName::parse("Foo::Set"), &[&a, &b]);

        let diag = &collector.diagnostics()[0];
        assert_eq!(diag.kind, DiagnosticKind::AmbiguousOverload);
        assert_eq!(diag.related.len(), 2);
        assert_eq!(&*diag.related[1].message, "candidate: method Foo::Set(float)");
    }
}
