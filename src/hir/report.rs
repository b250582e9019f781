//! Grouping and rendering of diagnostics.
//!
//! The reporter only formats: whether a run failed is decided by the
//! caller's escalation policy.

use std::fmt::Write;

use indexmap::IndexMap;

use crate::base::SourceLocation;

use super::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use super::input::SourceRoot;

/// Diagnostics of one run, grouped by kind in canonical kind order.
/// Within a group diagnostics keep their original order.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticReport {
    groups: IndexMap<DiagnosticKind, Vec<Diagnostic>>,
}

impl DiagnosticReport {
    pub fn new(diagnostics: &[Diagnostic]) -> Self {
        let mut groups: IndexMap<DiagnosticKind, Vec<Diagnostic>> = DiagnosticKind::ALL
            .into_iter()
            .map(|kind| (kind, Vec::new()))
            .collect();
        for diagnostic in diagnostics {
            groups.entry(diagnostic.kind).or_default().push(diagnostic.clone());
        }
        groups.retain(|_, group| !group.is_empty());
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Non-empty groups in canonical order.
    pub fn groups(&self) -> impl Iterator<Item = (DiagnosticKind, &[Diagnostic])> {
        self.groups.iter().map(|(kind, group)| (*kind, group.as_slice()))
    }

    pub fn group(&self, kind: DiagnosticKind) -> &[Diagnostic] {
        self.groups.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.group(kind).len()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.groups
            .values()
            .flatten()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// `3 errors, 1 warning`
    pub fn summary(&self) -> String {
        let plural = |n: usize, word: &str| {
            if n == 1 {
                format!("{} {}", n, word)
            } else {
                format!("{} {}s", n, word)
            }
        };
        let errors = self.count_severity(Severity::Error);
        let warnings = self.count_severity(Severity::Warning);
        format!("{}, {}", plural(errors, "error"), plural(warnings, "warning"))
    }

    /// Every diagnostic as `path:line:col: severity[code]: message`, one
    /// group after the other, followed by the summary.
    pub fn render(&self, sources: &SourceRoot) -> String {
        let mut out = String::new();
        for (kind, group) in self.groups() {
            let _ = writeln!(out, "{} ({}):", kind.name(), group.len());
            for diagnostic in group {
                let _ = writeln!(out, "  {}", render_diagnostic(diagnostic, sources));
                for related in &diagnostic.related {
                    let place = related
                        .location
                        .map(|loc| format!("{}: ", render_location(loc, sources)))
                        .unwrap_or_default();
                    let _ = writeln!(out, "    {}note: {}", place, related.message);
                }
            }
        }
        out.push_str(&self.summary());
        out.push('\n');
        out
    }
}

fn render_location(location: SourceLocation, sources: &SourceRoot) -> String {
    match sources.path(location.file) {
        Some(path) => format!("{}:{}:{}", path, location.display_line(), location.display_col()),
        None => location.to_string(),
    }
}

/// One diagnostic with its file path resolved through `sources`.
pub fn render_diagnostic(diagnostic: &Diagnostic, sources: &SourceRoot) -> String {
    format!(
        "{}: {}[{}]: {}",
        render_location(diagnostic.location, sources),
        diagnostic.severity.as_str(),
        diagnostic.code,
        diagnostic.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{FileId, QualifiedName};
    use crate::hir::diagnostics::DiagnosticCollector;

    fn diagnostics() -> Vec<Diagnostic> {
        let mut collector = DiagnosticCollector::new();
        let at = |line| SourceLocation::new(FileId::new(0), line, 4);
        collector.signature_mismatch(at(7), &QualifiedName::parse("Foo::SetX"), "no overload");
        collector.unresolved_symbol(at(2), "class", &QualifiedName::parse("Missing"));
        collector.duplicate_binding(at(9), &QualifiedName::parse("Foo"), "conflicting policy", at(1));
        collector.unresolved_symbol(at(5), "function", &QualifiedName::parse("gone"));
        collector.into_vec()
    }

    #[test]
    fn test_groups_follow_kind_order() {
        let report = DiagnosticReport::new(&diagnostics());
        let kinds: Vec<DiagnosticKind> = report.groups().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::UnresolvedSymbol,
                DiagnosticKind::SignatureMismatch,
                DiagnosticKind::DuplicateBinding,
            ]
        );
        let unresolved: Vec<u32> = report
            .group(DiagnosticKind::UnresolvedSymbol)
            .iter()
            .map(|d| d.location.line)
            .collect();
        assert_eq!(unresolved, vec![2, 5]);
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn test_render_uses_paths() {
        let mut sources = SourceRoot::new();
        sources.insert(FileId::new(0), "bind/usd.cpp");
        let report = DiagnosticReport::new(&diagnostics());
        let text = report.render(&sources);
        assert!(text.contains("  bind/usd.cpp:3:5: error[E0102]: "), "{}", text);
        assert!(text.contains("note: first bound here"));
        assert!(text.ends_with("3 errors, 1 warning\n"), "{}", text);
    }

    #[test]
    fn test_empty_report() {
        let report = DiagnosticReport::new(&[]);
        assert!(report.is_empty());
        assert_eq!(report.summary(), "0 errors, 0 warnings");
    }
}
