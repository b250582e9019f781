//! Run configuration.

#[cfg(feature = "interchange")]
use serde::{Deserialize, Serialize};

use crate::hir::{Diagnostic, DiagnosticKind, ReprPolicy, Severity};

/// Namespace wrapping every binding declaration file.
pub const DEFAULT_ROOT_NAMESPACE: &str = "cppmm_bind";

/// Which diagnostics fail a run. The binding model is built either way.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub enum EscalationPolicy {
    /// Only an empty binding set fails the run.
    #[default]
    Lenient,
    /// Any error or warning fails the run.
    Strict,
    /// Diagnostics of these kinds fail the run.
    Kinds(Vec<DiagnosticKind>),
}

impl EscalationPolicy {
    pub fn escalates(&self, diagnostic: &Diagnostic) -> bool {
        match self {
            EscalationPolicy::Lenient => false,
            EscalationPolicy::Strict => matches!(diagnostic.severity, Severity::Error | Severity::Warning),
            EscalationPolicy::Kinds(kinds) => kinds.contains(&diagnostic.kind),
        }
    }

    /// How many of `diagnostics` this policy turns into a failure.
    pub fn count(&self, diagnostics: &[Diagnostic]) -> usize {
        diagnostics.iter().filter(|d| self.escalates(d)).count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "interchange", serde(default))]
pub struct BindConfig {
    /// Stripped from the front of every declaration path in binding files.
    pub root_namespace: String,
    /// Policy of classes written without a marker.
    pub default_policy: ReprPolicy,
    /// Extensions of binding files picked up from directories.
    pub bind_extensions: Vec<String>,
    /// Extensions of library headers picked up from directories.
    pub header_extensions: Vec<String>,
    /// Parse binding files on the rayon pool.
    pub parallel: bool,
    pub escalation: EscalationPolicy,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            root_namespace: DEFAULT_ROOT_NAMESPACE.to_string(),
            default_policy: ReprPolicy::OpaquePointer,
            bind_extensions: ["cpp", "hpp", "h"].map(String::from).to_vec(),
            header_extensions: ["h", "hpp", "hh", "hxx"].map(String::from).to_vec(),
            parallel: true,
            escalation: EscalationPolicy::Lenient,
        }
    }
}

impl BindConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root_namespace(mut self, root: impl Into<String>) -> Self {
        self.root_namespace = root.into();
        self
    }

    pub fn with_default_policy(mut self, policy: ReprPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_bind_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bind_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_header_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_escalation(mut self, escalation: EscalationPolicy) -> Self {
        self.escalation = escalation;
        self
    }

    /// Read a configuration; missing fields keep their defaults.
    #[cfg(feature = "interchange")]
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{FileId, QualifiedName, SourceLocation};
    use crate::hir::DiagnosticCollector;

    fn sample() -> Vec<Diagnostic> {
        let mut collector = DiagnosticCollector::new();
        let at = SourceLocation::new(FileId::new(0), 0, 0);
        collector.unresolved_symbol(at, "class", &QualifiedName::parse("Missing"));
        collector.duplicate_binding(at, &QualifiedName::parse("Foo"), "conflicting policy", at);
        collector.into_vec()
    }

    #[test]
    fn test_defaults() {
        let config = BindConfig::default();
        assert_eq!(config.root_namespace, "cppmm_bind");
        assert_eq!(config.default_policy, ReprPolicy::OpaquePointer);
        assert!(config.parallel);
        assert_eq!(config.escalation, EscalationPolicy::Lenient);
    }

    #[test]
    fn test_escalation_counts() {
        let diagnostics = sample();
        assert_eq!(EscalationPolicy::Lenient.count(&diagnostics), 0);
        assert_eq!(EscalationPolicy::Strict.count(&diagnostics), 2);
        assert_eq!(
            EscalationPolicy::Kinds(vec![DiagnosticKind::DuplicateBinding]).count(&diagnostics),
            1
        );
    }

    #[cfg(feature = "interchange")]
    #[test]
    fn test_from_json_keeps_defaults() {
        let config = BindConfig::from_json_str(
            r#"{ "default_policy": "OpaqueBytes", "escalation": { "Kinds": ["UnresolvedSymbol"] } }"#,
        )
        .unwrap();
        assert_eq!(config.default_policy, ReprPolicy::OpaqueBytes);
        assert_eq!(config.escalation, EscalationPolicy::Kinds(vec![DiagnosticKind::UnresolvedSymbol]));
        assert_eq!(config.root_namespace, "cppmm_bind");
    }
}
