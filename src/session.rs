//! One binding run: Load → Parse → Resolve → Build → Report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::base::{FileId, LineIndex};
use crate::config::BindConfig;
use crate::hir::{
    collect_aliases, lower_bindings, BindingModel, BuildError, Diagnostic, DiagnosticReport, FileSet,
    LibraryBuilder, ParsedFile, RealSymbol, Resolver, SourceKind, SourceRoot, SymbolTable,
};
use crate::project::{ProjectError, WorkspaceLoader};

/// Why a finished run failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("{count} diagnostic(s) escalated to errors")]
    Escalated { count: usize },
}

/// Inputs of a run. Files may be added from memory or from disk in any
/// order; each stage sorts them by path.
#[derive(Debug, Default)]
pub struct BindSession {
    config: BindConfig,
    files: FileSet,
    symbols: Vec<RealSymbol>,
}

impl BindSession {
    pub fn new(config: BindConfig) -> Self {
        Self {
            config,
            files: FileSet::new(),
            symbols: Vec::new(),
        }
    }

    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn add_header_text(&mut self, path: impl AsRef<Path>, text: impl Into<Arc<str>>) -> FileId {
        self.files.add(path.as_ref(), SourceKind::Header, text)
    }

    pub fn add_binding_text(&mut self, path: impl AsRef<Path>, text: impl Into<Arc<str>>) -> FileId {
        self.files.add(path.as_ref(), SourceKind::Binding, text)
    }

    pub fn add_header_dir(&mut self, dir: impl AsRef<Path>) -> Result<Vec<FileId>, ProjectError> {
        WorkspaceLoader::new(&self.files).load_directory(dir, SourceKind::Header, &self.config.header_extensions)
    }

    pub fn add_binding_dir(&mut self, dir: impl AsRef<Path>) -> Result<Vec<FileId>, ProjectError> {
        WorkspaceLoader::new(&self.files).load_directory(dir, SourceKind::Binding, &self.config.bind_extensions)
    }

    pub fn add_binding_file(&mut self, path: impl AsRef<Path>) -> Result<FileId, ProjectError> {
        WorkspaceLoader::new(&self.files).load_file(path, SourceKind::Binding)
    }

    /// Symbols from an external front end, loaded after the headers.
    pub fn add_symbols(&mut self, symbols: impl IntoIterator<Item = RealSymbol>) {
        self.symbols.extend(symbols);
    }

    /// Symbols from a JSON dump; returns how many were added.
    #[cfg(feature = "interchange")]
    pub fn add_symbols_json(&mut self, path: &str, text: &str) -> Result<usize, ProjectError> {
        let symbols = crate::interchange::symbols_from_json(text).map_err(|source| ProjectError::Json {
            path: path.to_string(),
            source,
        })?;
        let count = symbols.len();
        self.add_symbols(symbols);
        Ok(count)
    }

    /// Symbols from CastXML output; returns how many were added.
    #[cfg(feature = "interchange")]
    pub fn add_castxml(&mut self, path: &str, text: &str) -> Result<usize, ProjectError> {
        let symbols = crate::interchange::load_castxml(text).map_err(|err| ProjectError::CastXml {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        let count = symbols.len();
        self.add_symbols(symbols);
        Ok(count)
    }

    /// Files of `kind` with their paths, sorted by path.
    fn sorted(&self, kind: SourceKind) -> Vec<(FileId, PathBuf, Arc<str>)> {
        let mut files: Vec<(FileId, PathBuf, Arc<str>)> = self
            .files
            .sources(kind)
            .into_iter()
            .map(|(id, text)| (id, self.files.path(id).unwrap_or_default(), text))
            .collect();
        files.sort_by(|a, b| a.1.cmp(&b.1));
        files
    }

    /// Lower every header and add the external symbols.
    pub fn load_symbols(&self) -> Result<SymbolTable, ProjectError> {
        let mut builder = LibraryBuilder::new();
        for (id, path, text) in self.sorted(SourceKind::Header) {
            if let Err(err) = builder.add_text(id, &text) {
                let at = LineIndex::new(&text).location(id, err.range);
                return Err(ProjectError::HeaderSyntax {
                    path: path.display().to_string(),
                    line: at.display_line(),
                    col: at.display_col(),
                    message: err.message,
                });
            }
        }
        let headers = builder.file_count();
        let mut symbols = builder.finish();
        symbols.extend(self.symbols.iter().cloned());
        let table = SymbolTable::load(symbols)?;
        info!(headers, symbols = table.len(), "library loaded");
        Ok(table)
    }

    /// Parse every binding file. Files are parsed in parallel when the
    /// configuration allows it; results keep path order either way.
    pub fn parse_bindings(&self) -> (Vec<ParsedFile>, Vec<Diagnostic>) {
        let sources = self.sorted(SourceKind::Binding);
        let root = self.config.root_namespace.as_str();
        let lower = |(id, _, text): &(FileId, PathBuf, Arc<str>)| lower_bindings(*id, text, root);
        let results: Vec<Result<ParsedFile, Diagnostic>> = if self.config.parallel {
            sources.par_iter().map(lower).collect()
        } else {
            sources.iter().map(lower).collect()
        };

        let mut parsed = Vec::with_capacity(results.len());
        let mut diagnostics = Vec::new();
        for result in results {
            match result {
                Ok(file) => parsed.push(file),
                Err(diagnostic) => {
                    debug!(location = %diagnostic.location, "binding file skipped");
                    diagnostics.push(diagnostic);
                }
            }
        }
        info!(files = parsed.len(), failed = diagnostics.len(), "binding files parsed");
        (parsed, diagnostics)
    }

    /// Run the whole pipeline. Only unreadable or malformed library input
    /// is an error here; everything else ends up in the output.
    pub fn run(&self) -> Result<BindOutput, ProjectError> {
        let table = self.load_symbols()?;
        let (parsed, mut diagnostics) = self.parse_bindings();

        let aliases = collect_aliases(&parsed);
        let resolution = Resolver::new(&table, &aliases)
            .with_default_policy(self.config.default_policy)
            .resolve(&parsed);
        diagnostics.extend(resolution.diagnostics);

        let model = BindingModel::build(&table, &resolution.bindings);
        Ok(BindOutput {
            model,
            diagnostics,
            sources: self.files.source_root(),
        })
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct BindOutput {
    pub model: Result<BindingModel, BuildError>,
    /// Syntax errors in path order, then resolution diagnostics in
    /// request order.
    pub diagnostics: Vec<Diagnostic>,
    pub sources: SourceRoot,
}

impl BindOutput {
    pub fn report(&self) -> DiagnosticReport {
        DiagnosticReport::new(&self.diagnostics)
    }

    /// Apply the configured escalation policy.
    pub fn finish(self, config: &BindConfig) -> Result<BindingModel, RunError> {
        let model = self.model?;
        let count = config.escalation.count(&self.diagnostics);
        if count > 0 {
            return Err(RunError::Escalated { count });
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscalationPolicy;
    use crate::hir::DiagnosticKind;

    const HEADER: &str = r#"
        namespace geo {
        class Point {
        public:
            Point();
            double X() const;
            void SetX(double x);
        private:
            double x_;
        };
        }
    "#;

    fn session(config: BindConfig) -> BindSession {
        let mut session = BindSession::new(config);
        session.add_header_text("include/geo/point.h", HEADER);
        session
    }

    #[test]
    fn test_run_builds_model() {
        let mut session = session(BindConfig::default());
        session.add_binding_text(
            "bind/point.cpp",
            "namespace cppmm_bind { namespace geo { class Point { double X() const; }; } }",
        );
        let output = session.run().unwrap();
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        let model = output.finish(session.config()).unwrap();
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_syntax_error_skips_only_that_file() {
        let mut session = session(BindConfig::default().with_parallel(false));
        session.add_binding_text("bind/a.cpp", "namespace geo { class Point { double X() const; }; }");
        session.add_binding_text("bind/b.cpp", "namespace geo { class Point { ");
        let output = session.run().unwrap();
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].kind, DiagnosticKind::SyntaxError);
        assert!(output.model.is_ok());
    }

    #[test]
    fn test_empty_binding_set_fails_run() {
        let mut session = session(BindConfig::default());
        session.add_binding_text("bind/a.cpp", "namespace geo { class Missing {}; }");
        let output = session.run().unwrap();
        assert_eq!(
            output.finish(session.config()),
            Err(RunError::Build(BuildError::EmptyBindingSet))
        );
    }

    #[test]
    fn test_escalation_fails_run() {
        let config = BindConfig::default().with_escalation(EscalationPolicy::Kinds(vec![DiagnosticKind::UnresolvedSymbol]));
        let mut session = session(config);
        session.add_binding_text(
            "bind/a.cpp",
            "namespace geo { class Point { double X() const; }; class Missing {}; }",
        );
        let output = session.run().unwrap();
        assert_eq!(output.finish(session.config()), Err(RunError::Escalated { count: 1 }));
    }

    #[test]
    fn test_header_syntax_error_is_fatal() {
        let mut session = BindSession::new(BindConfig::default());
        session.add_header_text("include/broken.h", "namespace geo { class Point {");
        let err = session.run().unwrap_err();
        assert!(matches!(err, ProjectError::HeaderSyntax { ref path, .. } if path == "include/broken.h"));
    }
}
