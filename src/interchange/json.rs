//! JSON rendering of symbol tables, the binding model and diagnostics.

use serde::Serialize;

use crate::base::QualifiedName;
use crate::hir::{BindingModel, Diagnostic, DiagnosticKind, RealSymbol, Severity, SourceRoot};

/// Read a dump of real symbols, as written by [`symbols_to_json`] or an
/// external front end.
pub fn symbols_from_json(text: &str) -> Result<Vec<RealSymbol>, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn symbols_to_json(symbols: &[RealSymbol]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(symbols)
}

pub fn model_to_json(model: &BindingModel) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(model)
}

#[derive(Serialize)]
struct DiagnosticRecord<'a> {
    kind: DiagnosticKind,
    severity: Severity,
    code: &'a str,
    message: &'a str,
    symbol: Option<&'a QualifiedName>,
    path: Option<&'a str>,
    /// 1-indexed
    line: u32,
    /// 1-indexed
    col: u32,
    related: Vec<RelatedRecord<'a>>,
}

#[derive(Serialize)]
struct RelatedRecord<'a> {
    message: &'a str,
    path: Option<&'a str>,
    line: Option<u32>,
}

/// Diagnostics as a JSON array, file ids resolved to paths.
pub fn diagnostics_to_json(diagnostics: &[Diagnostic], sources: &SourceRoot) -> Result<String, serde_json::Error> {
    let records: Vec<DiagnosticRecord<'_>> = diagnostics
        .iter()
        .map(|d| DiagnosticRecord {
            kind: d.kind,
            severity: d.severity,
            code: d.code,
            message: &d.message,
            symbol: d.symbol.as_ref(),
            path: sources.path(d.location.file),
            line: d.location.display_line(),
            col: d.location.display_col(),
            related: d
                .related
                .iter()
                .map(|r| RelatedRecord {
                    message: &r.message,
                    path: r.location.and_then(|loc| sources.path(loc.file)),
                    line: r.location.map(|loc| loc.display_line()),
                })
                .collect(),
        })
        .collect();
    serde_json::to_string_pretty(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{FileId, SourceLocation};
    use crate::hir::{DiagnosticCollector, Signature, SymbolTable, TypeRef};

    #[test]
    fn test_symbols_load_with_defaults() {
        let text = r#"[
            { "kind": "Class", "name": "pxr::UsdPrim", "layout": { "size": 32, "align": 8 } },
            { "kind": "Method", "name": "pxr::UsdPrim::IsValid",
              "signature": { "returns": { "name": "bool" }, "is_const": true } }
        ]"#;
        let symbols = symbols_from_json(text).unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[1].signature, Some(Signature::new(vec![], Some(TypeRef::named("bool"))).with_const()));
        let table = SymbolTable::load(symbols).unwrap();
        assert!(table.is_type(&QualifiedName::parse("pxr::UsdPrim")));
    }

    #[test]
    fn test_symbols_survive_a_dump() {
        let symbols = vec![RealSymbol::class("a::B").with_layout(4, 4)];
        let text = symbols_to_json(&symbols).unwrap();
        assert_eq!(symbols_from_json(&text).unwrap(), symbols);
    }

    #[test]
    fn test_diagnostics_carry_paths() {
        let mut sources = SourceRoot::new();
        sources.insert(FileId::new(3), "bind/prim.cpp");
        let mut collector = DiagnosticCollector::new();
        collector.unresolved_symbol(
            SourceLocation::new(FileId::new(3), 9, 4),
            "class",
            &QualifiedName::parse("pxr::Missing"),
        );

        let json = diagnostics_to_json(collector.diagnostics(), &sources).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["kind"], "UnresolvedSymbol");
        assert_eq!(value[0]["code"], "E0102");
        assert_eq!(value[0]["path"], "bind/prim.cpp");
        assert_eq!(value[0]["line"], 10);
        assert_eq!(value[0]["symbol"], "pxr::Missing");
    }
}
