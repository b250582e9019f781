//! Lowering of binding declaration files into [`BindDecl`]s.
//!
//! A binding file is written in the same C++ subset as the library headers,
//! wrapped in a root namespace (`cppmm_bind` by default) and annotated with
//! `CPPMM_*` markers:
//!
//! ```cpp
//! namespace cppmm_bind {
//! namespace PXR_INTERNAL_NS {
//! namespace pxr = ::PXR_INTERNAL_NS;
//! class UsdPrim {
//!     const pxr::TfToken& GetName() const;
//! } CPPMM_OPAQUEBYTES;
//! }
//! }
//! ```
//!
//! A file lowers completely or not at all: the first problem becomes one
//! `SyntaxError` diagnostic and no declarations.

use smol_str::SmolStr;
use tracing::debug;

use crate::base::{FileId, LineIndex, QualifiedName, TextRange};
use crate::syntax::ast::{
    Attribute, EnumDef, FieldDecl, FunctionDecl, FunctionKind, Item, Member, ParamDecl, RecordDef, TypeExpr, UsingDecl,
};
use crate::syntax::{ParseError, parse};

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::library::{alias_from_def, path_name};
use super::request::{BindDecl, BindingRequest, MemberKind, MemberSelection, ParsedFile, ReprPolicy, RequestKind};
use super::symbols::{Param, Signature};
use super::types::TypeRef;

pub const IGNORE_UNBOUND: &str = "CPPMM_IGNORE_UNBOUND";
pub const RENAME: &str = "CPPMM_RENAME";

/// Parse and lower one binding file.
pub fn lower_bindings(file: FileId, text: &str, root_namespace: &str) -> Result<ParsedFile, Diagnostic> {
    let lines = LineIndex::new(text);
    let syntax_error = |err: ParseError| {
        Diagnostic::new(
            DiagnosticKind::SyntaxError,
            lines.location(file, err.range),
            format!("syntax error: {}", err.message),
        )
    };

    let tree = parse(text).map_err(syntax_error)?;
    let mut lowering = BindLowering {
        file,
        lines: &lines,
        root: root_namespace,
        decls: Vec::new(),
    };
    lowering.lower_items(&QualifiedName::root(), &tree.items).map_err(syntax_error)?;

    debug!(file = %file, decls = lowering.decls.len(), "binding file lowered");
    Ok(ParsedFile {
        file,
        decls: lowering.decls,
    })
}

/// Written names are kept as written; the resolver canonicalizes them.
fn as_written(expr: &TypeExpr) -> TypeRef {
    TypeRef::from_expr(expr, &mut |written| written.clone())
}

fn param(decl: &ParamDecl) -> Param {
    Param {
        name: decl.name.clone(),
        ty: as_written(&decl.ty),
        has_default: decl.has_default,
    }
}

fn signature(func: &FunctionDecl) -> Signature {
    Signature {
        params: func.params.iter().map(param).collect(),
        returns: func.returns.as_ref().map(as_written),
        is_const: func.is_const,
        is_variadic: func.is_variadic,
    }
}

type LowerResult<T> = Result<T, ParseError>;

struct BindLowering<'a> {
    file: FileId,
    lines: &'a LineIndex,
    root: &'a str,
    decls: Vec<BindDecl>,
}

/// Markers accepted on a class.
#[derive(Default)]
struct RecordMarkers {
    policy: Option<ReprPolicy>,
    ignore_unbound: bool,
    rename: Option<SmolStr>,
}

impl BindLowering<'_> {
    fn location(&self, range: TextRange) -> crate::base::SourceLocation {
        self.lines.location(self.file, range)
    }

    fn lower_items(&mut self, scope: &QualifiedName, items: &[Item]) -> LowerResult<()> {
        for item in items {
            match item {
                Item::Namespace(ns) => {
                    let inner = match &ns.name {
                        Some(name) if scope.is_empty() && name == self.root => scope.clone(),
                        Some(name) => scope.child(name.clone()),
                        None => scope.clone(),
                    };
                    self.lower_items(&inner, &ns.items)?;
                }
                Item::NamespaceAlias(def) => {
                    let mut alias = alias_from_def(scope, def);
                    alias.location = Some(self.location(def.range));
                    self.decls.push(BindDecl::Alias(alias));
                }
                Item::Record(record) => {
                    if let Some(request) = self.lower_record(scope, record)? {
                        self.decls.push(BindDecl::Request(request));
                    }
                }
                Item::Function(func) => {
                    let request = self.lower_function(scope, func)?;
                    self.decls.push(BindDecl::Request(request));
                }
                Item::Enum(def) => {
                    let request = self.lower_enum(scope, def)?;
                    self.decls.push(BindDecl::Request(request));
                }
                Item::Using(using) => {
                    let request = self.lower_using_function(scope, using)?;
                    self.decls.push(BindDecl::Request(request));
                }
                Item::TypeAlias(_) => {}
                Item::Variable(var) => {
                    return Err(ParseError::new(
                        format!("variable '{}' cannot be bound; only classes, functions and enums can", var.name),
                        var.range,
                    ));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // ATTRIBUTES
    // ========================================================================

    fn rename_of(attr: &Attribute) -> LowerResult<SmolStr> {
        match attr.args.as_slice() {
            [name] if !name.is_empty() => Ok(name.clone()),
            _ => Err(ParseError::new(
                format!("{} takes exactly one name", RENAME),
                attr.range,
            )),
        }
    }

    fn record_markers(attributes: &[Attribute]) -> LowerResult<RecordMarkers> {
        let mut markers = RecordMarkers::default();
        for attr in attributes {
            if let Some(policy) = ReprPolicy::from_marker(&attr.name) {
                if let Some(existing) = markers.policy {
                    return Err(ParseError::new(
                        format!(
                            "conflicting representation markers {} and {}",
                            existing.marker(),
                            policy.marker()
                        ),
                        attr.range,
                    ));
                }
                markers.policy = Some(policy);
            } else if attr.name == IGNORE_UNBOUND {
                markers.ignore_unbound = true;
            } else if attr.name == RENAME {
                markers.rename = Some(Self::rename_of(attr)?);
            } else {
                return Err(unknown_attribute(attr));
            }
        }
        Ok(markers)
    }

    /// Functions and members only accept a rename.
    fn member_rename(attributes: &[Attribute]) -> LowerResult<Option<SmolStr>> {
        let mut rename = None;
        for attr in attributes {
            if attr.name == RENAME {
                rename = Some(Self::rename_of(attr)?);
            } else if ReprPolicy::from_marker(&attr.name).is_some() || attr.name == IGNORE_UNBOUND {
                return Err(ParseError::new(
                    format!("{} only applies to classes", attr.name),
                    attr.range,
                ));
            } else {
                return Err(unknown_attribute(attr));
            }
        }
        Ok(rename)
    }

    // ========================================================================
    // REQUESTS
    // ========================================================================

    /// Forward declarations request nothing and so take no markers.
    fn lower_record(&self, scope: &QualifiedName, record: &RecordDef) -> LowerResult<Option<BindingRequest>> {
        let markers = Self::record_markers(&record.attributes)?;
        let Some(members) = &record.members else {
            return match record.attributes.first() {
                Some(attr) => Err(ParseError::new(
                    format!("{} needs a class body; '{}' is only declared", attr.name, record.name),
                    attr.range,
                )),
                None => Ok(None),
            };
        };

        let mut request = BindingRequest::new(
            scope.clone(),
            QualifiedName::from_segments([record.name.clone()]),
            RequestKind::Record {
                keyword: record.keyword,
            },
            self.location(record.range),
        );
        request.policy = markers.policy;
        request.ignore_unbound = markers.ignore_unbound;
        request.rename = markers.rename;

        for member in members {
            match member {
                Member::Function(func) => request.members.push(self.lower_method(func)?),
                Member::Field(field) => request.members.push(self.lower_field(field)?),
                Member::Using(using) => request.members.push(self.lower_using_member(using)?),
                Member::TypeAlias(_) => {}
                Member::Record(nested) => {
                    return Err(ParseError::new(
                        format!(
                            "nested class '{}' must be bound at namespace scope",
                            nested.name
                        ),
                        nested.range,
                    ));
                }
                Member::Enum(nested) => {
                    return Err(ParseError::new(
                        format!("nested enum '{}' must be bound at namespace scope", nested.name),
                        nested.range,
                    ));
                }
            }
        }
        Ok(Some(request))
    }

    fn lower_method(&self, func: &FunctionDecl) -> LowerResult<MemberSelection> {
        reject_body(func)?;
        let kind = match func.kind {
            FunctionKind::Constructor => MemberKind::Constructor,
            FunctionKind::Destructor => MemberKind::Destructor,
            FunctionKind::Normal | FunctionKind::Operator => MemberKind::Method,
        };
        let mut selection =
            MemberSelection::new(kind, func.name.clone(), self.location(func.range)).with_signature(signature(func));
        selection.is_static = func.is_static;
        selection.rename = Self::member_rename(&func.attributes)?;
        Ok(selection)
    }

    fn lower_field(&self, field: &FieldDecl) -> LowerResult<MemberSelection> {
        let mut selection = MemberSelection::new(MemberKind::Field, field.name.clone(), self.location(field.range))
            .with_field_type(as_written(&field.ty));
        selection.is_static = field.is_static;
        selection.rename = Self::member_rename(&field.attributes)?;
        Ok(selection)
    }

    /// `using Class::member;` selects a member by name only.
    fn lower_using_member(&self, using: &UsingDecl) -> LowerResult<MemberSelection> {
        let name = using
            .path
            .last()
            .cloned()
            .ok_or_else(|| ParseError::new("empty using declaration", using.range))?;
        let mut selection = MemberSelection::new(MemberKind::Any, name, self.location(using.range));
        selection.rename = Self::member_rename(&using.attributes)?;
        Ok(selection)
    }

    fn lower_function(&self, scope: &QualifiedName, func: &FunctionDecl) -> LowerResult<BindingRequest> {
        reject_body(func)?;
        let mut request = BindingRequest::new(
            scope.clone(),
            QualifiedName::from_segments([func.name.clone()]),
            RequestKind::Function {
                signature: Some(signature(func)),
            },
            self.location(func.range),
        );
        request.rename = Self::member_rename(&func.attributes)?;
        Ok(request)
    }

    fn lower_using_function(&self, scope: &QualifiedName, using: &UsingDecl) -> LowerResult<BindingRequest> {
        let mut request = BindingRequest::new(
            scope.clone(),
            path_name(&using.path),
            RequestKind::Function { signature: None },
            self.location(using.range),
        );
        request.rename = Self::member_rename(&using.attributes)?;
        Ok(request)
    }

    fn lower_enum(&self, scope: &QualifiedName, def: &EnumDef) -> LowerResult<BindingRequest> {
        let mut request = BindingRequest::new(
            scope.clone(),
            QualifiedName::from_segments([def.name.clone()]),
            RequestKind::Enum { scoped: def.scoped },
            self.location(def.range),
        );
        request.rename = Self::member_rename(&def.attributes)?;
        Ok(request)
    }
}

fn unknown_attribute(attr: &Attribute) -> ParseError {
    ParseError::new(format!("unknown annotation '{}'", attr.name), attr.range)
}

fn reject_body(func: &FunctionDecl) -> LowerResult<()> {
    if func.has_body {
        return Err(ParseError::new(
            format!("'{}' has a body; binding declarations are signatures only", func.name),
            func.range,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::types::Reference;
    use crate::syntax::ast::RecordKeyword;

    const USD_PRIM: &str = r#"
#include "bind_defs.hpp"
#include "pxr/usd/usd/prim.h"

namespace cppmm_bind {

namespace PXR_INTERNAL_NS {

namespace pxr = ::PXR_INTERNAL_NS;

class UsdPrim {

    const pxr::TfToken &GetTypeName() const;
    const pxr::TfToken &GetName() const;

} CPPMM_OPAQUEBYTES;

}
}
"#;

    fn lower(text: &str) -> Result<ParsedFile, Diagnostic> {
        lower_bindings(FileId::new(0), text, "cppmm_bind")
    }

    #[test]
    fn test_usd_prim_sample() {
        let parsed = lower(USD_PRIM).unwrap();
        assert_eq!(parsed.decls.len(), 2);

        let alias = parsed.aliases().next().unwrap();
        assert_eq!(alias.scope, QualifiedName::parse("PXR_INTERNAL_NS"));
        assert_eq!(alias.alias, "pxr");
        assert_eq!(alias.target, QualifiedName::parse("PXR_INTERNAL_NS"));

        let request = parsed.requests().next().unwrap();
        assert_eq!(request.name(), QualifiedName::parse("PXR_INTERNAL_NS::UsdPrim"));
        assert_eq!(request.policy, Some(ReprPolicy::OpaqueBytes));
        assert_eq!(
            request.kind,
            RequestKind::Record {
                keyword: RecordKeyword::Class
            }
        );
        assert_eq!(request.location.line, 10);

        let names: Vec<&str> = request.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["GetTypeName", "GetName"]);
        let returns = request.members[0]
            .signature
            .as_ref()
            .and_then(|s| s.returns.as_ref())
            .unwrap();
        assert_eq!(returns.name, QualifiedName::parse("pxr::TfToken"));
        assert_eq!(returns.reference, Reference::LValue);
    }

    #[test]
    fn test_unmarked_class_has_no_policy() {
        let parsed = lower("namespace cppmm_bind { class Foo { int GetX() const; }; }").unwrap();
        let request = parsed.requests().next().unwrap();
        assert_eq!(request.policy, None);
        assert_eq!(request.name(), QualifiedName::parse("Foo"));
    }

    #[test]
    fn test_functions_enums_and_using() {
        let text = r#"
            namespace cppmm_bind { namespace ns {
                CPPMM_RENAME(compute_sum) int Compute(int a, int b);
                using other::Helper;
                enum class Color {};
                class Foo;
            } }
        "#;
        let parsed = lower(text).unwrap();
        let requests: Vec<&BindingRequest> = parsed.requests().collect();
        assert_eq!(requests.len(), 3);
        assert!(matches!(&requests[0].kind, RequestKind::Function { signature: Some(s) } if s.arity() == 2));
        assert_eq!(requests[0].rename.as_deref(), Some("compute_sum"));
        assert_eq!(requests[1].path, QualifiedName::parse("other::Helper"));
        assert!(matches!(requests[1].kind, RequestKind::Function { signature: None }));
        assert_eq!(requests[2].kind, RequestKind::Enum { scoped: true });
    }

    #[test]
    fn test_member_using_and_fields() {
        let text = r#"
            namespace cppmm_bind {
            struct Vec3 {
                float x;
                float y;
                using Vec3::Length;
            } CPPMM_VALUETYPE CPPMM_IGNORE_UNBOUND;
            }
        "#;
        let parsed = lower(text).unwrap();
        let request = parsed.requests().next().unwrap();
        assert!(request.ignore_unbound);
        assert_eq!(request.policy, Some(ReprPolicy::ValueType));
        assert_eq!(request.members[0].kind, MemberKind::Field);
        assert_eq!(request.members[2].kind, MemberKind::Any);
        assert_eq!(request.members[2].name, "Length");
    }

    #[test]
    fn test_conflicting_markers_is_syntax_error() {
        let err = lower("class Foo {} CPPMM_OPAQUEPTR CPPMM_VALUETYPE;").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SyntaxError);
        assert!(err.message.contains("conflicting representation markers"));
    }

    #[test]
    fn test_unknown_marker_is_syntax_error() {
        let err = lower("class Foo {} CPPMM_OPAQUE;").unwrap_err();
        assert!(err.message.contains("unknown annotation 'CPPMM_OPAQUE'"));
    }

    #[test]
    fn test_method_body_is_syntax_error() {
        let err = lower("class Foo { int GetX() const { return 1; } };").unwrap_err();
        assert!(err.message.contains("has a body"));
        assert_eq!(err.location.line, 0);
    }

    #[test]
    fn test_markers_on_forward_declaration_are_errors() {
        let unknown = lower("namespace a { CPPMM_NOPE class Foo; class Foo { void Go(); }; }").unwrap_err();
        assert_eq!(unknown.kind, DiagnosticKind::SyntaxError);
        assert!(unknown.message.contains("CPPMM_NOPE"), "{}", unknown.message);

        let policy = lower("CPPMM_OPAQUEPTR class Foo;").unwrap_err();
        assert!(policy.message.contains("needs a class body"), "{}", policy.message);

        let plain = lower("class Foo; class Foo { void Go(); };").unwrap();
        assert_eq!(plain.requests().count(), 1);
    }

    #[test]
    fn test_misplaced_attribute_is_syntax_error() {
        let err = lower("CPPMM_BOGUS namespace a { class Foo { void Go(); }; }").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SyntaxError);
        assert!(err.message.contains("cannot be applied to a namespace"), "{}", err.message);
    }

    #[test]
    fn test_parse_error_location() {
        let err = lower("namespace cppmm_bind {\nclass Foo { int GetX() const; }\n}").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SyntaxError);
        assert_eq!(err.location.line, 2);
    }
}
