//! Binding requests: what a declaration file asks to expose.

use std::fmt;

use smol_str::SmolStr;

#[cfg(feature = "interchange")]
use serde::{Deserialize, Serialize};

use crate::base::{FileId, QualifiedName, SourceLocation};
use crate::syntax::ast::RecordKeyword;

use super::alias::NamespaceAlias;
use super::symbols::{Signature, SymbolKind};
use super::types::TypeRef;

/// How a bound class is represented on the other side of the binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub enum ReprPolicy {
    /// Only reachable through a pointer; no layout is reproduced.
    OpaquePointer,
    /// Same size and alignment as the real type, no field access, value
    /// semantics (copy, move, destroy).
    OpaqueBytes,
    /// Field-for-field layout.
    ValueType,
}

impl ReprPolicy {
    pub const ALL: [ReprPolicy; 3] = [ReprPolicy::OpaquePointer, ReprPolicy::OpaqueBytes, ReprPolicy::ValueType];

    /// The annotation macro selecting this policy.
    pub fn marker(self) -> &'static str {
        match self {
            ReprPolicy::OpaquePointer => "CPPMM_OPAQUEPTR",
            ReprPolicy::OpaqueBytes => "CPPMM_OPAQUEBYTES",
            ReprPolicy::ValueType => "CPPMM_VALUETYPE",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.marker() == marker)
    }

    /// Fields are not accessible through opaque policies.
    pub fn is_opaque(self) -> bool {
        !matches!(self, ReprPolicy::ValueType)
    }

    pub fn has_value_semantics(self) -> bool {
        !matches!(self, ReprPolicy::OpaquePointer)
    }
}

impl fmt::Display for ReprPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReprPolicy::OpaquePointer => "OpaquePointer",
            ReprPolicy::OpaqueBytes => "OpaqueBytes",
            ReprPolicy::ValueType => "ValueType",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Record { keyword: RecordKeyword },
    /// `signature` is `None` for `using ns::f;`, which selects by name.
    Function { signature: Option<Signature> },
    /// Every real enumerator is exposed; `scoped` only records how the
    /// request was written.
    Enum { scoped: bool },
}

impl RequestKind {
    pub fn describe(&self) -> &'static str {
        match self {
            RequestKind::Record { keyword } => keyword.as_str(),
            RequestKind::Function { .. } => "function",
            RequestKind::Enum { .. } => "enum",
        }
    }

    /// Whether a real symbol of `kind` can satisfy this request.
    pub fn accepts(&self, kind: SymbolKind) -> bool {
        match self {
            RequestKind::Record { .. } => kind == SymbolKind::Class,
            RequestKind::Function { .. } => kind == SymbolKind::Function,
            RequestKind::Enum { .. } => kind == SymbolKind::Enum,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub enum MemberKind {
    Method,
    Field,
    Constructor,
    Destructor,
    /// `using Class::member;`: any member with that name.
    Any,
}

impl MemberKind {
    pub fn accepts(self, kind: SymbolKind) -> bool {
        match self {
            MemberKind::Method => kind == SymbolKind::Method,
            MemberKind::Field => kind == SymbolKind::Field,
            MemberKind::Constructor => kind == SymbolKind::Constructor,
            MemberKind::Destructor => kind == SymbolKind::Destructor,
            MemberKind::Any => kind.is_member(),
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Field => "field",
            MemberKind::Constructor => "constructor",
            MemberKind::Destructor => "destructor",
            MemberKind::Any => "member",
        }
    }
}

/// One member written inside a bound class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberSelection {
    pub kind: MemberKind,
    pub name: SmolStr,
    /// Methods, constructors and destructors as written; types are not yet
    /// canonical.
    pub signature: Option<Signature>,
    pub field_type: Option<TypeRef>,
    pub is_static: bool,
    /// `CPPMM_RENAME(name)`
    pub rename: Option<SmolStr>,
    pub location: SourceLocation,
}

impl MemberSelection {
    pub fn new(kind: MemberKind, name: impl Into<SmolStr>, location: SourceLocation) -> Self {
        Self {
            kind,
            name: name.into(),
            signature: None,
            field_type: None,
            is_static: false,
            rename: None,
            location,
        }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_field_type(mut self, ty: TypeRef) -> Self {
        self.field_type = Some(ty);
        self
    }

    /// The name exposed by the binding.
    pub fn exposed_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }

    pub fn describe(&self) -> String {
        match &self.signature {
            Some(signature) => format!("{}{}", self.name, signature.parameter_list()),
            None => self.name.to_string(),
        }
    }
}

/// A declared intent to expose one real symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingRequest {
    /// Enclosing namespace, with the binding root namespace stripped.
    pub scope: QualifiedName,
    /// Name as written, relative to `scope`.
    pub path: QualifiedName,
    pub kind: RequestKind,
    /// `None` when no policy marker was written.
    pub policy: Option<ReprPolicy>,
    /// Closed-world selection, in declaration order.
    pub members: Vec<MemberSelection>,
    /// `CPPMM_IGNORE_UNBOUND`: drop members with unbound types silently.
    pub ignore_unbound: bool,
    pub rename: Option<SmolStr>,
    pub location: SourceLocation,
}

impl BindingRequest {
    pub fn new(scope: QualifiedName, path: QualifiedName, kind: RequestKind, location: SourceLocation) -> Self {
        Self {
            scope,
            path,
            kind,
            policy: None,
            members: Vec::new(),
            ignore_unbound: false,
            rename: None,
            location,
        }
    }

    /// The declared, fully qualified name (`scope::path`) before alias
    /// rewriting.
    pub fn name(&self) -> QualifiedName {
        self.scope.join(&self.path)
    }
}

/// A declaration in a binding file, in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindDecl {
    Alias(NamespaceAlias),
    Request(BindingRequest),
}

impl BindDecl {
    /// Reset every location, for comparing declarations parsed from
    /// different texts.
    pub fn erase_locations(&mut self) {
        match self {
            BindDecl::Alias(alias) => alias.location = None,
            BindDecl::Request(request) => {
                request.location = SourceLocation::default();
                for member in &mut request.members {
                    member.location = SourceLocation::default();
                }
            }
        }
    }
}

/// Everything one binding file declares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedFile {
    pub file: FileId,
    pub decls: Vec<BindDecl>,
}

impl ParsedFile {
    pub fn requests(&self) -> impl Iterator<Item = &BindingRequest> {
        self.decls.iter().filter_map(|d| match d {
            BindDecl::Request(request) => Some(request),
            BindDecl::Alias(_) => None,
        })
    }

    pub fn aliases(&self) -> impl Iterator<Item = &NamespaceAlias> {
        self.decls.iter().filter_map(|d| match d {
            BindDecl::Alias(alias) => Some(alias),
            BindDecl::Request(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_markers() {
        assert_eq!(ReprPolicy::from_marker("CPPMM_OPAQUEBYTES"), Some(ReprPolicy::OpaqueBytes));
        assert_eq!(ReprPolicy::from_marker("CPPMM_OPAQUE"), None);
        assert!(ReprPolicy::OpaqueBytes.is_opaque());
        assert!(ReprPolicy::OpaqueBytes.has_value_semantics());
        assert!(!ReprPolicy::OpaquePointer.has_value_semantics());
        assert!(!ReprPolicy::ValueType.is_opaque());
    }

    #[test]
    fn test_member_kind_accepts() {
        assert!(MemberKind::Any.accepts(SymbolKind::Field));
        assert!(!MemberKind::Any.accepts(SymbolKind::Class));
        assert!(!MemberKind::Method.accepts(SymbolKind::Constructor));
    }

    #[test]
    fn test_request_name_joins_scope() {
        let request = BindingRequest::new(
            QualifiedName::parse("PXR_INTERNAL_NS"),
            QualifiedName::parse("UsdPrim"),
            RequestKind::Record {
                keyword: RecordKeyword::Class,
            },
            SourceLocation::default(),
        );
        assert_eq!(request.name().to_string(), "PXR_INTERNAL_NS::UsdPrim");
    }
}
