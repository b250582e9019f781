//! Declarations of the wrapped library.
//!
//! A [`RealSymbol`] is what the library actually declares: classes and their
//! members, free functions and enums. Symbols are immutable once loaded into
//! a [`SymbolTable`](super::SymbolTable).

use std::fmt;

use smol_str::SmolStr;

#[cfg(feature = "interchange")]
use serde::{Deserialize, Serialize};

use crate::base::{QualifiedName, SourceLocation};
use crate::syntax::ast;

use super::types::TypeRef;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub enum SymbolKind {
    Class,
    Method,
    Field,
    Function,
    Enum,
    Constructor,
    Destructor,
}

impl SymbolKind {
    /// Kinds that name a type.
    pub fn is_type(self) -> bool {
        matches!(self, SymbolKind::Class | SymbolKind::Enum)
    }

    /// Kinds that live inside a class.
    pub fn is_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Method | SymbolKind::Field | SymbolKind::Constructor | SymbolKind::Destructor
        )
    }

    pub fn is_callable(self) -> bool {
        matches!(
            self,
            SymbolKind::Method | SymbolKind::Function | SymbolKind::Constructor | SymbolKind::Destructor
        )
    }

    pub fn display(self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Field => "field",
            SymbolKind::Function => "function",
            SymbolKind::Enum => "enum",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Destructor => "destructor",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

impl From<ast::Access> for Access {
    fn from(access: ast::Access) -> Self {
        match access {
            ast::Access::Public => Access::Public,
            ast::Access::Protected => Access::Protected,
            ast::Access::Private => Access::Private,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct Param {
    #[cfg_attr(feature = "interchange", serde(default))]
    pub name: Option<SmolStr>,
    pub ty: TypeRef,
    #[cfg_attr(feature = "interchange", serde(default))]
    pub has_default: bool,
}

impl Param {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            name: None,
            ty,
            has_default: false,
        }
    }

    pub fn named(name: impl Into<SmolStr>, ty: TypeRef) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            has_default: false,
        }
    }
}

/// Parameters, return type and qualifiers of a callable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct Signature {
    #[cfg_attr(feature = "interchange", serde(default))]
    pub params: Vec<Param>,
    /// `None` for constructors and destructors.
    #[cfg_attr(feature = "interchange", serde(default))]
    pub returns: Option<TypeRef>,
    #[cfg_attr(feature = "interchange", serde(default))]
    pub is_const: bool,
    #[cfg_attr(feature = "interchange", serde(default))]
    pub is_variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<Param>, returns: Option<TypeRef>) -> Self {
        Self {
            params,
            returns,
            is_const: false,
            is_variadic: false,
        }
    }

    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Same parameter types, constness and variadicity. Return types are
    /// not part of the overload identity.
    pub fn same_overload(&self, other: &Signature) -> bool {
        self.params.len() == other.params.len()
            && self.is_const == other.is_const
            && self.is_variadic == other.is_variadic
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty.matches(&b.ty))
    }

    /// `(int, const Foo&) const`
    pub fn parameter_list(&self) -> String {
        let mut out = String::from("(");
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&param.ty.to_string());
        }
        if self.is_variadic {
            if !self.params.is_empty() {
                out.push_str(", ");
            }
            out.push_str("...");
        }
        out.push(')');
        if self.is_const {
            out.push_str(" const");
        }
        out
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.returns {
            Some(returns) => write!(f, "{} {}", returns, self.parameter_list()),
            None => f.write_str(&self.parameter_list()),
        }
    }
}

/// Size and alignment of a class, in bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct Layout {
    pub size: u64,
    pub align: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct EnumVariant {
    pub name: SmolStr,
    #[cfg_attr(feature = "interchange", serde(default))]
    pub value: Option<SmolStr>,
}

/// A declaration drawn from the wrapped library.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct RealSymbol {
    pub kind: SymbolKind,
    /// Fully qualified; for members the owning class is the parent.
    pub name: QualifiedName,
    /// Callables only.
    #[cfg_attr(feature = "interchange", serde(default))]
    pub signature: Option<Signature>,
    /// Fields only.
    #[cfg_attr(feature = "interchange", serde(default))]
    pub field_type: Option<TypeRef>,
    #[cfg_attr(feature = "interchange", serde(default))]
    pub is_static: bool,
    #[cfg_attr(feature = "interchange", serde(default))]
    pub access: Access,
    /// Classes only, when the loader knows it.
    #[cfg_attr(feature = "interchange", serde(default))]
    pub layout: Option<Layout>,
    /// Public base classes, in declaration order.
    #[cfg_attr(feature = "interchange", serde(default))]
    pub bases: Vec<QualifiedName>,
    /// Enums only.
    #[cfg_attr(feature = "interchange", serde(default))]
    pub variants: Vec<EnumVariant>,
    #[cfg_attr(feature = "interchange", serde(default, skip_serializing))]
    pub location: Option<SourceLocation>,
}

impl RealSymbol {
    pub fn new(kind: SymbolKind, name: impl Into<QualifiedName>) -> Self {
        Self {
            kind,
            name: name.into(),
            signature: None,
            field_type: None,
            is_static: false,
            access: Access::Public,
            layout: None,
            bases: Vec::new(),
            variants: Vec::new(),
            location: None,
        }
    }

    pub fn class(name: impl Into<QualifiedName>) -> Self {
        Self::new(SymbolKind::Class, name)
    }

    pub fn method(name: impl Into<QualifiedName>, signature: Signature) -> Self {
        Self::new(SymbolKind::Method, name).with_signature(signature)
    }

    pub fn function(name: impl Into<QualifiedName>, signature: Signature) -> Self {
        Self::new(SymbolKind::Function, name).with_signature(signature)
    }

    pub fn field(name: impl Into<QualifiedName>, ty: TypeRef) -> Self {
        let mut symbol = Self::new(SymbolKind::Field, name);
        symbol.field_type = Some(ty);
        symbol
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_layout(mut self, size: u64, align: u64) -> Self {
        self.layout = Some(Layout { size, align });
        self
    }

    pub fn with_base(mut self, base: impl Into<QualifiedName>) -> Self {
        self.bases.push(base.into());
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Unqualified name.
    pub fn simple_name(&self) -> &str {
        self.name.last().unwrap_or("")
    }

    /// Owning class (members) or enclosing namespace.
    pub fn owner(&self) -> QualifiedName {
        self.name.parent().unwrap_or_default()
    }

    /// Human-readable declaration, e.g. `method pxr::UsdPrim::GetName() const`.
    pub fn describe(&self) -> String {
        match (&self.signature, &self.field_type) {
            (Some(signature), _) => format!("{} {}{}", self.kind.display(), self.name, signature.parameter_list()),
            (None, Some(ty)) => format!("{} {} {}", self.kind.display(), ty, self.name),
            (None, None) => format!("{} {}", self.kind.display(), self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::types::Reference;

    fn token_ref() -> TypeRef {
        TypeRef::named("pxr::TfToken")
            .with_const()
            .with_reference(Reference::LValue)
    }

    #[test]
    fn test_describe_method() {
        let symbol = RealSymbol::method(
            "pxr::UsdPrim::GetName",
            Signature::new(vec![], Some(token_ref())).with_const(),
        );
        assert_eq!(symbol.describe(), "method pxr::UsdPrim::GetName() const");
        assert_eq!(symbol.simple_name(), "GetName");
        assert_eq!(symbol.owner(), QualifiedName::parse("pxr::UsdPrim"));
    }

    #[test]
    fn test_same_overload_ignores_return_type() {
        let a = Signature::new(vec![Param::new(TypeRef::named("int"))], Some(TypeRef::named("int")));
        let b = Signature::new(vec![Param::named("x", TypeRef::named("int"))], None);
        assert!(a.same_overload(&b));
        assert!(!a.same_overload(&b.clone().with_const()));
    }

    #[test]
    fn test_parameter_list_variadic() {
        let mut sig = Signature::new(vec![Param::new(TypeRef::named("char").with_const().with_pointer())], None);
        sig.is_variadic = true;
        assert_eq!(sig.parameter_list(), "(const char*, ...)");
    }

    #[test]
    fn test_kind_predicates() {
        assert!(SymbolKind::Class.is_type());
        assert!(SymbolKind::Enum.is_type());
        assert!(SymbolKind::Field.is_member());
        assert!(!SymbolKind::Function.is_member());
        assert!(SymbolKind::Constructor.is_callable());
    }
}
