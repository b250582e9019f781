//! Type references in real and declared signatures.

use std::fmt;

#[cfg(feature = "interchange")]
use serde::{Deserialize, Serialize};

use crate::base::QualifiedName;
use crate::syntax::ast::{RefKind, TypeExpr};

/// Reference qualifier of a type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub enum Reference {
    #[default]
    None,
    LValue,
    RValue,
}

/// How a value crosses the binding boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub enum Passing {
    Value,
    Pointer,
    Reference,
    ConstReference,
    RValueReference,
}

/// A type used in a signature.
///
/// `name` is fully qualified once the type has been canonicalized against
/// the symbol table; fundamental types use their canonical spelling
/// (`unsigned int`, `long long`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct TypeRef {
    pub name: QualifiedName,
    #[cfg_attr(feature = "interchange", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub template_args: Vec<TypeRef>,
    #[cfg_attr(feature = "interchange", serde(default))]
    pub is_const: bool,
    #[cfg_attr(feature = "interchange", serde(default))]
    pub pointer_depth: u8,
    #[cfg_attr(feature = "interchange", serde(default))]
    pub reference: Reference,
}

impl TypeRef {
    pub fn named(name: impl Into<QualifiedName>) -> Self {
        Self {
            name: name.into(),
            template_args: Vec::new(),
            is_const: false,
            pointer_depth: 0,
            reference: Reference::None,
        }
    }

    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = reference;
        self
    }

    /// Convert a parsed type, mapping every named type through `resolve`.
    ///
    /// Fundamental types bypass `resolve` and are normalized.
    pub fn from_expr(expr: &TypeExpr, resolve: &mut impl FnMut(&QualifiedName) -> QualifiedName) -> Self {
        let written = QualifiedName::from_segments(expr.path.segments.iter().cloned());
        let name = match written.segments() {
            [single] if is_fundamental_spelling(single) => QualifiedName::from_segments([normalize_fundamental(single)]),
            _ => resolve(&written),
        };
        Self {
            name,
            template_args: expr.args.iter().map(|arg| TypeRef::from_expr(arg, resolve)).collect(),
            is_const: expr.is_const,
            pointer_depth: expr.pointer_depth,
            reference: match expr.reference {
                RefKind::None => Reference::None,
                RefKind::LValue => Reference::LValue,
                RefKind::RValue => Reference::RValue,
            },
        }
    }

    pub fn passing(&self) -> Passing {
        match self.reference {
            Reference::LValue if self.is_const && self.pointer_depth == 0 => Passing::ConstReference,
            Reference::LValue => Passing::Reference,
            Reference::RValue => Passing::RValueReference,
            Reference::None if self.pointer_depth > 0 => Passing::Pointer,
            Reference::None => Passing::Value,
        }
    }

    /// Whether the named type needs no binding of its own.
    pub fn is_primitive(&self) -> bool {
        self.template_args.is_empty() && is_primitive_name(&self.name)
    }

    /// Signature equality as the compiler sees it: top-level `const` on a
    /// by-value parameter does not change the signature.
    pub fn matches(&self, other: &TypeRef) -> bool {
        let top_level_const = |t: &TypeRef| t.pointer_depth == 0 && t.reference == Reference::None;
        let const_matters = !(top_level_const(self) && top_level_const(other));
        self.name == other.name
            && self.pointer_depth == other.pointer_depth
            && self.reference == other.reference
            && (!const_matters || self.is_const == other.is_const)
            && self.template_args.len() == other.template_args.len()
            && self
                .template_args
                .iter()
                .zip(&other.template_args)
                .all(|(a, b)| a == b)
    }

    /// Every named type mentioned, outermost first.
    pub fn named_types(&self) -> Vec<&QualifiedName> {
        let mut out = vec![&self.name];
        for arg in &self.template_args {
            out.extend(arg.named_types());
        }
        out
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        write!(f, "{}", self.name)?;
        if !self.template_args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.template_args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.pointer_depth {
            f.write_str("*")?;
        }
        match self.reference {
            Reference::None => Ok(()),
            Reference::LValue => f.write_str("&"),
            Reference::RValue => f.write_str("&&"),
        }
    }
}

// ============================================================================
// FUNDAMENTAL TYPES
// ============================================================================

const FUNDAMENTAL: &[&str] = &[
    "void", "bool", "char", "wchar_t", "char8_t", "char16_t", "char32_t", "short", "int", "long",
    "float", "double", "signed", "unsigned",
];

/// Library typedefs that map onto fundamental types.
const PRIMITIVE_TYPEDEFS: &[&str] = &[
    "size_t", "ptrdiff_t", "intptr_t", "uintptr_t", "int8_t", "int16_t", "int32_t", "int64_t",
    "uint8_t", "uint16_t", "uint32_t", "uint64_t",
];

fn is_fundamental_spelling(spelling: &str) -> bool {
    spelling.split_whitespace().all(|word| FUNDAMENTAL.contains(&word))
}

/// Canonical spelling of a fundamental type: `unsigned` becomes
/// `unsigned int`, `long int` becomes `long`, `signed int` becomes `int`.
pub fn normalize_fundamental(spelling: &str) -> String {
    let words: Vec<&str> = spelling.split_whitespace().collect();
    let unsigned = words.contains(&"unsigned");
    let signed = words.contains(&"signed");
    let longs = words.iter().filter(|w| **w == "long").count();
    let has = |w: &str| words.contains(&w);

    let base = if has("char") {
        return match (signed, unsigned) {
            (true, _) => "signed char".to_string(),
            (_, true) => "unsigned char".to_string(),
            _ => "char".to_string(),
        };
    } else if has("double") {
        if longs > 0 { "long double" } else { "double" }
    } else if has("short") {
        "short"
    } else if longs >= 2 {
        "long long"
    } else if longs == 1 {
        "long"
    } else if has("int") || signed || unsigned {
        "int"
    } else {
        return words.join(" ");
    };

    if unsigned && base != "double" && base != "long double" {
        format!("unsigned {}", base)
    } else {
        base.to_string()
    }
}

pub fn is_primitive_name(name: &QualifiedName) -> bool {
    match name.segments() {
        [single] => is_fundamental_spelling(single) || PRIMITIVE_TYPEDEFS.contains(&single.as_str()),
        [std, single] if std == "std" => PRIMITIVE_TYPEDEFS.contains(&single.as_str()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fundamental() {
        assert_eq!(normalize_fundamental("unsigned"), "unsigned int");
        assert_eq!(normalize_fundamental("long int"), "long");
        assert_eq!(normalize_fundamental("unsigned long long int"), "unsigned long long");
        assert_eq!(normalize_fundamental("signed int"), "int");
        assert_eq!(normalize_fundamental("short int"), "short");
        assert_eq!(normalize_fundamental("unsigned char"), "unsigned char");
        assert_eq!(normalize_fundamental("long double"), "long double");
        assert_eq!(normalize_fundamental("float"), "float");
    }

    #[test]
    fn test_primitive_names() {
        assert!(is_primitive_name(&QualifiedName::parse("int")));
        assert!(is_primitive_name(&QualifiedName::parse("std::size_t")));
        assert!(is_primitive_name(&QualifiedName::parse("uint32_t")));
        assert!(!is_primitive_name(&QualifiedName::parse("pxr::TfToken")));
        assert!(!is_primitive_name(&QualifiedName::parse("std::string")));
    }

    #[test]
    fn test_passing() {
        let token = TypeRef::named("pxr::TfToken");
        assert_eq!(token.passing(), Passing::Value);
        assert_eq!(token.clone().with_pointer().passing(), Passing::Pointer);
        assert_eq!(
            token.clone().with_const().with_reference(Reference::LValue).passing(),
            Passing::ConstReference
        );
        assert_eq!(token.with_reference(Reference::RValue).passing(), Passing::RValueReference);
    }

    #[test]
    fn test_top_level_const_ignored_for_values() {
        let int = TypeRef::named("int");
        assert!(int.matches(&int.clone().with_const()));

        let by_ref = TypeRef::named("Foo").with_reference(Reference::LValue);
        assert!(!by_ref.matches(&by_ref.clone().with_const()));
    }

    #[test]
    fn test_display() {
        let ty = TypeRef::named("pxr::TfToken")
            .with_const()
            .with_reference(Reference::LValue);
        assert_eq!(ty.to_string(), "const pxr::TfToken&");
    }
}
