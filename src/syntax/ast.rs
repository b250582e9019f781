//! Syntax tree for the C++ declaration subset.
//!
//! The tree is shared by binding declaration files and library headers; it
//! keeps what was written (names unresolved, aliases unexpanded) plus the
//! byte range of every declaration.

use smol_str::SmolStr;

use crate::base::TextRange;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub items: Vec<Item>,
}

/// A namespace-scope declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Namespace(NamespaceDef),
    NamespaceAlias(NamespaceAliasDef),
    Record(RecordDef),
    Function(FunctionDecl),
    Enum(EnumDef),
    Using(UsingDecl),
    TypeAlias(TypeAliasDecl),
    Variable(FieldDecl),
}

/// `namespace name { ... }`; `name` is `None` for anonymous namespaces and
/// `extern "C"` blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceDef {
    pub name: Option<SmolStr>,
    pub items: Vec<Item>,
    pub range: TextRange,
}

/// `namespace alias = ::target;`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceAliasDef {
    pub alias: SmolStr,
    pub target: Path,
    pub range: TextRange,
}

/// A possibly qualified name as written.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path {
    /// Written with a leading `::`.
    pub global: bool,
    pub segments: Vec<SmolStr>,
}

impl Path {
    pub fn single(name: impl Into<SmolStr>) -> Self {
        Self {
            global: false,
            segments: vec![name.into()],
        }
    }

    pub fn last(&self) -> Option<&SmolStr> {
        self.segments.last()
    }
}

/// A `CPPMM_*` macro used as an annotation, with its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: SmolStr,
    pub args: Vec<SmolStr>,
    pub range: TextRange,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordKeyword {
    Class,
    Struct,
    Union,
}

impl RecordKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKeyword::Class => "class",
            RecordKeyword::Struct => "struct",
            RecordKeyword::Union => "union",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

/// `class Name : bases { members } ATTRS;`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordDef {
    pub keyword: RecordKeyword,
    pub name: SmolStr,
    pub bases: Vec<BaseSpec>,
    /// `None` for a forward declaration.
    pub members: Option<Vec<Member>>,
    /// Markers written between the closing brace and the semicolon.
    pub attributes: Vec<Attribute>,
    pub range: TextRange,
}

/// One entry of a base list. Access defaults to private for `class` and
/// public for `struct`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseSpec {
    pub path: Path,
    pub access: Access,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Member {
    Function(FunctionDecl),
    Field(FieldDecl),
    Using(UsingDecl),
    Record(RecordDef),
    Enum(EnumDef),
    TypeAlias(TypeAliasDecl),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Normal,
    Constructor,
    Destructor,
    Operator,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDecl {
    /// Attributes written before the declaration.
    pub attributes: Vec<Attribute>,
    pub kind: FunctionKind,
    pub name: SmolStr,
    /// `None` for constructors, destructors and conversion operators.
    pub returns: Option<TypeExpr>,
    pub params: Vec<ParamDecl>,
    pub is_variadic: bool,
    pub is_const: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_deleted: bool,
    pub has_body: bool,
    pub access: Access,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDecl {
    pub ty: TypeExpr,
    pub name: Option<SmolStr>,
    pub has_default: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub attributes: Vec<Attribute>,
    pub ty: TypeExpr,
    pub name: SmolStr,
    /// Array extent as written, e.g. `4` for `float m[4]`.
    pub extent: Option<SmolStr>,
    pub is_static: bool,
    pub access: Access,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDef {
    pub name: SmolStr,
    pub scoped: bool,
    pub underlying: Option<TypeExpr>,
    pub variants: Vec<Enumerator>,
    pub attributes: Vec<Attribute>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enumerator {
    pub name: SmolStr,
    /// Initializer tokens, concatenated without whitespace.
    pub value: Option<SmolStr>,
}

/// `using a::b;` (not `using namespace`, which is skipped).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsingDecl {
    pub attributes: Vec<Attribute>,
    pub path: Path,
    pub range: TextRange,
}

/// `typedef T Name;` or `using Name = T;`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeAliasDecl {
    pub name: SmolStr,
    pub ty: TypeExpr,
    pub range: TextRange,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RefKind {
    #[default]
    None,
    LValue,
    RValue,
}

/// A type as written: `const pxr::TfToken &`, `std::vector<int>*`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    /// Fundamental types are a single segment such as `unsigned int`.
    pub path: Path,
    pub args: Vec<TypeExpr>,
    pub is_const: bool,
    pub pointer_depth: u8,
    pub reference: RefKind,
}

impl TypeExpr {
    pub fn named(path: Path) -> Self {
        Self {
            path,
            args: Vec::new(),
            is_const: false,
            pointer_depth: 0,
            reference: RefKind::None,
        }
    }
}
