//! Lowering of library headers into [`RealSymbol`]s.
//!
//! Headers are collected first so that every type name can be qualified
//! against the types declared anywhere in the library, regardless of file
//! order:
//!
//! 1. **Declare** - record every class, enum and typedef name and every
//!    namespace alias, per file.
//! 2. **Lower** - walk the trees again, emitting symbols whose signature
//!    types are fully qualified.

use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::base::{FileId, LineIndex, QualifiedName, TextRange};
use crate::syntax::ast::{
    self, EnumDef, FieldDecl, FunctionDecl, FunctionKind, Item, Member, NamespaceAliasDef, Path, RecordDef, SourceFile,
    TypeExpr,
};
use crate::syntax::{ParseError, parse};

use super::alias::{AliasTable, NamespaceAlias};
use super::symbols::{Access, EnumVariant, Param, RealSymbol, Signature, SymbolKind};
use super::types::TypeRef;

struct HeaderFile {
    file: FileId,
    lines: LineIndex,
    tree: SourceFile,
}

/// Collects parsed headers and lowers them together.
#[derive(Default)]
pub struct LibraryBuilder {
    files: Vec<HeaderFile>,
}

impl LibraryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and add one header.
    pub fn add_text(&mut self, file: FileId, text: &str) -> Result<(), ParseError> {
        let tree = parse(text)?;
        self.add_file(file, LineIndex::new(text), tree);
        Ok(())
    }

    pub fn add_file(&mut self, file: FileId, lines: LineIndex, tree: SourceFile) {
        self.files.push(HeaderFile { file, lines, tree });
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Lower every added header, in the order added.
    pub fn finish(self) -> Vec<RealSymbol> {
        let mut declared = Declared::default();
        for header in &self.files {
            declared.collect_items(&QualifiedName::root(), &header.tree.items);
        }
        debug!(types = declared.types.len(), aliases = declared.aliases.len(), "library types declared");

        let mut symbols = Vec::new();
        for header in &self.files {
            let mut lowering = Lowering {
                declared: &declared,
                header,
                out: &mut symbols,
            };
            lowering.lower_items(&QualifiedName::root(), &header.tree.items);
        }
        info!(files = self.files.len(), symbols = symbols.len(), "library headers lowered");
        symbols
    }
}

// ============================================================================
// DECLARE PASS
// ============================================================================

#[derive(Default)]
struct Declared {
    types: FxHashSet<QualifiedName>,
    aliases: AliasTable,
}

impl Declared {
    fn collect_items(&mut self, scope: &QualifiedName, items: &[Item]) {
        for item in items {
            match item {
                Item::Namespace(ns) => match &ns.name {
                    Some(name) => self.collect_items(&scope.child(name.clone()), &ns.items),
                    None => self.collect_items(scope, &ns.items),
                },
                Item::NamespaceAlias(def) => {
                    self.aliases.insert(alias_from_def(scope, def));
                }
                Item::Record(record) => self.collect_record(scope, record),
                Item::Enum(def) => {
                    self.types.insert(scope.child(def.name.clone()));
                }
                Item::TypeAlias(alias) => {
                    self.types.insert(scope.child(alias.name.clone()));
                }
                Item::Function(_) | Item::Using(_) | Item::Variable(_) => {}
            }
        }
    }

    fn collect_record(&mut self, scope: &QualifiedName, record: &RecordDef) {
        let name = scope.child(record.name.clone());
        self.types.insert(name.clone());
        for member in record.members.iter().flatten() {
            match member {
                Member::Record(nested) => self.collect_record(&name, nested),
                Member::Enum(def) => {
                    self.types.insert(name.child(def.name.clone()));
                }
                Member::TypeAlias(alias) => {
                    self.types.insert(name.child(alias.name.clone()));
                }
                Member::Function(_) | Member::Field(_) | Member::Using(_) => {}
            }
        }
    }
}

pub(crate) fn alias_from_def(scope: &QualifiedName, def: &NamespaceAliasDef) -> NamespaceAlias {
    NamespaceAlias::new(scope.clone(), def.alias.clone(), path_name(&def.target))
}

pub(crate) fn path_name(path: &Path) -> QualifiedName {
    QualifiedName::from_segments(path.segments.iter().cloned())
}

// ============================================================================
// LOWER PASS
// ============================================================================

struct Lowering<'a> {
    declared: &'a Declared,
    header: &'a HeaderFile,
    out: &'a mut Vec<RealSymbol>,
}

impl Lowering<'_> {
    fn located(&self, symbol: RealSymbol, range: TextRange) -> RealSymbol {
        symbol.with_location(self.header.lines.location(self.header.file, range))
    }

    fn type_ref(&self, scope: &QualifiedName, expr: &TypeExpr) -> TypeRef {
        let declared = self.declared;
        TypeRef::from_expr(expr, &mut |written| {
            declared
                .aliases
                .canonical_type(scope, written, |candidate| declared.types.contains(candidate))
        })
    }

    /// A base class as written inside `scope`, fully qualified.
    fn base_name(&self, scope: &QualifiedName, path: &Path) -> QualifiedName {
        let declared = self.declared;
        declared
            .aliases
            .canonical_type(scope, &path_name(path), |candidate| declared.types.contains(candidate))
    }

    fn lower_items(&mut self, scope: &QualifiedName, items: &[Item]) {
        for item in items {
            match item {
                Item::Namespace(ns) => match &ns.name {
                    Some(name) => self.lower_items(&scope.child(name.clone()), &ns.items),
                    None => self.lower_items(scope, &ns.items),
                },
                Item::Record(record) => self.lower_record(scope, record),
                Item::Enum(def) => self.lower_enum(scope, def),
                Item::Function(func) => {
                    if let Some(symbol) = self.lower_function(scope, scope, func, SymbolKind::Function) {
                        self.out.push(symbol);
                    }
                }
                Item::NamespaceAlias(_) | Item::Using(_) | Item::TypeAlias(_) | Item::Variable(_) => {}
            }
        }
    }

    fn lower_record(&mut self, scope: &QualifiedName, record: &RecordDef) {
        // Forward declarations only contribute a type name.
        let Some(members) = &record.members else {
            return;
        };
        let name = scope.child(record.name.clone());
        let mut class = RealSymbol::class(name.clone());
        // Members of non-public bases are not reachable from a binding.
        class.bases = record
            .bases
            .iter()
            .filter(|base| base.access == ast::Access::Public)
            .map(|base| self.base_name(scope, &base.path))
            .collect();
        let class = self.located(class, record.range);
        self.out.push(class);

        for member in members {
            match member {
                Member::Function(func) => {
                    let kind = match func.kind {
                        FunctionKind::Constructor => SymbolKind::Constructor,
                        FunctionKind::Destructor => SymbolKind::Destructor,
                        FunctionKind::Normal | FunctionKind::Operator => SymbolKind::Method,
                    };
                    if let Some(symbol) = self.lower_function(&name, &name, func, kind) {
                        self.out.push(symbol);
                    }
                }
                Member::Field(field) => {
                    let symbol = self.lower_field(&name, field);
                    self.out.push(symbol);
                }
                Member::Record(nested) => self.lower_record(&name, nested),
                Member::Enum(def) => self.lower_enum(&name, def),
                Member::Using(_) | Member::TypeAlias(_) => {}
            }
        }
    }

    fn lower_function(
        &self,
        owner: &QualifiedName,
        scope: &QualifiedName,
        func: &FunctionDecl,
        kind: SymbolKind,
    ) -> Option<RealSymbol> {
        // Deleted functions cannot be called through a binding.
        if func.is_deleted {
            return None;
        }
        let params = func
            .params
            .iter()
            .map(|p| Param {
                name: p.name.clone(),
                ty: self.type_ref(scope, &p.ty),
                has_default: p.has_default,
            })
            .collect();
        let signature = Signature {
            params,
            returns: func.returns.as_ref().map(|r| self.type_ref(scope, r)),
            is_const: func.is_const,
            is_variadic: func.is_variadic,
        };
        let mut symbol = RealSymbol::new(kind, owner.child(func.name.clone()))
            .with_signature(signature)
            .with_access(Access::from(func.access));
        symbol.is_static = func.is_static;
        Some(self.located(symbol, func.range))
    }

    fn lower_field(&self, owner: &QualifiedName, field: &FieldDecl) -> RealSymbol {
        let mut symbol = RealSymbol::field(owner.child(field.name.clone()), self.type_ref(owner, &field.ty))
            .with_access(Access::from(field.access));
        symbol.is_static = field.is_static;
        self.located(symbol, field.range)
    }

    fn lower_enum(&mut self, scope: &QualifiedName, def: &EnumDef) {
        let mut symbol = RealSymbol::new(SymbolKind::Enum, scope.child(def.name.clone()));
        symbol.variants = def
            .variants
            .iter()
            .map(|v| EnumVariant {
                name: v.name.clone(),
                value: v.value.clone(),
            })
            .collect();
        let symbol = self.located(symbol, def.range);
        self.out.push(symbol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::types::Reference;

    const TOKEN_H: &str = r#"
        namespace PXR_INTERNAL_NS {
            class TfToken {
            public:
                TfToken();
                const char* GetText() const;
            };
        }
        namespace pxr = PXR_INTERNAL_NS;
    "#;

    const PRIM_H: &str = r#"
        namespace PXR_INTERNAL_NS {
            class TfToken;
            class UsdPrim {
            public:
                const TfToken& GetTypeName() const;
                const TfToken& GetName() const;
            private:
                int _flags;
            };
            enum class UsdListPosition { FrontOfPrependList, BackOfAppendList };
        }
    "#;

    fn lower(files: &[&str]) -> Vec<RealSymbol> {
        let mut builder = LibraryBuilder::new();
        for (i, text) in files.iter().enumerate() {
            builder.add_text(FileId::new(i as u32), text).unwrap();
        }
        builder.finish()
    }

    fn find<'a>(symbols: &'a [RealSymbol], name: &str) -> &'a RealSymbol {
        symbols
            .iter()
            .find(|s| s.name.to_string() == name)
            .unwrap_or_else(|| panic!("no symbol {}", name))
    }

    #[test]
    fn test_types_are_fully_qualified_across_files() {
        let symbols = lower(&[PRIM_H, TOKEN_H]);
        let get_name = find(&symbols, "PXR_INTERNAL_NS::UsdPrim::GetName");
        assert_eq!(get_name.kind, SymbolKind::Method);
        let signature = get_name.signature.as_ref().unwrap();
        assert!(signature.is_const);
        let returns = signature.returns.as_ref().unwrap();
        assert_eq!(returns.name, QualifiedName::parse("PXR_INTERNAL_NS::TfToken"));
        assert_eq!(returns.reference, Reference::LValue);
        assert!(returns.is_const);
    }

    #[test]
    fn test_forward_declarations_do_not_create_classes() {
        let symbols = lower(&[PRIM_H, TOKEN_H]);
        let classes: Vec<String> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Class)
            .map(|s| s.name.to_string())
            .collect();
        assert_eq!(classes, vec!["PXR_INTERNAL_NS::UsdPrim", "PXR_INTERNAL_NS::TfToken"]);
    }

    #[test]
    fn test_member_kinds_and_access() {
        let symbols = lower(&[TOKEN_H, PRIM_H]);
        assert_eq!(find(&symbols, "PXR_INTERNAL_NS::TfToken::TfToken").kind, SymbolKind::Constructor);
        let flags = find(&symbols, "PXR_INTERNAL_NS::UsdPrim::_flags");
        assert_eq!(flags.kind, SymbolKind::Field);
        assert_eq!(flags.access, Access::Private);
        assert_eq!(flags.field_type.as_ref().unwrap().name, QualifiedName::parse("int"));
    }

    #[test]
    fn test_enum_variants() {
        let symbols = lower(&[PRIM_H]);
        let position = find(&symbols, "PXR_INTERNAL_NS::UsdListPosition");
        assert_eq!(position.kind, SymbolKind::Enum);
        assert_eq!(position.variants.len(), 2);
        assert_eq!(position.variants[1].name, "BackOfAppendList");
    }

    #[test]
    fn test_locations_point_at_declarations() {
        let symbols = lower(&[TOKEN_H]);
        let class = find(&symbols, "PXR_INTERNAL_NS::TfToken");
        let location = class.location.unwrap();
        assert_eq!(location.file, FileId::new(0));
        assert_eq!(location.line, 2);
    }

    #[test]
    fn test_header_alias_is_honored() {
        let header = r#"
            namespace PXR_INTERNAL_NS { class SdfPath {}; }
            namespace pxr = ::PXR_INTERNAL_NS;
            namespace usdx { void Open(const pxr::SdfPath& path); }
        "#;
        let symbols = lower(&[header]);
        let open = find(&symbols, "usdx::Open");
        let param = &open.signature.as_ref().unwrap().params[0];
        assert_eq!(param.ty.name, QualifiedName::parse("PXR_INTERNAL_NS::SdfPath"));
        assert_eq!(param.name.as_deref(), Some("path"));
    }

    #[test]
    fn test_public_bases_are_qualified() {
        let header = r#"
            namespace PXR_INTERNAL_NS {
                class UsdObject { public: bool IsValid() const; };
                class Hidden {};
                class UsdPrim : public UsdObject, private Hidden {};
                struct UsdAttribute : UsdObject {};
            }
        "#;
        let symbols = lower(&[header]);
        let object = QualifiedName::parse("PXR_INTERNAL_NS::UsdObject");
        assert_eq!(find(&symbols, "PXR_INTERNAL_NS::UsdPrim").bases, vec![object.clone()]);
        assert_eq!(find(&symbols, "PXR_INTERNAL_NS::UsdAttribute").bases, vec![object]);
    }
}
