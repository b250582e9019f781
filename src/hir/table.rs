//! Symbol table: the read-only index over the wrapped library.
//!
//! Loaded once per run and shared (by reference) with every resolver;
//! nothing mutates it after [`SymbolTable::load`] returns.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{info, trace};

use crate::base::QualifiedName;

use super::ids::SymbolId;
use super::symbols::{RealSymbol, SymbolKind};

/// Failure to build a [`SymbolTable`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Two declarations share a name, kind and parameter list.
    #[error("duplicate declaration of {signature}")]
    DuplicateExactSignature { name: QualifiedName, signature: String },
}

/// Index of [`RealSymbol`]s by qualified name.
///
/// Overloads share a name; member lists keep declaration order.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<RealSymbol>,
    by_name: FxHashMap<QualifiedName, Vec<SymbolId>>,
    /// Owner → members (fields, methods, constructors, destructors).
    members: FxHashMap<QualifiedName, Vec<SymbolId>>,
    /// Classes and enums.
    types: FxHashMap<QualifiedName, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from every declaration of the library.
    pub fn load(symbols: impl IntoIterator<Item = RealSymbol>) -> Result<Self, LoadError> {
        let mut table = Self::new();
        for symbol in symbols {
            table.insert(symbol)?;
        }
        info!(
            symbols = table.symbols.len(),
            types = table.types.len(),
            "symbol table loaded"
        );
        Ok(table)
    }

    fn insert(&mut self, symbol: RealSymbol) -> Result<SymbolId, LoadError> {
        if let Some(existing) = self.by_name.get(&symbol.name) {
            for &id in existing {
                let other = &self.symbols[id.index()];
                if is_same_declaration(other, &symbol) {
                    return Err(LoadError::DuplicateExactSignature {
                        name: symbol.name.clone(),
                        signature: symbol.describe(),
                    });
                }
            }
        }

        let id = SymbolId::new(self.symbols.len() as u32);
        trace!(name = %symbol.name, kind = symbol.kind.display(), "loading symbol");

        self.by_name.entry(symbol.name.clone()).or_default().push(id);
        if symbol.kind.is_member() {
            self.members.entry(symbol.owner()).or_default().push(id);
        }
        if symbol.kind.is_type() {
            self.types.insert(symbol.name.clone(), id);
        }
        self.symbols.push(symbol);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, id: SymbolId) -> &RealSymbol {
        &self.symbols[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &RealSymbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| (SymbolId::new(i as u32), symbol))
    }

    /// Every symbol with exactly this name (all overloads).
    pub fn lookup(&self, name: &QualifiedName) -> &[SymbolId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Symbols with this name whose kind satisfies `filter`.
    pub fn lookup_kind(&self, name: &QualifiedName, filter: impl Fn(SymbolKind) -> bool) -> Vec<SymbolId> {
        self.lookup(name)
            .iter()
            .copied()
            .filter(|&id| filter(self.get(id).kind))
            .collect()
    }

    pub fn is_type(&self, name: &QualifiedName) -> bool {
        self.types.contains_key(name)
    }

    /// Members of a class in declaration order.
    pub fn members_of(&self, owner: &QualifiedName) -> impl Iterator<Item = SymbolId> + '_ {
        self.members.get(owner).into_iter().flatten().copied()
    }

    /// Public bases of a class; empty for anything that is not a loaded
    /// class.
    pub fn bases_of(&self, class: &QualifiedName) -> &[QualifiedName] {
        self.types
            .get(class)
            .map(|&id| self.get(id).bases.as_slice())
            .unwrap_or(&[])
    }

    /// Members of `owner` called `name`, looking through public bases.
    ///
    /// As in C++, a name declared in a class hides the same name in its
    /// bases, so bases are only searched when the class itself has none.
    pub fn members_named(&self, owner: &QualifiedName, name: &str) -> Vec<SymbolId> {
        let mut visited = FxHashSet::default();
        self.members_named_in(owner, name, &mut visited)
    }

    fn members_named_in(
        &self,
        owner: &QualifiedName,
        name: &str,
        visited: &mut FxHashSet<QualifiedName>,
    ) -> Vec<SymbolId> {
        if !visited.insert(owner.clone()) {
            return Vec::new();
        }
        let own: Vec<SymbolId> = self
            .members_of(owner)
            .filter(|&id| self.get(id).simple_name() == name)
            .collect();
        if !own.is_empty() {
            return own;
        }
        let mut inherited = Vec::new();
        for base in self.bases_of(owner) {
            let found = self.members_named_in(base, name, visited);
            if !found.is_empty() {
                trace!(%owner, %base, name, "member found in base");
            }
            inherited.extend(found);
        }
        inherited
    }

    /// Instance (non-static) fields of a class, those of its public bases
    /// first, each in declaration order.
    pub fn instance_fields(&self, owner: &QualifiedName) -> Vec<SymbolId> {
        let mut visited = FxHashSet::default();
        let mut fields = Vec::new();
        self.collect_instance_fields(owner, &mut visited, &mut fields);
        fields
    }

    fn collect_instance_fields(
        &self,
        owner: &QualifiedName,
        visited: &mut FxHashSet<QualifiedName>,
        fields: &mut Vec<SymbolId>,
    ) {
        if !visited.insert(owner.clone()) {
            return;
        }
        for base in self.bases_of(owner) {
            self.collect_instance_fields(base, visited, fields);
        }
        fields.extend(self.members_of(owner).filter(|&id| {
            let symbol = self.get(id);
            symbol.kind == SymbolKind::Field && !symbol.is_static
        }));
    }
}

fn is_same_declaration(a: &RealSymbol, b: &RealSymbol) -> bool {
    if a.kind != b.kind {
        return false;
    }
    match (&a.signature, &b.signature) {
        (Some(x), Some(y)) => x.same_overload(y),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::symbols::{Param, Signature};
    use crate::hir::types::TypeRef;

    fn foo_table() -> SymbolTable {
        SymbolTable::load(vec![
            RealSymbol::class("ns::Foo"),
            RealSymbol::field("ns::Foo::x", TypeRef::named("int")),
            RealSymbol::method("ns::Foo::GetX", Signature::new(vec![], Some(TypeRef::named("int"))).with_const()),
            RealSymbol::method(
                "ns::Foo::SetX",
                Signature::new(vec![Param::named("x", TypeRef::named("int"))], None),
            ),
            RealSymbol::method(
                "ns::Foo::SetX",
                Signature::new(vec![Param::named("x", TypeRef::named("float"))], None),
            ),
            RealSymbol::field("ns::Foo::count", TypeRef::named("int")).with_static(),
        ])
        .unwrap()
    }

    #[test]
    fn test_overloads_share_a_name() {
        let table = foo_table();
        assert_eq!(table.lookup(&QualifiedName::parse("ns::Foo::SetX")).len(), 2);
        assert!(table.lookup(&QualifiedName::parse("Foo::SetX")).is_empty());
    }

    #[test]
    fn test_members_in_declaration_order() {
        let table = foo_table();
        let names: Vec<&str> = table
            .members_of(&QualifiedName::parse("ns::Foo"))
            .map(|id| table.get(id).simple_name())
            .collect();
        assert_eq!(names, vec!["x", "GetX", "SetX", "SetX", "count"]);
        assert_eq!(table.instance_fields(&QualifiedName::parse("ns::Foo")).len(), 1);
    }

    #[test]
    fn test_duplicate_exact_signature() {
        let sig = Signature::new(vec![Param::new(TypeRef::named("int"))], None);
        let err = SymbolTable::load(vec![
            RealSymbol::function("f", sig.clone()),
            RealSymbol::function("f", sig),
        ])
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateExactSignature { ref name, .. } if name.to_string() == "f"));
    }

    #[test]
    fn test_members_found_through_public_bases() {
        let table = SymbolTable::load(vec![
            RealSymbol::class("Base"),
            RealSymbol::field("Base::id", TypeRef::named("int")),
            RealSymbol::method("Base::GetX", Signature::new(vec![], Some(TypeRef::named("int"))).with_const()),
            RealSymbol::method("Base::Name", Signature::new(vec![], None)),
            RealSymbol::class("Foo").with_base("Base"),
            RealSymbol::field("Foo::scale", TypeRef::named("float")),
            RealSymbol::method("Foo::Name", Signature::new(vec![], None)),
        ])
        .unwrap();
        let foo = QualifiedName::parse("Foo");

        let get_x = table.members_named(&foo, "GetX");
        assert_eq!(get_x.len(), 1);
        assert_eq!(table.get(get_x[0]).name, QualifiedName::parse("Base::GetX"));

        // The derived declaration hides the base one.
        let name = table.members_named(&foo, "Name");
        assert_eq!(name.len(), 1);
        assert_eq!(table.get(name[0]).name, QualifiedName::parse("Foo::Name"));

        let fields: Vec<&str> = table
            .instance_fields(&foo)
            .into_iter()
            .map(|id| table.get(id).simple_name())
            .collect();
        assert_eq!(fields, vec!["id", "scale"]);
    }

    #[test]
    fn test_base_cycles_terminate() {
        let table = SymbolTable::load(vec![
            RealSymbol::class("A").with_base("B"),
            RealSymbol::class("B").with_base("A"),
        ])
        .unwrap();
        assert!(table.members_named(&QualifiedName::parse("A"), "Missing").is_empty());
        assert!(table.instance_fields(&QualifiedName::parse("A")).is_empty());
    }
}
