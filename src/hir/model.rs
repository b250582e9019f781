//! The binding model: the resolved, target-agnostic IR handed to code
//! emitters.
//!
//! Entries are keyed by their public name and kept in resolution order.
//! Every type a member mentions that is itself bound points at that
//! type's entry through an [`EntryId`].

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{info, warn};

#[cfg(feature = "interchange")]
use serde::{Deserialize, Serialize};

use crate::base::{QualifiedName, SourceLocation};

use super::ids::{EntryId, SymbolId};
use super::request::ReprPolicy;
use super::resolve::{ResolvedBinding, ResolvedKind, ResolvedMember};
use super::symbols::{EnumVariant, Layout, Signature, SymbolKind};
use super::table::SymbolTable;
use super::types::TypeRef;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Nothing resolved, so there is nothing to emit.
    #[error("no binding request resolved; nothing to emit")]
    EmptyBindingSet,
}

/// A bound type mentioned by a member, and the entry that binds it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct TypeLink {
    pub real_name: QualifiedName,
    pub entry: EntryId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct MemberEntry {
    pub kind: SymbolKind,
    /// Exposed name.
    pub name: SmolStr,
    pub real_name: SmolStr,
    pub is_static: bool,
    pub signature: Option<Signature>,
    pub field_type: Option<TypeRef>,
    /// Bound types used by this member, first use first.
    pub links: Vec<TypeLink>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub enum EntryKind {
    Record {
        policy: ReprPolicy,
        /// Present for value-semantics policies when the library knows it.
        layout: Option<Layout>,
        /// Methods, constructors and destructors in selection order.
        members: Vec<MemberEntry>,
        /// `ValueType` fields, in selection order.
        fields: Vec<MemberEntry>,
    },
    Enum {
        variants: Vec<EnumVariant>,
    },
    Function {
        signature: Signature,
        links: Vec<TypeLink>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct BindingEntry {
    pub id: EntryId,
    pub public_name: QualifiedName,
    pub real_name: QualifiedName,
    pub symbol: SymbolId,
    pub location: SourceLocation,
    pub kind: EntryKind,
}

impl BindingEntry {
    pub fn policy(&self) -> Option<ReprPolicy> {
        match &self.kind {
            EntryKind::Record { policy, .. } => Some(*policy),
            _ => None,
        }
    }

    /// Every member of a record, fields last.
    pub fn members(&self) -> impl Iterator<Item = &MemberEntry> {
        let (members, fields): (&[MemberEntry], &[MemberEntry]) = match &self.kind {
            EntryKind::Record { members, fields, .. } => (members.as_slice(), fields.as_slice()),
            _ => (&[], &[]),
        };
        members.iter().chain(fields)
    }
}

/// The resolved bindings of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct BindingModel {
    entries: IndexMap<QualifiedName, BindingEntry>,
}

impl BindingModel {
    /// Finalize `bindings` (in resolution order) against the table they
    /// were resolved from.
    pub fn build(table: &SymbolTable, bindings: &[ResolvedBinding]) -> Result<Self, BuildError> {
        if bindings.is_empty() {
            return Err(BuildError::EmptyBindingSet);
        }

        // Ids first, so members can point at entries declared after them.
        let mut kept: Vec<&ResolvedBinding> = Vec::with_capacity(bindings.len());
        let mut by_public: FxHashMap<&QualifiedName, usize> = FxHashMap::default();
        for binding in bindings {
            // `Resolver::resolve` reports these; bindings assembled by hand
            // can still collide.
            if let Some(&first) = by_public.get(&binding.public_name) {
                warn!(
                    name = %binding.public_name,
                    first = %kept[first].real_name,
                    dropped = %binding.real_name,
                    "public name already taken; keeping the first binding"
                );
                continue;
            }
            by_public.insert(&binding.public_name, kept.len());
            kept.push(binding);
        }

        let type_entries: FxHashMap<&QualifiedName, EntryId> = kept
            .iter()
            .enumerate()
            .filter(|(_, b)| !matches!(b.kind, ResolvedKind::Function { .. }))
            .map(|(i, b)| (&b.real_name, EntryId::new(i as u32)))
            .collect();
        let links = |types: Vec<&TypeRef>| -> Vec<TypeLink> {
            let mut out: Vec<TypeLink> = Vec::new();
            for name in types.into_iter().flat_map(TypeRef::named_types) {
                if let Some(&entry) = type_entries.get(name) {
                    if !out.iter().any(|l| l.entry == entry) {
                        out.push(TypeLink {
                            real_name: name.clone(),
                            entry,
                        });
                    }
                }
            }
            out
        };
        let member_entry = |member: &ResolvedMember| MemberEntry {
            kind: member.kind,
            name: member.exposed_name.clone(),
            real_name: member.name.clone(),
            is_static: member.is_static,
            signature: member.signature.clone(),
            field_type: member.field_type.clone(),
            links: links(mentioned_types(member.signature.as_ref(), member.field_type.as_ref())),
        };

        let mut entries = IndexMap::with_capacity(kept.len());
        for (index, binding) in kept.iter().enumerate() {
            let real = table.get(binding.symbol);
            let kind = match &binding.kind {
                ResolvedKind::Record { policy, members } => {
                    let (fields, callables): (Vec<&ResolvedMember>, Vec<&ResolvedMember>) =
                        members.iter().partition(|m| m.kind == SymbolKind::Field);
                    EntryKind::Record {
                        policy: *policy,
                        layout: real.layout.filter(|_| policy.has_value_semantics()),
                        members: callables.into_iter().map(&member_entry).collect(),
                        fields: fields.into_iter().map(&member_entry).collect(),
                    }
                }
                ResolvedKind::Enum => EntryKind::Enum {
                    variants: real.variants.clone(),
                },
                ResolvedKind::Function { signature } => EntryKind::Function {
                    signature: signature.clone(),
                    links: links(mentioned_types(Some(signature), None)),
                },
            };
            entries.insert(
                binding.public_name.clone(),
                BindingEntry {
                    id: EntryId::new(index as u32),
                    public_name: binding.public_name.clone(),
                    real_name: binding.real_name.clone(),
                    symbol: binding.symbol,
                    location: binding.location,
                    kind,
                },
            );
        }

        info!(entries = entries.len(), "binding model built");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look an entry up by public name.
    pub fn get(&self, public_name: &QualifiedName) -> Option<&BindingEntry> {
        self.entries.get(public_name)
    }

    pub fn entry(&self, id: EntryId) -> Option<&BindingEntry> {
        self.entries.get_index(id.index()).map(|(_, entry)| entry)
    }

    pub fn contains(&self, public_name: &QualifiedName) -> bool {
        self.entries.contains_key(public_name)
    }

    /// Entries in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &BindingEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.entries.keys()
    }
}

fn mentioned_types<'a>(signature: Option<&'a Signature>, field_type: Option<&'a TypeRef>) -> Vec<&'a TypeRef> {
    let mut types = Vec::new();
    if let Some(signature) = signature {
        types.extend(signature.returns.iter());
        types.extend(signature.params.iter().map(|p| &p.ty));
    }
    types.extend(field_type);
    types
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FileId;
    use crate::hir::lower::lower_bindings;
    use crate::hir::resolve::{collect_aliases, Resolver};
    use crate::hir::symbols::{Param, RealSymbol};
    use crate::hir::types::Reference;

    fn build(table: &SymbolTable, text: &str) -> Result<BindingModel, BuildError> {
        let files = vec![lower_bindings(FileId::new(0), text, "cppmm_bind").unwrap()];
        let aliases = collect_aliases(&files);
        let resolution = Resolver::new(table, &aliases).resolve(&files);
        BindingModel::build(table, &resolution.bindings)
    }

    fn table() -> SymbolTable {
        let vec3 = TypeRef::named("gfx::Vec3");
        SymbolTable::load(vec![
            RealSymbol::class("gfx::Mesh").with_layout(48, 8),
            RealSymbol::method(
                "gfx::Mesh::Center",
                Signature::new(vec![], Some(vec3.clone())).with_const(),
            ),
            RealSymbol::method(
                "gfx::Mesh::Translate",
                Signature::new(
                    vec![Param::named("by", vec3.clone().with_const().with_reference(Reference::LValue))],
                    Some(TypeRef::named("void")),
                ),
            ),
            RealSymbol::class("gfx::Vec3").with_layout(12, 4),
            RealSymbol::field("gfx::Vec3::x", TypeRef::named("float")),
            RealSymbol::field("gfx::Vec3::y", TypeRef::named("float")),
            RealSymbol::field("gfx::Vec3::z", TypeRef::named("float")),
            RealSymbol::function(
                "gfx::Length",
                Signature::new(
                    vec![Param::new(vec3.with_const().with_reference(Reference::LValue))],
                    Some(TypeRef::named("float")),
                ),
            ),
        ])
        .unwrap()
    }

    const BINDINGS: &str = r#"
        namespace cppmm_bind { namespace gfx {
            class Mesh {
                Vec3 Center() const;
                void Translate(const Vec3& by);
            } CPPMM_OPAQUEPTR;
            struct Vec3 { float x; float y; float z; } CPPMM_VALUETYPE;
            float Length(const Vec3& v);
        } }
    "#;

    #[test]
    fn test_empty_binding_set_is_an_error() {
        let table = table();
        assert_eq!(build(&table, "class Missing {};"), Err(BuildError::EmptyBindingSet));
    }

    #[test]
    fn test_entries_keep_resolution_order() {
        let table = table();
        let model = build(&table, BINDINGS).unwrap();
        let names: Vec<String> = model.names().map(ToString::to_string).collect();
        assert_eq!(names, vec!["gfx::Mesh", "gfx::Vec3", "gfx::Length"]);
        assert_eq!(model.entry(EntryId::new(1)).map(|e| e.public_name.to_string()), Some("gfx::Vec3".into()));
    }

    #[test]
    fn test_members_link_to_bound_types() {
        let table = table();
        let model = build(&table, BINDINGS).unwrap();
        let vec3 = model.get(&QualifiedName::parse("gfx::Vec3")).unwrap().id;

        let mesh = model.get(&QualifiedName::parse("gfx::Mesh")).unwrap();
        for member in mesh.members() {
            assert_eq!(member.links.len(), 1, "{}", member.name);
            assert_eq!(member.links[0].entry, vec3);
        }
        let EntryKind::Function { links, .. } = &model.get(&QualifiedName::parse("gfx::Length")).unwrap().kind else {
            panic!("expected function");
        };
        assert_eq!(links[0].entry, vec3);
    }

    #[test]
    fn test_layout_only_for_value_semantics() {
        let table = table();
        let model = build(&table, BINDINGS).unwrap();
        let EntryKind::Record { layout, .. } = &model.get(&QualifiedName::parse("gfx::Mesh")).unwrap().kind else {
            panic!("expected record");
        };
        assert_eq!(*layout, None);

        let vec3 = model.get(&QualifiedName::parse("gfx::Vec3")).unwrap();
        let EntryKind::Record { layout, fields, members, .. } = &vec3.kind else {
            panic!("expected record");
        };
        assert_eq!(*layout, Some(Layout { size: 12, align: 4 }));
        assert_eq!(fields.len(), 3);
        assert!(members.is_empty());
    }

    #[test]
    fn test_public_name_collision_keeps_first() {
        let table = SymbolTable::load(vec![RealSymbol::class("a::Thing"), RealSymbol::class("a::Other")]).unwrap();
        let model = build(
            &table,
            "namespace a { class Thing {}; class Other {} CPPMM_RENAME(Thing); }",
        )
        .unwrap();
        assert_eq!(model.len(), 1);
        let entry = model.get(&QualifiedName::parse("a::Thing")).unwrap();
        assert_eq!(entry.real_name, QualifiedName::parse("a::Thing"));
    }
}
