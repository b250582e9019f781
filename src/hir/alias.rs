//! Scoped namespace aliases (`namespace pxr = ::PXR_INTERNAL_NS;`).
//!
//! Libraries that hide their API behind a versioned internal namespace are
//! bound through an alias: declarations are written against the stable
//! name and rewritten to the real namespace before lookup. The same table
//! maps real names back to the stable, public spelling for the binding
//! model.

use smol_str::SmolStr;
use tracing::{trace, warn};

use crate::base::{QualifiedName, SourceLocation};

/// One `namespace alias = target;` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceAlias {
    /// Namespace the alias was declared in; it is visible there and in
    /// every nested scope.
    pub scope: QualifiedName,
    pub alias: SmolStr,
    /// Fully qualified real namespace.
    pub target: QualifiedName,
    pub location: Option<SourceLocation>,
}

impl NamespaceAlias {
    pub fn new(scope: impl Into<QualifiedName>, alias: impl Into<SmolStr>, target: impl Into<QualifiedName>) -> Self {
        Self {
            scope: scope.into(),
            alias: alias.into(),
            target: target.into(),
            location: None,
        }
    }

    /// `scope::alias`, the name the alias introduces.
    pub fn path(&self) -> QualifiedName {
        self.scope.child(self.alias.clone())
    }
}

/// All aliases of a run, keyed by declaring scope and alias name.
#[derive(Clone, Debug, Default)]
pub struct AliasTable {
    aliases: Vec<NamespaceAlias>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias. A second declaration of the same alias in the
    /// same scope keeps the first; returns `false` when it was ignored.
    pub fn insert(&mut self, alias: NamespaceAlias) -> bool {
        if let Some(existing) = self
            .aliases
            .iter()
            .find(|a| a.scope == alias.scope && a.alias == alias.alias)
        {
            if existing.target != alias.target {
                warn!(
                    alias = %alias.path(),
                    kept = %existing.target,
                    ignored = %alias.target,
                    "conflicting namespace alias, keeping the first declaration"
                );
            }
            return false;
        }
        self.aliases.push(alias);
        true
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamespaceAlias> {
        self.aliases.iter()
    }

    fn visible_from<'a>(&'a self, scope: &'a QualifiedName) -> impl Iterator<Item = &'a NamespaceAlias> + 'a {
        self.aliases.iter().filter(move |a| scope.starts_with(&a.scope))
    }

    /// Rewrite `name`, written inside `scope`, through the innermost
    /// visible alias it mentions.
    ///
    /// Both relative use (`pxr::UsdPrim` where `pxr` is visible) and
    /// declarations nested inside the alias (`scope::pxr::UsdPrim`) are
    /// rewritten. Names that mention no alias come back unchanged.
    pub fn expand(&self, scope: &QualifiedName, name: &QualifiedName) -> QualifiedName {
        for ancestor in scope.ancestors() {
            for alias in self.aliases.iter().filter(|a| a.scope == ancestor) {
                let full = alias.path();
                if let Some(rewritten) = name.replace_prefix(&full, &alias.target) {
                    trace!(%name, %rewritten, "alias expanded");
                    return rewritten;
                }
                if name.first() == Some(alias.alias.as_str()) {
                    let first = QualifiedName::from_segments([alias.alias.clone()]);
                    if let Some(rewritten) = name.replace_prefix(&first, &alias.target) {
                        trace!(%name, %rewritten, "alias expanded");
                        return rewritten;
                    }
                }
            }
        }
        name.clone()
    }

    /// The stable spelling of a real name as seen from `scope`: the
    /// longest visible alias target that prefixes `real` is replaced by
    /// the alias.
    pub fn to_public(&self, scope: &QualifiedName, real: &QualifiedName) -> QualifiedName {
        self.visible_from(scope)
            .filter(|a| !a.target.is_empty() && real.starts_with(&a.target))
            .max_by_key(|a| a.target.len())
            .and_then(|a| real.replace_prefix(&a.target, &QualifiedName::from_segments([a.alias.clone()])))
            .unwrap_or_else(|| real.clone())
    }

    /// Canonical name of a type written inside `scope`: aliases expanded,
    /// then the first enclosing scope in which `is_known` accepts it.
    /// Unknown names are returned expanded but otherwise as written.
    pub fn canonical_type(
        &self,
        scope: &QualifiedName,
        written: &QualifiedName,
        is_known: impl Fn(&QualifiedName) -> bool,
    ) -> QualifiedName {
        let expanded = self.expand(scope, written);
        for ancestor in scope.ancestors() {
            let candidate = ancestor.join(&expanded);
            if is_known(&candidate) {
                return candidate;
            }
            // `ancestor::pxr::Foo` may itself go through an alias
            let rewritten = self.expand(scope, &candidate);
            if rewritten != candidate && is_known(&rewritten) {
                return rewritten;
            }
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pxr_table() -> AliasTable {
        let mut table = AliasTable::new();
        table.insert(NamespaceAlias::new("PXR_INTERNAL_NS", "pxr", "PXR_INTERNAL_NS"));
        table
    }

    #[test]
    fn test_expand_relative_use() {
        let table = pxr_table();
        let scope = QualifiedName::parse("PXR_INTERNAL_NS");
        assert_eq!(
            table.expand(&scope, &QualifiedName::parse("pxr::TfToken")),
            QualifiedName::parse("PXR_INTERNAL_NS::TfToken")
        );
        assert_eq!(
            table.expand(&scope, &QualifiedName::parse("std::string")),
            QualifiedName::parse("std::string")
        );
    }

    #[test]
    fn test_alias_not_visible_outside_scope() {
        let table = pxr_table();
        assert_eq!(
            table.expand(&QualifiedName::parse("Other"), &QualifiedName::parse("pxr::TfToken")),
            QualifiedName::parse("pxr::TfToken")
        );
    }

    #[test]
    fn test_to_public_uses_longest_target() {
        let mut table = pxr_table();
        table.insert(NamespaceAlias::new("PXR_INTERNAL_NS", "tf", "PXR_INTERNAL_NS::Tf"));
        let scope = QualifiedName::parse("PXR_INTERNAL_NS");
        assert_eq!(
            table.to_public(&scope, &QualifiedName::parse("PXR_INTERNAL_NS::UsdPrim")),
            QualifiedName::parse("pxr::UsdPrim")
        );
        assert_eq!(
            table.to_public(&scope, &QualifiedName::parse("PXR_INTERNAL_NS::Tf::Token")),
            QualifiedName::parse("tf::Token")
        );
    }

    #[test]
    fn test_first_declaration_wins() {
        let mut table = pxr_table();
        assert!(!table.insert(NamespaceAlias::new("PXR_INTERNAL_NS", "pxr", "pxrInternal_v0_21")));
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().next().unwrap().target, QualifiedName::parse("PXR_INTERNAL_NS"));
    }

    #[test]
    fn test_canonical_type_walks_outwards() {
        let table = pxr_table();
        let known = |name: &QualifiedName| name.to_string() == "PXR_INTERNAL_NS::TfToken";
        let scope = QualifiedName::parse("PXR_INTERNAL_NS::UsdPrim");
        assert_eq!(
            table.canonical_type(&scope, &QualifiedName::parse("TfToken"), known),
            QualifiedName::parse("PXR_INTERNAL_NS::TfToken")
        );
        assert_eq!(
            table.canonical_type(&scope, &QualifiedName::parse("pxr::TfToken"), known),
            QualifiedName::parse("PXR_INTERNAL_NS::TfToken")
        );
    }
}
