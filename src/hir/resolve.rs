//! Resolution of binding requests against the symbol table.
//!
//! Resolution is a pure function of (requests, alias table, symbol table)
//! and runs in two passes:
//!
//! 1. **Locate** - find the real symbol of every request, in file then
//!    declaration order. Requests that do not resolve are dropped with a
//!    diagnostic; a second request for an already located symbol is merged
//!    into the first, or dropped as a [`DuplicateBinding`] when it asks
//!    for a different representation.
//! 2. **Members** - check every member selection of the located classes.
//!    Only the failing member is dropped; the rest of the class binds.
//!
//! Pass 2 needs the complete set of bound types from pass 1 to decide
//! whether a signature mentions a type that has no binding. A ValueType
//! that cannot bind all of its fields is not bound, so that set is
//! narrowed until it is stable before any member is checked.
//!
//! Two bindings may not share a public name; the later one is dropped as
//! a [`DuplicateBinding`] and needs a `CPPMM_RENAME` to be kept.
//!
//! [`DuplicateBinding`]: super::DiagnosticKind::DuplicateBinding

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, info, trace};

use crate::base::{QualifiedName, SourceLocation};

use super::alias::AliasTable;
use super::diagnostics::{Diagnostic, DiagnosticCollector};
use super::ids::SymbolId;
use super::request::{BindingRequest, MemberKind, MemberSelection, ParsedFile, ReprPolicy, RequestKind};
use super::symbols::{Access, Param, Signature, SymbolKind};
use super::table::SymbolTable;
use super::types::{is_primitive_name, TypeRef};

// ============================================================================
// RESOLUTION RESULT
// ============================================================================

/// Outcome of looking a name up among overloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveResult {
    Found(SymbolId),
    Ambiguous(Vec<SymbolId>),
    /// Candidates exist but none has the declared signature.
    Mismatch(String),
    NotFound,
}

/// A member that will be exposed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMember {
    pub symbol: SymbolId,
    pub kind: SymbolKind,
    /// Real member name.
    pub name: SmolStr,
    /// Name used by the binding (`CPPMM_RENAME` or the real name).
    pub exposed_name: SmolStr,
    /// Real signature (callables).
    pub signature: Option<Signature>,
    /// Real type (fields).
    pub field_type: Option<TypeRef>,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedKind {
    Record {
        policy: ReprPolicy,
        members: Vec<ResolvedMember>,
    },
    Function {
        signature: Signature,
    },
    Enum,
}

/// One request paired with the real symbol it binds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub symbol: SymbolId,
    pub real_name: QualifiedName,
    /// Alias-adjusted, target-stable name.
    pub public_name: QualifiedName,
    pub kind: ResolvedKind,
    pub location: SourceLocation,
}

impl ResolvedBinding {
    pub fn policy(&self) -> Option<ReprPolicy> {
        match &self.kind {
            ResolvedKind::Record { policy, .. } => Some(*policy),
            _ => None,
        }
    }
}

/// Everything the resolver produced, in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    pub bindings: Vec<ResolvedBinding>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Every alias declared by the binding files, first declaration wins.
pub fn collect_aliases(files: &[ParsedFile]) -> AliasTable {
    let mut aliases = AliasTable::new();
    for file in files {
        for alias in file.aliases() {
            aliases.insert(alias.clone());
        }
    }
    aliases
}

// ============================================================================
// RESOLVER
// ============================================================================

/// A request located in pass 1, possibly with members merged in from
/// later duplicates.
struct Located {
    symbol: SymbolId,
    request: BindingRequest,
    policy: Option<ReprPolicy>,
    signature: Option<Signature>,
}

#[derive(Clone, Debug)]
pub struct Resolver<'a> {
    table: &'a SymbolTable,
    aliases: &'a AliasTable,
    default_policy: ReprPolicy,
}

impl<'a> Resolver<'a> {
    pub fn new(table: &'a SymbolTable, aliases: &'a AliasTable) -> Self {
        Self {
            table,
            aliases,
            default_policy: ReprPolicy::OpaquePointer,
        }
    }

    /// Policy for classes written without a marker.
    pub fn with_default_policy(mut self, policy: ReprPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Resolve every request of `files`, which must already be in the
    /// run's deterministic order.
    pub fn resolve(&self, files: &[ParsedFile]) -> Resolution {
        let mut diagnostics = DiagnosticCollector::new();
        let located = self.locate_all(files, &mut diagnostics);

        let bound_types = self.bound_types(&located);

        let mut bindings: Vec<ResolvedBinding> = Vec::with_capacity(located.len());
        let mut public_names: FxHashMap<QualifiedName, usize> = FxHashMap::default();
        for entry in located {
            let Some(binding) = self.finish(entry, &bound_types, &mut diagnostics) else {
                continue;
            };
            if let Some(&index) = public_names.get(&binding.public_name) {
                let first = &bindings[index];
                let message = format!(
                    "public name is already taken by {}; add CPPMM_RENAME to bind both",
                    self.table.get(first.symbol).describe()
                );
                diagnostics.duplicate_binding(binding.location, &binding.public_name, message, first.location);
                debug!(public_name = %binding.public_name, "colliding public name dropped");
                continue;
            }
            public_names.insert(binding.public_name.clone(), bindings.len());
            bindings.push(binding);
        }

        info!(
            bindings = bindings.len(),
            diagnostics = diagnostics.len(),
            "binding requests resolved"
        );
        Resolution {
            bindings,
            diagnostics: diagnostics.into_vec(),
        }
    }

    /// Located records and enums, minus every ValueType that cannot bind
    /// all of its fields. Dropping one can leave a ValueType holding it
    /// incomplete too, so this repeats until nothing changes.
    fn bound_types(&self, located: &[Located]) -> FxHashSet<QualifiedName> {
        let mut bound: FxHashSet<QualifiedName> = located
            .iter()
            .filter(|l| self.table.get(l.symbol).kind.is_type())
            .map(|l| self.table.get(l.symbol).name.clone())
            .collect();

        loop {
            let incomplete: Vec<QualifiedName> = located
                .iter()
                .filter(|l| l.policy == Some(ReprPolicy::ValueType))
                .filter(|l| bound.contains(&self.table.get(l.symbol).name))
                .filter(|l| {
                    // Diagnostics for these members are reported by `finish`.
                    let mut scratch = DiagnosticCollector::new();
                    let members = self.resolve_members(l, ReprPolicy::ValueType, &bound, &mut scratch);
                    !self.missing_fields(&self.table.get(l.symbol).name, &members).is_empty()
                })
                .map(|l| self.table.get(l.symbol).name.clone())
                .collect();
            if incomplete.is_empty() {
                return bound;
            }
            for name in incomplete {
                trace!(%name, "incomplete value type is not a bound type");
                bound.remove(&name);
            }
        }
    }

    // ========================================================================
    // PASS 1: LOCATE
    // ========================================================================

    fn locate_all(&self, files: &[ParsedFile], diagnostics: &mut DiagnosticCollector) -> Vec<Located> {
        let mut located: Vec<Located> = Vec::new();
        let mut by_symbol: FxHashMap<SymbolId, usize> = FxHashMap::default();

        for request in files.iter().flat_map(ParsedFile::requests) {
            let Some((symbol, signature)) = self.locate(request, diagnostics) else {
                continue;
            };
            let policy = match request.kind {
                RequestKind::Record { .. } => Some(request.policy.unwrap_or(self.default_policy)),
                _ => None,
            };

            match by_symbol.get(&symbol) {
                Some(&index) => {
                    let first = &mut located[index];
                    let conflict = if first.policy != policy {
                        Some(format!(
                            "requested as {} but already bound as {}; keeping the first",
                            display_policy(policy),
                            display_policy(first.policy)
                        ))
                    } else if first.request.rename != request.rename {
                        Some(format!(
                            "exposed {} but already bound {}; keeping the first",
                            display_rename(request.rename.as_deref()),
                            display_rename(first.request.rename.as_deref())
                        ))
                    } else {
                        None
                    };
                    if let Some(message) = conflict {
                        diagnostics.duplicate_binding(
                            request.location,
                            &request.name(),
                            message,
                            first.request.location,
                        );
                        debug!(name = %request.name(), "conflicting duplicate request dropped");
                    } else {
                        debug!(name = %request.name(), "duplicate request merged");
                        merge_members(&mut first.request, request);
                    }
                }
                None => {
                    by_symbol.insert(symbol, located.len());
                    located.push(Located {
                        symbol,
                        request: request.clone(),
                        policy,
                        signature,
                    });
                }
            }
        }
        located
    }

    /// Find the real symbol of one request; functions also return the
    /// chosen overload's signature.
    fn locate(
        &self,
        request: &BindingRequest,
        diagnostics: &mut DiagnosticCollector,
    ) -> Option<(SymbolId, Option<Signature>)> {
        let declared = request.name();
        let real = self.aliases.expand(&request.scope, &declared);
        trace!(%declared, %real, "locating request");

        let result = match &request.kind {
            RequestKind::Record { .. } | RequestKind::Enum { .. } => {
                match self.table.lookup_kind(&real, |k| request.kind.accepts(k)).first() {
                    Some(&id) => ResolveResult::Found(id),
                    None => ResolveResult::NotFound,
                }
            }
            RequestKind::Function { signature: Some(signature) } => {
                let candidates = self.table.lookup_kind(&real, |k| k == SymbolKind::Function);
                self.select_overload(&candidates, signature, &[&request.scope])
            }
            RequestKind::Function { signature: None } => {
                // `using a::f;` is looked up like C++ does: from the scope outwards.
                let mut result = ResolveResult::NotFound;
                for scope in request.scope.ancestors() {
                    let candidate = self.aliases.expand(&request.scope, &scope.join(&request.path));
                    let candidates = self.table.lookup_kind(&candidate, |k| k == SymbolKind::Function);
                    result = match candidates.as_slice() {
                        [] => continue,
                        [only] => ResolveResult::Found(*only),
                        _ => ResolveResult::Ambiguous(candidates),
                    };
                    break;
                }
                result
            }
        };

        match result {
            ResolveResult::Found(id) => Some((id, self.table.get(id).signature.clone())),
            ResolveResult::NotFound => {
                diagnostics.unresolved_symbol(request.location, request.kind.describe(), &declared);
                None
            }
            ResolveResult::Ambiguous(candidates) => {
                let symbols: Vec<_> = candidates.iter().map(|&id| self.table.get(id)).collect();
                diagnostics.ambiguous_overload(request.location, &declared, &symbols);
                None
            }
            ResolveResult::Mismatch(reason) => {
                diagnostics.signature_mismatch(request.location, &declared, reason);
                None
            }
        }
    }

    /// Arity first, then exact parameter types, then the return type.
    fn select_overload(
        &self,
        candidates: &[SymbolId],
        declared: &Signature,
        scopes: &[&QualifiedName],
    ) -> ResolveResult {
        if candidates.is_empty() {
            return ResolveResult::NotFound;
        }
        let declared = self.canonical_signature(declared, scopes);

        let by_arity: Vec<SymbolId> = candidates
            .iter()
            .copied()
            .filter(|&id| {
                self.table
                    .get(id)
                    .signature
                    .as_ref()
                    .is_some_and(|s| s.arity() == declared.arity() && s.is_variadic == declared.is_variadic)
            })
            .collect();
        trace!(candidates = candidates.len(), by_arity = by_arity.len(), "overload arity filter");

        let exact: Vec<SymbolId> = by_arity
            .iter()
            .copied()
            .filter(|&id| {
                self.table
                    .get(id)
                    .signature
                    .as_ref()
                    .is_some_and(|s| s.same_overload(&declared))
            })
            .collect();

        match exact.as_slice() {
            [only] => {
                let real = self.table.get(*only).signature.as_ref();
                match (real.and_then(|s| s.returns.as_ref()), declared.returns.as_ref()) {
                    (Some(real), Some(written)) if !real.matches(written) => ResolveResult::Mismatch(format!(
                        "declared return type '{}' but the library returns '{}'",
                        written, real
                    )),
                    _ => ResolveResult::Found(*only),
                }
            }
            [] => {
                let available: Vec<String> = candidates
                    .iter()
                    .filter_map(|&id| self.table.get(id).signature.as_ref())
                    .map(Signature::parameter_list)
                    .collect();
                ResolveResult::Mismatch(format!(
                    "no overload with parameters {}; the library declares {}",
                    declared.parameter_list(),
                    available.join(", ")
                ))
            }
            _ => ResolveResult::Ambiguous(exact),
        }
    }

    // ========================================================================
    // PASS 2: MEMBERS
    // ========================================================================

    fn finish(
        &self,
        entry: Located,
        bound_types: &FxHashSet<QualifiedName>,
        diagnostics: &mut DiagnosticCollector,
    ) -> Option<ResolvedBinding> {
        let symbol = self.table.get(entry.symbol);
        let request = &entry.request;
        let mut public_name = self.aliases.to_public(&request.scope, &symbol.name);
        if let Some(rename) = &request.rename {
            public_name = public_name.parent().unwrap_or_default().child(rename.clone());
        }

        let kind = match &request.kind {
            RequestKind::Enum { .. } => ResolvedKind::Enum,
            RequestKind::Function { .. } => {
                let signature = entry.signature.clone().unwrap_or_default();
                if let Err(reason) = self.check_bound(Some(&signature), None, bound_types) {
                    diagnostics.signature_mismatch(request.location, &request.name(), reason);
                    return None;
                }
                ResolvedKind::Function { signature }
            }
            RequestKind::Record { .. } => {
                let policy = entry.policy.unwrap_or(self.default_policy);
                let members = self.resolve_members(&entry, policy, bound_types, diagnostics);
                if policy == ReprPolicy::ValueType {
                    let missing = self.missing_fields(&symbol.name, &members);
                    if !missing.is_empty() {
                        diagnostics.incomplete_value_type(request.location, &request.name(), &missing);
                        debug!(name = %symbol.name, "incomplete value type dropped");
                        return None;
                    }
                }
                ResolvedKind::Record { policy, members }
            }
        };

        Some(ResolvedBinding {
            symbol: entry.symbol,
            real_name: symbol.name.clone(),
            public_name,
            kind,
            location: request.location,
        })
    }

    fn resolve_members(
        &self,
        entry: &Located,
        policy: ReprPolicy,
        bound_types: &FxHashSet<QualifiedName>,
        diagnostics: &mut DiagnosticCollector,
    ) -> Vec<ResolvedMember> {
        let owner = &self.table.get(entry.symbol).name;
        let request = &entry.request;
        let declared_owner = request.name();
        let scopes = [&declared_owner, owner];
        let mut seen = FxHashSet::default();
        let mut members = Vec::new();

        for selection in &request.members {
            let member_name = declared_owner.child(selection.name.clone());
            let id = match self.locate_member(owner, selection, &scopes) {
                ResolveResult::Found(id) => id,
                ResolveResult::NotFound => {
                    diagnostics.signature_mismatch(
                        selection.location,
                        &member_name,
                        format!("'{}' has no {} named '{}'", owner, selection.kind.display(), selection.name),
                    );
                    continue;
                }
                ResolveResult::Ambiguous(candidates) => {
                    let symbols: Vec<_> = candidates.iter().map(|&id| self.table.get(id)).collect();
                    diagnostics.ambiguous_overload(selection.location, &member_name, &symbols);
                    continue;
                }
                ResolveResult::Mismatch(reason) => {
                    diagnostics.signature_mismatch(selection.location, &member_name, reason);
                    continue;
                }
            };

            let real = self.table.get(id);
            if real.access != Access::Public {
                diagnostics.signature_mismatch(
                    selection.location,
                    &member_name,
                    format!("{} is not public", real.describe()),
                );
                continue;
            }
            if real.kind == SymbolKind::Field && policy.is_opaque() {
                diagnostics.signature_mismatch(
                    selection.location,
                    &member_name,
                    format!("fields cannot be bound on a class bound as {}", policy),
                );
                continue;
            }
            if let Err(reason) = self.check_bound(real.signature.as_ref(), real.field_type.as_ref(), bound_types) {
                if request.ignore_unbound {
                    debug!(member = %member_name, %reason, "member with unbound type skipped");
                } else {
                    diagnostics.signature_mismatch(selection.location, &member_name, reason);
                }
                continue;
            }
            if !seen.insert(id) {
                trace!(member = %member_name, "member selected twice");
                continue;
            }

            members.push(ResolvedMember {
                symbol: id,
                kind: real.kind,
                name: SmolStr::new(real.simple_name()),
                exposed_name: SmolStr::new(selection.exposed_name()),
                signature: real.signature.clone(),
                field_type: real.field_type.clone(),
                is_static: real.is_static,
            });
        }
        members
    }

    fn locate_member(&self, owner: &QualifiedName, selection: &MemberSelection, scopes: &[&QualifiedName]) -> ResolveResult {
        let candidates: Vec<SymbolId> = self
            .table
            .members_named(owner, &selection.name)
            .into_iter()
            .filter(|&id| selection.kind.accepts(self.table.get(id).kind))
            .collect();
        if candidates.is_empty() {
            return ResolveResult::NotFound;
        }

        match (selection.kind, &selection.signature, &selection.field_type) {
            (MemberKind::Field, _, Some(written)) => {
                let id = candidates[0];
                let written = self.canonical_type(written, scopes);
                match &self.table.get(id).field_type {
                    Some(real) if !real.matches(&written) => ResolveResult::Mismatch(format!(
                        "declared as '{}' but the library declares '{}'",
                        written, real
                    )),
                    _ => ResolveResult::Found(id),
                }
            }
            (_, Some(signature), _) => self.select_overload(&candidates, signature, scopes),
            _ => match candidates.as_slice() {
                [only] => ResolveResult::Found(*only),
                _ => ResolveResult::Ambiguous(candidates),
            },
        }
    }

    /// Non-static fields of `owner` that no resolved member covers.
    fn missing_fields(&self, owner: &QualifiedName, members: &[ResolvedMember]) -> Vec<String> {
        let bound: FxHashSet<SymbolId> = members.iter().map(|m| m.symbol).collect();
        self.table
            .instance_fields(owner)
            .into_iter()
            .filter(|id| !bound.contains(id))
            .map(|id| self.table.get(id).simple_name().to_string())
            .collect()
    }

    // ========================================================================
    // TYPES
    // ========================================================================

    /// Every named type in a real signature or field must be primitive or
    /// bound by some request.
    fn check_bound(
        &self,
        signature: Option<&Signature>,
        field_type: Option<&TypeRef>,
        bound_types: &FxHashSet<QualifiedName>,
    ) -> Result<(), String> {
        let mut types: Vec<&TypeRef> = Vec::new();
        if let Some(signature) = signature {
            types.extend(signature.params.iter().map(|p: &Param| &p.ty));
            types.extend(signature.returns.iter());
        }
        types.extend(field_type);

        for ty in types {
            if ty.is_primitive() {
                continue;
            }
            for name in ty.named_types() {
                if is_primitive_name(name) {
                    continue;
                }
                if !bound_types.contains(name) {
                    return Err(format!("type '{}' has no binding", name));
                }
            }
        }
        Ok(())
    }

    fn canonical_name(&self, written: &QualifiedName, scopes: &[&QualifiedName]) -> QualifiedName {
        let mut fallback = None;
        for scope in scopes {
            let name = self
                .aliases
                .canonical_type(scope, written, |candidate| self.table.is_type(candidate));
            if self.table.is_type(&name) {
                return name;
            }
            fallback.get_or_insert(name);
        }
        fallback.unwrap_or_else(|| written.clone())
    }

    fn canonical_type(&self, ty: &TypeRef, scopes: &[&QualifiedName]) -> TypeRef {
        let name = if is_primitive_name(&ty.name) {
            ty.name.clone()
        } else {
            self.canonical_name(&ty.name, scopes)
        };
        TypeRef {
            name,
            template_args: ty.template_args.iter().map(|a| self.canonical_type(a, scopes)).collect(),
            is_const: ty.is_const,
            pointer_depth: ty.pointer_depth,
            reference: ty.reference,
        }
    }

    fn canonical_signature(&self, signature: &Signature, scopes: &[&QualifiedName]) -> Signature {
        Signature {
            params: signature
                .params
                .iter()
                .map(|p| Param {
                    name: p.name.clone(),
                    ty: self.canonical_type(&p.ty, scopes),
                    has_default: p.has_default,
                })
                .collect(),
            returns: signature.returns.as_ref().map(|r| self.canonical_type(r, scopes)),
            is_const: signature.is_const,
            is_variadic: signature.is_variadic,
        }
    }
}

fn display_policy(policy: Option<ReprPolicy>) -> String {
    match policy {
        Some(policy) => policy.to_string(),
        None => "unmarked".to_string(),
    }
}

fn display_rename(rename: Option<&str>) -> String {
    match rename {
        Some(rename) => format!("as '{}'", rename),
        None => "under its own name".to_string(),
    }
}

/// Append the selections of a duplicate request that the first one does
/// not already make.
fn merge_members(first: &mut BindingRequest, duplicate: &BindingRequest) {
    for selection in &duplicate.members {
        let already = first.members.iter().any(|m| {
            m.kind == selection.kind && m.name == selection.name && m.signature == selection.signature
        });
        if !already {
            first.members.push(selection.clone());
        }
    }
    first.ignore_unbound |= duplicate.ignore_unbound;
}
