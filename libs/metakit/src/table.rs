// metakit/src/table.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::descriptor::{Annotation, MemberBlock, TypeDescriptor, TypeKey, TypeKind};
use crate::element::{ElementKind, TypeRef};
use crate::error::MetaError;
use crate::lang::Target;

/// The function type submitted by the macros via `inventory::submit!`.
/// It feeds the *builder*, not the final table.
pub struct Registrator(pub fn(&mut TypeTableBuilder));

inventory::collect!(Registrator);

/// The frozen, validated set of type descriptors.
pub struct TypeTable {
    types: HashMap<TypeKey, TypeRef>,
    by_name: HashMap<&'static str, TypeKey>,
    by_short_name: HashMap<&'static str, Vec<TypeKey>>,
    ordered: Vec<TypeKey>, // sorted by name
}

impl std::fmt::Debug for TypeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.ordered.iter().map(|k| k.path()).collect();
        f.debug_struct("TypeTable").field("types", &names).finish()
    }
}

impl TypeTable {
    pub fn builder() -> TypeTableBuilder {
        TypeTableBuilder::default()
    }

    /// Discover via inventory, have registrators fill the builder, then validate & freeze.
    pub fn discover_and_build() -> Result<Self, TableError> {
        let mut b = TypeTableBuilder::default();
        for r in ::inventory::iter::<Registrator> {
            r.0(&mut b);
        }
        b.build()
    }

    pub fn get(&self, key: TypeKey) -> Option<&TypeRef> {
        self.types.get(&key)
    }

    pub fn get_of<T: ?Sized + 'static>(&self) -> Option<&TypeRef> {
        self.get(TypeKey::of::<T>())
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.types.contains_key(&key)
    }

    /// Finds a type by full path (with or without `dyn `) or by an unambiguous
    /// short name. Absent if the name is unknown or ambiguous.
    pub fn lookup(&self, name: &str) -> Option<&TypeRef> {
        let name = name.strip_prefix("dyn ").unwrap_or(name);
        if let Some(key) = self.by_name.get(name) {
            return self.types.get(key);
        }
        match self.by_short_name.get(name).map(Vec::as_slice) {
            Some([only]) => self.types.get(only),
            _ => None,
        }
    }

    /// Registered types ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &TypeRef> + '_ {
        self.ordered.iter().filter_map(|k| self.types.get(k))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub(crate) fn resolve(&self, key: TypeKey) -> Result<&TypeRef, MetaError> {
        self.types
            .get(&key)
            .ok_or(MetaError::UnresolvedType { name: key.name() })
    }
}

/// Builder the generated registrators feed.
/// Keys are type identities; uniqueness enforced at build time.
#[derive(Default)]
pub struct TypeTableBuilder {
    types: HashMap<TypeKey, TypeDescriptor>,
    members: Vec<(TypeKey, MemberBlock)>,
    errors: Vec<String>,
}

impl TypeTableBuilder {
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        let key = descriptor.key();
        if self.types.contains_key(&key) {
            self.errors
                .push(format!("Type '{}' is already registered", key.path()));
            return self;
        }
        self.types.insert(key, descriptor);
        self
    }

    /// Adds methods/constructors to a type registered elsewhere.
    pub fn extend_members(&mut self, key: TypeKey, block: MemberBlock) -> &mut Self {
        self.members.push((key, block));
        self
    }

    /// Detect cycles in the supertype graph using DFS with path tracking.
    /// Returns the cycle path if found, None otherwise.
    fn detect_cycle_with_path(
        names: &[&'static str],
        adj: &[Vec<usize>],
    ) -> Option<Vec<&'static str>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White, // unvisited
            Gray,  // on current path
            Black, // finished
        }

        fn dfs(
            node: usize,
            names: &[&'static str],
            adj: &[Vec<usize>],
            colors: &mut [Color],
            path: &mut Vec<usize>,
        ) -> Option<Vec<&'static str>> {
            colors[node] = Color::Gray;
            path.push(node);

            for &next in &adj[node] {
                match colors[next] {
                    Color::Gray => {
                        // back edge: the cycle starts where `next` sits on the path
                        if let Some(start) = path.iter().position(|&n| n == next) {
                            let mut cycle: Vec<&'static str> =
                                path[start..].iter().map(|&i| names[i]).collect();
                            cycle.push(names[next]);
                            return Some(cycle);
                        }
                    }
                    Color::White => {
                        if let Some(cycle) = dfs(next, names, adj, colors, path) {
                            return Some(cycle);
                        }
                    }
                    Color::Black => {}
                }
            }

            path.pop();
            colors[node] = Color::Black;
            None
        }

        let mut colors = vec![Color::White; names.len()];
        let mut path = Vec::new();
        for i in 0..names.len() {
            if colors[i] == Color::White {
                if let Some(cycle) = dfs(i, names, adj, &mut colors, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn check_kinds(d: &TypeDescriptor, types: &HashMap<TypeKey, TypeDescriptor>) -> Result<(), TableError> {
        let ty = d.key().path();
        if let Some(sup) = d.superclass_key() {
            if d.kind() != TypeKind::Class {
                return Err(TableError::KindMismatch {
                    ty,
                    relation: "superclass",
                    target: sup.path(),
                    reason: format!("a {} cannot declare a superclass", d.kind()),
                });
            }
            let target = types.get(&sup).ok_or(TableError::UnknownType {
                referenced_by: ty,
                missing: sup.path(),
            })?;
            if target.kind() != TypeKind::Class {
                return Err(TableError::KindMismatch {
                    ty,
                    relation: "superclass",
                    target: sup.path(),
                    reason: format!("expected a class, found a {}", target.kind()),
                });
            }
        }
        for iface in d.interfaces() {
            if d.kind() == TypeKind::Annotation {
                return Err(TableError::KindMismatch {
                    ty,
                    relation: "interface",
                    target: iface.path(),
                    reason: "an annotation type cannot implement interfaces".to_string(),
                });
            }
            let target = types.get(iface).ok_or(TableError::UnknownType {
                referenced_by: ty,
                missing: iface.path(),
            })?;
            if target.kind() != TypeKind::Interface {
                return Err(TableError::KindMismatch {
                    ty,
                    relation: "interface",
                    target: iface.path(),
                    reason: format!("expected an interface, found a {}", target.kind()),
                });
            }
        }
        Ok(())
    }

    fn check_targets(
        d: &TypeDescriptor,
        types: &HashMap<TypeKey, TypeDescriptor>,
    ) -> Result<(), TableError> {
        let check = |annotations: &[Annotation], kind: ElementKind, element: String| {
            for a in annotations {
                let Some(annotation_type) = types.get(&a.annotation_type()) else {
                    continue;
                };
                let target = annotation_type
                    .annotations()
                    .iter()
                    .find_map(|meta| meta.downcast_ref::<Target>());
                if let Some(target) = target {
                    if !target.permits(kind) {
                        return Err(TableError::TargetViolation {
                            annotation: a.annotation_type().path(),
                            element,
                            kind,
                        });
                    }
                }
            }
            Ok(())
        };

        let owner = d.key().path();
        check(d.annotations(), ElementKind::Type, owner.to_string())?;
        for f in d.fields() {
            check(f.annotations(), ElementKind::Field, format!("{owner}.{}", f.name()))?;
        }
        for m in d.methods() {
            check(m.annotations(), ElementKind::Method, format!("{owner}::{}", m.name()))?;
        }
        for c in d.constructors() {
            check(
                c.annotations(),
                ElementKind::Constructor,
                format!("{owner}::{}", c.name()),
            )?;
        }
        Ok(())
    }

    /// Merge member blocks, validate references/kinds/targets, reject cycles, freeze.
    pub fn build(mut self) -> Result<TypeTable, TableError> {
        if !self.errors.is_empty() {
            return Err(TableError::InvalidTableConfiguration {
                errors: self.errors,
            });
        }

        // 1) attach member blocks to their types, in declaration order
        let mut members = std::mem::take(&mut self.members);
        members.sort_by_key(|(_, block)| block.origin());
        for (key, block) in members {
            let d = self
                .types
                .get_mut(&key)
                .ok_or_else(|| TableError::MembersForUnknownType(key.path().to_string()))?;
            d.absorb(block);
        }

        // deterministic order for validation and iteration
        let mut ordered: Vec<TypeKey> = self.types.keys().copied().collect();
        ordered.sort_by_key(|k| k.path());

        // 2) every supertype reference resolves to a type of the right kind
        for key in &ordered {
            if let Some(d) = self.types.get(key) {
                Self::check_kinds(d, &self.types)?;
                Self::check_targets(d, &self.types)?;
            }
        }

        // 3) supertype graph must be acyclic
        let names: Vec<&'static str> = ordered.iter().map(|k| k.path()).collect();
        let idx: HashMap<TypeKey, usize> =
            ordered.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        let mut adj = vec![Vec::<usize>::new(); ordered.len()];
        for (i, key) in ordered.iter().enumerate() {
            if let Some(d) = self.types.get(key) {
                for sup in d.superclass_key().iter().chain(d.interfaces()) {
                    if let Some(&j) = idx.get(sup) {
                        adj[i].push(j);
                    }
                }
            }
        }
        if let Some(path) = Self::detect_cycle_with_path(&names, &adj) {
            return Err(TableError::CycleDetected { path });
        }

        // 4) freeze
        let mut by_name = HashMap::with_capacity(ordered.len());
        let mut by_short_name: HashMap<&'static str, Vec<TypeKey>> = HashMap::new();
        let mut seen_short = HashSet::new();
        for key in &ordered {
            by_name.insert(key.path(), *key);
            if seen_short.insert((key.short_name(), *key)) {
                by_short_name.entry(key.short_name()).or_default().push(*key);
            }
        }
        let types: HashMap<TypeKey, TypeRef> = self
            .types
            .into_iter()
            .map(|(k, d)| (k, TypeRef::new(Arc::new(d))))
            .collect();

        tracing::debug!(types = types.len(), "Type table built");

        Ok(TypeTable {
            types,
            by_name,
            by_short_name,
            ordered,
        })
    }
}

/// Structured errors for building the type table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("members contributed for unregistered type '{0}'")]
    MembersForUnknownType(String),
    #[error("type '{referenced_by}' references unregistered type '{missing}'")]
    UnknownType {
        referenced_by: &'static str,
        missing: &'static str,
    },
    #[error("type '{ty}' has invalid {relation} '{target}': {reason}")]
    KindMismatch {
        ty: &'static str,
        relation: &'static str,
        target: &'static str,
        reason: String,
    },
    #[error("cyclic type hierarchy detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<&'static str> },
    #[error("annotation '{annotation}' is not applicable to {kind} '{element}'")]
    TargetViolation {
        annotation: &'static str,
        element: String,
        kind: ElementKind,
    },
    #[error("invalid type table configuration:\n{errors:#?}")]
    InvalidTableConfiguration { errors: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, MethodDescriptor};

    /* --------------------------- Test helpers ------------------------- */
    #[derive(Debug)]
    struct Marker;
    #[derive(Debug)]
    struct FieldOnly;
    struct Base;
    struct Derived;
    trait Walkable {}
    trait Runnable {}

    fn annotation_types(b: &mut TypeTableBuilder) {
        b.register(TypeDescriptor::annotation_type::<Marker>());
        b.register(
            TypeDescriptor::annotation_type::<FieldOnly>()
                .annotation(Target(&[ElementKind::Field])),
        );
    }

    /* ------------------------------- Tests ---------------------------- */

    #[test]
    fn build_happy_path() {
        let mut b = TypeTable::builder();
        annotation_types(&mut b);
        b.register(TypeDescriptor::interface::<dyn Walkable>())
            .register(TypeDescriptor::class::<Base>().implements::<dyn Walkable>())
            .register(
                TypeDescriptor::class::<Derived>()
                    .superclass::<Base>()
                    .field(FieldDescriptor::new::<u8>("x").annotation(FieldOnly)),
            );

        let table = b.build().unwrap();
        assert_eq!(table.len(), 5);
        assert!(table.get_of::<Derived>().is_some());
        assert!(table.get_of::<dyn Walkable>().is_some());
        assert!(table.get_of::<dyn Runnable>().is_none());

        let names: Vec<_> = table.iter().map(|t| t.name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn lookup_by_full_and_short_name() {
        let mut b = TypeTable::builder();
        b.register(TypeDescriptor::interface::<dyn Walkable>())
            .register(TypeDescriptor::class::<Base>());
        let table = b.build().unwrap();

        let full = TypeKey::of::<Base>().name();
        assert_eq!(table.lookup(full).map(|t| t.key()), Some(TypeKey::of::<Base>()));
        assert_eq!(table.lookup("Base").map(|t| t.key()), Some(TypeKey::of::<Base>()));
        assert_eq!(
            table.lookup(TypeKey::of::<dyn Walkable>().name()).map(|t| t.key()),
            Some(TypeKey::of::<dyn Walkable>())
        );
        assert!(table.lookup("Missing").is_none());
    }

    #[test]
    fn duplicate_type_reported_in_configuration_errors() {
        let mut b = TypeTable::builder();
        b.register(TypeDescriptor::class::<Base>());
        b.register(TypeDescriptor::class::<Base>());

        match b.build().unwrap_err() {
            TableError::InvalidTableConfiguration { errors } => {
                assert!(
                    errors.iter().any(|e| e.contains("already registered")),
                    "expected duplicate registration error, got {errors:?}"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_supertype_error() {
        let mut b = TypeTable::builder();
        b.register(TypeDescriptor::class::<Derived>().superclass::<Base>());

        match b.build().unwrap_err() {
            TableError::UnknownType {
                referenced_by,
                missing,
            } => {
                assert!(referenced_by.ends_with("Derived"));
                assert!(missing.ends_with("Base"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn members_for_unknown_type_error() {
        let mut b = TypeTable::builder();
        b.extend_members(
            TypeKey::of::<Base>(),
            MemberBlock::new().method(MethodDescriptor::new::<()>("run")),
        );
        assert!(matches!(
            b.build().unwrap_err(),
            TableError::MembersForUnknownType(_)
        ));
    }

    #[test]
    fn interface_must_be_an_interface() {
        let mut b = TypeTable::builder();
        b.register(TypeDescriptor::class::<Base>())
            .register(TypeDescriptor::class::<Derived>().implements::<Base>());
        match b.build().unwrap_err() {
            TableError::KindMismatch { relation, .. } => assert_eq!(relation, "interface"),
            other => panic!("expected KindMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn interface_cannot_declare_superclass() {
        let mut b = TypeTable::builder();
        b.register(TypeDescriptor::class::<Base>())
            .register(TypeDescriptor::interface::<dyn Walkable>().superclass::<Base>());
        assert!(matches!(
            b.build().unwrap_err(),
            TableError::KindMismatch { relation: "superclass", .. }
        ));
    }

    #[test]
    fn cyclic_hierarchy_detected() {
        let mut b = TypeTable::builder();
        b.register(TypeDescriptor::interface::<dyn Walkable>().implements::<dyn Runnable>())
            .register(TypeDescriptor::interface::<dyn Runnable>().implements::<dyn Walkable>())
            .register(TypeDescriptor::class::<Base>());

        let err = b.build().unwrap_err();
        match &err {
            TableError::CycleDetected { path } => {
                assert!(path.iter().any(|p| p.ends_with("Walkable")));
                assert!(path.iter().any(|p| p.ends_with("Runnable")));
                assert!(!path.iter().any(|p| p.ends_with("Base")));
                assert_eq!(path.len(), 3);
                assert_eq!(path.first(), path.last());
            }
            other => panic!("expected CycleDetected, got: {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("cyclic type hierarchy detected"));
        assert!(msg.contains("->"));
    }

    #[test]
    fn target_restricts_annotation_placement() {
        let mut b = TypeTable::builder();
        annotation_types(&mut b);
        b.register(
            TypeDescriptor::class::<Base>()
                .annotation(Marker)
                .method(MethodDescriptor::new::<()>("run").annotation(FieldOnly)),
        );

        match b.build().unwrap_err() {
            TableError::TargetViolation {
                annotation,
                element,
                kind,
            } => {
                assert!(annotation.ends_with("FieldOnly"));
                assert!(element.ends_with("Base::run"));
                assert_eq!(kind, ElementKind::Method);
            }
            other => panic!("expected TargetViolation, got: {other:?}"),
        }
    }

    #[test]
    fn member_blocks_are_merged_into_their_type() {
        let mut b = TypeTable::builder();
        b.register(TypeDescriptor::class::<Base>().method(MethodDescriptor::new::<()>("a")));
        b.extend_members(
            TypeKey::of::<Base>(),
            MemberBlock::new().method(MethodDescriptor::new::<()>("b")),
        );
        let table = b.build().unwrap();
        let names: Vec<_> = table
            .get_of::<Base>()
            .map(|t| t.methods().map(|m| m.name()).collect())
            .unwrap_or_default();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn member_blocks_merge_in_declaration_order() {
        let mut b = TypeTable::builder();
        b.register(TypeDescriptor::class::<Base>());
        // discovery hands blocks over in reverse
        b.extend_members(
            TypeKey::of::<Base>(),
            MemberBlock::new()
                .at("app::conn", 30, 1)
                .method(MethodDescriptor::new::<()>("third")),
        )
        .extend_members(
            TypeKey::of::<Base>(),
            MemberBlock::new()
                .at("app::conn", 20, 1)
                .method(MethodDescriptor::new::<()>("close").annotation(Marker)),
        )
        .extend_members(
            TypeKey::of::<Base>(),
            MemberBlock::new()
                .at("app::conn", 10, 1)
                .method(MethodDescriptor::new::<()>("first"))
                .method(MethodDescriptor::new::<()>("close")),
        );
        let table = b.build().unwrap();
        let base = table.get_of::<Base>().unwrap();

        let names: Vec<_> = base.methods().map(|m| m.name()).collect();
        assert_eq!(names, vec!["first", "close", "close", "third"]);
        let close = base.declared_method("close", &[]).unwrap();
        assert!(close.annotations().is_empty());
    }

    #[test]
    fn unresolved_key_is_a_distinct_failure() {
        let table = TypeTable::builder().build().unwrap();
        assert!(table.is_empty());
        assert!(matches!(
            table.resolve(TypeKey::of::<Base>()),
            Err(MetaError::UnresolvedType { .. })
        ));
    }
}
