//! Class graph walking and the `OnType` query builder.

use std::collections::HashSet;
use std::sync::Arc;

use crate::descriptor::TypeKey;
use crate::element::{ConstructorRef, FieldRef, MethodRef, TypeRef};
use crate::error::MetaError;
use crate::introspector::Introspector;
use crate::policy::{TraversalContext, TraversalPolicy};
use crate::table::TypeTable;

/// Pre-order walk: the start type, then its interfaces in declaration order
/// (each followed by its own super-interfaces), then its superclass chain.
/// A type reachable along several paths is emitted on first visit only.
pub(crate) fn walk_types(
    table: &TypeTable,
    start: &TypeRef,
    policy: TraversalPolicy,
) -> Result<Vec<TypeRef>, MetaError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    visit(table, start, policy, &mut seen, &mut out)?;
    Ok(out)
}

fn visit(
    table: &TypeTable,
    ty: &TypeRef,
    policy: TraversalPolicy,
    seen: &mut HashSet<TypeKey>,
    out: &mut Vec<TypeRef>,
) -> Result<(), MetaError> {
    if !seen.insert(ty.key()) {
        return Ok(());
    }
    out.push(ty.clone());

    if policy.traverse_interfaces {
        for iface in ty.descriptor().interfaces() {
            let iface = table.resolve(*iface)?;
            visit(table, iface, policy, seen, out)?;
        }
    }
    if policy.traverse_superclasses {
        if let Some(sup) = ty.descriptor().superclass_key() {
            let sup = table.resolve(sup)?;
            visit(table, sup, policy, seen, out)?;
        }
    }
    Ok(())
}

impl Introspector {
    /// Cached walk keyed by the start type and the walker-relevant flags.
    pub(crate) fn walk(
        &self,
        start: &TypeRef,
        policy: TraversalPolicy,
    ) -> Result<Arc<[TypeRef]>, MetaError> {
        self.check_registered(start)?;
        let ctx = TraversalContext::new(start.key(), policy.walk_flags());
        self.walks.get_or_try_insert_with(ctx, |ctx| {
            let types = walk_types(self.table(), start, ctx.policy())?;
            tracing::trace!(start = %start, policy = ?ctx.policy(), types = types.len(), "walked type graph");
            Ok(types)
        })
    }
}

/// Query builder over the types reachable from one start type.
///
/// Member views flatten the declared members of the walked types in walk
/// order and leave out synthetic members. Single-member lookups return the
/// nearest match; "not found" is `Ok(None)`.
#[derive(Clone)]
pub struct OnType<'i> {
    introspector: &'i Introspector,
    start: TypeRef,
    policy: TraversalPolicy,
}

impl<'i> OnType<'i> {
    pub(crate) fn new(introspector: &'i Introspector, start: TypeRef) -> Self {
        Self {
            introspector,
            start,
            policy: TraversalPolicy::new(),
        }
    }

    pub fn traversing_superclasses(mut self) -> Self {
        self.policy.traverse_superclasses = true;
        self
    }

    pub fn traversing_interfaces(mut self) -> Self {
        self.policy.traverse_interfaces = true;
        self
    }

    pub fn policy(&self) -> TraversalPolicy {
        self.policy
    }

    /// The walked types, start type first.
    pub fn types(&self) -> Result<Arc<[TypeRef]>, MetaError> {
        self.introspector.walk(&self.start, self.policy)
    }

    pub fn constructors(&self) -> Result<Vec<ConstructorRef>, MetaError> {
        Ok(self
            .types()?
            .iter()
            .flat_map(TypeRef::constructors)
            .filter(|c| !c.is_synthetic())
            .collect())
    }

    pub fn methods(&self) -> Result<Vec<MethodRef>, MetaError> {
        Ok(self
            .types()?
            .iter()
            .flat_map(TypeRef::methods)
            .filter(|m| !m.is_synthetic())
            .collect())
    }

    pub fn fields(&self) -> Result<Vec<FieldRef>, MetaError> {
        Ok(self
            .types()?
            .iter()
            .flat_map(TypeRef::fields)
            .filter(|f| !f.is_synthetic())
            .collect())
    }

    pub fn constructor(
        &self,
        name: &str,
        params: &[TypeKey],
    ) -> Result<Option<ConstructorRef>, MetaError> {
        Ok(self
            .constructors()?
            .into_iter()
            .find(|c| c.name() == name && c.parameter_types() == params))
    }

    pub fn method(&self, name: &str, params: &[TypeKey]) -> Result<Option<MethodRef>, MetaError> {
        Ok(self
            .methods()?
            .into_iter()
            .find(|m| m.name() == name && m.parameter_types() == params))
    }

    /// Like [`method`](Self::method), but the return type must match as well.
    pub fn method_returning(
        &self,
        name: &str,
        return_type: TypeKey,
        params: &[TypeKey],
    ) -> Result<Option<MethodRef>, MetaError> {
        Ok(self.methods()?.into_iter().find(|m| {
            m.name() == name && m.return_type() == return_type && m.parameter_types() == params
        }))
    }

    pub fn field(&self, name: &str) -> Result<Option<FieldRef>, MetaError> {
        Ok(self.fields()?.into_iter().find(|f| f.name() == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        ConstructorDescriptor, FieldDescriptor, MethodDescriptor, TypeDescriptor,
    };

    // Animal <- Dog; Dog: Pet + Trained; Pet: Named; Trained: Named
    trait Named {}
    trait Pet {}
    trait Trained {}
    trait Groomed {}
    struct Animal;
    struct Dog;
    struct Puppy;

    fn table() -> TypeTable {
        let mut b = TypeTable::builder();
        b.register(
            TypeDescriptor::interface::<dyn Named>()
                .method(MethodDescriptor::new::<String>("name")),
        )
        .register(TypeDescriptor::interface::<dyn Pet>().implements::<dyn Named>())
        .register(TypeDescriptor::interface::<dyn Trained>().implements::<dyn Named>())
        .register(TypeDescriptor::interface::<dyn Groomed>())
        .register(
            TypeDescriptor::class::<Animal>()
                .implements::<dyn Groomed>()
                .field(FieldDescriptor::new::<u32>("age"))
                .field(FieldDescriptor::new::<u64>("__tag").synthetic())
                .method(MethodDescriptor::new::<String>("name"))
                .method(MethodDescriptor::new::<Animal>("clone_animal"))
                .constructor(ConstructorDescriptor::new("new").param::<u32>()),
        )
        .register(
            TypeDescriptor::class::<Dog>()
                .superclass::<Animal>()
                .implements::<dyn Pet>()
                .implements::<dyn Trained>()
                .field(FieldDescriptor::new::<String>("breed"))
                .method(MethodDescriptor::new::<String>("name"))
                .method(MethodDescriptor::new::<Dog>("clone_animal"))
                .method(MethodDescriptor::new::<()>("bridge").synthetic())
                .constructor(ConstructorDescriptor::new("new").param::<u32>()),
        )
        .register(TypeDescriptor::class::<Puppy>().superclass::<Dog>());
        b.build().unwrap()
    }

    fn short_names(types: &[TypeRef]) -> Vec<&'static str> {
        types.iter().map(|t| t.key().short_name()).collect()
    }

    fn introspector() -> Introspector {
        Introspector::new(table())
    }

    #[test]
    fn no_flags_yields_only_the_start_type() {
        let i = introspector();
        let types = i.on_type_of::<Puppy>().unwrap().types().unwrap();
        assert_eq!(short_names(&types), vec!["Puppy"]);
    }

    #[test]
    fn superclasses_only() {
        let i = introspector();
        let types = i
            .on_type_of::<Puppy>()
            .unwrap()
            .traversing_superclasses()
            .types()
            .unwrap();
        assert_eq!(short_names(&types), vec!["Puppy", "Dog", "Animal"]);
    }

    #[test]
    fn interfaces_only_stays_on_the_start_type() {
        let i = introspector();
        let types = i
            .on_type_of::<Dog>()
            .unwrap()
            .traversing_interfaces()
            .types()
            .unwrap();
        assert_eq!(short_names(&types), vec!["Dog", "Pet", "Named", "Trained"]);
    }

    #[test]
    fn full_walk_is_preorder_and_deduplicated() {
        let i = introspector();
        let types = i
            .on_type_of::<Puppy>()
            .unwrap()
            .traversing_superclasses()
            .traversing_interfaces()
            .types()
            .unwrap();
        assert_eq!(
            short_names(&types),
            vec!["Puppy", "Dog", "Pet", "Named", "Trained", "Animal", "Groomed"]
        );
        let unique: HashSet<_> = types.iter().map(TypeRef::key).collect();
        assert_eq!(unique.len(), types.len());
    }

    #[test]
    fn walks_are_cached_per_walker_flags() {
        let i = introspector();
        let a = i.on_type_of::<Dog>().unwrap().traversing_superclasses();
        let b = i.on_type_of::<Dog>().unwrap().traversing_superclasses();
        assert!(Arc::ptr_eq(&a.types().unwrap(), &b.types().unwrap()));
        assert_eq!(i.cached_walks(), 1);
    }

    #[test]
    fn member_views_skip_synthetic_members() {
        let i = introspector();
        let q = i.on_type_of::<Dog>().unwrap().traversing_superclasses();

        let fields: Vec<_> = q.fields().unwrap().iter().map(|f| f.name()).collect();
        assert_eq!(fields, vec!["breed", "age"]);

        let methods: Vec<_> = q.methods().unwrap().iter().map(|m| m.name()).collect();
        assert_eq!(methods, vec!["name", "clone_animal", "name", "clone_animal"]);
        assert_eq!(q.constructors().unwrap().len(), 2);
        assert!(q.method("bridge", &[]).unwrap().is_none());
    }

    #[test]
    fn single_member_lookup_returns_nearest_match() {
        let i = introspector();
        let q = i.on_type_of::<Puppy>().unwrap().traversing_superclasses();

        let m = q.method("clone_animal", &[]).unwrap().unwrap();
        assert_eq!(m.declaring_type().key(), TypeKey::of::<Dog>());

        let exact = q
            .method_returning("clone_animal", TypeKey::of::<Animal>(), &[])
            .unwrap()
            .unwrap();
        assert_eq!(exact.declaring_type().key(), TypeKey::of::<Animal>());

        let c = q.constructor("new", &[TypeKey::of::<u32>()]).unwrap().unwrap();
        assert_eq!(c.declaring_type().key(), TypeKey::of::<Dog>());
        assert!(q.constructor("new", &[]).unwrap().is_none());

        let f = q.field("age").unwrap().unwrap();
        assert_eq!(f.declaring_type().key(), TypeKey::of::<Animal>());
        assert!(q.field("__tag").unwrap().is_none());
        assert!(q.field("missing").unwrap().is_none());
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let a = introspector();
        let b = introspector();
        let foreign = b.table().get_of::<Dog>().cloned().unwrap();
        let err = a.on_type(&foreign).types().unwrap_err();
        assert!(matches!(err, MetaError::InvalidArgument(_)));
    }
}
