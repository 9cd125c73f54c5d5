//! Annotation gathering and the `On` query builder.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::descriptor::{Annotation, AnnotationValue, TypeKey};
use crate::element::{Element, TypeRef};
use crate::error::MetaError;
use crate::introspector::Introspector;
use crate::policy::{TraversalContext, TraversalPolicy};
use crate::predicates::is_equivalent;

/// An ordered, cached annotation sequence. Earlier entries are closer to the
/// subject.
///
/// Cloning is cheap; clones share the sequence stored in the cache.
#[derive(Clone)]
pub struct Annotations(Arc<[Annotation]>);

impl Annotations {
    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.0
    }

    /// True if both wrap the very same cached sequence.
    pub fn ptr_eq(&self, other: &Annotations) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Lazy view over the entries of type `A`, in sequence order.
    pub fn of_type<A: AnnotationValue>(&self) -> OfType<A> {
        OfType {
            items: Arc::clone(&self.0),
            pos: 0,
            _marker: PhantomData,
        }
    }

    pub fn first_of<A: AnnotationValue>(&self) -> Option<Arc<A>> {
        self.of_type::<A>().next()
    }

    pub fn first_by_key(&self, key: TypeKey) -> Option<&Annotation> {
        self.0.iter().find(|a| a.annotation_type() == key)
    }
}

impl PartialEq for Annotations {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Annotations {}

impl fmt::Debug for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Annotations {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Iterator returned by [`Annotations::of_type`] and [`On::find_all_of`].
pub struct OfType<A> {
    items: Arc<[Annotation]>,
    pos: usize,
    _marker: PhantomData<fn() -> A>,
}

impl<A: AnnotationValue> Iterator for OfType<A> {
    type Item = Arc<A>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(a) = self.items.get(self.pos) {
            self.pos += 1;
            if let Some(v) = a.downcast::<A>() {
                return Some(v);
            }
        }
        None
    }
}

impl Introspector {
    pub(crate) fn gather(
        &self,
        subject: &Element,
        policy: TraversalPolicy,
    ) -> Result<Annotations, MetaError> {
        validate(subject, policy)?;
        self.check_registered(subject.owner())?;

        let ctx = TraversalContext::new(subject.clone(), policy);
        let items = self.gathers.get_or_try_insert_with(ctx, |ctx| {
            let items = self.collect_all(ctx.subject(), ctx.policy())?;
            tracing::trace!(subject = ?ctx.subject(), policy = ?ctx.policy(), annotations = items.len(), "gathered annotations");
            Ok::<_, MetaError>(items)
        })?;
        Ok(Annotations(items))
    }

    fn collect_all(
        &self,
        subject: &Element,
        policy: TraversalPolicy,
    ) -> Result<Vec<Annotation>, MetaError> {
        let mut out = Vec::new();
        for carrier in self.carriers(subject, policy)? {
            match carrier {
                Element::Type(t) if policy.expands_type_graph() => {
                    for ty in self.walk(&t, policy)?.iter() {
                        self.collect_from(&Element::Type(ty.clone()), policy, &mut out)?;
                    }
                }
                other => self.collect_from(&other, policy, &mut out)?,
            }
        }
        Ok(out)
    }

    /// Elements whose declared annotations are read, closest first.
    fn carriers(&self, subject: &Element, policy: TraversalPolicy) -> Result<Vec<Element>, MetaError> {
        let fallback = |out: &mut Vec<Element>, ty: &TypeRef| {
            if policy.fallback_to_declaring_type {
                out.push(Element::Type(ty.clone()));
            }
        };

        let mut out = vec![subject.clone()];
        match subject {
            Element::Type(_) => {}
            Element::Field(f) => fallback(&mut out, f.declaring_type()),
            Element::Method(m) => {
                fallback(&mut out, m.declaring_type());
                if policy.traverse_overridden_members {
                    for ty in self.walk(m.declaring_type(), policy)?.iter() {
                        for candidate in ty.methods() {
                            if candidate == *m || candidate.is_synthetic() || !is_equivalent(m, &candidate) {
                                continue;
                            }
                            out.push(Element::Method(candidate));
                            fallback(&mut out, ty);
                        }
                    }
                }
            }
            Element::Constructor(c) => {
                fallback(&mut out, c.declaring_type());
                if policy.traverse_overridden_members {
                    for ty in self.walk(c.declaring_type(), policy)?.iter() {
                        for candidate in ty.constructors() {
                            if candidate == *c || candidate.is_synthetic() || !is_equivalent(c, &candidate) {
                                continue;
                            }
                            out.push(Element::Constructor(candidate));
                            fallback(&mut out, ty);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn collect_from(
        &self,
        element: &Element,
        policy: TraversalPolicy,
        out: &mut Vec<Annotation>,
    ) -> Result<(), MetaError> {
        let mut path = Vec::new();
        if let Element::Type(t) = element {
            path.push(t.key());
        }
        self.collect(element.annotations(), policy, &mut path, out)
    }

    /// Appends surviving annotations depth-first. `path` holds the annotation
    /// types being expanded on the current recursion branch, the carrier
    /// itself first when it is a type.
    fn collect(
        &self,
        annotations: &[Annotation],
        policy: TraversalPolicy,
        path: &mut Vec<TypeKey>,
        out: &mut Vec<Annotation>,
    ) -> Result<(), MetaError> {
        for a in annotations {
            let key = a.annotation_type();
            if self.config().is_reserved(key) || path.last() == Some(&key) {
                continue;
            }
            out.push(a.clone());

            if policy.include_meta_annotations && !path.contains(&key) {
                let annotation_type = self.table().resolve(key)?;
                path.push(key);
                let res = self.collect(annotation_type.annotations(), policy, path, out);
                path.pop();
                res?;
            }
        }
        Ok(())
    }
}

fn validate(subject: &Element, policy: TraversalPolicy) -> Result<(), MetaError> {
    match subject {
        Element::Type(t) if policy.traverse_overridden_members => Err(MetaError::invalid(format!(
            "overridden-member traversal does not apply to type '{t}'"
        ))),
        Element::Type(t) if policy.fallback_to_declaring_type => Err(MetaError::invalid(format!(
            "type '{t}' has no declaring type to fall back on"
        ))),
        Element::Field(f) if policy.traverse_overridden_members => Err(MetaError::invalid(format!(
            "overridden-member traversal does not apply to field '{f:?}'"
        ))),
        _ => Ok(()),
    }
}

/// Query builder for the annotations reachable from one subject element.
///
/// Options compose freely; combinations that make no sense for the subject
/// kind are rejected by the terminal operation with
/// [`MetaError::InvalidArgument`].
#[derive(Clone)]
pub struct On<'i> {
    introspector: &'i Introspector,
    subject: Element,
    policy: TraversalPolicy,
}

impl<'i> On<'i> {
    pub(crate) fn new(introspector: &'i Introspector, subject: Element) -> Self {
        Self {
            introspector,
            subject,
            policy: TraversalPolicy::new(),
        }
    }

    /// Field, method and constructor subjects only.
    pub fn falling_back_on_declaring_type(mut self) -> Self {
        self.policy.fallback_to_declaring_type = true;
        self
    }

    /// Method and constructor subjects only.
    pub fn traversing_overridden_members(mut self) -> Self {
        self.policy.traverse_overridden_members = true;
        self
    }

    pub fn traversing_superclasses(mut self) -> Self {
        self.policy.traverse_superclasses = true;
        self
    }

    pub fn traversing_interfaces(mut self) -> Self {
        self.policy.traverse_interfaces = true;
        self
    }

    pub fn including_meta_annotations(mut self) -> Self {
        self.policy.include_meta_annotations = true;
        self
    }

    pub fn subject(&self) -> &Element {
        &self.subject
    }

    pub fn policy(&self) -> TraversalPolicy {
        self.policy
    }

    /// Every annotation found, closest first.
    pub fn find_all(&self) -> Result<Annotations, MetaError> {
        self.introspector.gather(&self.subject, self.policy)
    }

    /// The closest annotation of type `A`.
    pub fn find<A: AnnotationValue>(&self) -> Result<Option<Arc<A>>, MetaError> {
        Ok(self.find_all()?.first_of::<A>())
    }

    pub fn find_all_of<A: AnnotationValue>(&self) -> Result<OfType<A>, MetaError> {
        Ok(self.find_all()?.of_type::<A>())
    }

    /// The closest annotation whose type is `key`, left type-erased.
    pub fn find_by_key(&self, key: TypeKey) -> Result<Option<Annotation>, MetaError> {
        Ok(self.find_all()?.first_by_key(key).cloned())
    }
}
