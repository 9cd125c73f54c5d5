//! Reusable predicates over members and annotations.

use crate::descriptor::{Annotation, TypeKey};
use crate::element::Executable;

/// Two executables occupy the same slot when their names and parameter type
/// lists match. Return types are ignored so covariant overrides still match.
pub fn is_equivalent<A, B>(a: &A, b: &B) -> bool
where
    A: Executable + ?Sized,
    B: Executable + ?Sized,
{
    a.name() == b.name() && a.parameter_types() == b.parameter_types()
}

pub fn executable_is_equivalent_to<R, E>(reference: &R) -> impl Fn(&E) -> bool + '_
where
    R: Executable + ?Sized,
    E: Executable + ?Sized,
{
    move |candidate| is_equivalent(reference, candidate)
}

pub fn annotation_is_of_type(key: TypeKey) -> impl Fn(&Annotation) -> bool {
    move |a| a.annotation_type() == key
}

pub fn annotation_is<A: 'static>() -> impl Fn(&Annotation) -> bool {
    annotation_is_of_type(TypeKey::of::<A>())
}
