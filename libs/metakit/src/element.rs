//! Handles over frozen descriptors and the [`Element`] sum type.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::descriptor::{
    Annotation, ConstructorDescriptor, FieldDescriptor, MethodDescriptor, TypeDescriptor, TypeKey,
    TypeKind,
};

/// Shared handle to a registered type.
#[derive(Clone)]
pub struct TypeRef(Arc<TypeDescriptor>);

impl TypeRef {
    pub(crate) fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        Self(descriptor)
    }

    pub fn key(&self) -> TypeKey {
        self.0.key()
    }

    pub fn name(&self) -> &'static str {
        self.0.key().path()
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind()
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.0
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.0.annotations()
    }

    /// True if both handles point at the same frozen descriptor.
    pub fn same_descriptor(&self, other: &TypeRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldRef> + '_ {
        (0..self.0.fields().len()).map(move |index| FieldRef {
            owner: self.clone(),
            index,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodRef> + '_ {
        (0..self.0.methods().len()).map(move |index| MethodRef {
            owner: self.clone(),
            index,
        })
    }

    pub fn constructors(&self) -> impl Iterator<Item = ConstructorRef> + '_ {
        (0..self.0.constructors().len()).map(move |index| ConstructorRef {
            owner: self.clone(),
            index,
        })
    }

    pub fn declared_field(&self, name: &str) -> Option<FieldRef> {
        self.fields().find(|f| f.name() == name)
    }

    pub fn declared_method(&self, name: &str, params: &[TypeKey]) -> Option<MethodRef> {
        self.methods()
            .find(|m| m.name() == name && m.parameter_types() == params)
    }

    /// First declared method with the given name, whatever its parameters.
    pub fn declared_method_named(&self, name: &str) -> Option<MethodRef> {
        self.methods().find(|m| m.name() == name)
    }

    pub fn declared_constructor(&self, name: &str, params: &[TypeKey]) -> Option<ConstructorRef> {
        self.constructors()
            .find(|c| c.name() == name && c.parameter_types() == params)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.name())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    owner: TypeRef,
    index: usize,
}

impl FieldRef {
    pub fn declaring_type(&self) -> &TypeRef {
        &self.owner
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.owner.descriptor().fields()[self.index]
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name()
    }

    pub fn field_type(&self) -> TypeKey {
        self.descriptor().field_type()
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.descriptor().annotations()
    }

    pub fn is_synthetic(&self) -> bool {
        self.descriptor().is_synthetic()
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}: {}",
            self.owner.key().short_name(),
            self.name(),
            self.field_type()
        )
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    owner: TypeRef,
    index: usize,
}

impl MethodRef {
    pub fn declaring_type(&self) -> &TypeRef {
        &self.owner
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name()
    }

    pub fn parameter_types(&self) -> &[TypeKey] {
        self.descriptor().parameter_types()
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.owner.descriptor().methods()[self.index]
    }

    pub fn return_type(&self) -> TypeKey {
        self.descriptor().return_type()
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.descriptor().annotations()
    }

    pub fn is_synthetic(&self) -> bool {
        self.descriptor().is_synthetic()
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}({}) -> {}",
            self.owner.key().short_name(),
            self.name(),
            join_types(self.parameter_types()),
            self.return_type()
        )
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConstructorRef {
    owner: TypeRef,
    index: usize,
}

impl ConstructorRef {
    pub fn declaring_type(&self) -> &TypeRef {
        &self.owner
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name()
    }

    pub fn parameter_types(&self) -> &[TypeKey] {
        self.descriptor().parameter_types()
    }

    pub fn descriptor(&self) -> &ConstructorDescriptor {
        &self.owner.descriptor().constructors()[self.index]
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.descriptor().annotations()
    }

    pub fn is_synthetic(&self) -> bool {
        self.descriptor().is_synthetic()
    }
}

impl fmt::Debug for ConstructorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}({})",
            self.owner.key().short_name(),
            self.name(),
            join_types(self.parameter_types())
        )
    }
}

fn join_types(types: &[TypeKey]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Methods and constructors: the members that can override one another.
pub trait Executable {
    fn name(&self) -> &'static str;
    fn parameter_types(&self) -> &[TypeKey];
    fn declaring_type(&self) -> &TypeRef;
}

impl Executable for MethodRef {
    fn name(&self) -> &'static str {
        self.descriptor().name()
    }

    fn parameter_types(&self) -> &[TypeKey] {
        self.descriptor().parameter_types()
    }

    fn declaring_type(&self) -> &TypeRef {
        &self.owner
    }
}

impl Executable for ConstructorRef {
    fn name(&self) -> &'static str {
        self.descriptor().name()
    }

    fn parameter_types(&self) -> &[TypeKey] {
        self.descriptor().parameter_types()
    }

    fn declaring_type(&self) -> &TypeRef {
        &self.owner
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Type,
    Field,
    Method,
    Constructor,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementKind::Type => "type",
            ElementKind::Field => "field",
            ElementKind::Method => "method",
            ElementKind::Constructor => "constructor",
        };
        f.write_str(s)
    }
}

/// The thing being introspected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Type(TypeRef),
    Field(FieldRef),
    Method(MethodRef),
    Constructor(ConstructorRef),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Type(_) => ElementKind::Type,
            Element::Field(_) => ElementKind::Field,
            Element::Method(_) => ElementKind::Method,
            Element::Constructor(_) => ElementKind::Constructor,
        }
    }

    /// Annotations declared directly on this element.
    pub fn annotations(&self) -> &[Annotation] {
        match self {
            Element::Type(t) => t.annotations(),
            Element::Field(f) => f.annotations(),
            Element::Method(m) => m.annotations(),
            Element::Constructor(c) => c.annotations(),
        }
    }

    /// The type an element belongs to; a type belongs to itself.
    pub fn owner(&self) -> &TypeRef {
        match self {
            Element::Type(t) => t,
            Element::Field(f) => f.declaring_type(),
            Element::Method(m) => m.declaring_type(),
            Element::Constructor(c) => c.declaring_type(),
        }
    }
}

impl From<TypeRef> for Element {
    fn from(value: TypeRef) -> Self {
        Element::Type(value)
    }
}

impl From<FieldRef> for Element {
    fn from(value: FieldRef) -> Self {
        Element::Field(value)
    }
}

impl From<MethodRef> for Element {
    fn from(value: MethodRef) -> Self {
        Element::Method(value)
    }
}

impl From<ConstructorRef> for Element {
    fn from(value: ConstructorRef) -> Self {
        Element::Constructor(value)
    }
}
