//! Declarative type metadata.
//!
//! Rust has no runtime reflection, so every type the introspector can see is
//! described by a [`TypeDescriptor`] emitted at build time (normally by the
//! `#[metatype]` / `#[metamethods]` macros) and collected into a
//! [`TypeTable`](crate::table::TypeTable).

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a described type.
///
/// Equality and hashing use the [`TypeId`] only. The name is the fully
/// qualified path reported by [`std::any::type_name`] and is what namespace
/// filtering looks at.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name, including the `dyn ` prefix for interfaces.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Full path without the `dyn ` prefix.
    pub fn path(&self) -> &'static str {
        self.name.strip_prefix("dyn ").unwrap_or(self.name)
    }

    /// Last path segment, generic arguments excluded.
    pub fn short_name(&self) -> &'static str {
        let path = self.path();
        let base = path.split('<').next().unwrap_or(path);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Returns true if the type's path starts with `prefix` (e.g. `"std::"`).
    pub fn is_in_namespace(&self, prefix: &str) -> bool {
        self.path().starts_with(prefix)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Enum,
    Interface,
    Annotation,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeKind::Class => "class",
            TypeKind::Enum => "enum",
            TypeKind::Interface => "interface",
            TypeKind::Annotation => "annotation",
        };
        f.write_str(s)
    }
}

/// Value stored inside an [`Annotation`].
///
/// Blanket-implemented for every `Debug + Send + Sync + 'static` type, so any
/// plain struct can serve as an annotation.
pub trait AnnotationValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + fmt::Debug + Send + Sync> AnnotationValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// An annotation instance attached to a type or member.
///
/// Cloning shares the underlying value; two annotations are equal only when
/// they are the same instance.
#[derive(Clone)]
pub struct Annotation {
    key: TypeKey,
    value: Arc<dyn AnnotationValue>,
}

impl Annotation {
    pub fn new<A: AnnotationValue>(value: A) -> Self {
        Self {
            key: TypeKey::of::<A>(),
            value: Arc::new(value),
        }
    }

    /// Key of the annotation's type.
    pub fn annotation_type(&self) -> TypeKey {
        self.key
    }

    pub fn is<A: 'static>(&self) -> bool {
        self.key == TypeKey::of::<A>()
    }

    pub fn downcast_ref<A: 'static>(&self) -> Option<&A> {
        let value: &dyn AnnotationValue = &*self.value;
        value.as_any().downcast_ref::<A>()
    }

    pub fn downcast<A: AnnotationValue>(&self) -> Option<Arc<A>> {
        if !self.is::<A>() {
            return None;
        }
        Arc::clone(&self.value).into_any().downcast::<A>().ok()
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && Arc::ptr_eq(&self.value, &other.value)
    }
}

impl Eq for Annotation {}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:?}", self.value)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:?}", self.value)
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: &'static str,
    field_type: TypeKey,
    annotations: Vec<Annotation>,
    synthetic: bool,
}

impl FieldDescriptor {
    pub fn new<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            field_type: TypeKey::of::<T>(),
            annotations: Vec::new(),
            synthetic: false,
        }
    }

    pub fn annotation<A: AnnotationValue>(mut self, value: A) -> Self {
        self.annotations.push(Annotation::new(value));
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_type(&self) -> TypeKey {
        self.field_type
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    name: &'static str,
    params: Vec<TypeKey>,
    return_type: TypeKey,
    annotations: Vec<Annotation>,
    synthetic: bool,
}

impl MethodDescriptor {
    /// Describes a method returning `R`. Parameters are appended with [`param`](Self::param).
    pub fn new<R: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
            return_type: TypeKey::of::<R>(),
            annotations: Vec::new(),
            synthetic: false,
        }
    }

    pub fn param<T: ?Sized + 'static>(mut self) -> Self {
        self.params.push(TypeKey::of::<T>());
        self
    }

    pub fn annotation<A: AnnotationValue>(mut self, value: A) -> Self {
        self.annotations.push(Annotation::new(value));
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameter_types(&self) -> &[TypeKey] {
        &self.params
    }

    pub fn return_type(&self) -> TypeKey {
        self.return_type
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

#[derive(Debug, Clone)]
pub struct ConstructorDescriptor {
    name: &'static str,
    params: Vec<TypeKey>,
    annotations: Vec<Annotation>,
    synthetic: bool,
}

impl ConstructorDescriptor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
            annotations: Vec::new(),
            synthetic: false,
        }
    }

    pub fn param<T: ?Sized + 'static>(mut self) -> Self {
        self.params.push(TypeKey::of::<T>());
        self
    }

    pub fn annotation<A: AnnotationValue>(mut self, value: A) -> Self {
        self.annotations.push(Annotation::new(value));
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameter_types(&self) -> &[TypeKey] {
        &self.params
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// Factory producing a default instance of a described type.
pub type DefaultFactory = fn() -> Box<dyn Any + Send + Sync>;

fn make_default<T: Default + Send + Sync + 'static>() -> Box<dyn Any + Send + Sync> {
    Box::new(T::default())
}

/// Complete metadata of one type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    key: TypeKey,
    kind: TypeKind,
    superclass: Option<TypeKey>,
    interfaces: Vec<TypeKey>,
    annotations: Vec<Annotation>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    constructors: Vec<ConstructorDescriptor>,
    default_factory: Option<DefaultFactory>,
}

impl TypeDescriptor {
    fn with_kind(key: TypeKey, kind: TypeKind) -> Self {
        Self {
            key,
            kind,
            superclass: None,
            interfaces: Vec::new(),
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            default_factory: None,
        }
    }

    pub fn class<T: 'static>() -> Self {
        Self::with_kind(TypeKey::of::<T>(), TypeKind::Class)
    }

    pub fn enumeration<T: 'static>() -> Self {
        Self::with_kind(TypeKey::of::<T>(), TypeKind::Enum)
    }

    /// Describes an interface; `T` is the trait object type, e.g. `dyn Repository`.
    pub fn interface<T: ?Sized + 'static>() -> Self {
        Self::with_kind(TypeKey::of::<T>(), TypeKind::Interface)
    }

    pub fn annotation_type<T: 'static>() -> Self {
        Self::with_kind(TypeKey::of::<T>(), TypeKind::Annotation)
    }

    pub fn superclass<S: 'static>(mut self) -> Self {
        self.superclass = Some(TypeKey::of::<S>());
        self
    }

    /// Appends an implemented (or, for interfaces, extended) interface.
    pub fn implements<I: ?Sized + 'static>(mut self) -> Self {
        self.interfaces.push(TypeKey::of::<I>());
        self
    }

    pub fn annotation<A: AnnotationValue>(mut self, value: A) -> Self {
        self.annotations.push(Annotation::new(value));
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_default<T: Default + Send + Sync + 'static>(mut self) -> Self {
        self.default_factory = Some(make_default::<T>);
        self
    }

    pub(crate) fn absorb(&mut self, block: MemberBlock) {
        self.methods.extend(block.methods);
        self.constructors.extend(block.constructors);
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn superclass_key(&self) -> Option<TypeKey> {
        self.superclass
    }

    pub fn interfaces(&self) -> &[TypeKey] {
        &self.interfaces
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    pub fn default_factory(&self) -> Option<DefaultFactory> {
        self.default_factory
    }
}

/// Source position of a [`MemberBlock`]: module path, line, column.
pub type BlockOrigin = (&'static str, u32, u32);

/// Members contributed separately from the type declaration (one per `impl` block).
///
/// Blocks of one type are merged in [`origin`](Self::origin) order, so
/// members keep their declaration order whatever order discovery yields.
#[derive(Debug, Clone, Default)]
pub struct MemberBlock {
    origin: BlockOrigin,
    methods: Vec<MethodDescriptor>,
    constructors: Vec<ConstructorDescriptor>,
}

impl MemberBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where the block was declared.
    pub fn at(mut self, module: &'static str, line: u32, column: u32) -> Self {
        self.origin = (module, line, column);
        self
    }

    pub fn origin(&self) -> BlockOrigin {
        self.origin
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.constructors.is_empty()
    }
}
