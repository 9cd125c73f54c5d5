//! The query entry point and the process-wide instance.

use std::any::Any;
use std::sync::OnceLock;

use crate::annotations::On;
use crate::cache::ContextCache;
use crate::classes::OnType;
use crate::config::IntrospectorConfig;
use crate::descriptor::{Annotation, TypeKey};
use crate::element::{Element, TypeRef};
use crate::error::MetaError;
use crate::policy::TraversalContext;
use crate::table::TypeTable;

/// Owns a frozen [`TypeTable`] and the memoized walk and gather results
/// computed over it.
///
/// All queries take `&self`; an `Introspector` can be shared freely across
/// threads.
pub struct Introspector {
    table: TypeTable,
    config: IntrospectorConfig,
    pub(crate) walks: ContextCache<TraversalContext<TypeKey>, TypeRef>,
    pub(crate) gathers: ContextCache<TraversalContext<Element>, Annotation>,
}

impl Introspector {
    pub fn new(table: TypeTable) -> Self {
        Self::with_config(table, IntrospectorConfig::default())
    }

    pub fn with_config(table: TypeTable, config: IntrospectorConfig) -> Self {
        Self {
            table,
            config,
            walks: ContextCache::new(),
            gathers: ContextCache::new(),
        }
    }

    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    pub fn config(&self) -> &IntrospectorConfig {
        &self.config
    }

    pub fn on_type(&self, ty: &TypeRef) -> OnType<'_> {
        OnType::new(self, ty.clone())
    }

    pub fn on_type_of<T: ?Sized + 'static>(&self) -> Result<OnType<'_>, MetaError> {
        let ty = self.registered::<T>()?;
        Ok(OnType::new(self, ty.clone()))
    }

    pub fn on(&self, subject: impl Into<Element>) -> On<'_> {
        On::new(self, subject.into())
    }

    /// Creates a value through the default factory registered for `ty`.
    pub fn instantiate_default(&self, ty: &TypeRef) -> Result<Box<dyn Any + Send + Sync>, MetaError> {
        self.check_registered(ty)?;
        let factory = ty
            .descriptor()
            .default_factory()
            .ok_or(MetaError::NotInstantiable(ty.name()))?;
        Ok(factory())
    }

    pub fn instantiate_default_of<T: Any>(&self) -> Result<Box<T>, MetaError> {
        let ty = self.registered::<T>()?;
        self.instantiate_default(ty)?
            .downcast::<T>()
            .map_err(|_| MetaError::NotInstantiable(ty.name()))
    }

    /// Number of distinct walk contexts memoized so far.
    pub fn cached_walks(&self) -> usize {
        self.walks.len()
    }

    /// Number of distinct annotation contexts memoized so far.
    pub fn cached_gathers(&self) -> usize {
        self.gathers.len()
    }

    fn registered<T: ?Sized + 'static>(&self) -> Result<&TypeRef, MetaError> {
        self.table.get_of::<T>().ok_or_else(|| {
            MetaError::invalid(format!(
                "type '{}' is not registered",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Rejects handles that were not produced by this introspector's table.
    pub(crate) fn check_registered(&self, ty: &TypeRef) -> Result<(), MetaError> {
        match self.table.get(ty.key()) {
            Some(own) if own.same_descriptor(ty) => Ok(()),
            _ => Err(MetaError::invalid(format!(
                "type '{ty}' does not belong to this introspector"
            ))),
        }
    }
}

static GLOBAL: OnceLock<Introspector> = OnceLock::new();

/// Installs the process-wide introspector over every type registered through
/// the macros. Fails with [`MetaError::AlreadyInitialized`] on a second call or
/// after [`global`] already created the default instance.
pub fn init(config: IntrospectorConfig) -> Result<&'static Introspector, MetaError> {
    if GLOBAL.get().is_some() {
        return Err(MetaError::AlreadyInitialized);
    }
    let table = TypeTable::discover_and_build()?;
    tracing::info!(types = table.len(), "metakit introspector initialized");
    GLOBAL
        .set(Introspector::with_config(table, config))
        .map_err(|_| MetaError::AlreadyInitialized)?;
    GLOBAL.get().ok_or(MetaError::AlreadyInitialized)
}

/// The process-wide introspector; built with the default configuration on
/// first use unless [`init`] ran before.
pub fn global() -> Result<&'static Introspector, MetaError> {
    if let Some(i) = GLOBAL.get() {
        return Ok(i);
    }
    let table = TypeTable::discover_and_build()?;
    // a concurrent initializer may win; everyone ends up with the installed one
    let _ = GLOBAL.set(Introspector::new(table));
    GLOBAL.get().ok_or(MetaError::AlreadyInitialized)
}
