//! # MetaKit - Declarative Type Metadata & Annotation Discovery
//!
//! A read-only query engine over declarative type metadata: class/interface
//! hierarchies, declared members and the annotations attached to them.
//!
//! ## Features
//!
//! - **Declarative**: `#[metatype(...)]` / `#[metamethods]` describe types at build time
//! - **Auto-discovery**: descriptors are collected via inventory into a validated [`TypeTable`]
//! - **Composable traversal**: superclasses, interfaces, overridden members,
//!   declaring-type fallback and meta-annotations combine freely
//! - **Memoized**: every distinct query is computed once per [`Introspector`]
//!   and the same result sequence is handed to every caller
//!
//! ## Example
//!
//! ```rust,ignore
//! use metakit::{metamethods, metatype};
//!
//! #[metatype(annotation)]
//! #[derive(Debug)]
//! pub struct Tag;
//!
//! #[metatype]
//! pub trait Base {
//!     #[annotate(Tag)]
//!     fn run(&self);
//! }
//!
//! #[metatype(interfaces = [Base])]
//! pub struct Impl;
//!
//! #[metamethods]
//! impl Base for Impl {
//!     fn run(&self) {}
//! }
//!
//! let mk = metakit::global()?;
//! let run = mk.on_type_of::<Impl>()?.method("run", &[])?.expect("declared");
//! let tag = mk
//!     .on(run)
//!     .traversing_overridden_members()
//!     .traversing_interfaces()
//!     .find::<Tag>()?;
//! assert!(tag.is_some());
//! ```

// Lets the macros refer to `::metakit` from inside this crate's own tests.
extern crate self as metakit;

pub use inventory;

pub mod annotations;
pub mod cache;
pub mod classes;
pub mod config;
pub mod descriptor;
pub mod element;
pub mod error;
pub mod introspector;
pub mod lang;
pub mod policy;
pub mod predicates;
pub mod table;

pub use annotations::{Annotations, OfType, On};
pub use classes::OnType;
pub use config::IntrospectorConfig;
pub use descriptor::{
    Annotation, AnnotationValue, BlockOrigin, ConstructorDescriptor, FieldDescriptor, MemberBlock,
    MethodDescriptor, TypeDescriptor, TypeKey, TypeKind,
};
pub use element::{ConstructorRef, Element, ElementKind, Executable, FieldRef, MethodRef, TypeRef};
pub use error::MetaError;
pub use introspector::{global, init, Introspector};
pub use policy::{TraversalContext, TraversalPolicy};
pub use table::{Registrator, TableError, TypeTable, TypeTableBuilder};

pub use metakit_macros::{metamethods, metatype};
