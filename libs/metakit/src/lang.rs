//! Built-in annotations interpreted by the engine itself.
//!
//! This namespace is reserved by default: annotations of these types are
//! checked when the table is built and never show up in query results.

use crate::element::ElementKind;

/// Restricts the kinds of element an annotation type may be applied to.
///
/// ```rust,ignore
/// #[metatype(annotation, annotations = [Target(&[ElementKind::Method])])]
/// #[derive(Debug)]
/// pub struct Transactional;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target(pub &'static [ElementKind]);

impl Target {
    pub fn permits(&self, kind: ElementKind) -> bool {
        self.0.contains(&kind)
    }
}
