use serde::{Deserialize, Serialize};

use crate::descriptor::TypeKey;

/// Tunables of an [`Introspector`](crate::Introspector).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntrospectorConfig {
    /// Path prefixes of annotation types that are never reported.
    #[serde(default = "default_reserved_namespaces")]
    pub reserved_namespaces: Vec<String>,
}

pub fn default_reserved_namespaces() -> Vec<String> {
    ["core::", "std::", "alloc::", "metakit::lang::"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for IntrospectorConfig {
    fn default() -> Self {
        Self {
            reserved_namespaces: default_reserved_namespaces(),
        }
    }
}

impl IntrospectorConfig {
    pub fn is_reserved(&self, key: TypeKey) -> bool {
        self.reserved_namespaces
            .iter()
            .any(|ns| key.is_in_namespace(ns))
    }
}
