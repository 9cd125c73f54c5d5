//! Traversal options and the memoization key built from them.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// Independent, composable traversal flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TraversalPolicy {
    pub traverse_superclasses: bool,
    pub traverse_interfaces: bool,
    /// Only meaningful for method and constructor subjects.
    pub traverse_overridden_members: bool,
    /// Also inspect the declaring type of a member subject.
    pub fallback_to_declaring_type: bool,
    pub include_meta_annotations: bool,
}

impl TraversalPolicy {
    pub const fn new() -> Self {
        Self {
            traverse_superclasses: false,
            traverse_interfaces: false,
            traverse_overridden_members: false,
            fallback_to_declaring_type: false,
            include_meta_annotations: false,
        }
    }

    pub const fn with_superclasses(mut self) -> Self {
        self.traverse_superclasses = true;
        self
    }

    pub const fn with_interfaces(mut self) -> Self {
        self.traverse_interfaces = true;
        self
    }

    pub const fn with_overridden_members(mut self) -> Self {
        self.traverse_overridden_members = true;
        self
    }

    pub const fn with_declaring_type_fallback(mut self) -> Self {
        self.fallback_to_declaring_type = true;
        self
    }

    pub const fn with_meta_annotations(mut self) -> Self {
        self.include_meta_annotations = true;
        self
    }

    /// True if type carriers are expanded into their walked hierarchy.
    pub const fn expands_type_graph(&self) -> bool {
        self.traverse_superclasses || self.traverse_interfaces
    }

    /// The subset of flags the class graph walker looks at.
    pub const fn walk_flags(&self) -> TraversalPolicy {
        TraversalPolicy {
            traverse_superclasses: self.traverse_superclasses,
            traverse_interfaces: self.traverse_interfaces,
            ..TraversalPolicy::new()
        }
    }
}

/// (subject, policy) pair used as a cache key.
///
/// Immutable after construction; the hash is computed on first use and kept
/// on the instance.
pub struct TraversalContext<S> {
    subject: S,
    policy: TraversalPolicy,
    hash: OnceLock<u64>,
}

impl<S> TraversalContext<S> {
    pub fn new(subject: S, policy: TraversalPolicy) -> Self {
        Self {
            subject,
            policy,
            hash: OnceLock::new(),
        }
    }

    pub fn subject(&self) -> &S {
        &self.subject
    }

    pub fn policy(&self) -> TraversalPolicy {
        self.policy
    }
}

impl<S: Hash> TraversalContext<S> {
    fn cached_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.subject.hash(&mut hasher);
            self.policy.hash(&mut hasher);
            hasher.finish()
        })
    }
}

impl<S: Hash> Hash for TraversalContext<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.cached_hash());
    }
}

impl<S: PartialEq> PartialEq for TraversalContext<S> {
    fn eq(&self, other: &Self) -> bool {
        self.policy == other.policy && self.subject == other.subject
    }
}

impl<S: Eq> Eq for TraversalContext<S> {}

impl<S: Clone> Clone for TraversalContext<S> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            policy: self.policy,
            hash: self.hash.clone(),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for TraversalContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalContext")
            .field("subject", &self.subject)
            .field("policy", &self.policy)
            .finish()
    }
}
