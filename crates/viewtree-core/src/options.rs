//! Configuration for root data.
//!
//! [`RootOptions`] controls how a root obtains and protects its base:
//!
//! ```
//! use viewtree_core::{ElementOrdering, RootOptions, RootPolicy};
//!
//! let options = RootOptions::new()
//!     .with_policy(RootPolicy::SetOnce)
//!     .with_ordering(ElementOrdering::Sorted);
//!
//! assert_eq!(options.policy, RootPolicy::SetOnce);
//! assert!(options.dispatchable);
//! ```

use serde::{Deserialize, Serialize};

/// How the base of a root may be created and replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootPolicy {
    /// The base is created on first access and may be replaced at any time.
    #[default]
    Lazy,
    /// The base exists from construction onwards and can never become null.
    ConstructOnly,
    /// Once a base is present it can never be replaced.
    SetOnce,
}

/// Ordering and equality descriptor for default bases.
///
/// The default-base factory is keyed on this value: a hashed set and a sorted
/// set are different bases for the same element type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementOrdering {
    /// Hash-based equality with no defined iteration order.
    #[default]
    Hashed,
    /// Hash-based equality, iterated in insertion order.
    Linked,
    /// Total ordering of the elements (keys for maps).
    Sorted,
}

impl ElementOrdering {
    /// Whether iteration follows a defined order.
    pub fn is_ordered(self) -> bool {
        !matches!(self, Self::Hashed)
    }

    /// Whether range views (head, tail, sub) are available.
    pub fn is_navigable(self) -> bool {
        matches!(self, Self::Sorted)
    }
}

/// Options used to construct root data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootOptions {
    /// How the base may be created and replaced.
    pub policy: RootPolicy,
    /// Descriptor handed to the default-base factory.
    pub ordering: ElementOrdering,
    /// Whether modification events are dispatched at all.
    pub dispatchable: bool,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            policy: RootPolicy::default(),
            ordering: ElementOrdering::default(),
            dispatchable: true,
        }
    }
}

impl RootOptions {
    /// Create the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base policy.
    pub fn with_policy(mut self, policy: RootPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the ordering descriptor used for default bases.
    pub fn with_ordering(mut self, ordering: ElementOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Enable or suppress event dispatch.
    pub fn with_dispatchable(mut self, dispatchable: bool) -> Self {
        self.dispatchable = dispatchable;
        self
    }
}
