use std::fmt;

use serde::{Deserialize, Serialize};
use viewtree_core::{BaseCollection, DefaultBase, ElementOrdering, ValidatorChain};

use super::ListElement;

/// The canonical vector behind a list and its sublists.
///
/// A unique store never holds two equal elements: inserting an element
/// that is already present removes the existing occurrence.
#[derive(Clone, Serialize, Deserialize)]
pub struct ListStore<E> {
    items: Vec<E>,
    #[serde(default)]
    unique: bool,
    #[serde(skip)]
    validators: ValidatorChain<E>,
}

impl<E> ListStore<E> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Wrap a vector.
    pub fn from_vec(items: Vec<E>) -> Self {
        Self {
            items,
            unique: false,
            validators: ValidatorChain::new(),
        }
    }

    /// The elements.
    pub fn as_slice(&self) -> &[E] {
        &self.items
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether equal elements are evicted on insertion.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Unwrap the vector.
    pub fn into_vec(self) -> Vec<E> {
        self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<E> {
        &mut self.items
    }
}

impl<E: PartialEq> ListStore<E> {
    /// Wrap a vector in unique mode, keeping the first of equal elements.
    pub fn unique_from(items: Vec<E>) -> Self {
        let mut kept: Vec<E> = Vec::with_capacity(items.len());
        for item in items {
            if !kept.contains(&item) {
                kept.push(item);
            }
        }
        Self {
            items: kept,
            unique: true,
            validators: ValidatorChain::new(),
        }
    }

    /// Position of an element equal to `element`.
    pub fn position(&self, element: &E) -> Option<usize> {
        self.items.iter().position(|item| item == element)
    }
}

impl<E> Default for ListStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Debug> fmt::Debug for ListStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListStore")
            .field("items", &self.items)
            .field("unique", &self.unique)
            .finish_non_exhaustive()
    }
}

impl<E: PartialEq> PartialEq for ListStore<E> {
    fn eq(&self, other: &Self) -> bool {
        self.unique == other.unique && self.items == other.items
    }
}

impl<E: ListElement> BaseCollection for ListStore<E> {
    type Validators = ValidatorChain<E>;

    fn validators(&self) -> &Self::Validators {
        &self.validators
    }

    fn validators_mut(&mut self) -> &mut Self::Validators {
        &mut self.validators
    }
}

impl<E: ListElement> DefaultBase for ListStore<E> {
    fn create_default(_: ElementOrdering) -> Self {
        Self::new()
    }
}
