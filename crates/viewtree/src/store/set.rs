use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::ops::Bound;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use viewtree_core::{BaseCollection, DefaultBase, ElementOrdering, ValidatorChain};

use super::SetElement;
use crate::range::KeyRange;

/// Hash set iterated in insertion order.
#[derive(Debug, Clone)]
struct LinkedSet<E> {
    order: BTreeMap<u64, E>,
    slots: HashMap<E, u64>,
    next: u64,
}

impl<E: SetElement> LinkedSet<E> {
    fn new() -> Self {
        Self {
            order: BTreeMap::new(),
            slots: HashMap::new(),
            next: 0,
        }
    }

    fn insert(&mut self, element: E) -> bool {
        if self.slots.contains_key(&element) {
            return false;
        }
        self.slots.insert(element.clone(), self.next);
        self.order.insert(self.next, element);
        self.next += 1;
        true
    }

    fn remove(&mut self, element: &E) -> bool {
        match self.slots.remove(element) {
            Some(slot) => {
                self.order.remove(&slot);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
enum SetRepr<E> {
    Hashed(HashSet<E>),
    Linked(LinkedSet<E>),
    Sorted(BTreeSet<E>),
}

/// The canonical set behind a set view and its range views.
#[derive(Clone)]
pub struct SetStore<E> {
    repr: SetRepr<E>,
    validators: ValidatorChain<E>,
}

impl<E: SetElement> SetStore<E> {
    /// Create an empty store with the given ordering.
    pub fn new(ordering: ElementOrdering) -> Self {
        let repr = match ordering {
            ElementOrdering::Hashed => SetRepr::Hashed(HashSet::new()),
            ElementOrdering::Linked => SetRepr::Linked(LinkedSet::new()),
            ElementOrdering::Sorted => SetRepr::Sorted(BTreeSet::new()),
        };
        Self {
            repr,
            validators: ValidatorChain::new(),
        }
    }

    /// Create a store holding `elements`.
    pub fn from_elements(ordering: ElementOrdering, elements: impl IntoIterator<Item = E>) -> Self {
        let mut store = Self::new(ordering);
        for element in elements {
            store.insert(element);
        }
        store
    }

    /// The ordering of this store.
    pub fn ordering(&self) -> ElementOrdering {
        match self.repr {
            SetRepr::Hashed(_) => ElementOrdering::Hashed,
            SetRepr::Linked(_) => ElementOrdering::Linked,
            SetRepr::Sorted(_) => ElementOrdering::Sorted,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match &self.repr {
            SetRepr::Hashed(set) => set.len(),
            SetRepr::Linked(set) => set.slots.len(),
            SetRepr::Sorted(set) => set.len(),
        }
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the element is present.
    pub fn contains(&self, element: &E) -> bool {
        match &self.repr {
            SetRepr::Hashed(set) => set.contains(element),
            SetRepr::Linked(set) => set.slots.contains_key(element),
            SetRepr::Sorted(set) => set.contains(element),
        }
    }

    /// Iterate in store order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        match &self.repr {
            SetRepr::Hashed(set) => Box::new(set.iter()),
            SetRepr::Linked(set) => Box::new(set.order.values()),
            SetRepr::Sorted(set) => Box::new(set.iter()),
        }
    }

    /// The elements inside `range`, in store order (or reversed).
    ///
    /// Unordered stores are filtered; sorted stores use a range scan.
    pub(crate) fn collect_range(&self, range: &KeyRange<E>, descending: bool) -> Vec<E> {
        let mut elements: Vec<E> = match &self.repr {
            SetRepr::Sorted(_) if range.is_empty() => Vec::new(),
            SetRepr::Sorted(set) => set.range::<E, _>(range.bounds()).cloned().collect(),
            _ if range.is_full() => self.iter().cloned().collect(),
            _ => self.iter().filter(|e| range.contains(e)).cloned().collect(),
        };
        if descending {
            elements.reverse();
        }
        elements
    }

    /// The element of a sorted store nearest to `key` inside `range`.
    ///
    /// Searches below `key` when `below` is set, above it otherwise; `key`
    /// itself qualifies when `inclusive`. Unsorted stores have no neighbours.
    pub(crate) fn nearest(&self, range: &KeyRange<E>, key: &E, below: bool, inclusive: bool) -> Option<E> {
        let SetRepr::Sorted(set) = &self.repr else {
            return None;
        };
        let edge = if inclusive {
            Bound::Included(key)
        } else {
            Bound::Excluded(key)
        };
        let found = if below {
            set.range::<E, _>((Bound::Unbounded, edge))
                .rev()
                .find(|element| range.contains(element))
        } else {
            set.range::<E, _>((edge, Bound::Unbounded))
                .find(|element| range.contains(element))
        };
        found.cloned()
    }

    /// Insert an element; returns `false` if it was already present.
    pub fn insert(&mut self, element: E) -> bool {
        match &mut self.repr {
            SetRepr::Hashed(set) => set.insert(element),
            SetRepr::Linked(set) => set.insert(element),
            SetRepr::Sorted(set) => set.insert(element),
        }
    }

    /// Remove an element; returns `false` if it was absent.
    pub fn remove(&mut self, element: &E) -> bool {
        match &mut self.repr {
            SetRepr::Hashed(set) => set.remove(element),
            SetRepr::Linked(set) => set.remove(element),
            SetRepr::Sorted(set) => set.remove(element),
        }
    }
}

impl<E: SetElement> Default for SetStore<E> {
    fn default() -> Self {
        Self::new(ElementOrdering::default())
    }
}

impl<E: SetElement> fmt::Debug for SetStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetStore")
            .field("ordering", &self.ordering())
            .field("elements", &self.iter().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<E: SetElement> PartialEq for SetStore<E> {
    fn eq(&self, other: &Self) -> bool {
        self.ordering() == other.ordering()
            && self.len() == other.len()
            && self.iter().all(|element| other.contains(element))
    }
}

impl<E: SetElement> BaseCollection for SetStore<E> {
    type Validators = ValidatorChain<E>;

    fn validators(&self) -> &Self::Validators {
        &self.validators
    }

    fn validators_mut(&mut self) -> &mut Self::Validators {
        &mut self.validators
    }
}

impl<E: SetElement> DefaultBase for SetStore<E> {
    fn create_default(ordering: ElementOrdering) -> Self {
        Self::new(ordering)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredSet<E> {
    ordering: ElementOrdering,
    elements: Vec<E>,
}

impl<E: SetElement + Serialize> Serialize for SetStore<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StoredSet {
            ordering: self.ordering(),
            elements: self.iter().cloned().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de, E: SetElement + Deserialize<'de>> Deserialize<'de> for SetStore<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = StoredSet::<E>::deserialize(deserializer)?;
        Ok(Self::from_elements(stored.ordering, stored.elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linked_keeps_insertion_order() {
        let mut store = SetStore::from_elements(ElementOrdering::Linked, [3, 1, 2]);
        assert!(!store.insert(1));
        assert!(store.remove(&1));
        store.insert(1);
        assert_eq!(store.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn test_sorted_range_scan() {
        let store = SetStore::from_elements(ElementOrdering::Sorted, [5, 1, 4, 2, 3]);
        let range = KeyRange::full().with_bounds(&2, true, &4, false).unwrap();
        assert_eq!(store.collect_range(&range, false), vec![2, 3]);
        assert_eq!(store.collect_range(&range, true), vec![3, 2]);

        let empty = KeyRange::full().with_bounds(&3, false, &3, false).unwrap();
        assert!(store.collect_range(&empty, false).is_empty());
    }

    #[test]
    fn test_nearest_respects_range() {
        let store = SetStore::from_elements(ElementOrdering::Sorted, [10, 20, 30, 40]);
        let range = KeyRange::full().with_bounds(&15, true, &35, true).unwrap();
        assert_eq!(store.nearest(&range, &30, true, false), Some(20));
        assert_eq!(store.nearest(&range, &30, true, true), Some(30));
        assert_eq!(store.nearest(&range, &20, true, false), None);
        assert_eq!(store.nearest(&range, &50, true, false), Some(30));
        assert_eq!(store.nearest(&range, &30, false, false), None);

        let linked = SetStore::from_elements(ElementOrdering::Linked, [1, 2]);
        assert_eq!(linked.nearest(&KeyRange::full(), &2, true, false), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let store = SetStore::from_elements(ElementOrdering::Linked, ["b".to_string(), "a".to_string()]);
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"ordering":"Linked","elements":["b","a"]}"#);
        let back: SetStore<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
        assert_eq!(back.iter().cloned().collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
