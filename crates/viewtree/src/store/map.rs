use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use viewtree_core::{BaseCollection, DefaultBase, ElementOrdering, MapValidators};

use super::{MapValue, SetElement};
use crate::range::KeyRange;

/// Hash map iterated in insertion order.
#[derive(Debug, Clone)]
struct LinkedMap<K, V> {
    order: BTreeMap<u64, K>,
    entries: HashMap<K, (u64, V)>,
    next: u64,
}

impl<K: SetElement, V> LinkedMap<K, V> {
    fn new() -> Self {
        Self {
            order: BTreeMap::new(),
            entries: HashMap::new(),
            next: 0,
        }
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some((_, existing)) = self.entries.get_mut(&key) {
            return Some(std::mem::replace(existing, value));
        }
        self.order.insert(self.next, key.clone());
        self.entries.insert(key, (self.next, value));
        self.next += 1;
        None
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let (slot, value) = self.entries.remove(key)?;
        self.order.remove(&slot);
        Some(value)
    }

    fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.order.values().filter_map(|key| {
            self.entries.get_key_value(key).map(|(key, (_, value))| (key, value))
        })
    }
}

#[derive(Debug, Clone)]
enum MapRepr<K, V> {
    Hashed(HashMap<K, V>),
    Linked(LinkedMap<K, V>),
    Sorted(BTreeMap<K, V>),
}

/// The canonical map behind a map view and all of its projections.
#[derive(Clone)]
pub struct MapStore<K, V> {
    repr: MapRepr<K, V>,
    validators: MapValidators<K, V>,
}

impl<K: SetElement, V: MapValue> MapStore<K, V> {
    /// Create an empty store with the given key ordering.
    pub fn new(ordering: ElementOrdering) -> Self {
        let repr = match ordering {
            ElementOrdering::Hashed => MapRepr::Hashed(HashMap::new()),
            ElementOrdering::Linked => MapRepr::Linked(LinkedMap::new()),
            ElementOrdering::Sorted => MapRepr::Sorted(BTreeMap::new()),
        };
        Self {
            repr,
            validators: MapValidators::default(),
        }
    }

    /// Create a store holding `entries`; later duplicates overwrite earlier ones.
    pub fn from_entries(ordering: ElementOrdering, entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut store = Self::new(ordering);
        for (key, value) in entries {
            store.insert(key, value);
        }
        store
    }

    /// The key ordering of this store.
    pub fn ordering(&self) -> ElementOrdering {
        match self.repr {
            MapRepr::Hashed(_) => ElementOrdering::Hashed,
            MapRepr::Linked(_) => ElementOrdering::Linked,
            MapRepr::Sorted(_) => ElementOrdering::Sorted,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match &self.repr {
            MapRepr::Hashed(map) => map.len(),
            MapRepr::Linked(map) => map.entries.len(),
            MapRepr::Sorted(map) => map.len(),
        }
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        match &self.repr {
            MapRepr::Hashed(map) => map.get(key),
            MapRepr::Linked(map) => map.entries.get(key).map(|(_, value)| value),
            MapRepr::Sorted(map) => map.get(key),
        }
    }

    /// Whether an entry with `key` exists.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Iterate the entries in store order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        match &self.repr {
            MapRepr::Hashed(map) => Box::new(map.iter()),
            MapRepr::Linked(map) => Box::new(map.iter()),
            MapRepr::Sorted(map) => Box::new(map.iter()),
        }
    }

    /// The entries whose key lies inside `range`, in store order (or reversed).
    pub(crate) fn collect_range(&self, range: &KeyRange<K>, descending: bool) -> Vec<(K, V)> {
        let mut entries: Vec<(K, V)> = match &self.repr {
            MapRepr::Sorted(_) if range.is_empty() => Vec::new(),
            MapRepr::Sorted(map) => map
                .range::<K, _>(range.bounds())
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => self
                .iter()
                .filter(|(key, _)| range.contains(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        };
        if descending {
            entries.reverse();
        }
        entries
    }

    /// Insert or overwrite an entry, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match &mut self.repr {
            MapRepr::Hashed(map) => map.insert(key, value),
            MapRepr::Linked(map) => map.insert(key, value),
            MapRepr::Sorted(map) => map.insert(key, value),
        }
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        match &mut self.repr {
            MapRepr::Hashed(map) => map.remove(key),
            MapRepr::Linked(map) => map.remove(key),
            MapRepr::Sorted(map) => map.remove(key),
        }
    }
}

impl<K: SetElement, V: MapValue> Default for MapStore<K, V> {
    fn default() -> Self {
        Self::new(ElementOrdering::default())
    }
}

impl<K: SetElement, V: MapValue> fmt::Debug for MapStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapStore")
            .field("ordering", &self.ordering())
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<K: SetElement, V: MapValue> PartialEq for MapStore<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.ordering() == other.ordering()
            && self.len() == other.len()
            && self.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: SetElement, V: MapValue> BaseCollection for MapStore<K, V> {
    type Validators = MapValidators<K, V>;

    fn validators(&self) -> &Self::Validators {
        &self.validators
    }

    fn validators_mut(&mut self) -> &mut Self::Validators {
        &mut self.validators
    }
}

impl<K: SetElement, V: MapValue> DefaultBase for MapStore<K, V> {
    fn create_default(ordering: ElementOrdering) -> Self {
        Self::new(ordering)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredMap<K, V> {
    ordering: ElementOrdering,
    entries: Vec<(K, V)>,
}

impl<K, V> Serialize for MapStore<K, V>
where
    K: SetElement + Serialize,
    V: MapValue + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StoredMap {
            ordering: self.ordering(),
            entries: self
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
        .serialize(serializer)
    }
}

impl<'de, K, V> Deserialize<'de> for MapStore<K, V>
where
    K: SetElement + Deserialize<'de>,
    V: MapValue + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = StoredMap::<K, V>::deserialize(deserializer)?;
        Ok(Self::from_entries(stored.ordering, stored.entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linked_overwrite_keeps_position() {
        let mut store = MapStore::from_entries(ElementOrdering::Linked, [(2, "b"), (1, "a")]);
        assert_eq!(store.insert(2, "B"), Some("b"));
        let keys: Vec<_> = store.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![2, 1]);
        assert_eq!(store.remove(&2), Some("B"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sorted_range() {
        let store = MapStore::from_entries(ElementOrdering::Sorted, (1..=5).map(|k| (k, k * 10)));
        let range = KeyRange::full().with_lower(&3, true).unwrap();
        assert_eq!(store.collect_range(&range, true), vec![(5, 50), (4, 40), (3, 30)]);
    }

    #[test]
    fn test_serde_round_trip() {
        let store = MapStore::from_entries(ElementOrdering::Sorted, [(1, "one".to_string())]);
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"ordering":"Sorted","entries":[[1,"one"]]}"#);
        let back: MapStore<i32, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
