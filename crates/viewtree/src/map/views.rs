use std::fmt;
use std::sync::Arc;

use viewtree_core::{ElementListener, KeySetElementListener, MapElementListener, MapViewInfo, ViewError, ViewResult};

use super::iter::{EntryIter, KeyIter, ValueIter};
use super::{apply_map_op, MapKind, MapOp};
use crate::handle::{common_view_ops, ViewHandle};
use crate::store::{MapStore, MapValue, SetElement};

/// The keys of a map view.
///
/// Removing a key removes its entry. Keys cannot be added through the key set.
pub struct KeySetView<K: SetElement, V: MapValue> {
    handle: ViewHandle<MapKind<K, V>>,
}

impl<K: SetElement, V: MapValue> KeySetView<K, V> {
    pub(crate) fn new(handle: ViewHandle<MapKind<K, V>>) -> Self {
        Self { handle }
    }

    #[cfg(test)]
    pub(crate) fn handle(&self) -> &ViewHandle<MapKind<K, V>> {
        &self.handle
    }

    /// Whether both handles refer to the same view.
    pub fn same_view(&self, other: &Self) -> bool {
        self.handle.same_node(&other.handle)
    }

    /// Number of keys.
    pub fn len(&self) -> ViewResult<usize> {
        self.handle.read(|store, window| Ok(window.count(store)))
    }

    /// Whether the key set is empty.
    pub fn is_empty(&self) -> ViewResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// Whether `key` is visible.
    pub fn contains(&self, key: &K) -> ViewResult<bool> {
        self.handle.read(|store, window| Ok(window.get(store, key).is_some()))
    }

    /// Copy the keys, in view order.
    pub fn to_vec(&self) -> ViewResult<Vec<K>> {
        self.handle
            .read(|store, window| Ok(window.entries(store).into_iter().map(|(key, _)| key).collect()))
    }

    /// Always fails: a key set has no value to insert with.
    pub fn insert(&self, _key: K) -> ViewResult<bool> {
        Err(ViewError::ReadOnlyView { operation: "insertion" })
    }

    /// Remove the entry with `key`.
    pub fn remove(&self, key: &K) -> ViewResult<bool> {
        apply_map_op(&self.handle, MapOp::Remove(key), None).map(|outcome| !outcome.removed.is_empty())
    }

    /// Keep only the entries whose key matches `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&K) -> bool) -> ViewResult<usize> {
        apply_map_op(&self.handle, MapOp::RemoveWhere(&mut |key: &K, _: &V| !keep(key)), None)
            .map(|outcome| outcome.removed.len())
    }

    /// Remove every visible entry.
    pub fn clear(&self) -> ViewResult<()> {
        self.retain(|_| false).map(drop)
    }

    /// Open a cursor over the keys.
    pub fn iter(&self) -> ViewResult<KeyIter<K, V>> {
        KeyIter::open(&self.handle)
    }

    /// Register a listener for key events of this view.
    pub fn add_element_listener(&self, listener: Arc<dyn ElementListener<K>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.keys.add(listener))
    }

    /// Remove one registration of a key listener.
    pub fn remove_element_listener(&self, listener: &Arc<dyn ElementListener<K>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.keys.remove(listener))
    }

    /// Register a listener that sees each key together with its entry's value.
    pub fn add_key_set_element_listener(&self, listener: Arc<dyn KeySetElementListener<K, V>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.key_entries.add(listener))
    }

    /// Remove one registration of a key set element listener.
    pub fn remove_key_set_element_listener(
        &self,
        listener: &Arc<dyn KeySetElementListener<K, V>>,
    ) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.key_entries.remove(listener))
    }

    common_view_ops!(MapKind<K, V>, MapStore<K, V>, MapViewInfo<K, V>);
}

/// The values of a map view.
///
/// Removing a value removes the first entry holding it.
pub struct ValuesView<K: SetElement, V: MapValue> {
    handle: ViewHandle<MapKind<K, V>>,
}

impl<K: SetElement, V: MapValue> ValuesView<K, V> {
    pub(crate) fn new(handle: ViewHandle<MapKind<K, V>>) -> Self {
        Self { handle }
    }

    /// Number of values, duplicates included.
    pub fn len(&self) -> ViewResult<usize> {
        self.handle.read(|store, window| Ok(window.count(store)))
    }

    /// Whether there are no values.
    pub fn is_empty(&self) -> ViewResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// Whether any visible entry holds `value`.
    pub fn contains(&self, value: &V) -> ViewResult<bool> {
        self.handle
            .read(|store, window| Ok(window.entries(store).iter().any(|(_, v)| v == value)))
    }

    /// Copy the values, in key order of the view.
    pub fn to_vec(&self) -> ViewResult<Vec<V>> {
        self.handle
            .read(|store, window| Ok(window.entries(store).into_iter().map(|(_, value)| value).collect()))
    }

    /// Always fails: a values view has no key to insert under.
    pub fn push(&self, _value: V) -> ViewResult<()> {
        Err(ViewError::ReadOnlyView { operation: "insertion" })
    }

    /// Remove the first entry holding `value`.
    pub fn remove(&self, value: &V) -> ViewResult<bool> {
        apply_map_op(&self.handle, MapOp::RemoveValue(value), None).map(|outcome| !outcome.removed.is_empty())
    }

    /// Keep only the entries whose value matches `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&V) -> bool) -> ViewResult<usize> {
        apply_map_op(&self.handle, MapOp::RemoveWhere(&mut |_: &K, value: &V| !keep(value)), None)
            .map(|outcome| outcome.removed.len())
    }

    /// Remove every visible entry.
    pub fn clear(&self) -> ViewResult<()> {
        self.retain(|_| false).map(drop)
    }

    /// Open a cursor over the values.
    pub fn iter(&self) -> ViewResult<ValueIter<K, V>> {
        ValueIter::open(&self.handle)
    }

    /// Register a listener for value events of this view.
    pub fn add_element_listener(&self, listener: Arc<dyn ElementListener<V>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.values.add(listener))
    }

    /// Remove one registration of a value listener.
    pub fn remove_element_listener(&self, listener: &Arc<dyn ElementListener<V>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.values.remove(listener))
    }

    common_view_ops!(MapKind<K, V>, MapStore<K, V>, MapViewInfo<K, V>);
}

/// The entries of a map view, as a set.
pub struct EntrySetView<K: SetElement, V: MapValue> {
    handle: ViewHandle<MapKind<K, V>>,
}

impl<K: SetElement, V: MapValue> EntrySetView<K, V> {
    pub(crate) fn new(handle: ViewHandle<MapKind<K, V>>) -> Self {
        Self { handle }
    }

    /// Number of entries.
    pub fn len(&self) -> ViewResult<usize> {
        self.handle.read(|store, window| Ok(window.count(store)))
    }

    /// Whether the entry set is empty.
    pub fn is_empty(&self) -> ViewResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// Whether the entry `key -> value` is visible.
    pub fn contains(&self, key: &K, value: &V) -> ViewResult<bool> {
        self.handle
            .read(|store, window| Ok(window.get(store, key).is_some_and(|v| v == value)))
    }

    /// Copy the entries, in view order.
    pub fn to_vec(&self) -> ViewResult<Vec<(K, V)>> {
        self.handle.read(|store, window| Ok(window.entries(store)))
    }

    /// Remove the entry `key -> value`; a different value under `key` is kept.
    pub fn remove(&self, key: &K, value: &V) -> ViewResult<bool> {
        apply_map_op(&self.handle, MapOp::RemoveEntry(key, value), None).map(|outcome| !outcome.removed.is_empty())
    }

    /// Keep only the entries matching `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) -> ViewResult<usize> {
        apply_map_op(&self.handle, MapOp::RemoveWhere(&mut |key: &K, value: &V| !keep(key, value)), None)
            .map(|outcome| outcome.removed.len())
    }

    /// Remove every visible entry.
    pub fn clear(&self) -> ViewResult<()> {
        self.retain(|_, _| false).map(drop)
    }

    /// Open a cursor over the entries.
    pub fn iter(&self) -> ViewResult<EntryIter<K, V>> {
        EntryIter::open(&self.handle)
    }

    /// Register a listener for entry events of this view.
    pub fn add_map_element_listener(&self, listener: Arc<dyn MapElementListener<K, V>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.map.add(listener))
    }

    /// Remove one registration of an entry listener.
    pub fn remove_map_element_listener(&self, listener: &Arc<dyn MapElementListener<K, V>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.map.remove(listener))
    }

    common_view_ops!(MapKind<K, V>, MapStore<K, V>, MapViewInfo<K, V>);
}

/// A single entry of a map view.
///
/// The view follows its key. Once the entry is removed, reads fail with
/// [`ViewError::NoSuchElement`]; re-inserting the key brings it back.
pub struct EntryView<K: SetElement, V: MapValue> {
    handle: ViewHandle<MapKind<K, V>>,
}

impl<K: SetElement, V: MapValue> EntryView<K, V> {
    pub(crate) fn new(handle: ViewHandle<MapKind<K, V>>) -> Self {
        Self { handle }
    }

    /// Whether the entry currently exists.
    pub fn is_present(&self) -> ViewResult<bool> {
        self.handle
            .read(|store, window| Ok(window.entry_key().is_ok_and(|key| window.get(store, key).is_some())))
    }

    /// The key of the entry.
    pub fn key(&self) -> ViewResult<K> {
        self.handle.read(|store, window| {
            let key = window.entry_key()?;
            window.get(store, key).ok_or(ViewError::NoSuchElement)?;
            Ok(key.clone())
        })
    }

    /// The current value of the entry.
    pub fn value(&self) -> ViewResult<V> {
        self.handle.read(|store, window| {
            let key = window.entry_key()?;
            window.get(store, key).cloned().ok_or(ViewError::NoSuchElement)
        })
    }

    /// Replace the value, returning the previous one.
    pub fn set_value(&self, value: V) -> ViewResult<V> {
        apply_map_op(&self.handle, MapOp::SetValue(value), None)?
            .previous
            .ok_or(ViewError::NoSuchElement)
    }

    /// Register a listener for events raised through this entry.
    pub fn add_map_element_listener(&self, listener: Arc<dyn MapElementListener<K, V>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.map.add(listener))
    }

    /// Remove one registration of an entry listener.
    pub fn remove_map_element_listener(&self, listener: &Arc<dyn MapElementListener<K, V>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.map.remove(listener))
    }

    common_view_ops!(MapKind<K, V>, MapStore<K, V>, MapViewInfo<K, V>);
}

macro_rules! handle_impls {
    ($($view:ident),*) => {$(
        impl<K: SetElement, V: MapValue> Clone for $view<K, V> {
            fn clone(&self) -> Self {
                Self { handle: self.handle.clone() }
            }
        }

        impl<K: SetElement, V: MapValue> PartialEq for $view<K, V> {
            fn eq(&self, other: &Self) -> bool {
                self.handle.same_node(&other.handle)
            }
        }

        impl<K: SetElement, V: MapValue> fmt::Debug for $view<K, V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut s = f.debug_struct(stringify!($view));
                s.field("node", &self.handle.node());
                match self.handle.read(|store, window| Ok(window.entries(store))) {
                    Ok(entries) => s.field("entries", &entries),
                    Err(err) => s.field("error", &err.to_string()),
                };
                s.finish()
            }
        }
    )*};
}

handle_impls!(KeySetView, ValuesView, EntrySetView, EntryView);

#[cfg(test)]
mod tests {
    use crate::MapView;
    use viewtree_core::{ElementOrdering, ViewError};

    fn fruit() -> MapView<&'static str, u32> {
        MapView::from_entries(ElementOrdering::Linked, [("apple", 3), ("pear", 1), ("plum", 3)])
    }

    #[test]
    fn test_key_set_writes() {
        let map = fruit();
        let keys = map.key_set().unwrap();
        assert!(matches!(keys.insert("fig"), Err(ViewError::ReadOnlyView { .. })));
        assert!(keys.remove(&"pear").unwrap());
        assert!(!keys.remove(&"pear").unwrap());
        assert_eq!(map.to_vec().unwrap(), vec![("apple", 3), ("plum", 3)]);
        assert_eq!(keys.retain(|key| key.starts_with('a')).unwrap(), 1);
        assert_eq!(keys.to_vec().unwrap(), vec!["apple"]);
    }

    #[test]
    fn test_values_remove_first_match() {
        let map = fruit();
        let values = map.values().unwrap();
        assert!(matches!(values.push(7), Err(ViewError::ReadOnlyView { .. })));
        assert!(values.remove(&3).unwrap());
        assert_eq!(values.to_vec().unwrap(), vec![1, 3]);
        assert_eq!(map.get(&"plum").unwrap(), Some(3));
        values.clear().unwrap();
        assert!(map.is_empty().unwrap());
    }

    #[test]
    fn test_entry_set_remove_needs_value() {
        let map = fruit();
        let entries = map.entry_set().unwrap();
        assert!(!entries.remove(&"apple", &4).unwrap());
        assert!(entries.contains(&"apple", &3).unwrap());
        assert!(entries.remove(&"apple", &3).unwrap());
        assert_eq!(entries.len().unwrap(), 2);
    }

    #[test]
    fn test_entry_follows_key() {
        let map = fruit();
        let entry = map.entry_of_key("pear").unwrap();
        assert_eq!(entry.value().unwrap(), 1);
        assert_eq!(entry.set_value(5).unwrap(), 1);
        assert_eq!(map.get(&"pear").unwrap(), Some(5));

        map.remove(&"pear").unwrap();
        assert!(!entry.is_present().unwrap());
        assert!(matches!(entry.key(), Err(ViewError::NoSuchElement)));
        assert!(matches!(entry.set_value(2), Err(ViewError::NoSuchElement)));

        map.insert("pear", 8).unwrap();
        assert_eq!(entry.value().unwrap(), 8);
    }

    #[test]
    fn test_entry_of_value() {
        let map = fruit();
        let entry = map.entry_of_value(3).unwrap().unwrap();
        assert_eq!(entry.key().unwrap(), "apple");
        assert!(map.entry_of_value(9).unwrap().is_none());
    }
}
