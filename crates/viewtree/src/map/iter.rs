use std::fmt;
use std::sync::Arc;

use viewtree_core::{ElementListener, KeySetElementListener, MapElementListener, MapViewInfo, ViewError, ViewResult};

use super::views::EntryView;
use super::{apply_map_op, MapKind, MapOp};
use crate::handle::ViewHandle;
use crate::store::{MapValue, SetElement};

/// State shared by the map cursors: the keys in view order, snapshotted at
/// the modification count they were read at.
///
/// Values are read from the store on every step, since replacing the value
/// of an existing key leaves the modification count unchanged.
struct MapCursor<K: SetElement, V: MapValue> {
    handle: ViewHandle<MapKind<K, V>>,
    keys: Vec<K>,
    position: usize,
    last_returned: Option<K>,
    expected_mod_count: u64,
    failed: bool,
}

impl<K: SetElement, V: MapValue> MapCursor<K, V> {
    fn open(parent: &ViewHandle<MapKind<K, V>>) -> ViewResult<Self> {
        let handle = parent.derive(MapViewInfo::Iterator)?;
        let node = handle.node();
        let (keys, expected_mod_count) = handle.with_tree(|t| {
            t.required_enabled()?;
            let window = t.base(node)?;
            let mod_count = t.data().mod_count();
            let store = t.data_mut().base()?;
            let keys: Vec<K> = window.entries(store).into_iter().map(|(key, _)| key).collect();
            Ok::<_, ViewError>((keys, mod_count))
        })?;
        Ok(Self {
            handle,
            keys,
            position: 0,
            last_returned: None,
            expected_mod_count,
            failed: false,
        })
    }

    fn check_for_comodification(&self) -> ViewResult<()> {
        let expected = self.expected_mod_count;
        self.handle.with_tree(|t| {
            t.required_enabled()?;
            if t.data().mod_count() == expected {
                Ok(())
            } else {
                Err(ViewError::Comodification("the map was modified outside of this iterator"))
            }
        })
    }

    fn has_next(&self) -> ViewResult<bool> {
        self.check_for_comodification()?;
        Ok(self.position < self.keys.len())
    }

    /// Read the current value of `key`, failing if the map changed structurally.
    fn current(&self, key: &K) -> ViewResult<V> {
        let node = self.handle.node();
        let expected = self.expected_mod_count;
        self.handle.with_tree(|t| {
            t.required_enabled()?;
            if t.data().mod_count() != expected {
                return Err(ViewError::Comodification("the map was modified outside of this iterator"));
            }
            let window = t.base(node)?;
            let store = t.data_mut().base()?;
            window
                .get(store, key)
                .cloned()
                .ok_or(ViewError::Comodification("an entry vanished under the iterator"))
        })
    }

    fn advance(&mut self) -> Option<ViewResult<(K, V)>> {
        if self.failed {
            return None;
        }
        let key = self.keys.get(self.position)?.clone();
        match self.current(&key) {
            Ok(value) => {
                self.position += 1;
                self.last_returned = Some(key.clone());
                Some(Ok((key, value)))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn remove(&mut self) -> ViewResult<()> {
        let key = self
            .last_returned
            .take()
            .ok_or(ViewError::IllegalState("no entry has been returned since the last removal"))?;
        let outcome = apply_map_op(&self.handle, MapOp::Remove(&key), Some(self.expected_mod_count))?;
        self.expected_mod_count = outcome.mod_count;
        Ok(())
    }

    fn debug(&self, name: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(name)
            .field("node", &self.handle.node())
            .field("position", &self.position)
            .field("remaining", &(self.keys.len() - self.position))
            .field("expected_mod_count", &self.expected_mod_count)
            .finish()
    }
}

/// A cursor over the keys of a map view.
pub struct KeyIter<K: SetElement, V: MapValue> {
    cursor: MapCursor<K, V>,
}

impl<K: SetElement, V: MapValue> KeyIter<K, V> {
    pub(crate) fn open(parent: &ViewHandle<MapKind<K, V>>) -> ViewResult<Self> {
        MapCursor::open(parent).map(|cursor| Self { cursor })
    }

    /// Whether another key remains.
    pub fn has_next(&self) -> ViewResult<bool> {
        self.cursor.has_next()
    }

    /// Remove the entry of the key last returned by `next`.
    pub fn remove(&mut self) -> ViewResult<()> {
        self.cursor.remove()
    }

    /// Register a listener for key events raised through this cursor.
    pub fn add_element_listener(&self, listener: Arc<dyn ElementListener<K>>) -> ViewResult<()> {
        self.cursor.handle.update_listeners(|l| l.keys.add(listener))
    }

    /// Remove one registration of a key listener.
    pub fn remove_element_listener(&self, listener: &Arc<dyn ElementListener<K>>) -> ViewResult<bool> {
        self.cursor.handle.update_listeners(|l| l.keys.remove(listener))
    }

    /// Register a listener for key events, with entry values, raised through this cursor.
    pub fn add_key_set_element_listener(&self, listener: Arc<dyn KeySetElementListener<K, V>>) -> ViewResult<()> {
        self.cursor.handle.update_listeners(|l| l.key_entries.add(listener))
    }

    /// Remove one registration of a key set element listener.
    pub fn remove_key_set_element_listener(
        &self,
        listener: &Arc<dyn KeySetElementListener<K, V>>,
    ) -> ViewResult<bool> {
        self.cursor.handle.update_listeners(|l| l.key_entries.remove(listener))
    }
}

impl<K: SetElement, V: MapValue> Iterator for KeyIter<K, V> {
    type Item = ViewResult<K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.advance().map(|entry| entry.map(|(key, _)| key))
    }
}

/// A cursor over the values of a map view.
pub struct ValueIter<K: SetElement, V: MapValue> {
    cursor: MapCursor<K, V>,
}

impl<K: SetElement, V: MapValue> ValueIter<K, V> {
    pub(crate) fn open(parent: &ViewHandle<MapKind<K, V>>) -> ViewResult<Self> {
        MapCursor::open(parent).map(|cursor| Self { cursor })
    }

    /// Whether another value remains.
    pub fn has_next(&self) -> ViewResult<bool> {
        self.cursor.has_next()
    }

    /// Remove the entry of the value last returned by `next`.
    pub fn remove(&mut self) -> ViewResult<()> {
        self.cursor.remove()
    }

    /// Register a listener for value events raised through this cursor.
    pub fn add_element_listener(&self, listener: Arc<dyn ElementListener<V>>) -> ViewResult<()> {
        self.cursor.handle.update_listeners(|l| l.values.add(listener))
    }

    /// Remove one registration of a value listener.
    pub fn remove_element_listener(&self, listener: &Arc<dyn ElementListener<V>>) -> ViewResult<bool> {
        self.cursor.handle.update_listeners(|l| l.values.remove(listener))
    }
}

impl<K: SetElement, V: MapValue> Iterator for ValueIter<K, V> {
    type Item = ViewResult<V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.advance().map(|entry| entry.map(|(_, value)| value))
    }
}

/// A cursor over the entries of a map view.
///
/// Each entry is yielded as an [`EntryView`] below the cursor, so
/// `set_value` on it is seen by the cursor's listeners. Setting a value
/// leaves the cursor valid.
pub struct EntryIter<K: SetElement, V: MapValue> {
    cursor: MapCursor<K, V>,
}

impl<K: SetElement, V: MapValue> EntryIter<K, V> {
    pub(crate) fn open(parent: &ViewHandle<MapKind<K, V>>) -> ViewResult<Self> {
        MapCursor::open(parent).map(|cursor| Self { cursor })
    }

    /// Whether another entry remains.
    pub fn has_next(&self) -> ViewResult<bool> {
        self.cursor.has_next()
    }

    /// Remove the entry last returned by `next`.
    pub fn remove(&mut self) -> ViewResult<()> {
        self.cursor.remove()
    }

    /// Register a listener for entry events raised through this cursor.
    pub fn add_map_element_listener(&self, listener: Arc<dyn MapElementListener<K, V>>) -> ViewResult<()> {
        self.cursor.handle.update_listeners(|l| l.map.add(listener))
    }

    /// Remove one registration of an entry listener.
    pub fn remove_map_element_listener(&self, listener: &Arc<dyn MapElementListener<K, V>>) -> ViewResult<bool> {
        self.cursor.handle.update_listeners(|l| l.map.remove(listener))
    }
}

impl<K: SetElement, V: MapValue> Iterator for EntryIter<K, V> {
    type Item = ViewResult<EntryView<K, V>>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.cursor.advance()?;
        Some(entry.and_then(|(key, _)| {
            self.cursor
                .handle
                .derive(MapViewInfo::Entry(key))
                .map(EntryView::new)
        }))
    }
}

impl<K: SetElement, V: MapValue> fmt::Debug for KeyIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cursor.debug("KeyIter", f)
    }
}

impl<K: SetElement, V: MapValue> fmt::Debug for ValueIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cursor.debug("ValueIter", f)
    }
}

impl<K: SetElement, V: MapValue> fmt::Debug for EntryIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cursor.debug("EntryIter", f)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use viewtree_core::{map_element_listener, ElementOrdering, MapElementEvent, ModificationPhase, ModificationType};

    use crate::MapView;

    #[test]
    fn test_key_cursor_remove() {
        let map = MapView::from_entries(ElementOrdering::Sorted, (1..=5).map(|n| (n, n * n)));
        let keys = map.key_set().unwrap();
        let mut cursor = keys.iter().unwrap();
        while let Some(key) = cursor.next() {
            if key.unwrap() % 2 == 1 {
                cursor.remove().unwrap();
            }
        }
        assert_eq!(map.to_vec().unwrap(), vec![(2, 4), (4, 16)]);
    }

    #[test]
    fn test_entry_cursor_set_value_bubbles() {
        let map = MapView::from_entries(ElementOrdering::Sorted, [("a", 1), ("b", 2)]);
        let entries = map.entry_set().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        map.add_map_element_listener(map_element_listener(move |phase, event: &MapElementEvent<&'static str, i32>| {
            if phase == ModificationPhase::Modified {
                recorder.lock().push(event.modification_type());
            }
            Ok(())
        }))
        .unwrap();

        let mut cursor = entries.iter().unwrap();
        while let Some(entry) = cursor.next() {
            let entry = entry.unwrap();
            let value = entry.value().unwrap();
            entry.set_value(value * 10).unwrap();
        }
        assert_eq!(map.to_vec().unwrap(), vec![("a", 10), ("b", 20)]);
        assert_eq!(*seen.lock(), vec![ModificationType::Replace, ModificationType::Replace]);
    }

    #[test]
    fn test_stale_value_cursor() {
        let map = MapView::from_entries(ElementOrdering::Hashed, [(1, "x"), (2, "y")]);
        let values = map.values().unwrap();
        let mut cursor = values.iter().unwrap();
        assert!(cursor.next().unwrap().is_ok());
        map.insert(3, "z").unwrap();
        assert!(cursor.next().unwrap().unwrap_err().is_comodification());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_value_cursor_sees_replaced_values() {
        let map = MapView::from_entries(ElementOrdering::Sorted, [(1, "a"), (2, "b"), (3, "c")]);
        let values = map.values().unwrap();
        let mut cursor = values.iter().unwrap();
        assert_eq!(cursor.next().unwrap().unwrap(), "a");

        map.insert(2, "B").unwrap();
        map.entry_of_key(3).unwrap().set_value("C").unwrap();

        assert!(cursor.has_next().unwrap());
        assert_eq!(cursor.next().unwrap().unwrap(), "B");
        assert_eq!(cursor.next().unwrap().unwrap(), "C");
        assert!(cursor.next().is_none());
    }
}
