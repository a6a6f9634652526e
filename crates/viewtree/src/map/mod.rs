//! Observable maps and their projections.
//!
//! A [`MapView`] is the root of a map or a range view of one. Its
//! projections are views in the same tree:
//!
//! ```text
//! map ── key_set ── iterator
//!     ├─ values ─── iterator
//!     ├─ entry_set ─ iterator ── entry
//!     ├─ entry_of_key / entry_of_value
//!     └─ head_map / tail_map / sub_map / descending_map ── ...
//! ```
//!
//! Key set, values and entry set are created once per map view and kept
//! alive by it. Every modification raises a map event that bubbles up to
//! the root; key-set and values listeners see the matching projection of it.

mod iter;
mod views;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use viewtree_core::logging::targets;
use viewtree_core::{
    ElementListener, ElementOrdering, EntryChange, KeySetElementListener, ListenerSet, MapElementListener,
    MapViewInfo, ModificationEvent, ModificationPhase, ModificationPlan, NodeId, RootData, RootOptions,
    RootSnapshot, Validator, ViewError, ViewKind, ViewResult,
};

use crate::handle::{common_view_ops, ViewHandle};
use crate::range::KeyRange;
use crate::store::{MapStore, MapValue, SetElement};
pub use iter::{EntryIter, KeyIter, ValueIter};
pub use views::{EntrySetView, EntryView, KeySetView, ValuesView};

/// The map family of views.
pub struct MapKind<K, V>(PhantomData<fn() -> (K, V)>);

/// What a map view presents of its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapRole<K> {
    /// Entries, as a map.
    Map,
    /// The keys.
    Keys,
    /// The values.
    Values,
    /// The entries, as a set.
    Entries,
    /// A single entry; `None` once it no longer exists.
    Entry(Option<K>),
}

/// The part of the canonical map a view presents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapWindow<K> {
    /// Entries whose key lies outside the range are hidden.
    pub range: KeyRange<K>,
    /// Whether the view iterates in reverse key order.
    pub descending: bool,
    /// The projection.
    pub role: MapRole<K>,
}

impl<K: SetElement> MapWindow<K> {
    fn with_role(&self, role: MapRole<K>) -> Self {
        Self {
            range: self.range.clone(),
            descending: self.descending,
            role,
        }
    }

    pub(crate) fn entries<V: MapValue>(&self, store: &MapStore<K, V>) -> Vec<(K, V)> {
        store.collect_range(&self.range, self.descending)
    }

    pub(crate) fn count<V: MapValue>(&self, store: &MapStore<K, V>) -> usize {
        if self.range.is_full() {
            store.len()
        } else {
            store.collect_range(&self.range, false).len()
        }
    }

    /// The value under `key`, if the key is visible in this window.
    pub(crate) fn get<'a, V: MapValue>(&self, store: &'a MapStore<K, V>, key: &K) -> Option<&'a V> {
        if self.range.contains(key) {
            store.get(key)
        } else {
            None
        }
    }

    /// The key of a single-entry view.
    pub(crate) fn entry_key(&self) -> ViewResult<&K> {
        match &self.role {
            MapRole::Entry(Some(key)) => Ok(key),
            _ => Err(ViewError::NoSuchElement),
        }
    }
}

/// Listeners registered on one map view.
pub struct MapListeners<K, V> {
    map: ListenerSet<dyn MapElementListener<K, V>>,
    keys: ListenerSet<dyn ElementListener<K>>,
    key_entries: ListenerSet<dyn KeySetElementListener<K, V>>,
    values: ListenerSet<dyn ElementListener<V>>,
}

impl<K, V> Default for MapListeners<K, V> {
    fn default() -> Self {
        Self {
            map: ListenerSet::new(),
            keys: ListenerSet::new(),
            key_entries: ListenerSet::new(),
            values: ListenerSet::new(),
        }
    }
}

/// Listeners resolved for one map event.
pub struct ResolvedMapListeners<K, V> {
    map: Vec<Arc<dyn MapElementListener<K, V>>>,
    keys: Vec<Arc<dyn ElementListener<K>>>,
    key_entries: Vec<Arc<dyn KeySetElementListener<K, V>>>,
    values: Vec<Arc<dyn ElementListener<V>>>,
}

fn require_role<K, V: fmt::Debug>(
    window: &MapWindow<K>,
    accepts: impl Fn(&MapRole<K>) -> bool,
    info: &MapViewInfo<K, V>,
    reason: &str,
) -> ViewResult<()>
where
    K: fmt::Debug,
{
    if accepts(&window.role) {
        Ok(())
    } else {
        Err(ViewError::illegal_view_info(info, reason))
    }
}

fn narrowed<K: SetElement, V: MapValue>(
    range: Option<KeyRange<K>>,
    parent: &MapWindow<K>,
    info: &MapViewInfo<K, V>,
) -> ViewResult<MapWindow<K>> {
    range
        .map(|range| MapWindow {
            range,
            descending: parent.descending,
            role: MapRole::Map,
        })
        .ok_or_else(|| ViewError::illegal_view_info(info, "bounds outside the parent's range"))
}

impl<K: SetElement, V: MapValue> ViewKind for MapKind<K, V> {
    type Base = MapStore<K, V>;
    type Info = MapViewInfo<K, V>;
    type Local = MapWindow<K>;
    type Change = EntryChange<K, V>;
    type Listeners = MapListeners<K, V>;
    type Resolved = ResolvedMapListeners<K, V>;

    fn root_local(_: &MapStore<K, V>) -> MapWindow<K> {
        MapWindow {
            range: KeyRange::full(),
            descending: false,
            role: MapRole::Map,
        }
    }

    fn create_base_view(
        base: &MapStore<K, V>,
        parent: &MapWindow<K>,
        info: &MapViewInfo<K, V>,
    ) -> ViewResult<MapWindow<K>> {
        let is_map = |role: &MapRole<K>| *role == MapRole::Map;
        match info {
            MapViewInfo::KeySet => {
                require_role(parent, is_map, info, "key sets are views of maps")?;
                Ok(parent.with_role(MapRole::Keys))
            }
            MapViewInfo::Values => {
                require_role(parent, is_map, info, "values are views of maps")?;
                Ok(parent.with_role(MapRole::Values))
            }
            MapViewInfo::EntrySet => {
                require_role(parent, is_map, info, "entry sets are views of maps")?;
                Ok(parent.with_role(MapRole::Entries))
            }
            MapViewInfo::EntryOfKey(key) => {
                require_role(parent, is_map, info, "entries are views of maps")?;
                let present = parent.get(base, key).is_some();
                Ok(parent.with_role(MapRole::Entry(present.then(|| key.clone()))))
            }
            MapViewInfo::EntryOfValue(value) => {
                require_role(parent, is_map, info, "entries are views of maps")?;
                let key = parent
                    .entries(base)
                    .into_iter()
                    .find(|(_, v)| v == value)
                    .map(|(key, _)| key);
                Ok(parent.with_role(MapRole::Entry(key)))
            }
            MapViewInfo::Entry(key) => {
                require_role(
                    parent,
                    |role| *role == MapRole::Entries,
                    info,
                    "iterated entries are views of entry-set iterators",
                )?;
                let present = parent.get(base, key).is_some();
                Ok(parent.with_role(MapRole::Entry(present.then(|| key.clone()))))
            }
            MapViewInfo::Iterator => {
                require_role(
                    parent,
                    |role| matches!(role, MapRole::Keys | MapRole::Values | MapRole::Entries),
                    info,
                    "iterators are views of key sets, values or entry sets",
                )?;
                Ok(parent.clone())
            }
            MapViewInfo::DescendingMap => {
                require_role(parent, is_map, info, "descending views are views of maps")?;
                if !base.ordering().is_ordered() {
                    return Err(ViewError::illegal_view_info(info, "a hashed map has no order"));
                }
                Ok(MapWindow {
                    range: parent.range.clone(),
                    descending: !parent.descending,
                    role: MapRole::Map,
                })
            }
            MapViewInfo::HeadMap { .. } | MapViewInfo::TailMap { .. } | MapViewInfo::SubMap { .. } => {
                require_role(parent, is_map, info, "range views are views of maps")?;
                if !base.ordering().is_navigable() {
                    return Err(ViewError::illegal_view_info(info, "range views need a sorted map"));
                }
                let range = match info {
                    MapViewInfo::HeadMap { to, inclusive } if parent.descending => {
                        parent.range.with_lower(to, *inclusive)
                    }
                    MapViewInfo::HeadMap { to, inclusive } => parent.range.with_upper(to, *inclusive),
                    MapViewInfo::TailMap { from, inclusive } if parent.descending => {
                        parent.range.with_upper(from, *inclusive)
                    }
                    MapViewInfo::TailMap { from, inclusive } => parent.range.with_lower(from, *inclusive),
                    MapViewInfo::SubMap {
                        from,
                        from_inclusive,
                        to,
                        to_inclusive,
                    } if parent.descending => parent.range.with_bounds(to, *to_inclusive, from, *from_inclusive),
                    MapViewInfo::SubMap {
                        from,
                        from_inclusive,
                        to,
                        to_inclusive,
                    } => parent.range.with_bounds(from, *from_inclusive, to, *to_inclusive),
                    _ => None,
                };
                narrowed(range, parent, info)
            }
        }
    }

    fn bubble(change: &EntryChange<K, V>, _: &MapWindow<K>, _: &MapWindow<K>) -> EntryChange<K, V> {
        change.clone()
    }

    fn resolve_listeners(listeners: &MapListeners<K, V>) -> Option<ResolvedMapListeners<K, V>> {
        if listeners.map.is_empty()
            && listeners.keys.is_empty()
            && listeners.key_entries.is_empty()
            && listeners.values.is_empty()
        {
            return None;
        }
        Some(ResolvedMapListeners {
            map: listeners.map.snapshot(),
            keys: listeners.keys.snapshot(),
            key_entries: listeners.key_entries.snapshot(),
            values: listeners.values.snapshot(),
        })
    }

    fn notify(
        resolved: &ResolvedMapListeners<K, V>,
        phase: ModificationPhase,
        event: &ModificationEvent<EntryChange<K, V>>,
    ) -> ViewResult<()> {
        for listener in &resolved.map {
            match phase {
                ModificationPhase::Modifying => listener.modifying(event)?,
                ModificationPhase::Modified => listener.modified(event)?,
            }
        }
        // A value replacement leaves the key set unchanged.
        let key_change = if resolved.keys.is_empty() && resolved.key_entries.is_empty() {
            None
        } else {
            event.change().key_change()
        };
        if let Some(change) = key_change {
            if !resolved.keys.is_empty() {
                let projected = event.project(change.to_element_change());
                for listener in &resolved.keys {
                    match phase {
                        ModificationPhase::Modifying => listener.modifying(&projected)?,
                        ModificationPhase::Modified => listener.modified(&projected)?,
                    }
                }
            }
            let projected = event.project(change);
            for listener in &resolved.key_entries {
                match phase {
                    ModificationPhase::Modifying => listener.modifying(&projected)?,
                    ModificationPhase::Modified => listener.modified(&projected)?,
                }
            }
        }
        if !resolved.values.is_empty() {
            let projected = event.project(event.change().value_change());
            for listener in &resolved.values {
                match phase {
                    ModificationPhase::Modifying => listener.modifying(&projected)?,
                    ModificationPhase::Modified => listener.modified(&projected)?,
                }
            }
        }
        Ok(())
    }

    fn listener_count(listeners: &MapListeners<K, V>) -> usize {
        listeners.map.len() + listeners.keys.len() + listeners.key_entries.len() + listeners.values.len()
    }
}

// =========================================================================
// Writes
// =========================================================================

pub(crate) enum MapOp<'a, K, V> {
    /// Insert or overwrite an entry; only maps accept new entries.
    Put(K, V),
    Remove(&'a K),
    /// Remove the entry with this key if it holds this value.
    RemoveEntry(&'a K, &'a V),
    /// Remove the first entry in view order holding this value.
    RemoveValue(&'a V),
    RemoveWhere(&'a mut dyn FnMut(&K, &V) -> bool),
    /// Replace the value of a single-entry view.
    SetValue(V),
}

pub(crate) struct MapOutcome<K, V> {
    /// The value replaced by a put or set.
    pub(crate) previous: Option<V>,
    /// Entries removed by the call.
    pub(crate) removed: Vec<(K, V)>,
    /// Root modification count after the call.
    pub(crate) mod_count: u64,
}

struct PreparedMapWrite<K, V> {
    plan: ModificationPlan<EntryChange<K, V>>,
    path: Vec<NodeId>,
    put: Option<(K, V)>,
    structural: bool,
    outcome: MapOutcome<K, V>,
}

/// Run a map write through `handle`'s node.
pub(crate) fn apply_map_op<K: SetElement, V: MapValue>(
    handle: &ViewHandle<MapKind<K, V>>,
    op: MapOp<'_, K, V>,
    guard: Option<u64>,
) -> ViewResult<MapOutcome<K, V>> {
    let node = handle.node();
    let prepared = handle.prepare(|t, window| {
        let mod_count = t.data().mod_count();
        if guard.is_some_and(|expected| expected != mod_count) {
            return Err(ViewError::Comodification(
                "the map was modified outside of this iterator",
            ));
        }
        let path = t.path_to_root(node)?;
        let data = t.data();
        let store = data.base_if_present().ok_or(ViewError::NullBase)?;
        let mut plan = ModificationPlan::new(mod_count);
        let mut outcome = MapOutcome {
            previous: None,
            removed: Vec::new(),
            mod_count,
        };
        let mut put = None;

        let replace = |plan: &mut ModificationPlan<EntryChange<K, V>>, key: &K, value: V| -> ViewResult<Option<V>> {
            data.validators().validate(key, &value)?;
            let previous = window.get(store, key).cloned();
            let change = match &previous {
                Some(old) => EntryChange::replace(key.clone(), old.clone(), value),
                None => EntryChange::attach(key.clone(), value),
            };
            plan.push(node, change);
            Ok(previous)
        };

        match op {
            MapOp::Put(key, value) => {
                if window.role != MapRole::Map {
                    return Err(ViewError::ReadOnlyView { operation: "insertion" });
                }
                if !window.range.contains(&key) {
                    return Err(ViewError::OutOfRange);
                }
                outcome.previous = replace(&mut plan, &key, value.clone())?;
                put = Some((key, value));
            }
            MapOp::SetValue(value) => {
                let key = window.entry_key()?.clone();
                if window.get(store, &key).is_none() {
                    return Err(ViewError::NoSuchElement);
                }
                outcome.previous = replace(&mut plan, &key, value.clone())?;
                put = Some((key, value));
            }
            MapOp::Remove(key) => {
                if let Some(value) = window.get(store, key) {
                    outcome.removed.push((key.clone(), value.clone()));
                }
            }
            MapOp::RemoveEntry(key, expected) => {
                if let Some(value) = window.get(store, key).filter(|value| *value == expected) {
                    outcome.removed.push((key.clone(), value.clone()));
                }
            }
            MapOp::RemoveValue(expected) => {
                outcome.removed.extend(window.entries(store).into_iter().find(|(_, value)| value == expected));
            }
            MapOp::RemoveWhere(matches) => {
                outcome.removed = window
                    .entries(store)
                    .into_iter()
                    .filter(|(key, value)| matches(key, value))
                    .collect();
            }
        }
        for (key, value) in &outcome.removed {
            plan.push(node, EntryChange::detach(key.clone(), value.clone()));
        }
        let structural = !outcome.removed.is_empty() || (put.is_some() && outcome.previous.is_none());
        Ok(PreparedMapWrite {
            plan,
            path,
            put,
            structural,
            outcome,
        })
    })?;

    let PreparedMapWrite {
        plan,
        path,
        put,
        structural,
        mut outcome,
    } = prepared;
    if plan.is_empty() {
        return Ok(outcome);
    }
    tracing::trace!(target: targets::MAP, events = plan.len(), structural, "map write");

    let removals: Vec<K> = outcome.removed.iter().map(|(key, _)| key.clone()).collect();
    outcome.mod_count = handle.execute(plan, move |t| {
        let store = t.data_mut().base_mut()?;
        for key in &removals {
            store.remove(key);
        }
        if let Some((key, value)) = put {
            store.insert(key, value);
        }
        if structural {
            t.finish_structural_change(&path);
        }
        Ok(t.data().mod_count())
    })?;
    Ok(outcome)
}

// =========================================================================
// Map view
// =========================================================================

/// A map, or a range view of one.
///
/// Handles are cheap to clone; all clones share the view.
pub struct MapView<K: SetElement, V: MapValue> {
    handle: ViewHandle<MapKind<K, V>>,
}

static_assertions::assert_impl_all!(MapView<i32, String>: Send, Sync, Clone);

impl<K: SetElement, V: MapValue> MapView<K, V> {
    /// Create an empty map; the store is created on first use.
    pub fn new(ordering: ElementOrdering) -> Self {
        Self::with_options(RootOptions::default().with_ordering(ordering))
    }

    /// Create a map with explicit root options.
    pub fn with_options(options: RootOptions) -> Self {
        Self {
            handle: ViewHandle::root(RootData::new(options)),
        }
    }

    /// Create a map over an existing store.
    pub fn from_store(store: MapStore<K, V>, options: RootOptions) -> Self {
        let options = options.with_ordering(store.ordering());
        Self {
            handle: ViewHandle::root(RootData::with_base(store, options)),
        }
    }

    /// Create a map holding `entries`.
    pub fn from_entries(ordering: ElementOrdering, entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::from_store(MapStore::from_entries(ordering, entries), RootOptions::default())
    }

    /// Restore a map from a snapshot.
    ///
    /// The restored map has no validators; register them again.
    pub fn from_snapshot(snapshot: RootSnapshot<MapStore<K, V>>, options: RootOptions) -> Self {
        Self {
            handle: ViewHandle::from_snapshot(snapshot, options),
        }
    }

    /// Capture the root data of this map.
    pub fn snapshot(&self) -> RootSnapshot<MapStore<K, V>> {
        self.handle.snapshot()
    }

    fn read<R>(&self, f: impl FnOnce(&MapStore<K, V>, &MapWindow<K>) -> R) -> ViewResult<R> {
        self.handle.read(|store, window| Ok(f(store, window)))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The key ordering of the underlying store.
    pub fn ordering(&self) -> ViewResult<ElementOrdering> {
        self.read(|store, _| store.ordering())
    }

    /// Number of entries in the view.
    pub fn len(&self) -> ViewResult<usize> {
        self.read(|store, window| window.count(store))
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> ViewResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// The value stored under `key`.
    pub fn get(&self, key: &K) -> ViewResult<Option<V>> {
        self.read(|store, window| window.get(store, key).cloned())
    }

    /// Whether an entry with `key` is visible in the view.
    pub fn contains_key(&self, key: &K) -> ViewResult<bool> {
        self.read(|store, window| window.get(store, key).is_some())
    }

    /// Whether any visible entry holds `value`.
    pub fn contains_value(&self, value: &V) -> ViewResult<bool> {
        self.read(|store, window| window.entries(store).iter().any(|(_, v)| v == value))
    }

    /// Copy the entries of the view, in view order.
    pub fn to_vec(&self) -> ViewResult<Vec<(K, V)>> {
        self.read(|store, window| window.entries(store))
    }

    fn end(&self, last: bool) -> ViewResult<Option<(K, V)>> {
        self.handle.read(|store, window| {
            if !store.ordering().is_ordered() {
                return Err(ViewError::IllegalState("a hashed map has no first or last entry"));
            }
            let mut entries = window.entries(store);
            Ok(if last { entries.pop() } else { entries.into_iter().next() })
        })
    }

    /// The first entry in view order.
    pub fn first_entry(&self) -> ViewResult<Option<(K, V)>> {
        self.end(false)
    }

    /// The last entry in view order.
    pub fn last_entry(&self) -> ViewResult<Option<(K, V)>> {
        self.end(true)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert or overwrite an entry, returning the previous value.
    ///
    /// Overwriting raises a replace event even if the value is unchanged.
    pub fn insert(&self, key: K, value: V) -> ViewResult<Option<V>> {
        apply_map_op(&self.handle, MapOp::Put(key, value), None).map(|outcome| outcome.previous)
    }

    /// Remove an entry, returning its value.
    pub fn remove(&self, key: &K) -> ViewResult<Option<V>> {
        let outcome = apply_map_op(&self.handle, MapOp::Remove(key), None)?;
        Ok(outcome.removed.into_iter().next().map(|(_, value)| value))
    }

    /// Remove every entry of the view.
    pub fn clear(&self) -> ViewResult<()> {
        apply_map_op(&self.handle, MapOp::RemoveWhere(&mut |_: &K, _: &V| true), None).map(drop)
    }

    // =========================================================================
    // Projections and range views
    // =========================================================================

    /// The keys of this map.
    pub fn key_set(&self) -> ViewResult<KeySetView<K, V>> {
        self.handle.cached(MapViewInfo::KeySet).map(KeySetView::new)
    }

    /// The values of this map.
    pub fn values(&self) -> ViewResult<ValuesView<K, V>> {
        self.handle.cached(MapViewInfo::Values).map(ValuesView::new)
    }

    /// The entries of this map.
    pub fn entry_set(&self) -> ViewResult<EntrySetView<K, V>> {
        self.handle.cached(MapViewInfo::EntrySet).map(EntrySetView::new)
    }

    /// A view of the entry with `key`, present or not.
    pub fn entry_of_key(&self, key: K) -> ViewResult<EntryView<K, V>> {
        self.handle.derive(MapViewInfo::EntryOfKey(key)).map(EntryView::new)
    }

    /// A view of the first entry in view order holding `value`.
    pub fn entry_of_value(&self, value: V) -> ViewResult<Option<EntryView<K, V>>> {
        let entry = EntryView::new(self.handle.derive(MapViewInfo::EntryOfValue(value))?);
        Ok(entry.is_present()?.then_some(entry))
    }

    fn derive(&self, info: MapViewInfo<K, V>) -> ViewResult<MapView<K, V>> {
        let handle = self.handle.derive(info)?;
        tracing::trace!(target: targets::MAP, node = ?handle.node(), "created map view");
        Ok(MapView { handle })
    }

    /// The entries whose key comes before `to` in view order.
    pub fn head_map(&self, to: K, inclusive: bool) -> ViewResult<MapView<K, V>> {
        self.derive(MapViewInfo::HeadMap { to, inclusive })
    }

    /// The entries whose key comes after `from` in view order.
    pub fn tail_map(&self, from: K, inclusive: bool) -> ViewResult<MapView<K, V>> {
        self.derive(MapViewInfo::TailMap { from, inclusive })
    }

    /// The entries whose key lies between `from` and `to`, given in view order.
    pub fn sub_map(&self, from: K, from_inclusive: bool, to: K, to_inclusive: bool) -> ViewResult<MapView<K, V>> {
        self.derive(MapViewInfo::SubMap {
            from,
            from_inclusive,
            to,
            to_inclusive,
        })
    }

    /// The view in reverse key order.
    pub fn descending_map(&self) -> ViewResult<MapView<K, V>> {
        self.derive(MapViewInfo::DescendingMap)
    }

    // =========================================================================
    // Listeners and validators
    // =========================================================================

    /// Register a listener for entry events of this view.
    pub fn add_map_element_listener(&self, listener: Arc<dyn MapElementListener<K, V>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.map.add(listener))
    }

    /// Remove one registration of an entry listener.
    pub fn remove_map_element_listener(&self, listener: &Arc<dyn MapElementListener<K, V>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.map.remove(listener))
    }

    /// Register a validator consulted before a key enters the map.
    pub fn add_key_validator(&self, validator: Arc<dyn Validator<K>>) {
        self.handle.update_validators(|v| v.keys.add(Arc::clone(&validator)));
    }

    /// Remove a key validator.
    pub fn remove_key_validator(&self, validator: &Arc<dyn Validator<K>>) {
        self.handle.update_validators(|v| {
            v.keys.remove(validator);
        });
    }

    /// Register a validator consulted before a value enters the map.
    pub fn add_value_validator(&self, validator: Arc<dyn Validator<V>>) {
        self.handle.update_validators(|v| v.values.add(Arc::clone(&validator)));
    }

    /// Remove a value validator.
    pub fn remove_value_validator(&self, validator: &Arc<dyn Validator<V>>) {
        self.handle.update_validators(|v| {
            v.values.remove(validator);
        });
    }

    common_view_ops!(MapKind<K, V>, MapStore<K, V>, MapViewInfo<K, V>);
}

impl<K: SetElement, V: MapValue> Clone for MapView<K, V> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

impl<K: SetElement, V: MapValue> fmt::Debug for MapView<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("MapView");
        s.field("node", &self.handle.node());
        match self.to_vec() {
            Ok(entries) => s.field("entries", &entries),
            Err(err) => s.field("error", &err.to_string()),
        };
        s.finish()
    }
}

impl<K: SetElement, V: MapValue> PartialEq for MapView<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.handle.same_node(&other.handle)
    }
}
