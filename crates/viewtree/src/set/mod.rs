//! Observable sets with navigable range views.
//!
//! A [`SetView`] presents the elements of a [`SetStore`] that fall inside a
//! key range, in store order or reversed. Range views (`head_set`,
//! `tail_set`, `sub_set`) need a sorted store; `descending_set` needs an
//! ordered one.
//!
//! ```
//! use viewtree::{ElementOrdering, SetView};
//!
//! let set = SetView::from_elements(ElementOrdering::Sorted, [1, 3, 5, 7, 9]);
//! let high = set.tail_set(5, false).unwrap();
//! assert_eq!(high.to_vec().unwrap(), vec![7, 9]);
//!
//! high.insert(8).unwrap();
//! assert!(set.contains(&8).unwrap());
//! assert!(high.insert(2).is_err());
//! ```

mod iter;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use viewtree_core::logging::{targets, PerfSpan};
use viewtree_core::{
    ElementChange, ElementListener, ElementOrdering, ListenerSet, ModificationEvent,
    ModificationPhase, ModificationPlan, RootData, RootOptions, RootSnapshot, SetViewInfo,
    Validator, ViewError, ViewKind, ViewResult,
};

use crate::handle::{common_view_ops, ViewHandle};
use crate::range::KeyRange;
use crate::store::{SetElement, SetStore};
pub use iter::SetIter;

/// The set family of views.
pub struct SetKind<E>(PhantomData<fn() -> E>);

/// The part of the canonical set a view presents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetWindow<E> {
    /// Elements outside the range are hidden.
    pub range: KeyRange<E>,
    /// Whether the view iterates in reverse store order.
    pub descending: bool,
}

impl<E: SetElement> SetWindow<E> {
    fn elements(&self, store: &SetStore<E>) -> Vec<E> {
        store.collect_range(&self.range, self.descending)
    }

    fn count(&self, store: &SetStore<E>) -> usize {
        if self.range.is_full() {
            store.len()
        } else {
            store.collect_range(&self.range, false).len()
        }
    }
}

fn narrowed<E: SetElement>(
    range: Option<KeyRange<E>>,
    parent: &SetWindow<E>,
    info: &SetViewInfo<E>,
) -> ViewResult<SetWindow<E>> {
    range
        .map(|range| SetWindow {
            range,
            descending: parent.descending,
        })
        .ok_or_else(|| ViewError::illegal_view_info(info, "bounds outside the parent's range"))
}

impl<E: SetElement> ViewKind for SetKind<E> {
    type Base = SetStore<E>;
    type Info = SetViewInfo<E>;
    type Local = SetWindow<E>;
    type Change = ElementChange<E>;
    type Listeners = ListenerSet<dyn ElementListener<E>>;
    type Resolved = Vec<Arc<dyn ElementListener<E>>>;

    fn root_local(_: &SetStore<E>) -> SetWindow<E> {
        SetWindow {
            range: KeyRange::full(),
            descending: false,
        }
    }

    fn create_base_view(base: &SetStore<E>, parent: &SetWindow<E>, info: &SetViewInfo<E>) -> ViewResult<SetWindow<E>> {
        let ordering = base.ordering();
        match info {
            SetViewInfo::Iterator => Ok(parent.clone()),
            SetViewInfo::DescendingSet if ordering.is_ordered() => Ok(SetWindow {
                range: parent.range.clone(),
                descending: !parent.descending,
            }),
            SetViewInfo::DescendingSet => Err(ViewError::illegal_view_info(info, "a hashed set has no order")),
            _ if !ordering.is_navigable() => Err(ViewError::illegal_view_info(info, "range views need a sorted set")),
            // Under a descending parent the head of the view is the top of
            // the store's order.
            SetViewInfo::HeadSet { to, inclusive } => {
                let range = if parent.descending {
                    parent.range.with_lower(to, *inclusive)
                } else {
                    parent.range.with_upper(to, *inclusive)
                };
                narrowed(range, parent, info)
            }
            SetViewInfo::TailSet { from, inclusive } => {
                let range = if parent.descending {
                    parent.range.with_upper(from, *inclusive)
                } else {
                    parent.range.with_lower(from, *inclusive)
                };
                narrowed(range, parent, info)
            }
            SetViewInfo::SubSet {
                from,
                from_inclusive,
                to,
                to_inclusive,
            } => {
                let range = if parent.descending {
                    parent.range.with_bounds(to, *to_inclusive, from, *from_inclusive)
                } else {
                    parent.range.with_bounds(from, *from_inclusive, to, *to_inclusive)
                };
                narrowed(range, parent, info)
            }
        }
    }

    fn bubble(change: &ElementChange<E>, _: &SetWindow<E>, _: &SetWindow<E>) -> ElementChange<E> {
        change.clone()
    }

    fn resolve_listeners(listeners: &Self::Listeners) -> Option<Self::Resolved> {
        (!listeners.is_empty()).then(|| listeners.snapshot())
    }

    fn notify(
        resolved: &Self::Resolved,
        phase: ModificationPhase,
        event: &ModificationEvent<ElementChange<E>>,
    ) -> ViewResult<()> {
        for listener in resolved {
            match phase {
                ModificationPhase::Modifying => listener.modifying(event)?,
                ModificationPhase::Modified => listener.modified(event)?,
            }
        }
        Ok(())
    }

    fn listener_count(listeners: &Self::Listeners) -> usize {
        listeners.len()
    }
}

// =========================================================================
// Writes
// =========================================================================

pub(crate) enum SetOp<'a, E> {
    Insert(E),
    Remove(&'a E),
    RemoveWhere(&'a mut dyn FnMut(&E) -> bool),
    /// Remove the first element in view order, or the last.
    RemoveEnd { last: bool },
}

pub(crate) struct SetOutcome<E> {
    /// Elements inserted or removed.
    pub(crate) changed: Vec<E>,
    /// Root modification count after the call.
    pub(crate) mod_count: u64,
}

/// Run a set write through `handle`'s node.
pub(crate) fn apply_set_op<E: SetElement>(
    handle: &ViewHandle<SetKind<E>>,
    op: SetOp<'_, E>,
    guard: Option<u64>,
) -> ViewResult<SetOutcome<E>> {
    let node = handle.node();
    let (plan, path, changed, inserting) = handle.prepare(|t, window| {
        let mod_count = t.data().mod_count();
        if guard.is_some_and(|expected| expected != mod_count) {
            return Err(ViewError::Comodification(
                "the set was modified outside of this iterator",
            ));
        }
        let path = t.path_to_root(node)?;
        let data = t.data();
        let store = data.base_if_present().ok_or(ViewError::NullBase)?;
        let mut plan = ModificationPlan::new(mod_count);

        let (changed, inserting) = match op {
            SetOp::Insert(element) => {
                data.validators().validate(&element)?;
                if !window.range.contains(&element) {
                    return Err(ViewError::OutOfRange);
                }
                let changed = if store.contains(&element) { Vec::new() } else { vec![element] };
                (changed, true)
            }
            SetOp::Remove(element) => {
                let present = window.range.contains(element) && store.contains(element);
                (present.then(|| element.clone()).into_iter().collect(), false)
            }
            SetOp::RemoveWhere(matches) => {
                let removed = window.elements(store).into_iter().filter(|e| matches(e)).collect();
                (removed, false)
            }
            SetOp::RemoveEnd { last } => {
                if !store.ordering().is_ordered() {
                    return Err(ViewError::IllegalState("a hashed set has no first or last element"));
                }
                let elements = window.elements(store);
                let end = if last { elements.last() } else { elements.first() };
                (end.cloned().into_iter().collect(), false)
            }
        };
        for element in &changed {
            let change = if inserting {
                ElementChange::attach(element.clone())
            } else {
                ElementChange::detach(element.clone())
            };
            plan.push(node, change);
        }
        Ok((plan, path, changed, inserting))
    })?;

    if changed.is_empty() {
        let mod_count = handle.mod_count();
        return Ok(SetOutcome { changed, mod_count });
    }
    tracing::trace!(target: targets::SET, events = plan.len(), inserting, "set write");

    let applied = changed.clone();
    let mod_count = handle.execute(plan, move |t| {
        let store = t.data_mut().base_mut()?;
        for element in applied {
            if inserting {
                store.insert(element);
            } else {
                store.remove(&element);
            }
        }
        t.finish_structural_change(&path);
        Ok(t.data().mod_count())
    })?;
    Ok(SetOutcome { changed, mod_count })
}

/// A set, or a range view of one.
///
/// Handles are cheap to clone; all clones share the view.
pub struct SetView<E: SetElement> {
    handle: ViewHandle<SetKind<E>>,
}

static_assertions::assert_impl_all!(SetView<i32>: Send, Sync, Clone);

impl<E: SetElement> SetView<E> {
    /// Create an empty set; the store is created on first use.
    pub fn new(ordering: ElementOrdering) -> Self {
        Self::with_options(RootOptions::default().with_ordering(ordering))
    }

    /// Create a set with explicit root options.
    pub fn with_options(options: RootOptions) -> Self {
        Self {
            handle: ViewHandle::root(RootData::new(options)),
        }
    }

    /// Create a set over an existing store.
    pub fn from_store(store: SetStore<E>, options: RootOptions) -> Self {
        let options = options.with_ordering(store.ordering());
        Self {
            handle: ViewHandle::root(RootData::with_base(store, options)),
        }
    }

    /// Create a set holding `elements`.
    pub fn from_elements(ordering: ElementOrdering, elements: impl IntoIterator<Item = E>) -> Self {
        Self::from_store(SetStore::from_elements(ordering, elements), RootOptions::default())
    }

    /// Restore a set from a snapshot.
    ///
    /// The restored set has no validators; register them again.
    pub fn from_snapshot(snapshot: RootSnapshot<SetStore<E>>, options: RootOptions) -> Self {
        Self {
            handle: ViewHandle::from_snapshot(snapshot, options),
        }
    }

    /// Capture the root data of this set.
    pub fn snapshot(&self) -> RootSnapshot<SetStore<E>> {
        self.handle.snapshot()
    }

    fn read<R>(&self, f: impl FnOnce(&SetStore<E>, &SetWindow<E>) -> ViewResult<R>) -> ViewResult<R> {
        self.handle.read(f)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The ordering of the underlying store.
    pub fn ordering(&self) -> ViewResult<ElementOrdering> {
        self.read(|store, _| Ok(store.ordering()))
    }

    /// Number of elements in the view.
    pub fn len(&self) -> ViewResult<usize> {
        self.read(|store, window| Ok(window.count(store)))
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> ViewResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// Whether the view contains `element`.
    pub fn contains(&self, element: &E) -> ViewResult<bool> {
        self.read(|store, window| Ok(window.range.contains(element) && store.contains(element)))
    }

    /// Copy the elements of the view, in view order.
    pub fn to_vec(&self) -> ViewResult<Vec<E>> {
        self.read(|store, window| Ok(window.elements(store)))
    }

    fn end(&self, last: bool) -> ViewResult<Option<E>> {
        self.read(|store, window| {
            if !store.ordering().is_ordered() {
                return Err(ViewError::IllegalState("a hashed set has no first or last element"));
            }
            let elements = window.elements(store);
            Ok(if last { elements.last() } else { elements.first() }.cloned())
        })
    }

    /// The first element in view order.
    pub fn first(&self) -> ViewResult<Option<E>> {
        self.end(false)
    }

    /// The last element in view order.
    pub fn last(&self) -> ViewResult<Option<E>> {
        self.end(true)
    }

    fn neighbour(&self, key: &E, before: bool, inclusive: bool) -> ViewResult<Option<E>> {
        self.read(|store, window| {
            if !store.ordering().is_navigable() {
                return Err(ViewError::IllegalState("neighbour queries need a sorted set"));
            }
            // Before in a descending view is above in store order.
            let below = before != window.descending;
            Ok(store.nearest(&window.range, key, below, inclusive))
        })
    }

    /// The greatest element strictly before `key` in view order.
    pub fn lower(&self, key: &E) -> ViewResult<Option<E>> {
        self.neighbour(key, true, false)
    }

    /// The greatest element before or equal to `key` in view order.
    pub fn floor(&self, key: &E) -> ViewResult<Option<E>> {
        self.neighbour(key, true, true)
    }

    /// The least element after or equal to `key` in view order.
    pub fn ceiling(&self, key: &E) -> ViewResult<Option<E>> {
        self.neighbour(key, false, true)
    }

    /// The least element strictly after `key` in view order.
    pub fn higher(&self, key: &E) -> ViewResult<Option<E>> {
        self.neighbour(key, false, false)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert an element; returns whether the set changed.
    ///
    /// Fails with [`ViewError::OutOfRange`] if the element lies outside the
    /// bounds of a range view.
    pub fn insert(&self, element: E) -> ViewResult<bool> {
        let outcome = apply_set_op(&self.handle, SetOp::Insert(element), None)?;
        Ok(!outcome.changed.is_empty())
    }

    /// Remove an element; returns whether it was present in the view.
    pub fn remove(&self, element: &E) -> ViewResult<bool> {
        let outcome = apply_set_op(&self.handle, SetOp::Remove(element), None)?;
        Ok(!outcome.changed.is_empty())
    }

    /// Remove every element of the view.
    pub fn clear(&self) -> ViewResult<()> {
        apply_set_op(&self.handle, SetOp::RemoveWhere(&mut |_: &E| true), None).map(drop)
    }

    /// Keep only the elements for which `keep` returns true; returns the
    /// number of removed elements.
    pub fn retain(&self, mut keep: impl FnMut(&E) -> bool) -> ViewResult<usize> {
        let _span = PerfSpan::new("set.retain");
        let outcome = apply_set_op(&self.handle, SetOp::RemoveWhere(&mut |e: &E| !keep(e)), None)?;
        Ok(outcome.changed.len())
    }

    /// Remove and return the first element in view order.
    pub fn pop_first(&self) -> ViewResult<Option<E>> {
        let mut outcome = apply_set_op(&self.handle, SetOp::RemoveEnd { last: false }, None)?;
        Ok(outcome.changed.pop())
    }

    /// Remove and return the last element in view order.
    pub fn pop_last(&self) -> ViewResult<Option<E>> {
        let mut outcome = apply_set_op(&self.handle, SetOp::RemoveEnd { last: true }, None)?;
        Ok(outcome.changed.pop())
    }

    // =========================================================================
    // Views
    // =========================================================================

    fn derive(&self, info: SetViewInfo<E>) -> ViewResult<SetView<E>> {
        let handle = self.handle.derive(info)?;
        tracing::trace!(target: targets::SET, node = ?handle.node(), "created set view");
        Ok(SetView { handle })
    }

    /// The elements before `to` in view order.
    pub fn head_set(&self, to: E, inclusive: bool) -> ViewResult<SetView<E>> {
        self.derive(SetViewInfo::HeadSet { to, inclusive })
    }

    /// The elements after `from` in view order.
    pub fn tail_set(&self, from: E, inclusive: bool) -> ViewResult<SetView<E>> {
        self.derive(SetViewInfo::TailSet { from, inclusive })
    }

    /// The elements between `from` and `to`, given in view order.
    pub fn sub_set(&self, from: E, from_inclusive: bool, to: E, to_inclusive: bool) -> ViewResult<SetView<E>> {
        self.derive(SetViewInfo::SubSet {
            from,
            from_inclusive,
            to,
            to_inclusive,
        })
    }

    /// The view in reverse order.
    pub fn descending_set(&self) -> ViewResult<SetView<E>> {
        self.derive(SetViewInfo::DescendingSet)
    }

    /// A cursor over the elements of the view.
    pub fn iter(&self) -> ViewResult<SetIter<E>> {
        SetIter::open(&self.handle)
    }

    // =========================================================================
    // Listeners and validators
    // =========================================================================

    /// Register a listener for element events of this view.
    pub fn add_element_listener(&self, listener: Arc<dyn ElementListener<E>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.add(listener))
    }

    /// Remove one registration of an element listener.
    pub fn remove_element_listener(&self, listener: &Arc<dyn ElementListener<E>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.remove(listener))
    }

    /// Register a validator consulted before an element enters the set.
    pub fn add_validator(&self, validator: Arc<dyn Validator<E>>) {
        self.handle.update_validators(|v| v.add(Arc::clone(&validator)));
    }

    /// Remove a validator.
    pub fn remove_validator(&self, validator: &Arc<dyn Validator<E>>) {
        self.handle.update_validators(|v| {
            v.remove(validator);
        });
    }

    common_view_ops!(SetKind<E>, SetStore<E>, SetViewInfo<E>);
}

impl<E: SetElement> Clone for SetView<E> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

impl<E: SetElement> fmt::Debug for SetView<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SetView");
        s.field("node", &self.handle.node());
        match self.to_vec() {
            Ok(elements) => s.field("elements", &elements),
            Err(err) => s.field("error", &err.to_string()),
        };
        s.finish()
    }
}

impl<E: SetElement> PartialEq for SetView<E> {
    fn eq(&self, other: &Self) -> bool {
        self.handle.same_node(&other.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted() -> SetView<i32> {
        SetView::from_elements(ElementOrdering::Sorted, [10, 20, 30, 40, 50])
    }

    #[test]
    fn test_range_views_follow_the_base() {
        let set = sorted();
        let head = set.head_set(30, true).unwrap();
        assert_eq!(head.to_vec().unwrap(), vec![10, 20, 30]);
        set.insert(25).unwrap();
        set.insert(35).unwrap();
        assert_eq!(head.to_vec().unwrap(), vec![10, 20, 25, 30]);
        assert_eq!(head.len().unwrap(), 4);
    }

    #[test]
    fn test_insert_outside_range() {
        let set = sorted();
        let sub = set.sub_set(20, true, 40, false).unwrap();
        assert!(matches!(sub.insert(40), Err(ViewError::OutOfRange)));
        assert!(sub.insert(39).unwrap());
        assert!(!sub.insert(39).unwrap());
        assert!(!sub.remove(&50).unwrap());
        assert!(set.contains(&50).unwrap());
    }

    #[test]
    fn test_descending_views() {
        let set = sorted();
        let down = set.descending_set().unwrap();
        assert_eq!(down.to_vec().unwrap(), vec![50, 40, 30, 20, 10]);
        let head = down.head_set(30, false).unwrap();
        assert_eq!(head.to_vec().unwrap(), vec![50, 40]);
        let sub = down.sub_set(40, true, 20, true).unwrap();
        assert_eq!(sub.to_vec().unwrap(), vec![40, 30, 20]);
        assert_eq!(down.lower(&30).unwrap(), Some(40));
        assert_eq!(down.ceiling(&35).unwrap(), Some(30));
        assert_eq!(down.first().unwrap(), Some(50));
    }

    #[test]
    fn test_neighbours() {
        let set = sorted();
        assert_eq!(set.lower(&30).unwrap(), Some(20));
        assert_eq!(set.floor(&30).unwrap(), Some(30));
        assert_eq!(set.ceiling(&31).unwrap(), Some(40));
        assert_eq!(set.higher(&50).unwrap(), None);
        let tail = set.tail_set(30, true).unwrap();
        assert_eq!(tail.lower(&30).unwrap(), None);
    }

    #[test]
    fn test_illegal_range_views() {
        let hashed = SetView::from_elements(ElementOrdering::Hashed, [1, 2]);
        assert!(matches!(hashed.head_set(1, true), Err(ViewError::IllegalViewInfo { .. })));
        assert!(matches!(hashed.descending_set(), Err(ViewError::IllegalViewInfo { .. })));
        assert!(matches!(hashed.first(), Err(ViewError::IllegalState(_))));

        let set = sorted();
        let head = set.head_set(30, false).unwrap();
        assert!(matches!(head.tail_set(40, true), Err(ViewError::IllegalViewInfo { .. })));
        assert!(matches!(set.sub_set(40, true, 20, true), Err(ViewError::IllegalViewInfo { .. })));
    }

    #[test]
    fn test_linked_pop_and_retain() {
        let set = SetView::from_elements(ElementOrdering::Linked, ["c", "a", "b", "d"]);
        assert_eq!(set.pop_first().unwrap(), Some("c"));
        assert_eq!(set.descending_set().unwrap().pop_first().unwrap(), Some("d"));
        assert_eq!(set.retain(|e| *e != "a").unwrap(), 1);
        assert_eq!(set.to_vec().unwrap(), vec!["b"]);
        set.clear().unwrap();
        assert_eq!(set.pop_last().unwrap(), None);
    }
}
