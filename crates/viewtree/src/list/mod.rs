//! Observable lists with sublist and cursor views.
//!
//! A [`ListView`] is either the root of a list or a sublist of another list
//! view. Every view presents a window (`offset`, `len`) of the canonical
//! [`ListStore`]; the window is derived again from the parent's on the first
//! access after a modification.
//!
//! # Example
//!
//! ```
//! use viewtree::ListView;
//!
//! let list = ListView::from_vec(vec!['a', 'b', 'c', 'd', 'e']);
//! let middle = list.sub_list(1, 4).unwrap();
//! middle.insert(1, 'x').unwrap();
//!
//! assert_eq!(list.to_vec().unwrap(), vec!['a', 'b', 'x', 'c', 'd', 'e']);
//! assert_eq!(middle.to_vec().unwrap(), vec!['b', 'x', 'c', 'd']);
//! ```

mod edit;
mod iter;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use viewtree_core::logging::{targets, PerfSpan};
use viewtree_core::{
    ElementListener, ListChange, ListElementListener, ListViewInfo, ListenerSet,
    ModificationEvent, ModificationPhase, RootData, RootOptions, RootSnapshot, Validator,
    ViewError, ViewKind, ViewResult,
};

use crate::handle::{common_view_ops, ViewHandle};
use crate::store::{ListElement, ListStore};
use edit::{apply_list_op, ListOp};
pub use iter::ListIterator;

/// The list family of views.
pub struct ListKind<E>(PhantomData<fn() -> E>);

/// The part of the canonical list a view presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListWindow {
    /// Position of the first element in the root list.
    pub offset: usize,
    /// Number of elements.
    pub len: usize,
}

impl ListWindow {
    /// Whether the absolute root position lies inside the window.
    pub fn contains(&self, position: usize) -> bool {
        position >= self.offset && position < self.offset + self.len
    }
}

/// Listeners registered on one list view.
pub struct ListListeners<E> {
    list: ListenerSet<dyn ListElementListener<E>>,
    elements: ListenerSet<dyn ElementListener<E>>,
}

impl<E> Default for ListListeners<E> {
    fn default() -> Self {
        Self {
            list: ListenerSet::new(),
            elements: ListenerSet::new(),
        }
    }
}

/// Listeners resolved for one list event.
pub struct ResolvedListListeners<E> {
    list: Vec<Arc<dyn ListElementListener<E>>>,
    elements: Vec<Arc<dyn ElementListener<E>>>,
}

/// The elements a window presents.
pub(crate) fn visible<'a, E>(store: &'a ListStore<E>, window: &ListWindow) -> ViewResult<&'a [E]> {
    store
        .as_slice()
        .get(window.offset..window.offset + window.len)
        .ok_or(ViewError::Comodification("the view no longer fits its list"))
}

impl<E: ListElement> ViewKind for ListKind<E> {
    type Base = ListStore<E>;
    type Info = ListViewInfo;
    type Local = ListWindow;
    type Change = ListChange<E>;
    type Listeners = ListListeners<E>;
    type Resolved = ResolvedListListeners<E>;

    fn root_local(base: &ListStore<E>) -> ListWindow {
        ListWindow {
            offset: 0,
            len: base.len(),
        }
    }

    fn create_base_view(_: &ListStore<E>, parent: &ListWindow, info: &ListViewInfo) -> ViewResult<ListWindow> {
        match *info {
            // Cursors see their parent; their position lives in the cursor.
            ListViewInfo::Iterator | ListViewInfo::ListIterator { .. } => Ok(*parent),
            ListViewInfo::SubList { from, to } if from <= to && to <= parent.len => Ok(ListWindow {
                offset: parent.offset + from,
                len: to - from,
            }),
            ListViewInfo::SubList { .. } => Err(ViewError::illegal_view_info(
                info,
                format!("sublist bounds outside a parent of length {}", parent.len),
            )),
        }
    }

    fn is_positional(info: &ListViewInfo) -> bool {
        info.is_positional()
    }

    fn bubble(change: &ListChange<E>, child: &ListWindow, parent: &ListWindow) -> ListChange<E> {
        let detach_offset = child.offset - parent.offset;
        // Elements removed between the two heads move the child's head in
        // the after coordinates.
        let evicted = change
            .conflicts()
            .iter()
            .filter(|&&position| position >= parent.offset && position < child.offset)
            .count();
        change.shifted(detach_offset, detach_offset - evicted)
    }

    fn resolve_listeners(listeners: &ListListeners<E>) -> Option<ResolvedListListeners<E>> {
        if listeners.list.is_empty() && listeners.elements.is_empty() {
            return None;
        }
        Some(ResolvedListListeners {
            list: listeners.list.snapshot(),
            elements: listeners.elements.snapshot(),
        })
    }

    fn notify(
        resolved: &ResolvedListListeners<E>,
        phase: ModificationPhase,
        event: &ModificationEvent<ListChange<E>>,
    ) -> ViewResult<()> {
        for listener in &resolved.list {
            match phase {
                ModificationPhase::Modifying => listener.modifying(event)?,
                ModificationPhase::Modified => listener.modified(event)?,
            }
        }
        if resolved.elements.is_empty() {
            return Ok(());
        }
        let projected = event.project(event.change().to_element_change());
        for listener in &resolved.elements {
            match phase {
                ModificationPhase::Modifying => listener.modifying(&projected)?,
                ModificationPhase::Modified => listener.modified(&projected)?,
            }
        }
        Ok(())
    }

    fn listener_count(listeners: &ListListeners<E>) -> usize {
        listeners.list.len() + listeners.elements.len()
    }
}

/// A list, or a sublist of one.
///
/// Handles are cheap to clone; all clones share the view. Reads fail while
/// the collection is disabled, writes enable it again.
pub struct ListView<E: ListElement> {
    handle: ViewHandle<ListKind<E>>,
}

static_assertions::assert_impl_all!(ListView<i32>: Send, Sync, Clone);

impl<E: ListElement> ListView<E> {
    /// Create an empty list whose store is created on first use.
    pub fn new() -> Self {
        Self::with_options(RootOptions::default())
    }

    /// Create a list with explicit root options.
    pub fn with_options(options: RootOptions) -> Self {
        Self {
            handle: ViewHandle::root(RootData::new(options)),
        }
    }

    /// Create a list over an existing store.
    pub fn from_store(store: ListStore<E>, options: RootOptions) -> Self {
        Self {
            handle: ViewHandle::root(RootData::with_base(store, options)),
        }
    }

    /// Create a list holding `items`.
    pub fn from_vec(items: Vec<E>) -> Self {
        Self::from_store(ListStore::from_vec(items), RootOptions::default())
    }

    /// Restore a list from a snapshot.
    ///
    /// The restored list has no validators; register them again.
    pub fn from_snapshot(snapshot: RootSnapshot<ListStore<E>>, options: RootOptions) -> Self {
        Self {
            handle: ViewHandle::from_snapshot(snapshot, options),
        }
    }

    /// Capture the root data of this list.
    pub fn snapshot(&self) -> RootSnapshot<ListStore<E>> {
        self.handle.snapshot()
    }

    pub(crate) fn handle(&self) -> &ViewHandle<ListKind<E>> {
        &self.handle
    }

    fn read<R>(&self, f: impl FnOnce(&[E]) -> R) -> ViewResult<R> {
        self.handle.read(|store, window| visible(store, window).map(f))
    }

    /// Read the view together with the modification count it was read at.
    fn read_counted<R>(&self, f: impl FnOnce(&[E]) -> R) -> ViewResult<(R, u64)> {
        let node = self.handle.node();
        self.handle.with_tree(|t| {
            t.required_enabled()?;
            let window = t.base(node)?;
            let mod_count = t.data().mod_count();
            let store = t.data_mut().base()?;
            Ok((f(visible(store, &window)?), mod_count))
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Number of elements in the view.
    pub fn len(&self) -> ViewResult<usize> {
        self.read(<[E]>::len)
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> ViewResult<bool> {
        self.read(<[E]>::is_empty)
    }

    /// The element at `index`.
    pub fn get(&self, index: usize) -> ViewResult<E> {
        self.read(|items| {
            items.get(index).cloned().ok_or(ViewError::IndexOutOfBounds {
                index,
                len: items.len(),
            })
        })?
    }

    /// Whether the view contains `element`.
    pub fn contains(&self, element: &E) -> ViewResult<bool> {
        self.read(|items| items.contains(element))
    }

    /// Index of the first occurrence of `element`.
    pub fn index_of(&self, element: &E) -> ViewResult<Option<usize>> {
        self.read(|items| items.iter().position(|item| item == element))
    }

    /// Index of the last occurrence of `element`.
    pub fn last_index_of(&self, element: &E) -> ViewResult<Option<usize>> {
        self.read(|items| items.iter().rposition(|item| item == element))
    }

    /// Copy the elements of the view.
    pub fn to_vec(&self) -> ViewResult<Vec<E>> {
        self.read(<[E]>::to_vec)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append an element to the end of the view.
    ///
    /// In a unique list an equal element elsewhere is removed first.
    pub fn push(&self, element: E) -> ViewResult<()> {
        apply_list_op(&self.handle, ListOp::Push { element }, None).map(drop)
    }

    /// Insert an element at `index`.
    pub fn insert(&self, index: usize, element: E) -> ViewResult<()> {
        apply_list_op(&self.handle, ListOp::Insert { index, element }, None).map(drop)
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, element: E) -> ViewResult<E> {
        apply_list_op(&self.handle, ListOp::Set { index, element }, None)?
            .replaced
            .ok_or(ViewError::NoSuchElement)
    }

    /// Remove and return the element at `index`.
    pub fn remove_at(&self, index: usize) -> ViewResult<E> {
        apply_list_op(&self.handle, ListOp::Remove { indexes: vec![index] }, None)?
            .removed
            .pop()
            .ok_or(ViewError::NoSuchElement)
    }

    /// Remove the first occurrence of `element`; returns whether one was found.
    pub fn remove_item(&self, element: &E) -> ViewResult<bool> {
        self.handle.enable();
        let (index, mod_count) = self.read_counted(|items| items.iter().position(|item| item == element))?;
        match index {
            Some(index) => {
                apply_list_op(&self.handle, ListOp::Remove { indexes: vec![index] }, Some(mod_count))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every element of the view.
    pub fn clear(&self) -> ViewResult<()> {
        apply_list_op(&self.handle, ListOp::Clear, None).map(drop)
    }

    /// Append every element of `elements`.
    ///
    /// A unique list appends one element at a time so duplicates within the
    /// batch evict each other like separate pushes would.
    pub fn extend(&self, elements: impl IntoIterator<Item = E>) -> ViewResult<()> {
        let _span = PerfSpan::new("list.extend");
        let unique = self
            .handle
            .prepare(|t, _| Ok(t.data().base_if_present().is_some_and(ListStore::is_unique)))?;
        if unique {
            for element in elements {
                self.push(element)?;
            }
            return Ok(());
        }
        let elements: Vec<E> = elements.into_iter().collect();
        if elements.is_empty() {
            return Ok(());
        }
        apply_list_op(&self.handle, ListOp::Append { elements }, None).map(drop)
    }

    /// Keep only the elements for which `keep` returns true; returns the
    /// number of removed elements.
    pub fn retain(&self, mut keep: impl FnMut(&E) -> bool) -> ViewResult<usize> {
        let _span = PerfSpan::new("list.retain");
        self.handle.enable();
        let (indexes, mod_count) = self.read_counted(|items| {
            items
                .iter()
                .enumerate()
                .filter(|(_, item)| !keep(item))
                .map(|(index, _)| index)
                .collect::<Vec<_>>()
        })?;
        if indexes.is_empty() {
            return Ok(0);
        }
        let count = indexes.len();
        apply_list_op(&self.handle, ListOp::Remove { indexes }, Some(mod_count))?;
        Ok(count)
    }

    // =========================================================================
    // Views and cursors
    // =========================================================================

    /// A view of the elements in `[from, to)`.
    ///
    /// Writes through the sublist are visible in this list and keep the
    /// sublist's bounds in sync. Writes made elsewhere make the sublist
    /// stale: its next access fails with a comodification error.
    pub fn sub_list(&self, from: usize, to: usize) -> ViewResult<ListView<E>> {
        let handle = self.handle.derive(ListViewInfo::SubList { from, to })?;
        tracing::trace!(target: targets::LIST, from, to, node = ?handle.node(), "created sublist");
        Ok(ListView { handle })
    }

    /// A forward cursor over the view.
    pub fn iter(&self) -> ViewResult<ListIterator<E>> {
        ListIterator::open(&self.handle, ListViewInfo::Iterator, 0)
    }

    /// A bidirectional cursor positioned before `index`.
    pub fn list_iter(&self, index: usize) -> ViewResult<ListIterator<E>> {
        ListIterator::open(&self.handle, ListViewInfo::ListIterator { index }, index)
    }

    // =========================================================================
    // Listeners and validators
    // =========================================================================

    /// Register a listener for element events of this view.
    pub fn add_element_listener(&self, listener: Arc<dyn ElementListener<E>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.elements.add(listener))
    }

    /// Remove one registration of an element listener.
    pub fn remove_element_listener(&self, listener: &Arc<dyn ElementListener<E>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.elements.remove(listener))
    }

    /// Register a listener for positioned list events of this view.
    pub fn add_list_element_listener(&self, listener: Arc<dyn ListElementListener<E>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.list.add(listener))
    }

    /// Remove one registration of a list element listener.
    pub fn remove_list_element_listener(&self, listener: &Arc<dyn ListElementListener<E>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.list.remove(listener))
    }

    /// Register a validator consulted before an element enters the list.
    pub fn add_validator(&self, validator: Arc<dyn Validator<E>>) {
        self.handle.update_validators(|v| v.add(Arc::clone(&validator)));
    }

    /// Remove a validator.
    pub fn remove_validator(&self, validator: &Arc<dyn Validator<E>>) {
        self.handle.update_validators(|v| {
            v.remove(validator);
        });
    }

    common_view_ops!(ListKind<E>, ListStore<E>, ListViewInfo);
}

impl<E: ListElement> Default for ListView<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ListElement> Clone for ListView<E> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

impl<E: ListElement> fmt::Debug for ListView<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ListView");
        s.field("node", &self.handle.node());
        match self.to_vec() {
            Ok(items) => s.field("items", &items),
            Err(err) => s.field("error", &err.to_string()),
        };
        s.finish()
    }
}

impl<E: ListElement> PartialEq for ListView<E> {
    fn eq(&self, other: &Self) -> bool {
        self.handle.same_node(&other.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use viewtree_core::{list_element_listener, PropertyVersion, ValidationError};

    fn letters() -> ListView<char> {
        ListView::from_vec(vec!['a', 'b', 'c', 'd', 'e'])
    }

    #[test]
    fn test_reads() {
        let list = ListView::from_vec(vec![1, 2, 3, 2]);
        assert_eq!(list.len().unwrap(), 4);
        assert_eq!(list.get(1).unwrap(), 2);
        assert!(matches!(list.get(4), Err(ViewError::IndexOutOfBounds { index: 4, len: 4 })));
        assert_eq!(list.index_of(&2).unwrap(), Some(1));
        assert_eq!(list.last_index_of(&2).unwrap(), Some(3));
        assert!(!list.contains(&5).unwrap());
    }

    #[test]
    fn test_lazy_default_store() {
        let list: ListView<i32> = ListView::new();
        assert!(list.is_empty().unwrap());
        list.push(1).unwrap();
        assert_eq!(list.to_vec().unwrap(), vec![1]);
    }

    #[test]
    fn test_sublist_insert_bubbles_with_offset() {
        let list = letters();
        let sub = list.sub_list(1, 4).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        list.add_list_element_listener(list_element_listener(move |phase, event: &viewtree_core::ListElementEvent<char>| {
            if phase == ModificationPhase::Modified {
                recorder.lock().push(event.change().index(PropertyVersion::Attach));
            }
            Ok(())
        }))
        .unwrap();

        sub.insert(1, 'x').unwrap();
        assert_eq!(*seen.lock(), vec![Some(2)]);
        assert_eq!(list.to_vec().unwrap(), vec!['a', 'b', 'x', 'c', 'd', 'e']);
        assert_eq!(sub.to_vec().unwrap(), vec!['b', 'x', 'c', 'd']);
        assert_eq!(sub.view_info().unwrap(), Some(ListViewInfo::SubList { from: 1, to: 5 }));
    }

    #[test]
    fn test_sublist_bounds_checked() {
        let list = letters();
        assert!(matches!(list.sub_list(3, 6), Err(ViewError::IllegalViewInfo { .. })));
        assert!(matches!(list.sub_list(3, 2), Err(ViewError::IllegalViewInfo { .. })));
        assert!(list.sub_list(5, 5).unwrap().is_empty().unwrap());
    }

    #[test]
    fn test_set_returns_previous_without_structural_change() {
        let list = letters();
        let sub = list.sub_list(1, 3).unwrap();
        let before = list.mod_count();
        assert_eq!(sub.set(0, 'B').unwrap(), 'b');
        assert_eq!(list.mod_count(), before);
        assert_eq!(list.get(1).unwrap(), 'B');
    }

    #[test]
    fn test_unique_insert_evicts_duplicate() {
        let list = ListView::from_store(
            ListStore::unique_from(vec!['a', 'b', 'c', 'd', 'e']),
            RootOptions::default(),
        );
        let tail = list.sub_list(2, 5).unwrap();
        tail.insert(1, 'a').unwrap();
        assert_eq!(list.to_vec().unwrap(), vec!['b', 'c', 'a', 'd', 'e']);
        assert_eq!(tail.to_vec().unwrap(), vec!['c', 'a', 'd', 'e']);
    }

    #[test]
    fn test_retain_and_remove_item() {
        let list = ListView::from_vec((1..=6).collect());
        assert_eq!(list.retain(|n| n % 2 == 0).unwrap(), 3);
        assert_eq!(list.to_vec().unwrap(), vec![2, 4, 6]);
        assert!(list.remove_item(&4).unwrap());
        assert!(!list.remove_item(&5).unwrap());
        assert_eq!(list.to_vec().unwrap(), vec![2, 6]);
    }

    #[test]
    fn test_extend_and_clear_through_sublist() {
        let list = ListView::from_vec(vec![1, 2, 3]);
        let sub = list.sub_list(1, 2).unwrap();
        sub.extend([7, 8]).unwrap();
        assert_eq!(list.to_vec().unwrap(), vec![1, 2, 7, 8, 3]);
        sub.clear().unwrap();
        assert_eq!(list.to_vec().unwrap(), vec![1, 3]);
        assert!(sub.is_empty().unwrap());
    }

    #[test]
    fn test_validator_refuses_element() {
        let list = ListView::from_vec(vec![1]);
        let positive = viewtree_core::validator_fn(|n: &i32| {
            if *n > 0 { Ok(()) } else { Err(ValidationError::new("not positive")) }
        });
        list.add_validator(Arc::clone(&positive));
        assert!(matches!(list.push(-1), Err(ViewError::Validation(_))));
        assert_eq!(list.len().unwrap(), 1);
        list.remove_validator(&positive);
        list.push(-1).unwrap();
    }

    #[test]
    fn test_released_sublist_leaves_tree() {
        let list = letters();
        let sub = list.sub_list(0, 2).unwrap();
        assert_eq!(list.handle().with_tree(|t| t.node_count()), 2);
        drop(sub);
        assert_eq!(list.handle().with_tree(|t| t.node_count()), 1);
    }
}
