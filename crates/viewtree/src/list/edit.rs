//! Planning and applying list mutations.
//!
//! Every list write is described by a [`ListOp`], planned against the
//! current windows of the origin view and all of its ancestors, and then
//! executed under the two-phase protocol.
//!
//! Coordinates: removals are expressed in positions *before* the call,
//! insertions in positions *after* it. A unique list may evict an equal
//! element somewhere else in the root list (a conflict); the detach event for
//! it is raised on the deepest view of the path that contains it.

use std::sync::Arc;

use viewtree_core::logging::targets;
use viewtree_core::{
    ListChange, ListViewInfo, ModificationPlan, NodeId, ViewError, ViewResult, ViewTree,
};

use super::{ListKind, ListWindow};
use crate::handle::ViewHandle;
use crate::store::{ListElement, ListStore};

pub(crate) enum ListOp<E> {
    /// Insert at a view index.
    Insert { index: usize, element: E },
    /// Insert at the end of the view.
    Push { element: E },
    /// Replace the element at a view index.
    Set { index: usize, element: E },
    /// Remove the elements at ascending view indexes.
    Remove { indexes: Vec<usize> },
    /// Remove every element of the view.
    Clear,
    /// Append elements to a list that is not unique.
    Append { elements: Vec<E> },
}

/// What a list write did, in the origin view's coordinates.
pub(crate) struct ListOutcome<E> {
    /// Elements removed at the requested indexes.
    pub(crate) removed: Vec<E>,
    /// The element overwritten by a `Set`.
    pub(crate) replaced: Option<E>,
    /// Post-call index of the inserted or replaced element.
    pub(crate) position: Option<usize>,
    /// Pre-call view indexes of every element removed inside the view,
    /// evicted duplicates included.
    pub(crate) removed_in_view: Vec<usize>,
    /// Root modification count after the call.
    pub(crate) mod_count: u64,
}

/// A single insertion or replacement planned against the store.
struct Placement<E> {
    /// Pre-call view index of a replaced element.
    replaces: Option<usize>,
    /// Absolute post-call position.
    target: usize,
    element: E,
}

struct Prepared<E> {
    plan: ModificationPlan<ListChange<E>>,
    path: Vec<NodeId>,
    new_windows: Vec<ListWindow>,
    /// Absolute pre-call positions to remove, ascending.
    removed_abs: Vec<usize>,
    replacement: Option<(usize, E)>,
    inserts: Vec<(usize, E)>,
    outcome: ListOutcome<E>,
}

fn shifted_window(window: ListWindow, removed: &[usize], inserted: usize) -> ListWindow {
    let before = removed.iter().filter(|&&r| r < window.offset).count();
    let inside = removed.iter().filter(|&&r| window.contains(r)).count();
    ListWindow {
        offset: window.offset - before,
        len: window.len - inside + inserted,
    }
}

/// The deepest node of the path whose window contains `position`, and the
/// position in that node's coordinates.
fn owner_of(path: &[NodeId], windows: &[ListWindow], position: usize) -> Option<(NodeId, usize)> {
    path.iter()
        .zip(windows)
        .find(|(_, window)| window.contains(position))
        .map(|(&id, window)| (id, position - window.offset))
}

fn check_index(index: usize, len: usize) -> ViewResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(ViewError::IndexOutOfBounds { index, len })
    }
}

/// Position an element at view index `index`, evicting an equal element of
/// a unique store unless it already sits at the target.
fn place<E: ListElement>(
    store: &ListStore<E>,
    window: ListWindow,
    index: usize,
    element: &E,
    replacing: bool,
) -> (Option<usize>, usize) {
    let abs = window.offset + index;
    let conflict = if store.is_unique() {
        store
            .position(element)
            .filter(|&c| !(replacing && c == abs))
    } else {
        None
    };
    let target = abs - usize::from(conflict.is_some_and(|c| c < abs));
    (conflict, target)
}

/// Re-derive the bounds of every sublist on a mutation path.
fn resync_path<E: ListElement>(
    t: &mut ViewTree<ListKind<E>>,
    path: &[NodeId],
    new_windows: &[ListWindow],
) -> ViewResult<()> {
    for (i, &id) in path.iter().enumerate() {
        if let Some(ListViewInfo::SubList { .. }) = t.view_info(id)?.copied() {
            let parent = new_windows[i + 1];
            let from = new_windows[i].offset - parent.offset;
            let to = from + new_windows[i].len;
            t.set_view_info(id, ListViewInfo::SubList { from, to })?;
        }
    }
    Ok(())
}

/// Run a list write through `handle`'s node.
///
/// `guard` is the modification count the caller computed its indexes at; the
/// call fails with a comodification error if the list changed since.
pub(crate) fn apply_list_op<E: ListElement>(
    handle: &ViewHandle<ListKind<E>>,
    op: ListOp<E>,
    guard: Option<u64>,
) -> ViewResult<ListOutcome<E>> {
    let node = handle.node();
    let prepared = handle.prepare(|t, _| {
        let mod_count = t.data().mod_count();
        if guard.is_some_and(|expected| expected != mod_count) {
            return Err(ViewError::Comodification(
                "the list was modified since the positions were computed",
            ));
        }
        let path = t.path_to_root(node)?;
        let mut windows = Vec::with_capacity(path.len());
        for &id in &path {
            windows.push(*t.base(id)?);
        }
        let data = t.data();
        let store = data.base_if_present().ok_or(ViewError::NullBase)?;
        let validators = data.validators();
        let window = windows[0];
        let items = store.as_slice();

        let mut removed_abs: Vec<usize> = Vec::new();
        let mut removed = Vec::new();
        let mut detaches: Vec<(usize, E)> = Vec::new();
        let mut placement = None;
        let mut appended = Vec::new();

        match op {
            ListOp::Insert { index, element } => {
                if index > window.len {
                    return Err(ViewError::IndexOutOfBounds {
                        index,
                        len: window.len,
                    });
                }
                placement = Some((index, element, false));
            }
            ListOp::Push { element } => placement = Some((window.len, element, false)),
            ListOp::Set { index, element } => {
                check_index(index, window.len)?;
                placement = Some((index, element, true));
            }
            ListOp::Remove { indexes } => {
                for &index in &indexes {
                    check_index(index, window.len)?;
                }
                for index in indexes {
                    let abs = window.offset + index;
                    removed_abs.push(abs);
                    removed.push(items[abs].clone());
                    detaches.push((abs, items[abs].clone()));
                }
            }
            ListOp::Clear => {
                for abs in window.offset..window.offset + window.len {
                    removed_abs.push(abs);
                    removed.push(items[abs].clone());
                    detaches.push((abs, items[abs].clone()));
                }
            }
            ListOp::Append { elements } => {
                for element in &elements {
                    validators.validate(element)?;
                }
                appended = elements;
            }
        }

        let placement = match placement {
            Some((index, element, replacing)) => {
                validators.validate(&element)?;
                let (conflict, target) = place(store, window, index, &element, replacing);
                if let Some(c) = conflict {
                    removed_abs.push(c);
                    detaches.push((c, items[c].clone()));
                }
                Some(Placement {
                    replaces: replacing.then_some(index),
                    target,
                    element,
                })
            }
            None => None,
        };

        let inserted = appended.len() + usize::from(placement.as_ref().is_some_and(|p| p.replaces.is_none()));
        let new_windows: Vec<ListWindow> = windows
            .iter()
            .map(|&w| shifted_window(w, &removed_abs, inserted))
            .collect();
        let new_origin = new_windows[0];
        let conflicts: Arc<[usize]> = removed_abs.iter().copied().collect();

        let mut plan = ModificationPlan::new(mod_count);
        for (abs, element) in detaches {
            let (owner, index) = owner_of(&path, &windows, abs).ok_or(ViewError::IndexOutOfBounds {
                index: abs,
                len: items.len(),
            })?;
            plan.push(owner, ListChange::detach(index, element).with_conflicts(Arc::clone(&conflicts)));
        }

        let mut replacement = None;
        let mut replaced = None;
        let mut inserts = Vec::new();
        let mut position = None;
        if let Some(Placement {
            replaces,
            target,
            element,
        }) = placement
        {
            let new_index = target - new_origin.offset;
            position = Some(new_index);
            match replaces {
                Some(old_index) => {
                    let old = items[window.offset + old_index].clone();
                    plan.push(
                        node,
                        ListChange::replace(old_index, old.clone(), new_index, element.clone())
                            .with_conflicts(Arc::clone(&conflicts)),
                    );
                    replaced = Some(old);
                    replacement = Some((target, element));
                }
                None => {
                    plan.push(
                        node,
                        ListChange::attach(new_index, element.clone()).with_conflicts(Arc::clone(&conflicts)),
                    );
                    inserts.push((target, element));
                }
            }
        }
        let start = window.offset + window.len;
        for (k, element) in appended.into_iter().enumerate() {
            plan.push(node, ListChange::attach(window.len + k, element.clone()));
            inserts.push((start + k, element));
        }

        let removed_in_view = removed_abs
            .iter()
            .filter(|&&r| window.contains(r))
            .map(|&r| r - window.offset)
            .collect();

        Ok(Prepared {
            plan,
            path,
            new_windows,
            removed_abs,
            replacement,
            inserts,
            outcome: ListOutcome {
                removed,
                replaced,
                position,
                removed_in_view,
                mod_count,
            },
        })
    })?;

    let Prepared {
        plan,
        path,
        new_windows,
        removed_abs,
        replacement,
        inserts,
        mut outcome,
    } = prepared;

    let structural = !removed_abs.is_empty() || !inserts.is_empty();
    if !structural && replacement.is_none() {
        return Ok(outcome);
    }
    tracing::trace!(
        target: targets::LIST,
        events = plan.len(),
        removed = removed_abs.len(),
        inserted = inserts.len(),
        "list write"
    );

    outcome.mod_count = handle.execute(plan, move |t| {
        let items = t.data_mut().base_mut()?.items_mut();
        for &position in removed_abs.iter().rev() {
            items.remove(position);
        }
        if let Some((position, element)) = replacement {
            let slot = items
                .get_mut(position)
                .ok_or(ViewError::Comodification("the list shrank during the modification"))?;
            *slot = element;
        }
        for (position, element) in inserts {
            items.insert(position, element);
        }
        if structural {
            resync_path(t, &path, &new_windows)?;
            t.finish_structural_change(&path);
        }
        Ok(t.data().mod_count())
    })?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shifted_window() {
        let window = ListWindow { offset: 2, len: 3 };
        // One removal before the window, one inside, one insertion.
        assert_eq!(
            shifted_window(window, &[0, 3], 1),
            ListWindow { offset: 1, len: 3 }
        );
        assert_eq!(shifted_window(window, &[5], 0), window);
    }

    #[test]
    fn test_place_in_unique_store() {
        let store = ListStore::unique_from(vec!['a', 'b', 'c', 'd', 'e']);
        let window = ListWindow { offset: 2, len: 3 };
        // Inserting 'a' before 'd': 'a' is evicted from position 0 first.
        assert_eq!(place(&store, window, 1, &'a', false), (Some(0), 2));
        // Replacing 'c' with itself evicts nothing.
        assert_eq!(place(&store, window, 0, &'c', true), (None, 2));
        // Inserting an absent element.
        assert_eq!(place(&store, window, 3, &'z', false), (None, 5));
    }
}
