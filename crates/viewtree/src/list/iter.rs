use std::fmt;
use std::sync::Arc;

use viewtree_core::{ElementListener, ListElementListener, ListViewInfo, ViewError, ViewResult};

use super::edit::{apply_list_op, ListOp, ListOutcome};
use super::{visible, ListKind};
use crate::handle::ViewHandle;
use crate::store::ListElement;

/// A cursor over a list view.
///
/// The cursor sits between two elements. It remembers the modification
/// count it last saw; once the list is changed through any other view, every
/// further access fails with [`ViewError::Comodification`]. Writes through
/// the cursor itself keep it valid.
///
/// As an [`Iterator`] it yields `ViewResult<E>`: a stale or disabled cursor
/// yields one error and then ends.
pub struct ListIterator<E: ListElement> {
    handle: ViewHandle<ListKind<E>>,
    cursor: usize,
    last_returned: Option<usize>,
    expected_mod_count: u64,
    failed: bool,
}

impl<E: ListElement> ListIterator<E> {
    pub(crate) fn open(parent: &ViewHandle<ListKind<E>>, info: ListViewInfo, index: usize) -> ViewResult<Self> {
        let len = parent.read(|store, window| visible(store, window).map(<[E]>::len))?;
        if index > len {
            return Err(ViewError::IndexOutOfBounds { index, len });
        }
        let handle = parent.derive(info)?;
        let expected_mod_count = handle.mod_count();
        Ok(Self {
            handle,
            cursor: index,
            last_returned: None,
            expected_mod_count,
            failed: false,
        })
    }

    /// Run a read against the elements if the cursor is still current.
    fn read<R>(&self, f: impl FnOnce(&[E]) -> R) -> ViewResult<R> {
        let node = self.handle.node();
        let expected = self.expected_mod_count;
        self.handle.with_tree(|t| {
            t.required_enabled()?;
            if t.data().mod_count() != expected {
                return Err(ViewError::Comodification(
                    "the list was modified outside of this iterator",
                ));
            }
            let window = t.base(node)?;
            let store = t.data_mut().base()?;
            Ok(f(visible(store, &window)?))
        })
    }

    /// Whether an element follows the cursor.
    pub fn has_next(&self) -> ViewResult<bool> {
        let cursor = self.cursor;
        self.read(|items| cursor < items.len())
    }

    /// Whether an element precedes the cursor.
    pub fn has_previous(&self) -> ViewResult<bool> {
        self.read(|_| self.cursor > 0)
    }

    /// Index of the element a call to `next` would return.
    pub fn next_index(&self) -> usize {
        self.cursor
    }

    /// Index of the element a call to `previous` would return.
    pub fn previous_index(&self) -> Option<usize> {
        self.cursor.checked_sub(1)
    }

    fn advance(&mut self) -> ViewResult<E> {
        let cursor = self.cursor;
        let element = self.read(|items| items.get(cursor).cloned())?.ok_or(ViewError::NoSuchElement)?;
        self.last_returned = Some(cursor);
        self.cursor += 1;
        Ok(element)
    }

    /// Move the cursor back and return the element it passed.
    pub fn previous(&mut self) -> ViewResult<E> {
        let index = self.cursor.checked_sub(1).ok_or(ViewError::NoSuchElement)?;
        let element = self.read(|items| items.get(index).cloned())?.ok_or(ViewError::NoSuchElement)?;
        self.last_returned = Some(index);
        self.cursor = index;
        Ok(element)
    }

    fn last_returned(&self) -> ViewResult<usize> {
        self.last_returned
            .ok_or(ViewError::IllegalState("no element has been returned since the last write"))
    }

    /// Shift the cursor past elements removed before it.
    fn absorb(&mut self, outcome: &ListOutcome<E>) {
        let cursor = self.cursor;
        self.cursor -= outcome.removed_in_view.iter().filter(|&&index| index < cursor).count();
        self.expected_mod_count = outcome.mod_count;
    }

    /// Remove the element last returned by `next` or `previous`.
    pub fn remove(&mut self) -> ViewResult<E> {
        let index = self.last_returned()?;
        let mut outcome = apply_list_op(
            &self.handle,
            ListOp::Remove { indexes: vec![index] },
            Some(self.expected_mod_count),
        )?;
        self.absorb(&outcome);
        self.last_returned = None;
        outcome.removed.pop().ok_or(ViewError::NoSuchElement)
    }

    /// Replace the element last returned by `next` or `previous`.
    pub fn set(&mut self, element: E) -> ViewResult<E> {
        let index = self.last_returned()?;
        let outcome = apply_list_op(
            &self.handle,
            ListOp::Set { index, element },
            Some(self.expected_mod_count),
        )?;
        self.absorb(&outcome);
        self.last_returned = outcome.position;
        outcome.replaced.ok_or(ViewError::NoSuchElement)
    }

    /// Insert an element before the cursor.
    pub fn add(&mut self, element: E) -> ViewResult<()> {
        let outcome = apply_list_op(
            &self.handle,
            ListOp::Insert {
                index: self.cursor,
                element,
            },
            Some(self.expected_mod_count),
        )?;
        self.absorb(&outcome);
        if let Some(position) = outcome.position {
            self.cursor = position + 1;
        }
        self.last_returned = None;
        Ok(())
    }

    /// Register a listener for element events raised through this cursor.
    pub fn add_element_listener(&self, listener: Arc<dyn ElementListener<E>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.elements.add(listener))
    }

    /// Remove one registration of an element listener.
    pub fn remove_element_listener(&self, listener: &Arc<dyn ElementListener<E>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.elements.remove(listener))
    }

    /// Register a listener for positioned events raised through this cursor.
    pub fn add_list_element_listener(&self, listener: Arc<dyn ListElementListener<E>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.list.add(listener))
    }

    /// Remove one registration of a list element listener.
    pub fn remove_list_element_listener(&self, listener: &Arc<dyn ListElementListener<E>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.list.remove(listener))
    }

    /// The descriptor of the cursor view.
    pub fn view_info(&self) -> ViewResult<Option<ListViewInfo>> {
        self.handle.view_info()
    }
}

impl<E: ListElement> Iterator for ListIterator<E> {
    type Item = ViewResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(element) => Some(Ok(element)),
            Err(ViewError::NoSuchElement) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

impl<E: ListElement> fmt::Debug for ListIterator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListIterator")
            .field("node", &self.handle.node())
            .field("cursor", &self.cursor)
            .field("last_returned", &self.last_returned)
            .field("expected_mod_count", &self.expected_mod_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::ListView;
    use viewtree_core::ViewError;

    #[test]
    fn test_walk_both_ways() {
        let list = ListView::from_vec(vec![1, 2, 3]);
        let mut cursor = list.list_iter(1).unwrap();
        assert_eq!(cursor.previous_index(), Some(0));
        assert_eq!(cursor.next_index(), 1);
        assert!(cursor.has_previous().unwrap());
        assert_eq!(cursor.next().unwrap().unwrap(), 2);
        assert_eq!(cursor.next().unwrap().unwrap(), 3);
        assert!(cursor.next().is_none());
        assert_eq!(cursor.previous().unwrap(), 3);
        assert_eq!(cursor.previous().unwrap(), 2);
        assert_eq!(cursor.previous().unwrap(), 1);
        assert!(matches!(cursor.previous(), Err(ViewError::NoSuchElement)));
    }

    #[test]
    fn test_list_iter_index_checked() {
        let list = ListView::from_vec(vec![1, 2, 3]);
        assert!(matches!(list.list_iter(4), Err(ViewError::IndexOutOfBounds { index: 4, len: 3 })));
    }

    #[test]
    fn test_writes_keep_cursor_valid() {
        let list = ListView::from_vec(vec![1, 2, 3, 4]);
        let mut cursor = list.iter().unwrap();
        while let Some(item) = cursor.next() {
            let item = item.unwrap();
            if item % 2 == 0 {
                cursor.remove().unwrap();
            } else {
                cursor.add(item * 10).unwrap();
            }
        }
        assert_eq!(list.to_vec().unwrap(), vec![1, 10, 3, 30]);
    }

    #[test]
    fn test_set_after_previous() {
        let list = ListView::from_vec(vec!['a', 'b', 'c']);
        let mut cursor = list.list_iter(3).unwrap();
        assert_eq!(cursor.previous().unwrap(), 'c');
        assert_eq!(cursor.set('z').unwrap(), 'c');
        assert!(matches!(cursor.remove(), Ok('z')));
        assert!(matches!(cursor.remove(), Err(ViewError::IllegalState(_))));
        assert_eq!(list.to_vec().unwrap(), vec!['a', 'b']);
    }

    #[test]
    fn test_stale_cursor_fails() {
        let list = ListView::from_vec(vec![1, 2, 3]);
        let mut cursor = list.iter().unwrap();
        assert_eq!(cursor.next().unwrap().unwrap(), 1);
        list.push(4).unwrap();
        assert!(cursor.next().unwrap().unwrap_err().is_comodification());
        assert!(cursor.next().is_none());
        assert!(cursor.remove().unwrap_err().is_comodification());
    }
}
