use std::fmt;
use std::sync::Arc;

use viewtree_core::{ElementListener, ViewError, ViewResult};

use super::{apply_set_op, SetKind, SetOp};
use crate::handle::ViewHandle;
use crate::store::SetElement;

/// A cursor over a set view.
///
/// The elements are captured when the cursor is opened. A modification made
/// through any other view makes the cursor stale; `remove` goes through the
/// cursor's own view node and keeps it valid.
pub struct SetIter<E: SetElement> {
    handle: ViewHandle<SetKind<E>>,
    elements: Vec<E>,
    position: usize,
    last_returned: Option<E>,
    expected_mod_count: u64,
    failed: bool,
}

impl<E: SetElement> SetIter<E> {
    pub(crate) fn open(parent: &ViewHandle<SetKind<E>>) -> ViewResult<Self> {
        let handle = parent.derive(viewtree_core::SetViewInfo::Iterator)?;
        let node = handle.node();
        let (elements, expected_mod_count) = handle.with_tree(|t| {
            t.required_enabled()?;
            let window = t.base(node)?;
            let mod_count = t.data().mod_count();
            let store = t.data_mut().base()?;
            Ok::<_, ViewError>((window.elements(store), mod_count))
        })?;
        Ok(Self {
            handle,
            elements,
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
                Err(ViewError::Comodification("the set was modified outside of this iterator"))
            }
        })
    }

    /// Whether another element remains.
    pub fn has_next(&self) -> ViewResult<bool> {
        self.check_for_comodification()?;
        Ok(self.position < self.elements.len())
    }

    /// Remove the element last returned by `next`.
    pub fn remove(&mut self) -> ViewResult<()> {
        let element = self
            .last_returned
            .take()
            .ok_or(ViewError::IllegalState("no element has been returned since the last removal"))?;
        let outcome = apply_set_op(&self.handle, SetOp::Remove(&element), Some(self.expected_mod_count))?;
        self.expected_mod_count = outcome.mod_count;
        Ok(())
    }

    /// Register a listener for element events raised through this cursor.
    pub fn add_element_listener(&self, listener: Arc<dyn ElementListener<E>>) -> ViewResult<()> {
        self.handle.update_listeners(|l| l.add(listener))
    }

    /// Remove one registration of an element listener.
    pub fn remove_element_listener(&self, listener: &Arc<dyn ElementListener<E>>) -> ViewResult<bool> {
        self.handle.update_listeners(|l| l.remove(listener))
    }
}

impl<E: SetElement> Iterator for SetIter<E> {
    type Item = ViewResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Err(err) = self.check_for_comodification() {
            self.failed = true;
            return Some(Err(err));
        }
        let element = self.elements.get(self.position)?.clone();
        self.position += 1;
        self.last_returned = Some(element.clone());
        Some(Ok(element))
    }
}

impl<E: SetElement> fmt::Debug for SetIter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetIter")
            .field("node", &self.handle.node())
            .field("position", &self.position)
            .field("remaining", &(self.elements.len() - self.position))
            .field("expected_mod_count", &self.expected_mod_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::SetView;
    use viewtree_core::{ElementOrdering, ViewError};

    #[test]
    fn test_remove_through_cursor() {
        let set = SetView::from_elements(ElementOrdering::Sorted, 1..=6);
        let mut cursor = set.iter().unwrap();
        while let Some(element) = cursor.next() {
            if element.unwrap() % 3 == 0 {
                cursor.remove().unwrap();
            }
        }
        assert_eq!(set.to_vec().unwrap(), vec![1, 2, 4, 5]);
        assert!(matches!(cursor.remove(), Err(ViewError::IllegalState(_))));
    }

    #[test]
    fn test_stale_cursor() {
        let set = SetView::from_elements(ElementOrdering::Linked, ["x", "y"]);
        let mut cursor = set.descending_set().unwrap().iter().unwrap();
        assert_eq!(cursor.next().unwrap().unwrap(), "y");
        set.insert("z").unwrap();
        assert!(cursor.has_next().unwrap_err().is_comodification());
        assert!(cursor.next().unwrap().unwrap_err().is_comodification());
        assert!(cursor.next().is_none());
    }
}
