//! Listener traits and listener aggregation.
//!
//! Listeners are shared as `Arc<dyn ...Listener>` and registered on view
//! nodes. A [`ListenerSet`] combines every listener registered on one node:
//!
//! - notification order is registration order
//! - registering the same `Arc` twice counts twice and notifies twice
//! - removal is by identity (`Arc` pointer), one registration at a time
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use viewtree_core::listener::{element_listener, ListenerSet};
//! use viewtree_core::{ElementListener, ModificationPhase};
//!
//! let listener = element_listener(|phase, event: &viewtree_core::ElementEvent<u32>| {
//!     if phase == ModificationPhase::Modified {
//!         println!("{:?}", event.change());
//!     }
//!     Ok(())
//! });
//!
//! let mut set: ListenerSet<dyn ElementListener<u32>> = ListenerSet::new();
//! set.add(Arc::clone(&listener));
//! assert_eq!(set.len(), 1);
//! assert!(set.remove(&listener));
//! assert!(set.is_empty());
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{ListenerError, ModificationPhase};
use crate::event::{ElementEvent, KeySetElementEvent, ListElementEvent, MapElementEvent};

/// Listener for element events of lists, sets, key sets and values views.
pub trait ElementListener<E>: Send + Sync {
    /// Called before the modification.
    fn modifying(&self, event: &ElementEvent<E>) -> Result<(), ListenerError> {
        let _ = event;
        Ok(())
    }

    /// Called after the modification.
    fn modified(&self, event: &ElementEvent<E>) -> Result<(), ListenerError> {
        let _ = event;
        Ok(())
    }
}

/// Listener for positional events of lists.
pub trait ListElementListener<E>: Send + Sync {
    /// Called before the modification.
    fn modifying(&self, event: &ListElementEvent<E>) -> Result<(), ListenerError> {
        let _ = event;
        Ok(())
    }

    /// Called after the modification.
    fn modified(&self, event: &ListElementEvent<E>) -> Result<(), ListenerError> {
        let _ = event;
        Ok(())
    }
}

/// Listener for entry events of maps.
pub trait MapElementListener<K, V>: Send + Sync {
    /// Called before the modification.
    fn modifying(&self, event: &MapElementEvent<K, V>) -> Result<(), ListenerError> {
        let _ = event;
        Ok(())
    }

    /// Called after the modification.
    fn modified(&self, event: &MapElementEvent<K, V>) -> Result<(), ListenerError> {
        let _ = event;
        Ok(())
    }
}

/// Listener for the key set of a map.
///
/// Unlike an [`ElementListener`] on the key set, it also sees the value of
/// each entry whose key is attached or detached.
pub trait KeySetElementListener<K, V>: Send + Sync {
    /// Called before the modification.
    fn modifying(&self, event: &KeySetElementEvent<K, V>) -> Result<(), ListenerError> {
        let _ = event;
        Ok(())
    }

    /// Called after the modification.
    fn modified(&self, event: &KeySetElementEvent<K, V>) -> Result<(), ListenerError> {
        let _ = event;
        Ok(())
    }
}

/// Adapter turning a closure into a listener.
///
/// The closure receives the phase together with the event. Use
/// [`element_listener`], [`list_element_listener`] or [`map_element_listener`]
/// to build one.
pub struct FnListener<F, Args> {
    callback: F,
    _args: PhantomData<fn(Args)>,
}

impl<F, Args> FnListener<F, Args> {
    fn new(callback: F) -> Self {
        Self {
            callback,
            _args: PhantomData,
        }
    }
}

impl<F, E> ElementListener<E> for FnListener<F, ElementEvent<E>>
where
    F: Fn(ModificationPhase, &ElementEvent<E>) -> Result<(), ListenerError> + Send + Sync,
{
    fn modifying(&self, event: &ElementEvent<E>) -> Result<(), ListenerError> {
        (self.callback)(ModificationPhase::Modifying, event)
    }

    fn modified(&self, event: &ElementEvent<E>) -> Result<(), ListenerError> {
        (self.callback)(ModificationPhase::Modified, event)
    }
}

impl<F, E> ListElementListener<E> for FnListener<F, ListElementEvent<E>>
where
    F: Fn(ModificationPhase, &ListElementEvent<E>) -> Result<(), ListenerError> + Send + Sync,
{
    fn modifying(&self, event: &ListElementEvent<E>) -> Result<(), ListenerError> {
        (self.callback)(ModificationPhase::Modifying, event)
    }

    fn modified(&self, event: &ListElementEvent<E>) -> Result<(), ListenerError> {
        (self.callback)(ModificationPhase::Modified, event)
    }
}

impl<F, K, V> MapElementListener<K, V> for FnListener<F, MapElementEvent<K, V>>
where
    F: Fn(ModificationPhase, &MapElementEvent<K, V>) -> Result<(), ListenerError> + Send + Sync,
{
    fn modifying(&self, event: &MapElementEvent<K, V>) -> Result<(), ListenerError> {
        (self.callback)(ModificationPhase::Modifying, event)
    }

    fn modified(&self, event: &MapElementEvent<K, V>) -> Result<(), ListenerError> {
        (self.callback)(ModificationPhase::Modified, event)
    }
}

impl<F, K, V> KeySetElementListener<K, V> for FnListener<F, KeySetElementEvent<K, V>>
where
    F: Fn(ModificationPhase, &KeySetElementEvent<K, V>) -> Result<(), ListenerError> + Send + Sync,
{
    fn modifying(&self, event: &KeySetElementEvent<K, V>) -> Result<(), ListenerError> {
        (self.callback)(ModificationPhase::Modifying, event)
    }

    fn modified(&self, event: &KeySetElementEvent<K, V>) -> Result<(), ListenerError> {
        (self.callback)(ModificationPhase::Modified, event)
    }
}

/// Build an element listener from a closure.
pub fn element_listener<E, F>(callback: F) -> Arc<dyn ElementListener<E>>
where
    E: 'static,
    F: Fn(ModificationPhase, &ElementEvent<E>) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    Arc::new(FnListener::<F, ElementEvent<E>>::new(callback))
}

/// Build a list element listener from a closure.
pub fn list_element_listener<E, F>(callback: F) -> Arc<dyn ListElementListener<E>>
where
    E: 'static,
    F: Fn(ModificationPhase, &ListElementEvent<E>) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    Arc::new(FnListener::<F, ListElementEvent<E>>::new(callback))
}

/// Build a map element listener from a closure.
pub fn map_element_listener<K, V, F>(callback: F) -> Arc<dyn MapElementListener<K, V>>
where
    K: 'static,
    V: 'static,
    F: Fn(ModificationPhase, &MapElementEvent<K, V>) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    Arc::new(FnListener::<F, MapElementEvent<K, V>>::new(callback))
}

/// Build a key set element listener from a closure.
pub fn key_set_element_listener<K, V, F>(callback: F) -> Arc<dyn KeySetElementListener<K, V>>
where
    K: 'static,
    V: 'static,
    F: Fn(ModificationPhase, &KeySetElementEvent<K, V>) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    Arc::new(FnListener::<F, KeySetElementEvent<K, V>>::new(callback))
}

struct Registration<L: ?Sized> {
    listener: Arc<L>,
    count: usize,
}

/// The combined listeners (or validators) registered on one node.
pub struct ListenerSet<L: ?Sized> {
    registrations: Vec<Registration<L>>,
}

impl<L: ?Sized> ListenerSet<L> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Register a listener.
    pub fn add(&mut self, listener: Arc<L>) {
        self.add_counted(listener, 1);
    }

    fn add_counted(&mut self, listener: Arc<L>, count: usize) {
        match self.position(&listener) {
            Some(index) => self.registrations[index].count += count,
            None => self.registrations.push(Registration { listener, count }),
        }
    }

    /// Remove one registration of a listener.
    ///
    /// Returns `false` if the listener was not registered.
    pub fn remove(&mut self, listener: &Arc<L>) -> bool {
        self.remove_counted(listener, 1)
    }

    fn remove_counted(&mut self, listener: &Arc<L>, count: usize) -> bool {
        let Some(index) = self.position(listener) else {
            return false;
        };
        let registration = &mut self.registrations[index];
        if registration.count > count {
            registration.count -= count;
        } else {
            self.registrations.remove(index);
        }
        true
    }

    /// Whether the listener is registered.
    pub fn contains(&self, listener: &Arc<L>) -> bool {
        self.position(listener).is_some()
    }

    /// Add every registration of `other` to this set.
    pub fn absorb(&mut self, other: &Self) {
        for registration in &other.registrations {
            self.add_counted(Arc::clone(&registration.listener), registration.count);
        }
    }

    /// Remove every registration of `other` from this set.
    pub fn remove_all(&mut self, other: &Self) {
        for registration in &other.registrations {
            self.remove_counted(&registration.listener, registration.count);
        }
    }

    /// Number of registrations, counting repeated ones.
    pub fn len(&self) -> usize {
        self.registrations.iter().map(|r| r.count).sum()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Snapshot of the listeners in notification order.
    ///
    /// A listener registered twice appears twice.
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.registrations
            .iter()
            .flat_map(|r| std::iter::repeat_n(&r.listener, r.count))
            .cloned()
            .collect()
    }

    fn position(&self, listener: &Arc<L>) -> Option<usize> {
        self.registrations
            .iter()
            .position(|r| std::ptr::addr_eq(Arc::as_ptr(&r.listener), Arc::as_ptr(listener)))
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Clone for ListenerSet<L> {
    fn clone(&self) -> Self {
        Self {
            registrations: self
                .registrations
                .iter()
                .map(|r| Registration {
                    listener: Arc::clone(&r.listener),
                    count: r.count,
                })
                .collect(),
        }
    }
}

impl<L: ?Sized> fmt::Debug for ListenerSet<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.registrations.len())
            .field("registrations", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ElementChange, ModificationEvent};
    use crate::node::NodeId;
    use parking_lot::Mutex;
    use slotmap::SlotMap;

    fn event(value: i32) -> ElementEvent<i32> {
        let mut ids: SlotMap<NodeId, ()> = SlotMap::with_key();
        ModificationEvent::new(ids.insert(()), ElementChange::attach(value))
    }

    #[test]
    fn test_notification_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set: ListenerSet<dyn ElementListener<i32>> = ListenerSet::new();
        for name in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            set.add(element_listener(move |_, _: &ElementEvent<i32>| {
                log.lock().push(name);
                Ok(())
            }));
        }

        let event = event(1);
        for listener in set.snapshot() {
            listener.modifying(&event).unwrap();
        }
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_duplicate_registration_counts() {
        let calls = Arc::new(Mutex::new(0));
        let listener = {
            let calls = Arc::clone(&calls);
            element_listener(move |_, _: &ElementEvent<i32>| {
                *calls.lock() += 1;
                Ok(())
            })
        };

        let mut set: ListenerSet<dyn ElementListener<i32>> = ListenerSet::new();
        set.add(Arc::clone(&listener));
        set.add(Arc::clone(&listener));
        assert_eq!(set.len(), 2);

        let event = event(1);
        for l in set.snapshot() {
            l.modified(&event).unwrap();
        }
        assert_eq!(*calls.lock(), 2);

        assert!(set.remove(&listener));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&listener));
        assert!(set.remove(&listener));
        assert!(!set.remove(&listener));
        assert!(set.is_empty());
    }

    #[test]
    fn test_removal_is_by_identity() {
        let make = || element_listener(|_, _: &ElementEvent<i32>| Ok(()));
        let a = make();
        let b = make();

        let mut set: ListenerSet<dyn ElementListener<i32>> = ListenerSet::new();
        set.add(Arc::clone(&a));
        assert!(!set.remove(&b));
        assert!(set.remove(&a));
    }

    #[test]
    fn test_absorb_and_remove_all() {
        let a = element_listener(|_, _: &ElementEvent<i32>| Ok(()));
        let b = element_listener(|_, _: &ElementEvent<i32>| Ok(()));

        let mut local: ListenerSet<dyn ElementListener<i32>> = ListenerSet::new();
        local.add(Arc::clone(&a));
        local.add(Arc::clone(&a));

        let mut forwarded: ListenerSet<dyn ElementListener<i32>> = ListenerSet::new();
        forwarded.add(Arc::clone(&b));
        forwarded.absorb(&local);
        assert_eq!(forwarded.len(), 3);

        forwarded.remove_all(&local);
        assert_eq!(forwarded.len(), 1);
        assert!(forwarded.contains(&b));
        assert!(!forwarded.contains(&a));
    }

    #[test]
    fn test_listener_error_propagates() {
        let listener = element_listener(|phase, _: &ElementEvent<i32>| {
            if phase == ModificationPhase::Modifying {
                Err(ListenerError::new("refused"))
            } else {
                Ok(())
            }
        });

        let event = event(3);
        assert_eq!(listener.modifying(&event).unwrap_err().message(), "refused");
        assert!(listener.modified(&event).is_ok());
    }
}
