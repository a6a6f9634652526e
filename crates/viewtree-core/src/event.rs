//! Modification events.
//!
//! A [`ModificationEvent`] is created at the node where a mutation physically
//! happens. Every time the event bubbles, a new event is created for the
//! parent node with its change remapped into the parent's coordinates, and the
//! child event becomes its [`cause`](ModificationEvent::cause).
//!
//! The payload of an event is a [`Change`]. Three kinds are provided:
//!
//! - [`ElementChange`] for plain collections (sets, key sets, values)
//! - [`ListChange`] for positional collections, carrying indexes
//! - [`EntryChange`] for maps, carrying keys and values
//!
//! Values that differ between the two phases are read through a
//! [`PropertyVersion`]: a detached element and its index describe the state
//! before the modification, an attached element and its index the state after.

use std::fmt;
use std::sync::Arc;

use crate::node::NodeId;

/// The kind of structural change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModificationType {
    /// An element is removed.
    Detach,
    /// An element is added.
    Attach,
    /// An element is replaced by another.
    Replace,
}

impl ModificationType {
    /// Whether the change removes (or replaces) something.
    pub fn contains_detach(self) -> bool {
        matches!(self, Self::Detach | Self::Replace)
    }

    /// Whether the change adds (or replaces) something.
    pub fn contains_attach(self) -> bool {
        matches!(self, Self::Attach | Self::Replace)
    }
}

/// Which side of a change a value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyVersion {
    /// The state before the modification.
    Detach,
    /// The state after the modification.
    Attach,
}

/// Whether an event was raised where the mutation happened or by bubbling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOrigin {
    /// Raised by the node the mutation was invoked on.
    Direct,
    /// Re-raised on a parent node.
    Bubbled,
}

/// Payload of a modification event.
pub trait Change: Clone + fmt::Debug + Send + Sync + 'static {
    /// The kind of change.
    fn modification_type(&self) -> ModificationType;
}

/// A modification event raised on a view node.
#[derive(Debug, Clone)]
pub struct ModificationEvent<C> {
    source: NodeId,
    origin: EventOrigin,
    cause: Option<Arc<ModificationEvent<C>>>,
    change: C,
}

impl<C: Change> ModificationEvent<C> {
    /// Create an event at the node where the mutation happens.
    pub fn new(source: NodeId, change: C) -> Self {
        Self {
            source,
            origin: EventOrigin::Direct,
            cause: None,
            change,
        }
    }

    /// Create the event re-raised on a parent node.
    pub fn bubbled(source: NodeId, change: C, cause: Arc<ModificationEvent<C>>) -> Self {
        Self {
            source,
            origin: EventOrigin::Bubbled,
            cause: Some(cause),
            change,
        }
    }

    /// The node this event is raised on.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Whether the event was raised directly or by bubbling.
    pub fn origin(&self) -> EventOrigin {
        self.origin
    }

    /// The child event this one was bubbled from.
    pub fn cause(&self) -> Option<&Arc<ModificationEvent<C>>> {
        self.cause.as_ref()
    }

    /// The first event of the bubbling chain.
    pub fn original(&self) -> &ModificationEvent<C> {
        let mut current = self;
        while let Some(cause) = &current.cause {
            current = cause;
        }
        current
    }

    /// The change carried by this event.
    pub fn change(&self) -> &C {
        &self.change
    }

    /// The kind of change.
    pub fn modification_type(&self) -> ModificationType {
        self.change.modification_type()
    }

    /// Build a projected event with a different payload.
    ///
    /// The projection keeps the source and origin but drops the cause chain,
    /// whose payload type differs.
    pub fn project<D: Change>(&self, change: D) -> ModificationEvent<D> {
        ModificationEvent {
            source: self.source,
            origin: self.origin,
            cause: None,
            change,
        }
    }
}

fn modification_type_of<T, U>(detached: &Option<T>, attached: &Option<U>) -> ModificationType {
    match (detached.is_some(), attached.is_some()) {
        (true, true) => ModificationType::Replace,
        (true, false) => ModificationType::Detach,
        _ => ModificationType::Attach,
    }
}

// =========================================================================
// Element changes
// =========================================================================

/// A change to an unpositioned collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementChange<E> {
    detached: Option<E>,
    attached: Option<E>,
}

impl<E> ElementChange<E> {
    /// An element is removed.
    pub fn detach(element: E) -> Self {
        Self {
            detached: Some(element),
            attached: None,
        }
    }

    /// An element is added.
    pub fn attach(element: E) -> Self {
        Self {
            detached: None,
            attached: Some(element),
        }
    }

    /// An element is replaced.
    pub fn replace(old: E, new: E) -> Self {
        Self {
            detached: Some(old),
            attached: Some(new),
        }
    }

    /// The element on the given side of the change.
    pub fn element(&self, version: PropertyVersion) -> Option<&E> {
        match version {
            PropertyVersion::Detach => self.detached.as_ref(),
            PropertyVersion::Attach => self.attached.as_ref(),
        }
    }
}

impl<E: Clone + fmt::Debug + Send + Sync + 'static> Change for ElementChange<E> {
    fn modification_type(&self) -> ModificationType {
        modification_type_of(&self.detached, &self.attached)
    }
}

// =========================================================================
// List changes
// =========================================================================

/// A change to a positional collection.
///
/// The detached index is expressed in the coordinates before the modification,
/// the attached index in the coordinates after it. `conflicts` lists the
/// absolute positions (in the root list, before the modification) that are
/// removed as a side effect of the same call, e.g. duplicates evicted from a
/// unique list. Bubbling uses them to correct attach indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChange<E> {
    detached: Option<(usize, E)>,
    attached: Option<(usize, E)>,
    conflicts: Arc<[usize]>,
}

impl<E> ListChange<E> {
    /// An element is removed from `index`.
    pub fn detach(index: usize, element: E) -> Self {
        Self {
            detached: Some((index, element)),
            attached: None,
            conflicts: Arc::from([]),
        }
    }

    /// An element is inserted at `index`.
    pub fn attach(index: usize, element: E) -> Self {
        Self {
            detached: None,
            attached: Some((index, element)),
            conflicts: Arc::from([]),
        }
    }

    /// The element at `old_index` is replaced; the new element lands at `new_index`.
    pub fn replace(old_index: usize, old: E, new_index: usize, new: E) -> Self {
        Self {
            detached: Some((old_index, old)),
            attached: Some((new_index, new)),
            conflicts: Arc::from([]),
        }
    }

    /// Attach the absolute conflict positions of the whole call.
    pub fn with_conflicts(mut self, conflicts: Arc<[usize]>) -> Self {
        self.conflicts = conflicts;
        self
    }

    /// The index on the given side of the change.
    pub fn index(&self, version: PropertyVersion) -> Option<usize> {
        match version {
            PropertyVersion::Detach => self.detached.as_ref().map(|(index, _)| *index),
            PropertyVersion::Attach => self.attached.as_ref().map(|(index, _)| *index),
        }
    }

    /// The element on the given side of the change.
    pub fn element(&self, version: PropertyVersion) -> Option<&E> {
        match version {
            PropertyVersion::Detach => self.detached.as_ref().map(|(_, element)| element),
            PropertyVersion::Attach => self.attached.as_ref().map(|(_, element)| element),
        }
    }

    /// Absolute positions removed as a side effect of the same call.
    pub fn conflicts(&self) -> &[usize] {
        &self.conflicts
    }
}

impl<E: Clone> ListChange<E> {
    /// Shift the indexes into a parent's coordinates.
    pub fn shifted(&self, detach_offset: usize, attach_offset: usize) -> Self {
        Self {
            detached: self
                .detached
                .as_ref()
                .map(|(index, element)| (index + detach_offset, element.clone())),
            attached: self
                .attached
                .as_ref()
                .map(|(index, element)| (index + attach_offset, element.clone())),
            conflicts: Arc::clone(&self.conflicts),
        }
    }

    /// Drop the indexes, keeping the elements.
    pub fn to_element_change(&self) -> ElementChange<E> {
        ElementChange {
            detached: self.detached.as_ref().map(|(_, element)| element.clone()),
            attached: self.attached.as_ref().map(|(_, element)| element.clone()),
        }
    }
}

impl<E: Clone + fmt::Debug + Send + Sync + 'static> Change for ListChange<E> {
    fn modification_type(&self) -> ModificationType {
        modification_type_of(&self.detached, &self.attached)
    }
}

// =========================================================================
// Entry changes
// =========================================================================

/// A change to a map entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChange<K, V> {
    detached: Option<(K, V)>,
    attached: Option<(K, V)>,
}

impl<K, V> EntryChange<K, V> {
    /// An entry is removed.
    pub fn detach(key: K, value: V) -> Self {
        Self {
            detached: Some((key, value)),
            attached: None,
        }
    }

    /// An entry is added.
    pub fn attach(key: K, value: V) -> Self {
        Self {
            detached: None,
            attached: Some((key, value)),
        }
    }

    /// The value of an existing entry is replaced.
    pub fn replace(key: K, old: V, new: V) -> Self
    where
        K: Clone,
    {
        Self {
            detached: Some((key.clone(), old)),
            attached: Some((key, new)),
        }
    }

    /// The key on the given side of the change.
    pub fn key(&self, version: PropertyVersion) -> Option<&K> {
        self.side(version).map(|(key, _)| key)
    }

    /// The value on the given side of the change.
    pub fn value(&self, version: PropertyVersion) -> Option<&V> {
        self.side(version).map(|(_, value)| value)
    }

    fn side(&self, version: PropertyVersion) -> Option<&(K, V)> {
        match version {
            PropertyVersion::Detach => self.detached.as_ref(),
            PropertyVersion::Attach => self.attached.as_ref(),
        }
    }
}

impl<K: Clone + PartialEq, V: Clone> EntryChange<K, V> {
    /// The change as seen by a key set.
    ///
    /// Returns `None` when only the value of an entry changes.
    pub fn key_change(&self) -> Option<KeySetChange<K, V>> {
        match (&self.detached, &self.attached) {
            (Some((old, _)), Some((new, _))) if old == new => None,
            (detached, attached) => Some(KeySetChange {
                detached: detached.clone(),
                attached: attached.clone(),
            }),
        }
    }

    /// The change as seen by a values view.
    pub fn value_change(&self) -> ElementChange<V> {
        ElementChange {
            detached: self.detached.as_ref().map(|(_, value)| value.clone()),
            attached: self.attached.as_ref().map(|(_, value)| value.clone()),
        }
    }
}

impl<K, V> Change for EntryChange<K, V>
where
    K: Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn modification_type(&self) -> ModificationType {
        modification_type_of(&self.detached, &self.attached)
    }
}

// =========================================================================
// Key set changes
// =========================================================================

/// A change to the keys of a map, together with the values of the entries
/// those keys belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySetChange<K, V> {
    detached: Option<(K, V)>,
    attached: Option<(K, V)>,
}

impl<K, V> KeySetChange<K, V> {
    /// The key on the given side of the change.
    pub fn element(&self, version: PropertyVersion) -> Option<&K> {
        self.side(version).map(|(key, _)| key)
    }

    /// The value of the entry on the given side of the change.
    pub fn value(&self, version: PropertyVersion) -> Option<&V> {
        self.side(version).map(|(_, value)| value)
    }

    fn side(&self, version: PropertyVersion) -> Option<&(K, V)> {
        match version {
            PropertyVersion::Detach => self.detached.as_ref(),
            PropertyVersion::Attach => self.attached.as_ref(),
        }
    }
}

impl<K: Clone, V> KeySetChange<K, V> {
    /// The keys alone, for element listeners.
    pub fn to_element_change(&self) -> ElementChange<K> {
        ElementChange {
            detached: self.detached.as_ref().map(|(key, _)| key.clone()),
            attached: self.attached.as_ref().map(|(key, _)| key.clone()),
        }
    }
}

impl<K, V> Change for KeySetChange<K, V>
where
    K: Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn modification_type(&self) -> ModificationType {
        modification_type_of(&self.detached, &self.attached)
    }
}

/// Event raised by unpositioned collections.
pub type ElementEvent<E> = ModificationEvent<ElementChange<E>>;
/// Event raised by lists.
pub type ListElementEvent<E> = ModificationEvent<ListChange<E>>;
/// Event raised by maps.
pub type MapElementEvent<K, V> = ModificationEvent<EntryChange<K, V>>;
/// Event seen by the key set of a map.
pub type KeySetElementEvent<K, V> = ModificationEvent<KeySetChange<K, V>>;
