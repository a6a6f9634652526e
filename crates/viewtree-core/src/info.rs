//! View descriptors.
//!
//! A descriptor says what a derived view is and with which parameters. It is
//! used to derive the view's local base from its parent's and answers
//! `view_info()` introspection. Descriptors are immutable; a positional view
//! whose bounds move gets a new descriptor.

/// Descriptor of a derived list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListViewInfo {
    /// A forward iterator over the whole parent.
    Iterator,
    /// A bidirectional iterator starting at `index`.
    ListIterator {
        /// Initial cursor position.
        index: usize,
    },
    /// The elements of the parent in `[from, to)`.
    SubList {
        /// First index, inclusive.
        from: usize,
        /// Last index, exclusive.
        to: usize,
    },
}

impl ListViewInfo {
    /// Whether the descriptor carries positions that shift on modification.
    pub fn is_positional(&self) -> bool {
        matches!(self, Self::SubList { .. })
    }
}

/// Descriptor of a derived set view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SetViewInfo<E> {
    /// An iterator over the parent.
    Iterator,
    /// The elements below `to`.
    HeadSet { to: E, inclusive: bool },
    /// The elements above `from`.
    TailSet { from: E, inclusive: bool },
    /// The elements between `from` and `to`.
    SubSet {
        from: E,
        from_inclusive: bool,
        to: E,
        to_inclusive: bool,
    },
    /// The parent in reverse order.
    DescendingSet,
}

/// Descriptor of a derived map view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapViewInfo<K, V> {
    /// The keys of the parent map.
    KeySet,
    /// The values of the parent map.
    Values,
    /// The entries of the parent map.
    EntrySet,
    /// The entry of the parent map with this key.
    EntryOfKey(K),
    /// The first entry of the parent map holding this value.
    EntryOfValue(V),
    /// An entry yielded by an entry-set iterator.
    Entry(K),
    /// An iterator over a key set, values view or entry set.
    Iterator,
    /// The entries below `to`.
    HeadMap { to: K, inclusive: bool },
    /// The entries above `from`.
    TailMap { from: K, inclusive: bool },
    /// The entries between `from` and `to`.
    SubMap {
        from: K,
        from_inclusive: bool,
        to: K,
        to_inclusive: bool,
    },
    /// The parent map in reverse key order.
    DescendingMap,
}

impl<K, V> MapViewInfo<K, V> {
    /// Whether the view is retained by its parent once created.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::KeySet | Self::Values | Self::EntrySet)
    }

    /// Whether the view presents a single entry.
    pub fn is_entry(&self) -> bool {
        matches!(self, Self::EntryOfKey(_) | Self::EntryOfValue(_) | Self::Entry(_))
    }
}
