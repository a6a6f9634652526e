//! Observable collections with always-consistent derived views.
//!
//! Every collection is a tree of views over one canonical store. The root
//! view owns the store; derived views (sublists, range views, key sets,
//! iterators, single entries) delegate all reads and writes to it and are
//! re-derived lazily after each structural change.
//!
//! Every modification raises a two-phase event: listeners see it before the
//! store changes and again afterwards. Events raised on a derived view bubble
//! up to the root, remapped into each ancestor's coordinates.
//!
//! - [`ListView`]: lists with sublists and list iterators
//! - [`SetView`]: hashed, linked and sorted sets with range views
//! - [`MapView`]: maps with key set, values, entry set, entry and range views
//!
//! The engine behind the containers lives in `viewtree-core` and is
//! re-exported here.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use viewtree::{list_element_listener, ListElementEvent, ListView, ModificationPhase, PropertyVersion};
//!
//! let list = ListView::from_vec(vec![1, 2, 3, 4]);
//! let tail = list.sub_list(2, 4).unwrap();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let recorder = Arc::clone(&seen);
//! list.add_list_element_listener(list_element_listener(move |phase, event: &ListElementEvent<i32>| {
//!     if phase == ModificationPhase::Modified {
//!         recorder.lock().push(event.change().index(PropertyVersion::Attach));
//!     }
//!     Ok(())
//! }))
//! .unwrap();
//!
//! tail.push(5).unwrap();
//! assert_eq!(*seen.lock(), vec![Some(4)]);
//! ```

mod handle;
pub mod list;
pub mod map;
pub mod prelude;
pub mod range;
pub mod set;
pub mod store;

pub use list::{ListIterator, ListView};
pub use map::{EntryIter, EntrySetView, EntryView, KeyIter, KeySetView, MapView, ValueIter, ValuesView};
pub use range::KeyRange;
pub use set::{SetIter, SetView};
pub use store::{ListElement, ListStore, MapStore, MapValue, SetElement, SetStore};

pub use viewtree_core::{
    element_listener, key_set_element_listener, list_element_listener, map_element_listener,
    validator_fn, DispatchStage, ElementChange, ElementEvent, ElementListener, ElementOrdering,
    EntryChange, EventOrigin, KeySetChange, KeySetElementEvent, KeySetElementListener,
    ListChange, ListElementEvent, ListElementListener, ListViewInfo, ListenerError,
    MapElementEvent, MapElementListener, MapViewInfo, ModificationEvent, ModificationPhase,
    ModificationType, NodeHooks, PropertyVersion, RootOptions, RootPolicy, RootSnapshot,
    SetViewInfo, ValidationError, Validator, ViewError, ViewResult,
};
