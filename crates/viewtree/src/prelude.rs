//! Commonly used types, for glob import:
//!
//! ```
//! use viewtree::prelude::*;
//!
//! let set = SetView::from_elements(ElementOrdering::Sorted, [3, 1, 2]);
//! assert_eq!(set.first().unwrap(), Some(1));
//! ```

// ============================================================================
// Containers
// ============================================================================

pub use crate::{ListView, MapView, SetView};
pub use crate::{EntrySetView, EntryView, KeySetView, ValuesView};

// ============================================================================
// Options and errors
// ============================================================================

pub use crate::{ElementOrdering, RootOptions, RootPolicy, ViewError, ViewResult};

// ============================================================================
// Events and listeners
// ============================================================================

pub use crate::{element_listener, list_element_listener, map_element_listener, validator_fn};
pub use crate::key_set_element_listener;
pub use crate::{ElementListener, KeySetElementListener, ListElementListener, MapElementListener, Validator};
pub use crate::{ElementEvent, KeySetElementEvent, ListElementEvent, MapElementEvent};
pub use crate::{ModificationPhase, ModificationType, PropertyVersion};
