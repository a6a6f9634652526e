//! Core engine for viewtree.
//!
//! This crate provides the machinery shared by every container family:
//!
//! - **Root data**: the single owner of a collection's canonical base, its
//!   validators, the disabled flag and the modification counter
//! - **View nodes**: an arena of derived views per collection, each lazily
//!   re-deriving its local base when the modification counter moves
//! - **View kinds**: the seam through which a container family describes its
//!   descriptors, derivation, event remapping and listeners
//! - **Two-phase dispatch**: pre- and post-modification events that bubble
//!   from the view a mutation happens on up to the root
//! - **Listeners and validators**: identity-keyed registration sets
//! - **Logging**: tracing targets and a view tree formatter
//!
//! Concrete lists, sets and maps live in the `viewtree` crate.
//!
//! # Events
//!
//! ```
//! use viewtree_core::{Change, ListChange, ModificationType, PropertyVersion};
//!
//! // An insertion at index 1 of a sublist starting at index 1 of its parent.
//! let change = ListChange::attach(1, 'X');
//! let bubbled = change.shifted(1, 1);
//!
//! assert_eq!(bubbled.modification_type(), ModificationType::Attach);
//! assert_eq!(bubbled.index(PropertyVersion::Attach), Some(2));
//! ```
//!
//! # Error aggregation
//!
//! ```
//! use viewtree_core::{DispatchStage, ModificationPhase, PhaseRunner, ViewError};
//!
//! let mut runner = PhaseRunner::new(ModificationPhase::Modified);
//! runner.run(DispatchStage::Bubble, || Ok(()));
//! runner.run(DispatchStage::Listeners, || Err(ViewError::NoSuchElement));
//! runner.run(DispatchStage::Hook, || Err(ViewError::Disabled));
//!
//! let err = runner.finish().unwrap_err();
//! assert!(matches!(err.root_cause(), ViewError::NoSuchElement));
//! ```

pub mod dispatch;
mod error;
pub mod event;
pub mod info;
pub mod listener;
pub mod logging;
pub mod node;
mod options;
pub mod root;
pub mod validator;

pub use dispatch::{execute_modification, ModificationPlan, NodeHooks, PhaseRunner};
pub use error::{
    DispatchStage, ListenerError, ModificationPhase, ValidationError, ViewError, ViewResult,
};
pub use event::{
    Change, ElementChange, ElementEvent, EntryChange, EventOrigin, KeySetChange, KeySetElementEvent,
    ListChange, ListElementEvent, MapElementEvent, ModificationEvent, ModificationType,
    PropertyVersion,
};
pub use info::{ListViewInfo, MapViewInfo, SetViewInfo};
pub use listener::{
    element_listener, key_set_element_listener, list_element_listener, map_element_listener,
    ElementListener, KeySetElementListener, ListElementListener, ListenerSet, MapElementListener,
};
pub use logging::{PerfSpan, TreeFormatOptions, TreeStyle, ViewTreeDebug};
pub use node::{NodeId, Released, SharedViewTree, ViewKind, ViewTree};
pub use options::{ElementOrdering, RootOptions, RootPolicy};
pub use root::{BaseCollection, DefaultBase, RootData, RootHooks, RootSnapshot};
pub use validator::{validator_fn, MapValidators, Validator, ValidatorChain, ValidatorSet};
