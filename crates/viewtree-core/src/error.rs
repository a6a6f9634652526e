//! Error types for view trees.
//!
//! Every fallible operation in this crate returns [`ViewResult`]. The variants
//! of [`ViewError`] fall into four groups:
//!
//! - **Programmer errors**: an illegal [`ViewInfo`](crate::info) for the parent
//!   it is applied to, replacing the base through a derived view, using a
//!   released node handle.
//! - **State errors**: a disabled collection, a base swap during
//!   deserialization, a second base on a set-once root, a missing base on a
//!   construct-only root.
//! - **Consistency errors**: stale iterators and stale positional views.
//! - **Modification errors**: the first failure of a dispatch phase, wrapped
//!   together with the phase and stage it came from.

use std::fmt;

/// Result type alias for view tree operations.
pub type ViewResult<T> = std::result::Result<T, ViewError>;

/// The two phases of the modification protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModificationPhase {
    /// Before the structural change is applied.
    Modifying,
    /// After the structural change has been applied.
    Modified,
}

impl fmt::Display for ModificationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modifying => write!(f, "pre-modification"),
            Self::Modified => write!(f, "post-modification"),
        }
    }
}

/// The step of a dispatch phase that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchStage {
    /// The node's own `on_modifying` / `on_modified` hook.
    Hook,
    /// The listeners registered on the node.
    Listeners,
    /// Re-raising the event on the parent node.
    Bubble,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hook => write!(f, "hook"),
            Self::Listeners => write!(f, "listener"),
            Self::Bubble => write!(f, "bubble"),
        }
    }
}

/// Error returned by a listener that refuses or fails to handle an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    /// Create a listener error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message given by the listener.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error returned by a validator that refuses a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("value rejected by validator: {message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Create a validation error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message given by the validator.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur while working with a view tree.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// A view descriptor does not apply to the parent it was attached to.
    #[error("Illegal view info {info}: {reason}")]
    IllegalViewInfo { info: String, reason: String },

    /// The operation is only legal on the root of a view tree.
    #[error("Operation is only supported by the root view, not by a derived view")]
    NotRoot,

    /// The node handle does not refer to a live node.
    #[error("Invalid or released view node")]
    UnknownNode,

    /// The view cannot perform this kind of write.
    #[error("This view does not support {operation}")]
    ReadOnlyView { operation: &'static str },

    /// The collection has been disabled.
    #[error("The collection is disabled")]
    Disabled,

    /// The base cannot be changed while root data is being deserialized.
    #[error("Cannot set the base while the root data is being deserialized")]
    Deserializing,

    /// A set-once root already has a base.
    #[error("The base of a set-once root has already been set")]
    BaseAlreadySet,

    /// A construct-only root can never be without a base.
    #[error("The base of a construct-only root cannot be null")]
    NullBase,

    /// The root owner was requested before it was attached.
    #[error("The root owner has not been attached yet")]
    NoRootOwner,

    /// The collection was modified outside of this view or iterator.
    #[error("Concurrent modification: {0}")]
    Comodification(&'static str),

    /// An index is outside the bounds of the view.
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A value lies outside the bounds of a range view.
    #[error("The value is outside the range of this view")]
    OutOfRange,

    /// There is no element to return.
    #[error("No such element")]
    NoSuchElement,

    /// A cursor or view is not in a state that allows the operation.
    #[error("Illegal state: {0}")]
    IllegalState(&'static str),

    /// A validator refused a value.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A listener failed while handling an event.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// The first failure of a modification phase.
    #[error("{phase} failure in {stage} stage: {source}")]
    Modification {
        phase: ModificationPhase,
        stage: DispatchStage,
        #[source]
        source: Box<ViewError>,
    },
}

impl ViewError {
    /// Create an illegal view info error.
    pub fn illegal_view_info(info: &impl fmt::Debug, reason: impl Into<String>) -> Self {
        Self::IllegalViewInfo {
            info: format!("{info:?}"),
            reason: reason.into(),
        }
    }

    /// Wrap an error as the failure of a modification phase.
    ///
    /// An error that already carries the same phase is returned unchanged, so
    /// failures bubbling up through several nodes keep their innermost stage.
    pub fn modification(phase: ModificationPhase, stage: DispatchStage, source: ViewError) -> Self {
        match source {
            Self::Modification { phase: inner, .. } if inner == phase => source,
            source => Self::Modification {
                phase,
                stage,
                source: Box::new(source),
            },
        }
    }

    /// The phase this error was raised in, if it is a modification error.
    pub fn phase(&self) -> Option<ModificationPhase> {
        match self {
            Self::Modification { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// The error underneath any modification wrappers.
    pub fn root_cause(&self) -> &ViewError {
        let mut current = self;
        while let Self::Modification { source, .. } = current {
            current = source;
        }
        current
    }

    /// Whether this error reports a stale iterator or view.
    pub fn is_comodification(&self) -> bool {
        matches!(self.root_cause(), Self::Comodification(_))
    }
}
