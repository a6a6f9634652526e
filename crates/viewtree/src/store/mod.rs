//! Canonical base stores.
//!
//! A store is the single collection all views of one tree delegate to. It
//! owns the data and the validators; it knows nothing about views or events.

use std::fmt::Debug;
use std::hash::Hash;

mod list;
mod map;
mod set;

pub use list::ListStore;
pub use map::MapStore;
pub use set::SetStore;

/// Elements of lists.
pub trait ListElement: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> ListElement for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

/// Elements of sets and keys of maps.
///
/// Sets need both hashing (hashed and linked orderings) and a total order
/// (sorted ordering and range views).
pub trait SetElement: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

impl<T> SetElement for T where T: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

/// Values of maps.
pub trait MapValue: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> MapValue for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}
