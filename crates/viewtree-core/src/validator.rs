//! Validators.
//!
//! A validator is consulted before a value is accepted into a collection and
//! may refuse it. Validators compose the same way listeners do, see
//! [`ListenerSet`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ValidationError;
use crate::listener::ListenerSet;

/// Checks values before they enter a collection.
pub trait Validator<T: ?Sized>: Send + Sync {
    /// Accept or refuse a value.
    fn validate(&self, value: &T) -> Result<(), ValidationError>;
}

struct FnValidator<F, T: ?Sized> {
    check: F,
    _value: PhantomData<fn(&T)>,
}

impl<F, T> Validator<T> for FnValidator<F, T>
where
    T: ?Sized,
    F: Fn(&T) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, value: &T) -> Result<(), ValidationError> {
        (self.check)(value)
    }
}

/// Build a validator from a closure.
pub fn validator_fn<T, F>(check: F) -> Arc<dyn Validator<T>>
where
    T: ?Sized + 'static,
    F: Fn(&T) -> Result<(), ValidationError> + Send + Sync + 'static,
{
    Arc::new(FnValidator {
        check,
        _value: PhantomData,
    })
}

/// Validator collections that root data can forward to its base.
///
/// Root data keeps its own copy of every registered validator so that
/// validators survive while no base exists. When a base is installed the
/// local set is absorbed into the base's set; when the base is swapped out the
/// local set is removed from it again.
pub trait ValidatorSet: Default + Send + Sync + 'static {
    /// Add every validator of `other`.
    fn absorb(&mut self, other: &Self);
    /// Remove every validator of `other`.
    fn remove_all(&mut self, other: &Self);
    /// Whether no validator is registered.
    fn is_empty(&self) -> bool;
}

/// An ordered chain of validators for one value type.
pub struct ValidatorChain<T: ?Sized> {
    validators: ListenerSet<dyn Validator<T>>,
}

impl<T: ?Sized> ValidatorChain<T> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            validators: ListenerSet::new(),
        }
    }

    /// Register a validator.
    pub fn add(&mut self, validator: Arc<dyn Validator<T>>) {
        self.validators.add(validator);
    }

    /// Remove one registration of a validator.
    pub fn remove(&mut self, validator: &Arc<dyn Validator<T>>) -> bool {
        self.validators.remove(validator)
    }

    /// Whether the validator is registered.
    pub fn contains(&self, validator: &Arc<dyn Validator<T>>) -> bool {
        self.validators.contains(validator)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Run every validator in registration order, stopping at the first refusal.
    pub fn validate(&self, value: &T) -> Result<(), ValidationError> {
        for validator in self.validators.snapshot() {
            validator.validate(value)?;
        }
        Ok(())
    }
}

impl<T: ?Sized> Default for ValidatorChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for ValidatorChain<T> {
    fn clone(&self) -> Self {
        Self {
            validators: self.validators.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for ValidatorChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorChain")
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl<T: ?Sized + 'static> ValidatorSet for ValidatorChain<T> {
    fn absorb(&mut self, other: &Self) {
        self.validators.absorb(&other.validators);
    }

    fn remove_all(&mut self, other: &Self) {
        self.validators.remove_all(&other.validators);
    }

    fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

/// Separate validator chains for the keys and values of a map.
pub struct MapValidators<K, V> {
    /// Validators consulted for keys.
    pub keys: ValidatorChain<K>,
    /// Validators consulted for values.
    pub values: ValidatorChain<V>,
}

impl<K, V> MapValidators<K, V> {
    /// Validate a key and a value.
    pub fn validate(&self, key: &K, value: &V) -> Result<(), ValidationError> {
        self.keys.validate(key)?;
        self.values.validate(value)
    }
}

impl<K, V> Default for MapValidators<K, V> {
    fn default() -> Self {
        Self {
            keys: ValidatorChain::new(),
            values: ValidatorChain::new(),
        }
    }
}

impl<K, V> Clone for MapValidators<K, V> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            values: self.values.clone(),
        }
    }
}

impl<K, V> fmt::Debug for MapValidators<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapValidators")
            .field("keys", &self.keys.len())
            .field("values", &self.values.len())
            .finish()
    }
}

impl<K: 'static, V: 'static> ValidatorSet for MapValidators<K, V> {
    fn absorb(&mut self, other: &Self) {
        self.keys.absorb(&other.keys);
        self.values.absorb(&other.values);
    }

    fn remove_all(&mut self, other: &Self) {
        self.keys.remove_all(&other.keys);
        self.values.remove_all(&other.values);
    }

    fn is_empty(&self) -> bool {
        ValidatorSet::is_empty(&self.keys) && ValidatorSet::is_empty(&self.values)
    }
}
