//! Root data: the single owner of a collection's canonical base.
//!
//! Every view tree has exactly one [`RootData`]. It holds:
//!
//! - the base collection, created on demand from [`DefaultBase`] for lazy roots
//! - the locally registered validators, forwarded to the base when present
//! - the disabled flag
//! - the modification counter that drives lazy rebasing of derived views
//!
//! The modification counter increases on every base replacement and on every
//! structural modification. A second counter tracks structural modifications
//! only; positional views (sublists) use it to detect that another view has
//! shifted their bounds.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ViewError, ViewResult};
use crate::logging::targets;
use crate::node::NodeId;
use crate::options::{ElementOrdering, RootOptions, RootPolicy};
use crate::validator::ValidatorSet;

/// A canonical collection that can sit at the root of a view tree.
pub trait BaseCollection: Send + 'static {
    /// The validators this collection consults before accepting values.
    type Validators: ValidatorSet;

    /// The validators of this collection.
    fn validators(&self) -> &Self::Validators;

    /// Mutable access to the validators of this collection.
    fn validators_mut(&mut self) -> &mut Self::Validators;

    /// Whether the collection offers external read/write locking.
    fn is_read_write_lock_supported(&self) -> bool {
        false
    }
}

/// Factory for default bases, keyed on an ordering descriptor.
pub trait DefaultBase: BaseCollection + Sized {
    /// Create an empty base for the given ordering.
    fn create_default(ordering: ElementOrdering) -> Self;
}

/// Hooks called when the base of a root is unloaded or loaded.
///
/// Implementations typically drop or rebuild caches derived from the base.
/// They run while the view tree is locked and must not call back into
/// collection handles.
pub trait RootHooks<B: DefaultBase>: Send + Sync {
    /// Called with the outgoing base before it is released.
    fn on_unload_transient(&self, base: &B) {
        let _ = base;
    }

    /// Called after a base has been installed or restored.
    fn on_load_transient(&self, root: &mut RootData<B>) {
        let _ = root;
    }
}

/// Persisted form of root data.
///
/// Derived views are never persisted; they are rebuilt lazily from the
/// restored root.
///
/// Validators are not captured either. A restored collection starts with
/// none, so owners must register them again after restoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootSnapshot<B> {
    /// The base collection, if one was present.
    pub base: Option<B>,
    /// Whether the collection was disabled.
    pub disabled: bool,
}

/// The owner of a collection's canonical base.
pub struct RootData<B: DefaultBase> {
    base: Option<B>,
    validators: B::Validators,
    disabled: bool,
    mod_count: u64,
    structure_count: u64,
    options: RootOptions,
    owner: Option<NodeId>,
    deserializing: bool,
    hooks: Option<Arc<dyn RootHooks<B>>>,
}

impl<B: DefaultBase> RootData<B> {
    /// Create root data without a base.
    ///
    /// Construct-only roots receive a default base immediately, so their base
    /// is never absent.
    pub fn new(options: RootOptions) -> Self {
        let base = match options.policy {
            RootPolicy::ConstructOnly => Some(B::create_default(options.ordering)),
            RootPolicy::Lazy | RootPolicy::SetOnce => None,
        };
        Self {
            base,
            validators: B::Validators::default(),
            disabled: false,
            mod_count: 0,
            structure_count: 0,
            options,
            owner: None,
            deserializing: false,
            hooks: None,
        }
    }

    /// Create root data wrapping an explicit base.
    pub fn with_base(base: B, options: RootOptions) -> Self {
        let mut data = Self::new(options);
        data.base = Some(base);
        data
    }

    /// The options this root was created with.
    pub fn options(&self) -> &RootOptions {
        &self.options
    }

    /// Install hooks notified on base unload/load.
    pub fn set_hooks(&mut self, hooks: Option<Arc<dyn RootHooks<B>>>) {
        self.hooks = hooks;
    }

    // =========================================================================
    // Base access
    // =========================================================================

    /// The base, created from the default factory if absent.
    pub fn base(&mut self) -> ViewResult<&B> {
        self.ensure_base()?;
        self.base.as_ref().ok_or(ViewError::NullBase)
    }

    /// Mutable access to the base, created from the default factory if absent.
    pub fn base_mut(&mut self) -> ViewResult<&mut B> {
        self.ensure_base()?;
        self.base.as_mut().ok_or(ViewError::NullBase)
    }

    /// The base if one is present, without creating a default.
    pub fn base_if_present(&self) -> Option<&B> {
        self.base.as_ref()
    }

    /// Make sure a base exists, creating the default one if needed.
    pub fn ensure_base(&mut self) -> ViewResult<()> {
        if self.base.is_some() {
            return Ok(());
        }
        if self.options.policy == RootPolicy::ConstructOnly {
            return Err(ViewError::NullBase);
        }
        tracing::trace!(target: targets::ROOT, ordering = ?self.options.ordering, "creating default base");
        self.set_base(Some(B::create_default(self.options.ordering)))?;
        Ok(())
    }

    /// Replace the base.
    ///
    /// Validators are unregistered from the outgoing base and registered on
    /// the incoming one, the modification counter is bumped and the transient
    /// hooks are notified. Returns the outgoing base.
    pub fn set_base(&mut self, base: Option<B>) -> ViewResult<Option<B>> {
        if self.deserializing {
            return Err(ViewError::Deserializing);
        }
        match self.options.policy {
            RootPolicy::SetOnce if self.base.is_some() => return Err(ViewError::BaseAlreadySet),
            RootPolicy::ConstructOnly if base.is_none() => return Err(ViewError::NullBase),
            _ => {}
        }

        let mut old = self.base.take();
        if let Some(old) = old.as_mut() {
            old.validators_mut().remove_all(&self.validators);
            if let Some(hooks) = &self.hooks {
                hooks.on_unload_transient(old);
            }
        }

        self.base = base.map(|mut base| {
            base.validators_mut().absorb(&self.validators);
            base
        });
        self.mod_count += 1;
        tracing::debug!(
            target: targets::ROOT,
            mod_count = self.mod_count,
            has_base = self.base.is_some(),
            "base replaced"
        );

        if let Some(hooks) = self.hooks.clone() {
            hooks.on_load_transient(self);
        }
        Ok(old)
    }

    /// Whether the base supports external read/write locking.
    pub fn is_read_write_lock_supported(&self) -> bool {
        self.base
            .as_ref()
            .is_some_and(BaseCollection::is_read_write_lock_supported)
    }

    // =========================================================================
    // Validators
    // =========================================================================

    /// Apply the same edit to the local validators and to the base's.
    ///
    /// ```
    /// use viewtree_core::validator::{validator_fn, ValidatorChain};
    /// # use viewtree_core::{BaseCollection, DefaultBase, ElementOrdering, RootData, RootOptions};
    /// # #[derive(Default)]
    /// # struct Numbers { validators: ValidatorChain<i32> }
    /// # impl BaseCollection for Numbers {
    /// #     type Validators = ValidatorChain<i32>;
    /// #     fn validators(&self) -> &Self::Validators { &self.validators }
    /// #     fn validators_mut(&mut self) -> &mut Self::Validators { &mut self.validators }
    /// # }
    /// # impl DefaultBase for Numbers {
    /// #     fn create_default(_: ElementOrdering) -> Self { Self::default() }
    /// # }
    /// let mut root: RootData<Numbers> = RootData::new(RootOptions::default());
    /// let positive = validator_fn(|value: &i32| {
    ///     if *value > 0 { Ok(()) } else { Err(viewtree_core::ValidationError::new("not positive")) }
    /// });
    /// root.update_validators(|validators| validators.add(positive.clone()));
    /// assert!(root.validators().validate(&-1).is_err());
    /// ```
    pub fn update_validators(&mut self, edit: impl Fn(&mut B::Validators)) {
        edit(&mut self.validators);
        if let Some(base) = self.base.as_mut() {
            edit(base.validators_mut());
        }
        tracing::debug!(target: targets::ROOT, forwarded = self.base.is_some(), "validators updated");
    }

    /// The validators in effect: the base's if present, the local ones otherwise.
    pub fn validators(&self) -> &B::Validators {
        match &self.base {
            Some(base) => base.validators(),
            None => &self.validators,
        }
    }

    /// The locally registered validators.
    pub fn local_validators(&self) -> &B::Validators {
        &self.validators
    }

    // =========================================================================
    // Disabled flag
    // =========================================================================

    /// Whether the collection is disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Set or clear the disabled flag.
    pub fn set_disabled(&mut self, disabled: bool) {
        if self.disabled != disabled {
            tracing::debug!(target: targets::ROOT, disabled, "disabled flag changed");
        }
        self.disabled = disabled;
    }

    /// Fail if the collection is disabled.
    pub fn required_enabled(&self) -> ViewResult<()> {
        if self.disabled {
            Err(ViewError::Disabled)
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// The current modification count.
    pub fn mod_count(&self) -> u64 {
        self.mod_count
    }

    /// The number of structural modifications performed so far.
    pub fn structure_count(&self) -> u64 {
        self.structure_count
    }

    /// Record a structural modification of the base.
    pub fn record_structural_change(&mut self) {
        self.mod_count += 1;
        self.structure_count += 1;
    }

    /// Whether modification events are dispatched.
    pub fn is_dispatchable(&self) -> bool {
        self.options.dispatchable
    }

    /// Enable or suppress event dispatch.
    pub fn set_dispatchable(&mut self, dispatchable: bool) {
        self.options.dispatchable = dispatchable;
    }

    // =========================================================================
    // Owner
    // =========================================================================

    /// The root node of the tree this data belongs to.
    pub fn root_owner(&self) -> ViewResult<NodeId> {
        self.owner.ok_or(ViewError::NoRootOwner)
    }

    pub(crate) fn attach_owner(&mut self, owner: NodeId) {
        self.owner = Some(owner);
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Capture the persisted state of this root.
    ///
    /// Validators are closures and are not captured; owners re-register them
    /// after [`read_state`](Self::read_state).
    pub fn write_state(&self) -> RootSnapshot<B>
    where
        B: Clone,
    {
        RootSnapshot {
            base: self.base.clone(),
            disabled: self.disabled,
        }
    }

    /// Rebuild root data from a snapshot.
    ///
    /// The root is in the deserializing state while the load hook runs, so
    /// the hook cannot replace the base.
    pub fn read_state(
        snapshot: RootSnapshot<B>,
        options: RootOptions,
        hooks: Option<Arc<dyn RootHooks<B>>>,
    ) -> Self {
        let mut data = Self::new(options);
        data.deserializing = true;
        if let Some(base) = snapshot.base {
            data.base = Some(base);
        }
        data.disabled = snapshot.disabled;
        data.hooks = hooks;
        if let Some(hooks) = data.hooks.clone() {
            hooks.on_load_transient(&mut data);
        }
        data.deserializing = false;
        tracing::debug!(
            target: targets::ROOT,
            has_base = data.base.is_some(),
            disabled = data.disabled,
            "root data restored"
        );
        data
    }

    /// Whether the root is being restored from a snapshot.
    pub fn is_deserializing(&self) -> bool {
        self.deserializing
    }
}

impl<B: DefaultBase + fmt::Debug> fmt::Debug for RootData<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootData")
            .field("base", &self.base)
            .field("disabled", &self.disabled)
            .field("mod_count", &self.mod_count)
            .field("structure_count", &self.structure_count)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::validator::{validator_fn, ValidatorChain};
    use parking_lot::Mutex;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Bag {
        items: Vec<i32>,
        #[serde(skip)]
        validators: ValidatorChainSlot,
    }

    // ValidatorChain has no PartialEq; compare bags by items only.
    #[derive(Debug, Clone, Default)]
    struct ValidatorChainSlot(ValidatorChain<i32>);

    impl PartialEq for ValidatorChainSlot {
        fn eq(&self, _: &Self) -> bool {
            true
        }
    }

    impl BaseCollection for Bag {
        type Validators = ValidatorChain<i32>;

        fn validators(&self) -> &Self::Validators {
            &self.validators.0
        }

        fn validators_mut(&mut self) -> &mut Self::Validators {
            &mut self.validators.0
        }
    }

    impl DefaultBase for Bag {
        fn create_default(_: ElementOrdering) -> Self {
            Self::default()
        }
    }

    fn bag(items: &[i32]) -> Bag {
        Bag {
            items: items.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_lazy_default_base() {
        let mut root: RootData<Bag> = RootData::new(RootOptions::default());
        assert!(root.base_if_present().is_none());
        assert_eq!(root.mod_count(), 0);

        assert!(root.base().unwrap().items.is_empty());
        assert_eq!(root.mod_count(), 1);

        // A second access reuses the same base.
        root.base().unwrap();
        assert_eq!(root.mod_count(), 1);
    }

    #[test]
    fn test_set_base_bumps_mod_count() {
        let mut root: RootData<Bag> = RootData::with_base(bag(&[1]), RootOptions::default());
        let before = root.mod_count();
        let old = root.set_base(Some(bag(&[2]))).unwrap();
        assert_eq!(old.unwrap().items, vec![1]);
        assert!(root.mod_count() > before);
        assert_eq!(root.base().unwrap().items, vec![2]);
    }

    #[test]
    fn test_set_once_rejects_second_base() {
        let mut root: RootData<Bag> =
            RootData::new(RootOptions::new().with_policy(RootPolicy::SetOnce));
        root.set_base(Some(bag(&[1]))).unwrap();
        let count = root.mod_count();

        let err = root.set_base(Some(bag(&[2]))).unwrap_err();
        assert!(matches!(err, ViewError::BaseAlreadySet));
        assert_eq!(root.mod_count(), count);
        assert_eq!(root.base().unwrap().items, vec![1]);
    }

    #[test]
    fn test_construct_only_never_null() {
        let mut root: RootData<Bag> =
            RootData::new(RootOptions::new().with_policy(RootPolicy::ConstructOnly));
        assert!(root.base_if_present().is_some());
        assert!(matches!(root.set_base(None), Err(ViewError::NullBase)));
        assert!(root.base_if_present().is_some());
    }

    #[test]
    fn test_validators_forwarded_to_base() {
        let reject_negative = validator_fn(|value: &i32| {
            if *value < 0 {
                Err(ValidationError::new("negative"))
            } else {
                Ok(())
            }
        });

        let mut root: RootData<Bag> = RootData::new(RootOptions::default());
        root.update_validators(|v| v.add(reject_negative.clone()));
        // No base yet: local validators are in effect.
        assert!(root.validators().validate(&-1).is_err());

        root.set_base(Some(bag(&[]))).unwrap();
        assert!(root.base().unwrap().validators().contains(&reject_negative));

        let old = root.set_base(Some(bag(&[]))).unwrap().unwrap();
        assert!(!old.validators().contains(&reject_negative));
        assert!(root.local_validators().contains(&reject_negative));
        assert!(root.validators().validate(&-1).is_err());

        root.update_validators(|v| {
            v.remove(&reject_negative);
        });
        assert!(root.validators().validate(&-1).is_ok());
    }

    #[test]
    fn test_required_enabled() {
        let mut root: RootData<Bag> = RootData::new(RootOptions::default());
        assert!(root.required_enabled().is_ok());
        root.set_disabled(true);
        assert!(matches!(root.required_enabled(), Err(ViewError::Disabled)));
        root.set_disabled(false);
        assert!(root.required_enabled().is_ok());
    }

    #[test]
    fn test_root_owner_before_attach() {
        let root: RootData<Bag> = RootData::new(RootOptions::default());
        assert!(matches!(root.root_owner(), Err(ViewError::NoRootOwner)));
    }

    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl RootHooks<Bag> for RecordingHooks {
        fn on_unload_transient(&self, base: &Bag) {
            self.events.lock().push(format!("unload {:?}", base.items));
        }

        fn on_load_transient(&self, root: &mut RootData<Bag>) {
            let items = root.base_if_present().map(|b| b.items.clone());
            self.events.lock().push(format!("load {items:?}"));
            if root.is_deserializing() {
                let attempt = root.set_base(Some(bag(&[99])));
                self.events
                    .lock()
                    .push(format!("swap during restore: {}", attempt.is_err()));
            }
        }
    }

    #[test]
    fn test_transient_hooks_on_set_base() {
        let hooks = Arc::new(RecordingHooks {
            events: Mutex::new(Vec::new()),
        });
        let mut root: RootData<Bag> = RootData::with_base(bag(&[1]), RootOptions::default());
        root.set_hooks(Some(hooks.clone()));
        root.set_base(Some(bag(&[2]))).unwrap();

        assert_eq!(
            *hooks.events.lock(),
            vec!["unload [1]".to_string(), "load Some([2])".to_string()]
        );
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut root: RootData<Bag> = RootData::with_base(bag(&[3, 4]), RootOptions::default());
        root.set_disabled(true);

        let json = serde_json::to_string(&root.write_state()).unwrap();
        let snapshot: RootSnapshot<Bag> = serde_json::from_str(&json).unwrap();

        let hooks = Arc::new(RecordingHooks {
            events: Mutex::new(Vec::new()),
        });
        let mut restored = RootData::read_state(snapshot, RootOptions::default(), Some(hooks.clone()));
        assert!(restored.is_disabled());
        assert!(!restored.is_deserializing());
        assert_eq!(restored.base().unwrap().items, vec![3, 4]);
        assert_eq!(
            *hooks.events.lock(),
            vec![
                "load Some([3, 4])".to_string(),
                "swap during restore: true".to_string()
            ]
        );
    }
}
