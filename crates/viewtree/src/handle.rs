//! Reference-counted handles to view nodes.
//!
//! Every container type is a thin wrapper around a [`ViewHandle`]: the shared
//! tree of its collection plus the id of its node. Cloning a handle retains
//! the node; dropping the last handle of a view releases it from the arena.

use std::sync::Arc;

use viewtree_core::{
    execute_modification, BaseCollection, ModificationPlan, NodeHooks, NodeId, RootData,
    RootOptions, RootSnapshot, SharedViewTree, ViewKind, ViewResult, ViewTree, ViewTreeDebug,
};

pub(crate) struct ViewHandle<K: ViewKind> {
    tree: Arc<SharedViewTree<K>>,
    node: NodeId,
}

impl<K: ViewKind> ViewHandle<K> {
    /// Create a new tree and return a handle to its root.
    pub(crate) fn root(data: RootData<K::Base>) -> Self {
        let tree = ViewTree::new(data);
        let node = tree.root();
        Self {
            tree: Arc::new(SharedViewTree::new(tree)),
            node,
        }
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn with_tree<R>(&self, f: impl FnOnce(&mut ViewTree<K>) -> R) -> R {
        self.tree.with_tree(f)
    }

    /// Add a derived view below this node.
    pub(crate) fn derive(&self, info: K::Info) -> ViewResult<Self> {
        let node = self.with_tree(|t| t.add_view(self.node, info))?;
        Ok(Self {
            tree: Arc::clone(&self.tree),
            node,
        })
    }

    /// The cached view of this node with the descriptor, created on first use.
    pub(crate) fn cached(&self, info: K::Info) -> ViewResult<Self> {
        let node = self.with_tree(|t| t.cached_view(self.node, info))?;
        Ok(Self {
            tree: Arc::clone(&self.tree),
            node,
        })
    }

    /// Run a read against the base and this node's local base.
    ///
    /// Fails if the collection is disabled.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&K::Base, &K::Local) -> ViewResult<R>) -> ViewResult<R> {
        self.with_tree(|t| {
            t.required_enabled()?;
            let local = t.base(self.node)?;
            let base = t.data_mut().base()?;
            f(base, &local)
        })
    }

    /// Prepare a write: enable the collection, then inspect the tree.
    pub(crate) fn prepare<R>(
        &self,
        f: impl FnOnce(&mut ViewTree<K>, Arc<K::Local>) -> ViewResult<R>,
    ) -> ViewResult<R> {
        self.with_tree(|t| {
            t.enable();
            let local = t.base(self.node)?;
            f(t, local)
        })
    }

    /// Run a planned mutation under the two-phase protocol.
    pub(crate) fn execute<R>(
        &self,
        plan: ModificationPlan<K::Change>,
        apply: impl FnOnce(&mut ViewTree<K>) -> ViewResult<R>,
    ) -> ViewResult<R> {
        execute_modification(&self.tree, plan, apply)
    }

    pub(crate) fn mod_count(&self) -> u64 {
        self.with_tree(|t| t.data().mod_count())
    }

    pub(crate) fn update_listeners<R>(&self, f: impl FnOnce(&mut K::Listeners) -> R) -> ViewResult<R> {
        self.with_tree(|t| t.listeners_mut(self.node).map(f))
    }

    pub(crate) fn update_validators(&self, edit: impl Fn(&mut <K::Base as BaseCollection>::Validators)) {
        self.with_tree(|t| t.data_mut().update_validators(edit));
    }

    pub(crate) fn set_hooks(&self, hooks: Option<Arc<dyn NodeHooks<K>>>) -> ViewResult<()> {
        self.with_tree(|t| t.set_hooks(self.node, hooks))
    }

    pub(crate) fn disable(&self) {
        self.with_tree(|t| t.disable());
    }

    pub(crate) fn enable(&self) {
        self.with_tree(|t| t.enable());
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.with_tree(|t| t.data().is_disabled())
    }

    pub(crate) fn view_info(&self) -> ViewResult<Option<K::Info>> {
        self.with_tree(|t| t.view_info(self.node).map(|info| info.cloned()))
    }

    pub(crate) fn replace(&self, base: K::Base) -> ViewResult<Option<K::Base>> {
        self.with_tree(|t| t.replace(self.node, Some(base)))
    }

    pub(crate) fn is_read_write_lock_supported(&self) -> bool {
        self.with_tree(|t| t.data().is_read_write_lock_supported())
    }

    pub(crate) fn snapshot(&self) -> RootSnapshot<K::Base>
    where
        K::Base: Clone,
    {
        self.with_tree(|t| t.data().write_state())
    }

    pub(crate) fn from_snapshot(snapshot: RootSnapshot<K::Base>, options: RootOptions) -> Self {
        Self::root(RootData::read_state(snapshot, options, None))
    }

    pub(crate) fn format_views(&self) -> String {
        self.with_tree(|t| ViewTreeDebug::new().format_tree(t))
    }

    /// Whether two handles refer to the same node of the same tree.
    pub(crate) fn same_node(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.node == other.node
    }
}

impl<K: ViewKind> Clone for ViewHandle<K> {
    fn clone(&self) -> Self {
        self.tree.retain(self.node);
        Self {
            tree: Arc::clone(&self.tree),
            node: self.node,
        }
    }
}

impl<K: ViewKind> Drop for ViewHandle<K> {
    fn drop(&mut self) {
        self.tree.release(self.node);
    }
}

/// Forward the operations every container handle offers.
macro_rules! common_view_ops {
    ($kind:ty, $base:ty, $info:ty) => {
        /// Disable the whole collection; reads fail until the next write or `enable`.
        pub fn disable(&self) {
            self.handle.disable();
        }

        /// Clear the disabled flag.
        pub fn enable(&self) {
            self.handle.enable();
        }

        /// Whether the collection is disabled.
        pub fn is_disabled(&self) -> bool {
            self.handle.is_disabled()
        }

        /// The descriptor of this view; `None` for the root.
        pub fn view_info(&self) -> viewtree_core::ViewResult<Option<$info>> {
            self.handle.view_info()
        }

        /// Replace the canonical base, returning the previous one.
        ///
        /// Only the root may replace the base; derived views pick up the new
        /// base lazily on their next access.
        pub fn replace(&self, base: $base) -> viewtree_core::ViewResult<Option<$base>> {
            self.handle.replace(base)
        }

        /// Whether the base offers external read/write locking.
        pub fn is_read_write_lock_supported(&self) -> bool {
            self.handle.is_read_write_lock_supported()
        }

        /// The modification count of the collection.
        pub fn mod_count(&self) -> u64 {
            self.handle.mod_count()
        }

        /// Attach hooks run around every modification routed through this view.
        pub fn set_hooks(
            &self,
            hooks: Option<std::sync::Arc<dyn viewtree_core::NodeHooks<$kind>>>,
        ) -> viewtree_core::ViewResult<()> {
            self.handle.set_hooks(hooks)
        }

        /// Render the views of this collection for diagnostics.
        pub fn format_views(&self) -> String {
            self.handle.format_views()
        }
    };
}

pub(crate) use common_view_ops;
