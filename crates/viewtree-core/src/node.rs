//! View nodes and the per-collection arena that owns them.
//!
//! A [`ViewTree`] stores every view of one collection in a `SlotMap` arena.
//! The root node wraps the [`RootData`]; every other node is a derived view
//! described by a [`ViewKind::Info`] descriptor and a parent handle. Parents
//! are plain [`NodeId`]s, never owning references.
//!
//! # Lazy rebasing
//!
//! Each node caches its *local base*: the slice, range or projection of the
//! canonical base it presents. The cache is valid iff the node's expected
//! modification count equals the root's current count. A stale node derives
//! its local base again from its parent's, recursively up to the root, the
//! next time it is accessed:
//!
//! ```text
//! base(node) = create_base_view(root base, base(parent), info)
//! ```
//!
//! Replacing the canonical base is therefore O(1) no matter how many views
//! exist; the price is O(depth) work on the next access of each stale view.
//!
//! # Positional views
//!
//! Views whose descriptor carries positions (sublists) additionally record
//! the structural modification they were last synchronized with. A
//! structural modification routed through them resynchronizes their bounds;
//! any other structural modification makes them stale for good, and accessing
//! them fails with [`ViewError::Comodification`].

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::dispatch::NodeHooks;
use crate::error::{ModificationPhase, ViewError, ViewResult};
use crate::event::{Change, ModificationEvent};
use crate::logging::targets;
use crate::root::{DefaultBase, RootData};

new_key_type! {
    /// Handle of a node in a [`ViewTree`].
    ///
    /// Handles stay unique for the lifetime of the tree; a released node's
    /// handle is never reused for another node.
    pub struct NodeId;
}

static_assertions::assert_impl_all!(NodeId: Send, Sync, Copy);

/// The behaviour of one family of views (lists, sets, maps).
///
/// A view kind supplies the descriptors of its derived views, the way a
/// derived view's local base is computed from its parent's, the way events
/// are remapped when they bubble, and the listeners its nodes accept.
pub trait ViewKind: Sized + Send + 'static {
    /// The canonical collection at the root.
    type Base: DefaultBase;
    /// Descriptor of a derived view.
    type Info: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;
    /// What a node presents of the base: a window, a range, a projection.
    type Local: fmt::Debug + Send + Sync + 'static;
    /// Payload of the events raised by this family.
    type Change: Change;
    /// Listeners registered on one node.
    type Listeners: Default + Send + 'static;
    /// Snapshot of listeners resolved for one event.
    type Resolved: Send + Sync + 'static;

    /// The local base of the root node.
    fn root_local(base: &Self::Base) -> Self::Local;

    /// Derive a view's local base from its parent's.
    ///
    /// Fails with [`ViewError::IllegalViewInfo`] if the descriptor does not
    /// apply to the parent.
    fn create_base_view(
        base: &Self::Base,
        parent: &Self::Local,
        info: &Self::Info,
    ) -> ViewResult<Self::Local>;

    /// Whether the descriptor carries positions that shift on modification.
    fn is_positional(info: &Self::Info) -> bool {
        let _ = info;
        false
    }

    /// Remap a change raised on a child into its parent's coordinates.
    ///
    /// Both locals describe the state before the modification.
    fn bubble(change: &Self::Change, child: &Self::Local, parent: &Self::Local) -> Self::Change;

    /// Resolve the listeners that should receive the next event.
    fn resolve_listeners(listeners: &Self::Listeners) -> Option<Self::Resolved>;

    /// Notify resolved listeners of one phase of an event.
    fn notify(
        resolved: &Self::Resolved,
        phase: ModificationPhase,
        event: &ModificationEvent<Self::Change>,
    ) -> ViewResult<()>;

    /// Number of listener registrations, for diagnostics.
    fn listener_count(listeners: &Self::Listeners) -> usize;
}

/// Internal data stored in the arena for each node.
struct ViewNode<K: ViewKind> {
    /// Descriptor (None for the root).
    info: Option<K::Info>,
    /// Parent node (None for the root).
    parent: Option<NodeId>,
    /// Derived views of this node.
    children: Vec<NodeId>,
    /// Cached local base.
    local: Option<Arc<K::Local>>,
    /// Root modification count the cache was computed at.
    expected_mod_count: u64,
    /// Structural modification count positional bounds are valid for.
    synced_structure: u64,
    /// Number of times the local base was derived.
    derivations: u64,
    listeners: K::Listeners,
    hooks: Option<Arc<dyn NodeHooks<K>>>,
    /// Live handles referring to this node.
    handles: usize,
    /// Retained by its parent even without handles (key sets, entry sets).
    cached: bool,
}

impl<K: ViewKind> ViewNode<K> {
    fn new(parent: Option<NodeId>, info: Option<K::Info>, synced_structure: u64) -> Self {
        Self {
            info,
            parent,
            children: Vec::new(),
            local: None,
            expected_mod_count: 0,
            synced_structure,
            derivations: 0,
            listeners: K::Listeners::default(),
            hooks: None,
            handles: 1,
            cached: false,
        }
    }
}

/// Nodes removed from a tree, dropped once the tree lock is released.
///
/// Listeners and hooks stored on removed nodes may own collection handles;
/// dropping those while the tree is locked would deadlock.
#[must_use = "dropping removed nodes while the tree is locked can deadlock"]
pub struct Released<K: ViewKind> {
    nodes: Vec<ViewNode<K>>,
}

impl<K: ViewKind> Released<K> {
    /// Number of nodes removed.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing was removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The arena of all views over one canonical collection.
pub struct ViewTree<K: ViewKind> {
    nodes: SlotMap<NodeId, ViewNode<K>>,
    root: NodeId,
    data: RootData<K::Base>,
}

impl<K: ViewKind> ViewTree<K> {
    /// Create a tree around root data.
    ///
    /// The root node starts with one handle reference.
    pub fn new(mut data: RootData<K::Base>) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(ViewNode::new(None, None, data.structure_count()));
        data.attach_owner(root);
        tracing::trace!(target: targets::NODE, ?root, "created view tree");
        Self { nodes, root, data }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` is the root node.
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// The root data.
    pub fn data(&self) -> &RootData<K::Base> {
        &self.data
    }

    /// Mutable access to the root data.
    pub fn data_mut(&mut self) -> &mut RootData<K::Base> {
        &mut self.data
    }

    /// Whether the node is alive.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> ViewResult<&ViewNode<K>> {
        self.nodes.get(id).ok_or(ViewError::UnknownNode)
    }

    fn node_mut(&mut self, id: NodeId) -> ViewResult<&mut ViewNode<K>> {
        self.nodes.get_mut(id).ok_or(ViewError::UnknownNode)
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// The parent of a node (None for the root).
    pub fn parent(&self, id: NodeId) -> ViewResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// The derived views of a node.
    pub fn children(&self, id: NodeId) -> ViewResult<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// The descriptor of a node (None for the root).
    pub fn view_info(&self, id: NodeId) -> ViewResult<Option<&K::Info>> {
        Ok(self.node(id)?.info.as_ref())
    }

    /// The node followed by its ancestors, ending with the root.
    pub fn path_to_root(&self, id: NodeId) -> ViewResult<Vec<NodeId>> {
        let mut path = vec![id];
        let mut current = self.node(id)?.parent;
        while let Some(parent) = current {
            path.push(parent);
            current = self.node(parent)?.parent;
        }
        Ok(path)
    }

    /// Add a derived view below `parent`.
    ///
    /// The local base is derived immediately, so an illegal descriptor is
    /// reported here rather than on first use. The returned node carries one
    /// handle reference.
    #[tracing::instrument(skip(self), target = "viewtree_core::node", level = "trace")]
    pub fn add_view(&mut self, parent: NodeId, info: K::Info) -> ViewResult<NodeId> {
        self.node(parent)?;
        let id = self.nodes.insert(ViewNode::new(
            Some(parent),
            Some(info),
            self.data.structure_count(),
        ));
        if let Err(err) = self.base(id) {
            self.nodes.remove(id);
            return Err(err);
        }
        self.node_mut(parent)?.children.push(id);
        tracing::trace!(target: targets::NODE, ?id, ?parent, "added view");
        Ok(id)
    }

    /// Return the cached view of `parent` with this descriptor, creating it
    /// on first use.
    ///
    /// Cached views stay alive as long as their parent does. The returned
    /// node carries one additional handle reference.
    pub fn cached_view(&mut self, parent: NodeId, info: K::Info) -> ViewResult<NodeId> {
        let existing = self.node(parent)?.children.iter().copied().find(|&child| {
            self.nodes
                .get(child)
                .is_some_and(|node| node.cached && node.info.as_ref() == Some(&info))
        });
        match existing {
            Some(id) => {
                self.node_mut(id)?.handles += 1;
                Ok(id)
            }
            None => {
                let id = self.add_view(parent, info)?;
                self.node_mut(id)?.cached = true;
                Ok(id)
            }
        }
    }

    /// Update the descriptor of a positional view whose bounds moved.
    pub fn set_view_info(&mut self, id: NodeId, info: K::Info) -> ViewResult<()> {
        let node = self.node_mut(id)?;
        if node.parent.is_none() {
            return Err(ViewError::NotRoot);
        }
        node.info = Some(info);
        Ok(())
    }

    // =========================================================================
    // Local bases
    // =========================================================================

    /// The local base of a node, derived again if stale.
    ///
    /// Repeated calls without an intervening modification return the same
    /// `Arc`.
    pub fn base(&mut self, id: NodeId) -> ViewResult<Arc<K::Local>> {
        self.data.ensure_base()?;
        self.base_of(id)
    }

    fn base_of(&mut self, id: NodeId) -> ViewResult<Arc<K::Local>> {
        let mod_count = self.data.mod_count();
        let node = self.node(id)?;
        if node.expected_mod_count == mod_count {
            if let Some(local) = &node.local {
                return Ok(Arc::clone(local));
            }
        }
        let (parent, info, synced) = (node.parent, node.info.clone(), node.synced_structure);

        let derived = match (parent, info) {
            (Some(parent), Some(info)) => {
                if K::is_positional(&info) && synced != self.data.structure_count() {
                    return Err(ViewError::Comodification(
                        "the view was invalidated by a modification made through another view",
                    ));
                }
                let parent_local = self.base_of(parent)?;
                K::create_base_view(self.data.base()?, &parent_local, &info)?
            }
            _ => K::root_local(self.data.base()?),
        };
        let derived = Arc::new(derived);

        let node = self.node_mut(id)?;
        let previous = node.local.replace(Arc::clone(&derived));
        node.expected_mod_count = mod_count;
        node.derivations += 1;
        tracing::trace!(target: targets::NODE, ?id, mod_count, derivations = node.derivations, "derived local base");

        if let Some(hooks) = node.hooks.clone() {
            if let Some(previous) = &previous {
                hooks.on_unload_base(id, previous);
            }
            hooks.on_load_base(id, &derived);
        }
        Ok(derived)
    }

    /// Whether the cached local base of a node is current.
    pub fn is_fresh(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|node| {
            node.local.is_some() && node.expected_mod_count == self.data.mod_count()
        })
    }

    /// Number of times a node's local base has been derived.
    pub fn derivations(&self, id: NodeId) -> ViewResult<u64> {
        Ok(self.node(id)?.derivations)
    }

    /// Record a structural modification routed through `path`.
    ///
    /// Bumps the modification counters and marks every node on the path as
    /// synchronized with the new structure.
    pub fn finish_structural_change(&mut self, path: &[NodeId]) {
        self.data.record_structural_change();
        let structure = self.data.structure_count();
        for &id in path {
            if let Some(node) = self.nodes.get_mut(id) {
                node.synced_structure = structure;
            }
        }
        tracing::trace!(target: targets::NODE, mod_count = self.data.mod_count(), path_len = path.len(), "structural change");
    }

    /// Replace the canonical base.
    ///
    /// Only legal on the root; derived views pick up the new base lazily.
    pub fn replace(&mut self, id: NodeId, base: Option<K::Base>) -> ViewResult<Option<K::Base>> {
        if !self.is_root(id) {
            return Err(ViewError::NotRoot);
        }
        self.data.set_base(base)
    }

    // =========================================================================
    // Enabled state
    // =========================================================================

    /// Fail if the collection is disabled.
    pub fn required_enabled(&self) -> ViewResult<()> {
        self.data.required_enabled()
    }

    /// Clear the disabled flag.
    pub fn enable(&mut self) {
        self.data.set_disabled(false);
    }

    /// Set the disabled flag.
    pub fn disable(&mut self) {
        self.data.set_disabled(true);
    }

    // =========================================================================
    // Listeners and hooks
    // =========================================================================

    /// The listeners of a node.
    pub fn listeners(&self, id: NodeId) -> ViewResult<&K::Listeners> {
        Ok(&self.node(id)?.listeners)
    }

    /// Mutable access to the listeners of a node.
    pub fn listeners_mut(&mut self, id: NodeId) -> ViewResult<&mut K::Listeners> {
        Ok(&mut self.node_mut(id)?.listeners)
    }

    /// Number of listener registrations on a node.
    pub fn listener_count(&self, id: NodeId) -> ViewResult<usize> {
        Ok(K::listener_count(&self.node(id)?.listeners))
    }

    /// The hooks of a node.
    pub fn hooks(&self, id: NodeId) -> ViewResult<Option<Arc<dyn NodeHooks<K>>>> {
        Ok(self.node(id)?.hooks.clone())
    }

    /// Install or remove the hooks of a node.
    pub fn set_hooks(&mut self, id: NodeId, hooks: Option<Arc<dyn NodeHooks<K>>>) -> ViewResult<()> {
        self.node_mut(id)?.hooks = hooks;
        Ok(())
    }

    // =========================================================================
    // Handle counting
    // =========================================================================

    /// Register one more handle referring to a node.
    pub fn retain(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.handles += 1;
        }
    }

    /// Number of live handles referring to a node.
    pub fn handle_count(&self, id: NodeId) -> usize {
        self.nodes.get(id).map_or(0, |node| node.handles)
    }

    /// Whether a node is a cached view retained by its parent.
    pub fn is_cached(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.cached)
    }

    /// Drop one handle reference, removing nodes that are no longer reachable.
    ///
    /// A node is removed when it has no handles, is not cached by its parent,
    /// and all of its children are cached views without handles. Removal
    /// continues with the parent.
    pub fn release(&mut self, id: NodeId) -> Released<K> {
        let mut released = Released { nodes: Vec::new() };
        let Some(node) = self.nodes.get_mut(id) else {
            return released;
        };
        node.handles = node.handles.saturating_sub(1);

        let mut current = Some(id);
        while let Some(id) = current {
            if id == self.root {
                break;
            }
            let Some(node) = self.nodes.get(id) else {
                break;
            };
            if node.cached || !self.is_collectible(id) {
                break;
            }
            current = node.parent;
            self.remove_subtree(id, &mut released);
        }
        released
    }

    fn is_collectible(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|node| {
            node.handles == 0
                && node.children.iter().all(|&child| {
                    self.nodes.get(child).is_some_and(|c| c.cached) && self.is_collectible(child)
                })
        })
    }

    fn remove_subtree(&mut self, id: NodeId, released: &mut Released<K>) {
        if let Some(parent) = self.nodes.get(id).and_then(|node| node.parent) {
            if let Some(parent) = self.nodes.get_mut(parent) {
                parent.children.retain(|&child| child != id);
            }
        }
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(next) {
                pending.extend(node.children.iter().copied());
                released.nodes.push(node);
            }
        }
        tracing::trace!(target: targets::NODE, ?id, removed = released.nodes.len(), "released view");
    }
}

/// A view tree shared between collection handles.
///
/// All access goes through a `parking_lot::Mutex`. The lock is held only for
/// the duration of a closure passed to [`with_tree`](Self::with_tree); the
/// dispatcher never holds it while listeners run.
pub struct SharedViewTree<K: ViewKind> {
    inner: Mutex<ViewTree<K>>,
}

impl<K: ViewKind> SharedViewTree<K> {
    /// Wrap a tree for shared access.
    pub fn new(tree: ViewTree<K>) -> Self {
        Self {
            inner: Mutex::new(tree),
        }
    }

    /// Access the tree with the lock held.
    pub fn with_tree<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ViewTree<K>) -> R,
    {
        f(&mut self.inner.lock())
    }

    /// Register one more handle referring to a node.
    pub fn retain(&self, id: NodeId) {
        self.inner.lock().retain(id);
    }

    /// Drop one handle reference; removed nodes are dropped after unlocking.
    pub fn release(&self, id: NodeId) {
        let released = self.inner.lock().release(id);
        drop(released);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::event::ElementChange;
    use crate::listener::{ElementListener, ListenerSet};
    use crate::options::{ElementOrdering, RootOptions};
    use crate::root::BaseCollection;
    use crate::validator::ValidatorChain;

    /// A minimal view kind over a vector: views are index windows.
    pub(crate) struct WindowKind;

    #[derive(Debug, Default)]
    pub(crate) struct Numbers {
        pub(crate) items: Vec<i32>,
        validators: ValidatorChain<i32>,
    }

    impl Numbers {
        pub(crate) fn of(items: &[i32]) -> Self {
            Self {
                items: items.to_vec(),
                ..Default::default()
            }
        }
    }

    impl BaseCollection for Numbers {
        type Validators = ValidatorChain<i32>;

        fn validators(&self) -> &Self::Validators {
            &self.validators
        }

        fn validators_mut(&mut self) -> &mut Self::Validators {
            &mut self.validators
        }
    }

    impl DefaultBase for Numbers {
        fn create_default(_: ElementOrdering) -> Self {
            Self::default()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Window {
        Slice { from: usize, to: usize },
        Whole,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Span {
        pub(crate) offset: usize,
        pub(crate) len: usize,
    }

    impl ViewKind for WindowKind {
        type Base = Numbers;
        type Info = Window;
        type Local = Span;
        type Change = ElementChange<i32>;
        type Listeners = ListenerSet<dyn ElementListener<i32>>;
        type Resolved = Vec<Arc<dyn ElementListener<i32>>>;

        fn root_local(base: &Numbers) -> Span {
            Span {
                offset: 0,
                len: base.items.len(),
            }
        }

        fn create_base_view(_: &Numbers, parent: &Span, info: &Window) -> ViewResult<Span> {
            match *info {
                Window::Whole => Ok(*parent),
                Window::Slice { from, to } if from <= to && to <= parent.len => Ok(Span {
                    offset: parent.offset + from,
                    len: to - from,
                }),
                Window::Slice { .. } => Err(ViewError::illegal_view_info(info, "slice out of bounds")),
            }
        }

        fn is_positional(info: &Window) -> bool {
            matches!(info, Window::Slice { .. })
        }

        fn bubble(change: &ElementChange<i32>, _: &Span, _: &Span) -> ElementChange<i32> {
            change.clone()
        }

        fn resolve_listeners(listeners: &Self::Listeners) -> Option<Self::Resolved> {
            (!listeners.is_empty()).then(|| listeners.snapshot())
        }

        fn notify(
            resolved: &Self::Resolved,
            phase: ModificationPhase,
            event: &ModificationEvent<ElementChange<i32>>,
        ) -> ViewResult<()> {
            for listener in resolved {
                match phase {
                    ModificationPhase::Modifying => listener.modifying(event)?,
                    ModificationPhase::Modified => listener.modified(event)?,
                }
            }
            Ok(())
        }

        fn listener_count(listeners: &Self::Listeners) -> usize {
            listeners.len()
        }
    }

    pub(crate) fn tree_of(items: &[i32]) -> ViewTree<WindowKind> {
        ViewTree::new(RootData::with_base(Numbers::of(items), RootOptions::default()))
    }

    #[test]
    fn test_rebasing_is_idempotent() {
        let mut tree = tree_of(&[1, 2, 3, 4, 5]);
        let view = tree.add_view(tree.root(), Window::Slice { from: 1, to: 4 }).unwrap();

        let first = tree.base(view).unwrap();
        let second = tree.base(view).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, Span { offset: 1, len: 3 });
        assert_eq!(tree.derivations(view).unwrap(), 1);
    }

    #[test]
    fn test_replace_invalidates_every_view() {
        let mut tree = tree_of(&[1, 2, 3, 4, 5]);
        let root = tree.root();
        let outer = tree.add_view(root, Window::Slice { from: 1, to: 5 }).unwrap();
        let inner = tree.add_view(outer, Window::Slice { from: 1, to: 2 }).unwrap();
        let before_outer = tree.base(outer).unwrap();
        let before_inner = tree.base(inner).unwrap();

        tree.replace(root, Some(Numbers::of(&[9, 9, 9, 9, 9, 9]))).unwrap();
        assert!(!tree.is_fresh(outer));
        assert!(!tree.is_fresh(inner));

        let after_inner = tree.base(inner).unwrap();
        assert!(!Arc::ptr_eq(&before_inner, &after_inner));
        assert!(!Arc::ptr_eq(&before_outer, &tree.base(outer).unwrap()));
        assert_eq!(*after_inner, Span { offset: 2, len: 1 });
        assert_eq!(tree.derivations(inner).unwrap(), 2);
    }

    #[test]
    fn test_replace_rejected_on_views() {
        let mut tree = tree_of(&[1, 2]);
        let view = tree.add_view(tree.root(), Window::Whole).unwrap();
        let err = tree.replace(view, Some(Numbers::of(&[]))).unwrap_err();
        assert!(matches!(err, ViewError::NotRoot));
        assert_eq!(tree.data().base_if_present().map(|b| b.items.len()), Some(2));
    }

    #[test]
    fn test_illegal_view_info() {
        let mut tree = tree_of(&[1, 2]);
        let count = tree.node_count();
        let err = tree
            .add_view(tree.root(), Window::Slice { from: 1, to: 7 })
            .unwrap_err();
        assert!(matches!(err, ViewError::IllegalViewInfo { .. }));
        assert_eq!(tree.node_count(), count);
    }

    #[test]
    fn test_positional_view_goes_stale() {
        let mut tree = tree_of(&[1, 2, 3, 4]);
        let root = tree.root();
        let on_path = tree.add_view(root, Window::Slice { from: 0, to: 2 }).unwrap();
        let off_path = tree.add_view(root, Window::Slice { from: 2, to: 4 }).unwrap();
        let whole = tree.add_view(root, Window::Whole).unwrap();

        tree.data_mut().base_mut().unwrap().items.insert(0, 0);
        tree.set_view_info(on_path, Window::Slice { from: 0, to: 3 }).unwrap();
        tree.finish_structural_change(&[on_path, root]);

        assert_eq!(*tree.base(on_path).unwrap(), Span { offset: 0, len: 3 });
        assert_eq!(*tree.base(whole).unwrap(), Span { offset: 0, len: 5 });
        assert!(tree.base(off_path).unwrap_err().is_comodification());
    }

    #[test]
    fn test_path_to_root() {
        let mut tree = tree_of(&[1, 2, 3]);
        let root = tree.root();
        let a = tree.add_view(root, Window::Whole).unwrap();
        let b = tree.add_view(a, Window::Slice { from: 0, to: 1 }).unwrap();
        assert_eq!(tree.path_to_root(b).unwrap(), vec![b, a, root]);
        assert_eq!(tree.view_info(root).unwrap(), None);
        assert_eq!(tree.view_info(b).unwrap(), Some(&Window::Slice { from: 0, to: 1 }));
    }

    #[test]
    fn test_cached_views_are_shared() {
        let mut tree = tree_of(&[1]);
        let root = tree.root();
        let first = tree.cached_view(root, Window::Whole).unwrap();
        let second = tree.cached_view(root, Window::Whole).unwrap();
        assert_eq!(first, second);

        // Cached views survive their handles.
        assert!(tree.release(first).is_empty());
        assert!(tree.release(second).is_empty());
        assert!(tree.contains(first));
    }

    #[test]
    fn test_release_collects_unreachable_views() {
        let mut tree = tree_of(&[1, 2, 3]);
        let root = tree.root();
        let outer = tree.add_view(root, Window::Whole).unwrap();
        let inner = tree.add_view(outer, Window::Slice { from: 0, to: 1 }).unwrap();
        let cached = tree.cached_view(outer, Window::Whole).unwrap();
        assert!(tree.release(cached).is_empty());

        // The outer view still has a derived view with a handle.
        assert!(tree.release(outer).is_empty());
        assert!(tree.contains(outer));

        let released = tree.release(inner);
        assert_eq!(released.len(), 3);
        assert!(!tree.contains(outer));
        assert!(!tree.contains(cached));
        assert_eq!(tree.node_count(), 1);
        assert!(tree.children(root).unwrap().is_empty());
    }

    #[test]
    fn test_root_owner_attached() {
        let tree = tree_of(&[]);
        assert_eq!(tree.data().root_owner().unwrap(), tree.root());
    }
}
