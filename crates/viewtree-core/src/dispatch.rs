//! The two-phase modification protocol.
//!
//! Every mutating call goes through [`execute_modification`]:
//!
//! 1. **Pre-phase.** For each planned event, starting at the node where the
//!    mutation happens: the node's `on_modifying` hook, then its listeners,
//!    then the event is remapped and re-raised on the parent, recursively.
//! 2. **Mutation.** The structural change is applied to the base.
//! 3. **Post-phase.** In reverse: the parent first (recursively), then the
//!    node's listeners, then its `on_modified` hook.
//!
//! Within a phase every stage runs even if an earlier one failed. The first
//! failure is kept and returned once the phase completes, wrapped as a
//! [`ViewError::Modification`] carrying the phase and stage. A failing
//! pre-phase does not prevent the mutation: the call still completes and
//! then reports the error.
//!
//! Listeners resolved in the pre-phase are kept on the dispatch frame and
//! reused in the post-phase of the same event, so both phases reach the same
//! listeners even if registrations change in between.
//!
//! The tree lock is never held while hooks or listeners run. They may read
//! the collection; a listener that modifies it makes the pending mutation
//! fail with [`ViewError::Comodification`].

use std::sync::Arc;

use crate::error::{DispatchStage, ModificationPhase, ViewError, ViewResult};
use crate::event::ModificationEvent;
use crate::logging::targets;
use crate::node::{NodeId, SharedViewTree, ViewKind, ViewTree};

/// Per-node hooks taking part in the modification protocol.
///
/// `on_modifying` and `on_modified` are the first and last stage of the
/// respective phase on their node. `on_load_base` and `on_unload_base` are
/// called when the node's cached local base is swapped; they run with the
/// tree locked and must not access collection handles.
pub trait NodeHooks<K: ViewKind>: Send + Sync {
    /// First stage of the pre-phase on this node.
    fn on_modifying(&self, event: &ModificationEvent<K::Change>) -> ViewResult<()> {
        let _ = event;
        Ok(())
    }

    /// Last stage of the post-phase on this node.
    fn on_modified(&self, event: &ModificationEvent<K::Change>) -> ViewResult<()> {
        let _ = event;
        Ok(())
    }

    /// A freshly derived local base was installed.
    fn on_load_base(&self, node: NodeId, local: &K::Local) {
        let _ = (node, local);
    }

    /// A stale local base is being discarded.
    fn on_unload_base(&self, node: NodeId, local: &K::Local) {
        let _ = (node, local);
    }
}

/// Runs every stage of a phase and remembers the first failure.
///
/// ```
/// use viewtree_core::dispatch::PhaseRunner;
/// use viewtree_core::{DispatchStage, ModificationPhase, ViewError};
///
/// let mut ran = Vec::new();
/// let mut runner = PhaseRunner::new(ModificationPhase::Modifying);
/// runner.run(DispatchStage::Hook, || Err(ViewError::Disabled));
/// runner.run(DispatchStage::Listeners, || {
///     ran.push("listeners");
///     Ok(())
/// });
///
/// let err = runner.finish().unwrap_err();
/// assert_eq!(ran, vec!["listeners"]);
/// assert_eq!(err.phase(), Some(ModificationPhase::Modifying));
/// ```
#[derive(Debug)]
pub struct PhaseRunner {
    phase: ModificationPhase,
    failure: Option<(DispatchStage, ViewError)>,
}

impl PhaseRunner {
    /// Start a phase.
    pub fn new(phase: ModificationPhase) -> Self {
        Self {
            phase,
            failure: None,
        }
    }

    /// Run one stage.
    pub fn run(&mut self, stage: DispatchStage, step: impl FnOnce() -> ViewResult<()>) {
        if let Err(err) = step() {
            tracing::debug!(target: targets::DISPATCH, phase = %self.phase, %stage, error = %err, "stage failed");
            if self.failure.is_none() {
                self.failure = Some((stage, err));
            }
        }
    }

    /// Finish the phase, returning the first failure.
    pub fn finish(self) -> ViewResult<()> {
        match self.failure {
            Some((stage, err)) => Err(ViewError::modification(self.phase, stage, err)),
            None => Ok(()),
        }
    }
}

struct Frame<K: ViewKind> {
    node: NodeId,
    event: Arc<ModificationEvent<K::Change>>,
    hooks: Option<Arc<dyn NodeHooks<K>>>,
    resolved: Option<K::Resolved>,
}

/// The nodes one event travels through, from its origin to the root.
struct DispatchChain<K: ViewKind> {
    frames: Vec<Frame<K>>,
}

impl<K: ViewKind> DispatchChain<K> {
    fn new(tree: &SharedViewTree<K>, origin: NodeId, change: K::Change) -> ViewResult<Self> {
        let hooks = tree.with_tree(|t| t.hooks(origin))?;
        Ok(Self {
            frames: vec![Frame {
                node: origin,
                event: Arc::new(ModificationEvent::new(origin, change)),
                hooks,
                resolved: None,
            }],
        })
    }

    fn execute_modifying(&mut self, tree: &SharedViewTree<K>, depth: usize) -> ViewResult<()> {
        let mut runner = PhaseRunner::new(ModificationPhase::Modifying);
        let node = self.frames[depth].node;
        let event = Arc::clone(&self.frames[depth].event);

        runner.run(DispatchStage::Hook, || match &self.frames[depth].hooks {
            Some(hooks) => hooks.on_modifying(&event),
            None => Ok(()),
        });
        runner.run(DispatchStage::Listeners, || {
            let resolved = tree.with_tree(|t| t.listeners(node).map(K::resolve_listeners))?;
            let frame = &mut self.frames[depth];
            frame.resolved = resolved;
            match &frame.resolved {
                Some(resolved) => K::notify(resolved, ModificationPhase::Modifying, &event),
                None => Ok(()),
            }
        });
        runner.run(DispatchStage::Bubble, || {
            if self.push_parent(tree, depth)? {
                self.execute_modifying(tree, depth + 1)
            } else {
                Ok(())
            }
        });
        runner.finish()
    }

    fn execute_modified(&self, depth: usize) -> ViewResult<()> {
        let mut runner = PhaseRunner::new(ModificationPhase::Modified);
        let frame = &self.frames[depth];

        runner.run(DispatchStage::Bubble, || {
            if depth + 1 < self.frames.len() {
                self.execute_modified(depth + 1)
            } else {
                Ok(())
            }
        });
        runner.run(DispatchStage::Listeners, || match &frame.resolved {
            Some(resolved) => K::notify(resolved, ModificationPhase::Modified, &frame.event),
            None => Ok(()),
        });
        runner.run(DispatchStage::Hook, || match &frame.hooks {
            Some(hooks) => hooks.on_modified(&frame.event),
            None => Ok(()),
        });
        runner.finish()
    }

    /// Build the frame of the parent of `depth`, if there is one.
    fn push_parent(&mut self, tree: &SharedViewTree<K>, depth: usize) -> ViewResult<bool> {
        let child = self.frames[depth].node;
        let cause = Arc::clone(&self.frames[depth].event);
        let parent_frame = tree.with_tree(|t| -> ViewResult<Option<Frame<K>>> {
            let Some(parent) = t.parent(child)? else {
                return Ok(None);
            };
            let child_local = t.base(child)?;
            let parent_local = t.base(parent)?;
            let change = K::bubble(cause.change(), &child_local, &parent_local);
            Ok(Some(Frame {
                node: parent,
                event: Arc::new(ModificationEvent::bubbled(parent, change, cause)),
                hooks: t.hooks(parent)?,
                resolved: None,
            }))
        })?;

        match parent_frame {
            Some(frame) => {
                self.frames.truncate(depth + 1);
                self.frames.push(frame);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// The events a mutating call will raise, planned before it runs.
#[derive(Debug)]
pub struct ModificationPlan<C> {
    expected_mod_count: u64,
    events: Vec<(NodeId, C)>,
}

impl<C> ModificationPlan<C> {
    /// Start a plan against the current modification count.
    pub fn new(expected_mod_count: u64) -> Self {
        Self {
            expected_mod_count,
            events: Vec::new(),
        }
    }

    /// Add an event raised on `origin`.
    pub fn push(&mut self, origin: NodeId, change: C) {
        self.events.push((origin, change));
    }

    /// Number of planned events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the call raises no events (and changes nothing).
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The planned events in order.
    pub fn events(&self) -> &[(NodeId, C)] {
        &self.events
    }
}

fn check_unchanged<K: ViewKind>(tree: &ViewTree<K>, expected: u64) -> ViewResult<()> {
    if tree.data().mod_count() == expected {
        Ok(())
    } else {
        Err(ViewError::Comodification(
            "the collection was modified while modification events were dispatched",
        ))
    }
}

/// Run a mutation under the two-phase protocol.
///
/// `apply` performs the structural change with the tree locked. It runs after
/// every pre-phase has completed, even if one of them failed. If the tree was
/// modified in the meantime (by a listener), `apply` is not run and the call
/// fails with [`ViewError::Comodification`].
///
/// When the root is not dispatchable, no events are raised and only `apply`
/// runs.
pub fn execute_modification<K, R>(
    tree: &SharedViewTree<K>,
    plan: ModificationPlan<K::Change>,
    apply: impl FnOnce(&mut ViewTree<K>) -> ViewResult<R>,
) -> ViewResult<R>
where
    K: ViewKind,
{
    let expected = plan.expected_mod_count;
    let dispatchable = tree.with_tree(|t| t.data().is_dispatchable());
    if !dispatchable {
        return tree.with_tree(|t| {
            check_unchanged(t, expected)?;
            apply(t)
        });
    }

    tracing::trace!(target: targets::DISPATCH, events = plan.len(), "dispatching modification");
    let mut first_error: Option<ViewError> = None;
    let mut chains = Vec::with_capacity(plan.events.len());
    for (origin, change) in plan.events {
        let mut chain = DispatchChain::new(tree, origin, change)?;
        if let Err(err) = chain.execute_modifying(tree, 0) {
            first_error.get_or_insert(err);
        }
        chains.push(chain);
    }

    let value = tree.with_tree(|t| {
        check_unchanged(t, expected)?;
        apply(t)
    })?;

    for chain in &chains {
        if let Err(err) = chain.execute_modified(0) {
            first_error.get_or_insert(err);
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(value),
    }
}
