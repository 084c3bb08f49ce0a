//! Node types stored in the search tree arenas.
//!
//! State nodes live in a dense `Vec` and are referenced by [`StateId`]
//! indices; state-action statistics live inline in their parent node. The
//! vanilla variant carries a fixed child per legal action, the widening
//! variant grows its children one edge at a time and keeps the observed
//! successor multiset on each edge.

use std::collections::HashMap;
use std::hash::Hash;

use mdp_core::Mdp;

/// Index into a tree's node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(pub u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fold one backed-up return into a running mean over real backups.
///
/// The first backup overwrites the initialization value outright; phantom
/// visits from `init_N` never contribute returns.
#[inline]
fn fold_backup(q: &mut f64, backups: &mut u32, sample: f64) {
    *backups += 1;
    if *backups == 1 {
        *q = sample;
    } else {
        *q += (sample - *q) / f64::from(*backups);
    }
}

/// A state node of the vanilla tree: one child per legal action, created
/// together with the node and fixed for its lifetime.
pub struct StateNode<M: Mdp> {
    /// Sum of child visit counts, including `init_N` phantom visits.
    pub total_n: u32,
    /// State-action children in action-enumeration order.
    pub children: Vec<StateActionNode<M>>,
}

impl<M: Mdp> StateNode<M> {
    pub fn new(children: Vec<StateActionNode<M>>) -> Self {
        let total_n = children.iter().map(|c| c.n).sum();
        Self { total_n, children }
    }

    /// Index of the best child by accumulated `q`, ties to the lowest index.
    pub fn best_child(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, child) in self.children.iter().enumerate() {
            if best.map_or(true, |(_, q)| child.q > q) {
                best = Some((i, child.q));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Per-child `(action, n, q)` statistics for inspection.
    pub fn child_stats(&self) -> impl Iterator<Item = (&M::Action, u32, f64)> {
        self.children.iter().map(|c| (&c.action, c.n, c.q))
    }
}

/// Visit and value statistics for one `(state, action)` edge.
pub struct StateActionNode<M: Mdp> {
    /// The action this edge represents. Immutable after construction.
    pub action: M::Action,
    /// Visit count, seeded with `init_N`.
    pub n: u32,
    /// Running mean of backed-up discounted returns, seeded with `init_Q`.
    pub q: f64,
    /// Real backups folded into `q`.
    pub(crate) backups: u32,
    /// Successor nodes observed through this edge. Populated only when the
    /// planner is configured to retain edges for inspection.
    pub successors: Vec<StateId>,
}

impl<M: Mdp> StateActionNode<M> {
    pub fn new(action: M::Action, init_n: u32, init_q: f64) -> Self {
        Self {
            action,
            n: init_n,
            q: init_q,
            backups: 0,
            successors: Vec::new(),
        }
    }

    /// Back one sampled return up through this edge.
    pub fn record(&mut self, sample: f64) {
        self.n += 1;
        fold_backup(&mut self.q, &mut self.backups, sample);
    }
}

/// A state node of the widening tree. Action children are inserted one at a
/// time by the widening rule (or all at once when action widening is off).
/// The edge vector keeps insertion order for tie-breaking; the index map
/// keys each action to its slot in that vector.
pub struct DpwStateNode<M: Mdp>
where
    M::Action: Eq + Hash,
{
    /// Sum of edge visit counts, including `init_N` phantom visits.
    pub total_n: u32,
    /// Action edges in insertion order.
    pub children: Vec<DpwEdge<M>>,
    action_index: HashMap<M::Action, usize>,
}

impl<M: Mdp> DpwStateNode<M>
where
    M::Action: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            total_n: 0,
            children: Vec::new(),
            action_index: HashMap::new(),
        }
    }

    pub fn has_action(&self, action: &M::Action) -> bool {
        self.action_index.contains_key(action)
    }

    /// The edge for `action`, if one has been admitted.
    pub fn edge(&self, action: &M::Action) -> Option<&DpwEdge<M>> {
        self.action_index.get(action).map(|&i| &self.children[i])
    }

    /// Append a freshly initialized edge and index it by its action. The
    /// edge's `init_N` joins `total_n` so the node invariant
    /// `total_n = Σ n(child)` holds from birth.
    pub fn push_edge(&mut self, edge: DpwEdge<M>) {
        self.total_n += edge.n;
        self.action_index
            .insert(edge.action.clone(), self.children.len());
        self.children.push(edge);
    }

    /// Index of the best edge by accumulated `q`, ties to insertion order.
    pub fn best_child(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, edge) in self.children.iter().enumerate() {
            if best.map_or(true, |(_, q)| edge.q > q) {
                best = Some((i, edge.q));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Per-edge `(action, n, q)` statistics for inspection.
    pub fn child_stats(&self) -> impl Iterator<Item = (&M::Action, u32, f64)> {
        self.children.iter().map(|e| (&e.action, e.n, e.q))
    }
}

impl<M: Mdp> Default for DpwStateNode<M>
where
    M::Action: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A widening state-action edge with its observed successor multiset.
pub struct DpwEdge<M: Mdp> {
    pub action: M::Action,
    /// Visit count, seeded with `init_N`.
    pub n: u32,
    /// Running mean of backed-up discounted returns, seeded with `init_Q`.
    pub q: f64,
    pub(crate) backups: u32,
    /// Sampled `(successor, reward)` pairs in sampling order. Reuse draws
    /// uniformly from this sequence, which weights each successor by how
    /// often it was generated.
    pub transitions: Vec<(M::State, f64)>,
    /// Traversal count per distinct successor. Sums to `n` after backup.
    successor_counts: HashMap<M::State, u32>,
}

impl<M: Mdp> DpwEdge<M> {
    pub fn new(action: M::Action, init_n: u32, init_q: f64) -> Self {
        Self {
            action,
            n: init_n,
            q: init_q,
            backups: 0,
            transitions: Vec::new(),
            successor_counts: HashMap::new(),
        }
    }

    /// Number of distinct successor states observed under this edge.
    pub fn n_a_children(&self) -> usize {
        self.successor_counts.len()
    }

    /// Traversals committed through `successor`.
    pub fn successor_count(&self, successor: &M::State) -> u32 {
        self.successor_counts.get(successor).copied().unwrap_or(0)
    }

    /// Record a freshly generated transition sample. The successor becomes
    /// a distinct child immediately; its traversal count is committed by
    /// [`DpwEdge::visit`] once the simulation below it succeeds.
    pub fn record_transition(&mut self, successor: M::State, reward: f64) {
        self.successor_counts.entry(successor.clone()).or_insert(0);
        self.transitions.push((successor, reward));
    }

    /// Back one sampled return up through this edge, committing the
    /// traversal of `successor`.
    pub fn visit(&mut self, successor: M::State, sample: f64) {
        self.n += 1;
        *self.successor_counts.entry(successor).or_insert(0) += 1;
        fold_backup(&mut self.q, &mut self.backups, sample);
    }
}
