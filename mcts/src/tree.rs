//! Search tree storage with arena allocation.
//!
//! Both variants keep their state nodes in a contiguous `Vec` and resolve
//! states through a `state -> StateId` index, which keeps the hot selection
//! path free of pointer chasing. The tree is owned by its planner and
//! mutated only by the search driver; [`clear`](VanillaTree::clear) is the
//! only releasing operation.

use std::collections::HashMap;
use std::hash::Hash;

use mdp_core::Mdp;

use crate::node::{DpwStateNode, StateId, StateNode};

/// UCB child selection over `(n, q)` statistics.
///
/// A child with `n = 0` wins outright (lowest index among them); otherwise
/// the index maximizing `q + c * sqrt(ln(total_n) / n)` wins, ties to the
/// lowest index. With `c = 0` the score reduces to `q` alone.
fn ucb_best(total_n: u32, stats: impl Iterator<Item = (u32, f64)>, c: f64) -> Option<usize> {
    let ln_total = f64::from(total_n.max(1)).ln();
    let mut unvisited: Option<usize> = None;
    let mut best: Option<(usize, f64)> = None;

    for (i, (n, q)) in stats.enumerate() {
        if n == 0 {
            if unvisited.is_none() {
                unvisited = Some(i);
            }
            continue;
        }
        let score = if c == 0.0 {
            q
        } else {
            q + c * (ln_total / f64::from(n)).sqrt()
        };
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }

    unvisited.or_else(|| best.map(|(i, _)| i))
}

/// Summary statistics over a built tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    /// State nodes in the arena.
    pub total_nodes: usize,
    /// Visits recorded at the root, phantom visits included.
    pub root_visits: u32,
    /// Best root child value; the value backing the recommendation.
    pub root_value: f64,
}

/// Tree store for the vanilla planner.
pub struct VanillaTree<M: Mdp> {
    nodes: Vec<StateNode<M>>,
    index: HashMap<M::State, StateId>,
}

impl<M: Mdp> VanillaTree<M> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node and index entry. The next planning call rebuilds
    /// from scratch.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
    }

    #[inline]
    pub fn lookup(&self, state: &M::State) -> Option<StateId> {
        self.index.get(state).copied()
    }

    pub fn insert(&mut self, state: M::State, node: StateNode<M>) -> StateId {
        let id = StateId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.index.insert(state, id);
        id
    }

    #[inline]
    pub fn get(&self, id: StateId) -> &StateNode<M> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: StateId) -> &mut StateNode<M> {
        &mut self.nodes[id.index()]
    }

    /// The arena slice for read access.
    #[inline]
    pub fn arena(&self) -> &[StateNode<M>] {
        &self.nodes
    }

    /// Select a child index by UCB. `None` only for a node without children.
    pub fn select_ucb(&self, id: StateId, c: f64) -> Option<usize> {
        let node = self.get(id);
        ucb_best(node.total_n, node.children.iter().map(|e| (e.n, e.q)), c)
    }

    pub fn stats(&self, root: StateId) -> TreeStats {
        let node = self.get(root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: node.total_n,
            root_value: node.best_child().map_or(0.0, |i| node.children[i].q),
        }
    }
}

impl<M: Mdp> Default for VanillaTree<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tree store for the double-progressive-widening planner.
pub struct DpwTree<M: Mdp>
where
    M::Action: Eq + Hash,
{
    nodes: Vec<DpwStateNode<M>>,
    index: HashMap<M::State, StateId>,
}

impl<M: Mdp> DpwTree<M>
where
    M::Action: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
    }

    #[inline]
    pub fn lookup(&self, state: &M::State) -> Option<StateId> {
        self.index.get(state).copied()
    }

    pub fn insert(&mut self, state: M::State, node: DpwStateNode<M>) -> StateId {
        let id = StateId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.index.insert(state, id);
        id
    }

    #[inline]
    pub fn get(&self, id: StateId) -> &DpwStateNode<M> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: StateId) -> &mut DpwStateNode<M> {
        &mut self.nodes[id.index()]
    }

    /// The arena slice for read access.
    #[inline]
    pub fn arena(&self) -> &[DpwStateNode<M>] {
        &self.nodes
    }

    /// Select an edge index by UCB over the current action children.
    pub fn select_ucb(&self, id: StateId, c: f64) -> Option<usize> {
        let node = self.get(id);
        ucb_best(node.total_n, node.children.iter().map(|e| (e.n, e.q)), c)
    }

    pub fn stats(&self, root: StateId) -> TreeStats {
        let node = self.get(root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: node.total_n,
            root_value: node.best_child().map_or(0.0, |i| node.children[i].q),
        }
    }
}

impl<M: Mdp> Default for DpwTree<M>
where
    M::Action: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
