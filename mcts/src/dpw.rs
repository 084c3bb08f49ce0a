//! Double-progressive-widening planner for large or continuous state and
//! action spaces.
//!
//! The tree grows under two sublinear budgets. At a state with `N` visits,
//! new actions are admitted only while the child count stays below
//! `ceil(k_action * N^alpha_action)`; proposals come from the `next_action`
//! seam. At an edge with `n` visits, fresh successor samples are drawn only
//! while the distinct-successor count stays below
//! `ceil(k_state * n^alpha_state)`; beyond that the simulation replays one of
//! the previously sampled `(successor, reward)` pairs, drawn uniformly from
//! the sampling sequence so that successors are weighted by observation
//! frequency.

use std::hash::Hash;

use mdp_core::Mdp;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, trace};

use crate::config::{ConfigError, DpwConfig};
use crate::estimator::ValueEstimate;
use crate::knowledge::{InitN, InitQ, NextAction};
use crate::node::{DpwEdge, DpwStateNode, StateId};
use crate::search::SearchError;
use crate::tree::{DpwTree, TreeStats};

/// Child budget after `visits` visits: `ceil(k * visits^alpha)`, with the
/// visit count clamped to one so a first visit always admits at least one
/// child.
fn widen_budget(k: f64, alpha: f64, visits: u32) -> usize {
    (k * f64::from(visits.max(1)).powf(alpha)).ceil() as usize
}

/// Callback invoked at the top of every planning call with the tree and the
/// queried root state.
pub type DpwResetCallback<M> = Box<dyn FnMut(&mut DpwTree<M>, &<M as Mdp>::State)>;

/// The double-progressive-widening planner.
///
/// Requires `Eq + Hash` on actions: action children are keyed by action,
/// both for widening membership checks and for the insertion-ordered edge
/// index.
pub struct DpwPlanner<M: Mdp>
where
    M::Action: Eq + Hash,
{
    config: DpwConfig,
    tree: DpwTree<M>,
    init_n: InitN<M>,
    init_q: InitQ<M>,
    estimator: ValueEstimate<M>,
    next_action: Option<NextAction<M>>,
    reset_callback: Option<DpwResetCallback<M>>,
    rng: ChaCha20Rng,
}

impl<M: Mdp> DpwPlanner<M>
where
    M::Action: Eq + Hash,
{
    /// Create a planner with a seeded RNG. Fails on an invalid
    /// configuration. With `enable_action_pw` a `next_action` seam must be
    /// supplied before the first planning call.
    pub fn new(config: DpwConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            tree: DpwTree::new(),
            init_n: InitN::default(),
            init_q: InitQ::default(),
            estimator: ValueEstimate::default(),
            next_action: None,
            reset_callback: None,
            rng: ChaCha20Rng::seed_from_u64(seed),
        })
    }

    pub fn with_init_n(mut self, seam: InitN<M>) -> Self {
        self.init_n = seam;
        self
    }

    pub fn with_init_q(mut self, seam: InitQ<M>) -> Self {
        self.init_q = seam;
        self
    }

    pub fn with_estimator(mut self, estimator: ValueEstimate<M>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_next_action(mut self, seam: NextAction<M>) -> Self {
        self.next_action = Some(seam);
        self
    }

    pub fn with_reset_callback(mut self, callback: DpwResetCallback<M>) -> Self {
        self.reset_callback = Some(callback);
        self
    }

    pub fn with_rng(mut self, rng: ChaCha20Rng) -> Self {
        self.rng = rng;
        self
    }

    /// Replace the RNG with a freshly seeded one.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
    }

    pub fn config(&self) -> &DpwConfig {
        &self.config
    }

    /// The built tree, for inspection.
    pub fn tree(&self) -> &DpwTree<M> {
        &self.tree
    }

    /// Summary statistics for the subtree rooted at `root`, if present.
    pub fn tree_stats(&self, root: &M::State) -> Option<TreeStats> {
        self.tree.lookup(root).map(|id| self.tree.stats(id))
    }

    /// Drop the whole tree. The next planning call rebuilds from scratch.
    pub fn clear_tree(&mut self) {
        self.tree.clear();
    }

    /// Plan from `state` and return the best root action by accumulated
    /// value, ties broken by insertion order.
    pub fn action(&mut self, mdp: &M, state: &M::State) -> Result<M::Action, SearchError> {
        self.config.validate()?;
        if self.config.enable_action_pw && self.next_action.is_none() {
            return Err(ConfigError::MissingNextAction.into());
        }
        let gamma = mdp.discount();
        if !(0.0..=1.0).contains(&gamma) {
            return Err(SearchError::Discount(gamma));
        }

        if !self.config.keep_tree {
            self.tree.clear();
        }
        if let Some(callback) = self.reset_callback.as_mut() {
            callback(&mut self.tree, state);
        }

        // Root insertion is not counted against the iteration budget; every
        // simulation below starts with a selection step.
        let root = match self.tree.lookup(state) {
            Some(id) => id,
            None => self.insert_node(mdp, state)?,
        };

        for iteration in 0..self.config.n_iterations {
            let value = self.simulate(mdp, state.clone(), self.config.depth)?;
            trace!(
                iteration,
                value,
                tree_nodes = self.tree.len(),
                "simulation complete"
            );
        }

        let node = self.tree.get(root);
        let best = node
            .best_child()
            .ok_or_else(|| SearchError::NoActions(format!("{:?}", state)))?;
        let edge = &node.children[best];
        debug!(action = ?edge.action, n = edge.n, q = edge.q, "planning call resolved");
        Ok(edge.action.clone())
    }

    fn simulate(&mut self, mdp: &M, state: M::State, depth: u32) -> Result<f64, SearchError> {
        if depth == 0 || mdp.is_terminal(&state) {
            return Ok(0.0);
        }

        let id = match self.tree.lookup(&state) {
            Some(id) => id,
            None => {
                self.insert_node(mdp, &state)?;
                let value = self
                    .estimator
                    .estimate(mdp, &state, depth, &mut self.rng)?;
                return Ok(value);
            }
        };

        if self.config.enable_action_pw {
            self.widen_actions(mdp, &state, id)?;
        }

        let edge_idx = self
            .tree
            .select_ucb(id, self.config.exploration_constant)
            .ok_or_else(|| SearchError::NoActions(format!("{:?}", state)))?;
        let action = self.tree.get(id).children[edge_idx].action.clone();

        let (next_state, reward) = self.next_transition(mdp, &state, id, edge_idx, &action)?;

        let value = reward + mdp.discount() * self.simulate(mdp, next_state.clone(), depth - 1)?;

        let node = self.tree.get_mut(id);
        node.total_n += 1;
        node.children[edge_idx].visit(next_state, value);
        Ok(value)
    }

    /// Admit one proposed action if the widening budget allows. Proposing an
    /// action already present adds nothing.
    fn widen_actions(&mut self, mdp: &M, state: &M::State, id: StateId) -> Result<(), SearchError> {
        let node = self.tree.get(id);
        let budget = widen_budget(self.config.k_action, self.config.alpha_action, node.total_n);
        if node.children.len() >= budget {
            return Ok(());
        }

        let seam = self
            .next_action
            .as_mut()
            .ok_or(ConfigError::MissingNextAction)?;
        let proposed = seam.propose(mdp, state, node, &mut self.rng)?;

        if self.tree.get(id).has_action(&proposed) {
            return Ok(());
        }
        let n0 = self.init_n.eval(mdp, state, &proposed)?;
        let q0 = self.init_q.eval(mdp, state, &proposed)?;
        self.tree
            .get_mut(id)
            .push_edge(DpwEdge::new(proposed, n0, q0));
        Ok(())
    }

    /// Sample a fresh successor while the state-widening budget allows,
    /// otherwise replay a recorded transition, frequency-weighted.
    fn next_transition(
        &mut self,
        mdp: &M,
        state: &M::State,
        id: StateId,
        edge_idx: usize,
        action: &M::Action,
    ) -> Result<(M::State, f64), SearchError> {
        let (visits, distinct, recorded) = {
            let edge = &self.tree.get(id).children[edge_idx];
            (edge.n, edge.n_a_children(), edge.transitions.len())
        };

        let budget = widen_budget(self.config.k_state, self.config.alpha_state, visits);
        if distinct < budget {
            let (next, reward) = mdp.step(state, action, &mut self.rng);
            if !reward.is_finite() {
                return Err(SearchError::NonFiniteReward(reward));
            }
            self.tree.get_mut(id).children[edge_idx].record_transition(next.clone(), reward);
            Ok((next, reward))
        } else {
            let i = self.rng.gen_range(0..recorded);
            Ok(self.tree.get(id).children[edge_idx].transitions[i].clone())
        }
    }

    /// Insert a freshly initialized node for `state`. With action widening
    /// the node starts empty; otherwise it gets one edge per legal action.
    fn insert_node(&mut self, mdp: &M, state: &M::State) -> Result<StateId, SearchError> {
        let mut node = DpwStateNode::new();

        if !self.config.enable_action_pw {
            let actions = mdp.actions(state);
            if actions.is_empty() {
                return Err(SearchError::NoActions(format!("{:?}", state)));
            }
            for action in actions {
                let n0 = self.init_n.eval(mdp, state, &action)?;
                let q0 = self.init_q.eval(mdp, state, &action)?;
                node.push_edge(DpwEdge::new(action, n0, q0));
            }
        }

        Ok(self.tree.insert(state.clone(), node))
    }
}
