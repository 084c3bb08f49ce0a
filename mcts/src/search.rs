//! Vanilla UCT planner for finite, enumerable action spaces.
//!
//! Each planning call runs a budget of simulations from the queried root
//! state. A simulation walks the tree by UCB selection, samples one
//! transition per step from the generative model, and backs the discounted
//! return up the traversed path. A state seen for the first time gets a node
//! with one child per legal action and is evaluated by the leaf estimator
//! instead of being expanded further.

use mdp_core::Mdp;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{ConfigError, MctsConfig};
use crate::estimator::{EstimatorError, ValueEstimate};
use crate::knowledge::{InitN, InitQ, KnowledgeError};
use crate::node::{StateActionNode, StateId, StateNode};
use crate::tree::{TreeStats, VanillaTree};

/// Errors that abort a planning call.
///
/// The retained tree stays valid: backups commit per simulation on the
/// successful unwind, so a failing simulation contributes no partial
/// statistics above its failure point.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("model reported no actions at non-terminal state {0}")]
    NoActions(String),

    #[error("generative model returned non-finite reward {0}")]
    NonFiniteReward(f64),

    #[error("discount factor must lie in [0, 1], got {0}")]
    Discount(f64),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    Estimator(#[from] EstimatorError),
}

/// Callback invoked at the top of every planning call with the tree and the
/// queried root state.
pub type ResetCallback<M> =
    Box<dyn FnMut(&mut VanillaTree<M>, &<M as Mdp>::State)>;

/// The vanilla planner: owns the tree, the seams, and the RNG.
pub struct MctsPlanner<M: Mdp> {
    config: MctsConfig,
    tree: VanillaTree<M>,
    init_n: InitN<M>,
    init_q: InitQ<M>,
    estimator: ValueEstimate<M>,
    reset_callback: Option<ResetCallback<M>>,
    rng: ChaCha20Rng,
}

impl<M: Mdp> MctsPlanner<M> {
    /// Create a planner with a seeded RNG. Fails on an invalid
    /// configuration.
    pub fn new(config: MctsConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            tree: VanillaTree::new(),
            init_n: InitN::default(),
            init_q: InitQ::default(),
            estimator: ValueEstimate::default(),
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

    pub fn with_reset_callback(mut self, callback: ResetCallback<M>) -> Self {
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

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// The built tree, for inspection.
    pub fn tree(&self) -> &VanillaTree<M> {
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
    /// value, ties broken by action-enumeration order.
    pub fn action(&mut self, mdp: &M, state: &M::State) -> Result<M::Action, SearchError> {
        self.config.validate()?;
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
        let child = &node.children[best];
        debug!(action = ?child.action, n = child.n, q = child.q, "planning call resolved");
        Ok(child.action.clone())
    }

    /// One simulation step at `(state, depth)`; returns the discounted
    /// return from here, which the caller folds into its own backup.
    fn simulate(&mut self, mdp: &M, state: M::State, depth: u32) -> Result<f64, SearchError> {
        if depth == 0 || mdp.is_terminal(&state) {
            return Ok(0.0);
        }

        let id = match self.tree.lookup(&state) {
            Some(id) => id,
            None => {
                // Leaf: insert the node, estimate the remaining value, and
                // stop. The estimate already accounts for the future return.
                self.insert_node(mdp, &state)?;
                let value = self
                    .estimator
                    .estimate(mdp, &state, depth, &mut self.rng)?;
                return Ok(value);
            }
        };

        let child_idx = self
            .tree
            .select_ucb(id, self.config.exploration_constant)
            .ok_or_else(|| SearchError::NoActions(format!("{:?}", state)))?;
        let action = self.tree.get(id).children[child_idx].action.clone();

        let (next_state, reward) = mdp.step(&state, &action, &mut self.rng);
        if !reward.is_finite() {
            return Err(SearchError::NonFiniteReward(reward));
        }

        let value = reward + mdp.discount() * self.simulate(mdp, next_state.clone(), depth - 1)?;

        if self.config.enable_tree_vis {
            if let Some(successor) = self.tree.lookup(&next_state) {
                let edge = &mut self.tree.get_mut(id).children[child_idx];
                if !edge.successors.contains(&successor) {
                    edge.successors.push(successor);
                }
            }
        }

        let node = self.tree.get_mut(id);
        node.total_n += 1;
        node.children[child_idx].record(value);
        Ok(value)
    }

    /// Insert a freshly initialized node for `state`: one child per legal
    /// action, seeded through the `init_N`/`init_Q` seams.
    fn insert_node(&mut self, mdp: &M, state: &M::State) -> Result<StateId, SearchError> {
        let actions = mdp.actions(state);
        if actions.is_empty() {
            return Err(SearchError::NoActions(format!("{:?}", state)));
        }

        let mut children = Vec::with_capacity(actions.len());
        for action in actions {
            let n0 = self.init_n.eval(mdp, state, &action)?;
            let q0 = self.init_q.eval(mdp, state, &action)?;
            children.push(StateActionNode::new(action, n0, q0));
        }

        Ok(self.tree.insert(state.clone(), StateNode::new(children)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic two-state MDP. Action 1 pays 1.0 and flips the state;
    /// action 0 pays 0.1 and stays.
    struct Flip;

    impl Mdp for Flip {
        type State = bool;
        type Action = u8;

        fn actions(&self, _s: &bool) -> Vec<u8> {
            vec![0, 1]
        }

        fn step(&self, s: &bool, a: &u8, _rng: &mut ChaCha20Rng) -> (bool, f64) {
            if *a == 1 {
                (!*s, 1.0)
            } else {
                (*s, 0.1)
            }
        }

        fn discount(&self) -> f64 {
            0.9
        }

        fn is_terminal(&self, _s: &bool) -> bool {
            false
        }
    }

    /// States strictly increase along a trajectory, so a given state node is
    /// backed up at most once per simulation. That makes visit counts exact.
    struct Counter;

    impl Mdp for Counter {
        type State = u32;
        type Action = u32;

        fn actions(&self, _s: &u32) -> Vec<u32> {
            vec![1, 2]
        }

        fn step(&self, s: &u32, a: &u32, _rng: &mut ChaCha20Rng) -> (u32, f64) {
            (s + a, f64::from(*a))
        }

        fn discount(&self) -> f64 {
            0.9
        }

        fn is_terminal(&self, _s: &u32) -> bool {
            false
        }
    }

    fn assert_visit_invariant<M: Mdp>(tree: &VanillaTree<M>) {
        for node in tree.arena() {
            let n_sum: u32 = node.children.iter().map(|c| c.n).sum();
            assert_eq!(node.total_n, n_sum);
        }
    }

    #[test]
    fn plan_builds_a_tree_and_returns_a_legal_action() {
        let mut planner = MctsPlanner::new(MctsConfig::for_testing(), 42).unwrap();
        let action = planner.action(&Counter, &0).unwrap();

        assert!(action == 1 || action == 2);
        assert!(planner.tree().len() >= 1);
        assert_visit_invariant(planner.tree());

        let stats = planner.tree_stats(&0).unwrap();
        assert_eq!(stats.root_visits, 16);
    }

    #[test]
    fn greedy_planner_finds_the_better_action() {
        let config = MctsConfig::default()
            .with_iterations(64)
            .with_depth(4)
            .with_exploration(0.0);
        let mut planner = MctsPlanner::new(config, 1).unwrap();

        // With zero exploration and a deterministic model, the recommended
        // action is the one with the better observed return.
        assert_eq!(planner.action(&Flip, &false).unwrap(), 1);
    }

    #[test]
    fn zero_discount_backs_up_immediate_rewards() {
        /// Rewards depend only on the action taken, discount is zero.
        struct Myopic;

        impl Mdp for Myopic {
            type State = u8;
            type Action = u8;

            fn actions(&self, _s: &u8) -> Vec<u8> {
                vec![0, 1]
            }

            fn step(&self, s: &u8, a: &u8, _rng: &mut ChaCha20Rng) -> (u8, f64) {
                (s.wrapping_add(*a), f64::from(*a) * 3.0)
            }

            fn discount(&self) -> f64 {
                0.0
            }

            fn is_terminal(&self, _s: &u8) -> bool {
                false
            }
        }

        let config = MctsConfig::default().with_iterations(32).with_depth(6);
        let mut planner = MctsPlanner::new(config, 5).unwrap();
        planner.action(&Myopic, &0).unwrap();

        let tree = planner.tree();
        let root = tree.lookup(&0).unwrap();
        for child in &tree.get(root).children {
            if child.n > 0 {
                // Backed-up value equals the mean immediate reward, which is
                // constant per action here.
                assert!((child.q - f64::from(child.action) * 3.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn unvisited_edges_keep_their_initialization() {
        let config = MctsConfig::default().with_iterations(1).with_depth(3);
        let mut planner = MctsPlanner::new(config, 0)
            .unwrap()
            .with_init_q(InitQ::Constant(5.5));
        planner.action(&Flip, &false).unwrap();

        let tree = planner.tree();
        let root = tree.lookup(&false).unwrap();
        let visited: Vec<_> = tree.get(root).children.iter().filter(|c| c.n > 0).collect();
        let untouched: Vec<_> = tree.get(root).children.iter().filter(|c| c.n == 0).collect();

        assert_eq!(visited.len(), 1);
        assert_eq!(untouched.len(), 1);
        assert_eq!(untouched[0].q, 5.5);
    }

    #[test]
    fn same_seed_same_tree_and_action() {
        let run = || {
            let mut planner = MctsPlanner::new(MctsConfig::for_testing(), 99).unwrap();
            let action = planner.action(&Flip, &false).unwrap();
            let root = planner.tree().lookup(&false).unwrap();
            let stats: Vec<(u8, u32, f64)> = planner
                .tree()
                .get(root)
                .child_stats()
                .map(|(a, n, q)| (*a, n, q))
                .collect();
            (action, planner.tree().len(), stats)
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn keep_tree_accumulates_across_calls() {
        let config = MctsConfig::for_testing().with_keep_tree(true);
        let mut planner = MctsPlanner::new(config, 3).unwrap();

        planner.action(&Counter, &0).unwrap();
        let first = planner.tree_stats(&0).unwrap().root_visits;
        planner.action(&Counter, &0).unwrap();
        let second = planner.tree_stats(&0).unwrap().root_visits;

        assert_eq!(first, 16);
        assert_eq!(second, 32);
    }

    #[test]
    fn fresh_tree_per_call_by_default() {
        let mut planner = MctsPlanner::new(MctsConfig::for_testing(), 3).unwrap();

        planner.action(&Counter, &0).unwrap();
        planner.action(&Counter, &0).unwrap();
        assert_eq!(planner.tree_stats(&0).unwrap().root_visits, 16);
    }

    #[test]
    fn reset_callback_runs_each_call() {
        use std::cell::Cell;
        use std::rc::Rc;

        let calls = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&calls);
        let mut planner = MctsPlanner::new(MctsConfig::for_testing(), 3)
            .unwrap()
            .with_reset_callback(Box::new(move |_tree, _state| {
                seen.set(seen.get() + 1);
            }));

        planner.action(&Flip, &false).unwrap();
        planner.action(&Flip, &true).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn invalid_discount_rejected() {
        struct BadGamma;

        impl Mdp for BadGamma {
            type State = u8;
            type Action = u8;

            fn actions(&self, _s: &u8) -> Vec<u8> {
                vec![0]
            }

            fn step(&self, s: &u8, _a: &u8, _rng: &mut ChaCha20Rng) -> (u8, f64) {
                (*s, 0.0)
            }

            fn discount(&self) -> f64 {
                1.5
            }

            fn is_terminal(&self, _s: &u8) -> bool {
                false
            }
        }

        let mut planner = MctsPlanner::new(MctsConfig::for_testing(), 0).unwrap();
        assert!(matches!(
            planner.action(&BadGamma, &0),
            Err(SearchError::Discount(g)) if g == 1.5
        ));
    }

    #[test]
    fn empty_action_set_rejected() {
        struct NoMoves;

        impl Mdp for NoMoves {
            type State = u8;
            type Action = u8;

            fn actions(&self, _s: &u8) -> Vec<u8> {
                Vec::new()
            }

            fn step(&self, s: &u8, _a: &u8, _rng: &mut ChaCha20Rng) -> (u8, f64) {
                (*s, 0.0)
            }

            fn discount(&self) -> f64 {
                1.0
            }

            fn is_terminal(&self, _s: &u8) -> bool {
                false
            }
        }

        let mut planner = MctsPlanner::new(MctsConfig::for_testing(), 0).unwrap();
        assert!(matches!(
            planner.action(&NoMoves, &0),
            Err(SearchError::NoActions(_))
        ));
    }

    #[test]
    fn tree_vis_records_successor_edges() {
        let config = MctsConfig::for_testing().with_tree_vis(true);
        let mut planner = MctsPlanner::new(config, 11).unwrap();
        planner.action(&Flip, &false).unwrap();

        let tree = planner.tree();
        let root = tree.lookup(&false).unwrap();
        let recorded: usize = tree
            .get(root)
            .children
            .iter()
            .map(|c| c.successors.len())
            .sum();
        assert!(recorded > 0);
    }
}
