//! Online Monte Carlo Tree Search planners for generative MDP models.
//!
//! This crate provides two interchangeable planners over any model
//! implementing the `mdp-core` [`Mdp`](mdp_core::Mdp) trait:
//!
//! - [`MctsPlanner`]: vanilla UCT for finite, enumerable action spaces.
//!   Every state node carries one child per legal action; selection follows
//!   the UCB rule `q + c * sqrt(ln(N) / n)`.
//! - [`DpwPlanner`]: double progressive widening for large or continuous
//!   spaces. Action children and distinct successors are admitted under
//!   sublinear budgets of the visit count, and saturated edges replay
//!   previously sampled transitions.
//!
//! Each planning call runs a fixed budget of simulations from the queried
//! root state and recommends the root action with the best accumulated
//! value. All randomness flows through one seeded `ChaCha20Rng`, so a
//! planning call is reproducible from its seed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{MctsConfig, MctsPlanner, RandomRollout, ValueEstimate};
//!
//! let config = MctsConfig::default()
//!     .with_iterations(500)
//!     .with_depth(20)
//!     .with_exploration(1.0);
//!
//! let mut planner = MctsPlanner::new(config, 42)?
//!     .with_estimator(ValueEstimate::rollout(RandomRollout));
//!
//! let best = planner.action(&model, &state)?;
//! ```
//!
//! # Domain knowledge
//!
//! Four seams let a domain steer the search, each accepting a constant, a
//! closure, or a shared hook object ([`DomainHooks`]):
//!
//! - [`InitN`] / [`InitQ`]: visit count and value seeded into new
//!   state-action edges.
//! - [`ValueEstimate`]: the value of a freshly inserted leaf, including the
//!   rollout estimator.
//! - [`NextAction`]: the action proposer driving progressive widening.
//!
//! # Concurrency
//!
//! Planning is strictly single-threaded: the planner owns its tree and RNG,
//! and a call runs to completion without suspension. Independent planners
//! may run on separate threads against a shared model.

pub mod config;
pub mod dpw;
pub mod estimator;
pub mod knowledge;
pub mod node;
pub mod search;
pub mod tree;

pub use config::{ConfigError, DpwConfig, MctsConfig};
pub use dpw::{DpwPlanner, DpwResetCallback};
pub use estimator::{
    EstimatorError, FnRollout, RandomRollout, RolloutEstimator, RolloutPolicy, ValueEstimate,
};
pub use knowledge::{DomainHooks, InitN, InitQ, KnowledgeError, NextAction, SharedHooks};
pub use node::{DpwEdge, DpwStateNode, StateActionNode, StateId, StateNode};
pub use search::{MctsPlanner, ResetCallback, SearchError};
pub use tree::{DpwTree, TreeStats, VanillaTree};
