//! Domain-knowledge seams.
//!
//! The planners expose four extension points: initial visit count and
//! initial value for a new state-action edge, the leaf value estimate, and
//! the action proposer used by progressive widening. Each seam accepts a
//! constant, a closure, or a shared hook object, with one dispatch boundary
//! per seam.
//!
//! Hook objects implement [`DomainHooks`] and are shared by reference, so a
//! single object can back several seams at once and keep its own internal
//! state (counters, its own RNG, learned tables). Operations a hook object
//! does not override report [`KnowledgeError::Unsupported`] on first
//! dispatch.

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use mdp_core::Mdp;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::node::DpwStateNode;

/// Errors raised while dispatching a domain-knowledge seam.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnowledgeError {
    #[error("domain hooks object does not implement `{0}`")]
    Unsupported(&'static str),
}

/// A hook object backing one or more seams.
///
/// Every operation has a default body that reports the operation as
/// unsupported; implementors override only what they provide. Stochastic
/// operations receive the engine RNG so a planning call stays reproducible
/// from one seed.
pub trait DomainHooks<M: Mdp> {
    /// Initial visit count for a new `(state, action)` edge.
    fn init_n(
        &mut self,
        _mdp: &M,
        _state: &M::State,
        _action: &M::Action,
    ) -> Result<u32, KnowledgeError> {
        Err(KnowledgeError::Unsupported("init_n"))
    }

    /// Initial value estimate for a new `(state, action)` edge.
    fn init_q(
        &mut self,
        _mdp: &M,
        _state: &M::State,
        _action: &M::Action,
    ) -> Result<f64, KnowledgeError> {
        Err(KnowledgeError::Unsupported("init_q"))
    }

    /// Value estimate at a freshly inserted leaf with `depth` steps left.
    fn estimate_value(
        &mut self,
        _mdp: &M,
        _state: &M::State,
        _depth: u32,
        _rng: &mut ChaCha20Rng,
    ) -> Result<f64, KnowledgeError> {
        Err(KnowledgeError::Unsupported("estimate_value"))
    }

    /// Propose a new action to add under `state` during action widening.
    /// `node` exposes the currently present edges.
    fn next_action(
        &mut self,
        _mdp: &M,
        _state: &M::State,
        _node: &DpwStateNode<M>,
        _rng: &mut ChaCha20Rng,
    ) -> Result<M::Action, KnowledgeError>
    where
        M::Action: Eq + Hash,
    {
        Err(KnowledgeError::Unsupported("next_action"))
    }
}

/// Shared handle to a hook object. One object may serve all four seams.
pub type SharedHooks<M> = Rc<RefCell<dyn DomainHooks<M>>>;

/// The `init_N` seam: initial visit count for new edges.
pub enum InitN<M: Mdp> {
    Constant(u32),
    Fn(Box<dyn FnMut(&M, &M::State, &M::Action) -> u32>),
    Hooks(SharedHooks<M>),
}

impl<M: Mdp> InitN<M> {
    pub fn from_fn(f: impl FnMut(&M, &M::State, &M::Action) -> u32 + 'static) -> Self {
        Self::Fn(Box::new(f))
    }

    pub fn eval(
        &mut self,
        mdp: &M,
        state: &M::State,
        action: &M::Action,
    ) -> Result<u32, KnowledgeError> {
        match self {
            Self::Constant(n) => Ok(*n),
            Self::Fn(f) => Ok(f(mdp, state, action)),
            Self::Hooks(hooks) => hooks.borrow_mut().init_n(mdp, state, action),
        }
    }
}

impl<M: Mdp> Default for InitN<M> {
    fn default() -> Self {
        Self::Constant(0)
    }
}

/// The `init_Q` seam: initial value estimate for new edges.
pub enum InitQ<M: Mdp> {
    Constant(f64),
    Fn(Box<dyn FnMut(&M, &M::State, &M::Action) -> f64>),
    Hooks(SharedHooks<M>),
}

impl<M: Mdp> InitQ<M> {
    pub fn from_fn(f: impl FnMut(&M, &M::State, &M::Action) -> f64 + 'static) -> Self {
        Self::Fn(Box::new(f))
    }

    pub fn eval(
        &mut self,
        mdp: &M,
        state: &M::State,
        action: &M::Action,
    ) -> Result<f64, KnowledgeError> {
        match self {
            Self::Constant(q) => Ok(*q),
            Self::Fn(f) => Ok(f(mdp, state, action)),
            Self::Hooks(hooks) => hooks.borrow_mut().init_q(mdp, state, action),
        }
    }
}

impl<M: Mdp> Default for InitQ<M> {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

/// The `next_action` seam: proposes a new action during action widening.
///
/// The proposer sees the node's current edges, so it can steer toward
/// actions not yet present; proposing a duplicate is allowed and adds
/// nothing.
pub enum NextAction<M: Mdp>
where
    M::Action: Eq + Hash,
{
    Constant(M::Action),
    #[allow(clippy::type_complexity)]
    Fn(Box<dyn FnMut(&M, &M::State, &DpwStateNode<M>, &mut ChaCha20Rng) -> M::Action>),
    Hooks(SharedHooks<M>),
}

impl<M: Mdp> NextAction<M>
where
    M::Action: Eq + Hash,
{
    pub fn from_fn(
        f: impl FnMut(&M, &M::State, &DpwStateNode<M>, &mut ChaCha20Rng) -> M::Action + 'static,
    ) -> Self {
        Self::Fn(Box::new(f))
    }

    pub fn propose(
        &mut self,
        mdp: &M,
        state: &M::State,
        node: &DpwStateNode<M>,
        rng: &mut ChaCha20Rng,
    ) -> Result<M::Action, KnowledgeError> {
        match self {
            Self::Constant(action) => Ok(action.clone()),
            Self::Fn(f) => Ok(f(mdp, state, node, rng)),
            Self::Hooks(hooks) => hooks.borrow_mut().next_action(mdp, state, node, rng),
        }
    }
}
