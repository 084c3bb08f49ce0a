//! Leaf value estimators.
//!
//! When a simulation reaches a state with no tree node yet, the planner
//! inserts the node and asks a [`ValueEstimate`] for the value of the
//! remaining horizon. The estimate is returned as-is; nothing above the leaf
//! re-discounts or augments it.
//!
//! The rollout arm simulates a [`RolloutPolicy`] from the leaf for the
//! remaining depth on the engine RNG and returns the discounted return, so
//! an entire planning call stays reproducible from one seed.

use mdp_core::Mdp;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::knowledge::{KnowledgeError, SharedHooks};

/// Errors raised while evaluating a leaf.
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("rollout policy produced no action at a non-terminal state")]
    RolloutStuck,

    #[error("generative model returned non-finite reward {0} during rollout")]
    NonFiniteReward(f64),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

/// The `estimate_value` seam: value of a freshly inserted leaf.
pub enum ValueEstimate<M: Mdp> {
    Constant(f64),
    #[allow(clippy::type_complexity)]
    Fn(Box<dyn FnMut(&M, &M::State, u32, &mut ChaCha20Rng) -> f64>),
    Hooks(SharedHooks<M>),
    Rollout(RolloutEstimator<M>),
}

impl<M: Mdp> ValueEstimate<M> {
    pub fn from_fn(f: impl FnMut(&M, &M::State, u32, &mut ChaCha20Rng) -> f64 + 'static) -> Self {
        Self::Fn(Box::new(f))
    }

    pub fn rollout(policy: impl RolloutPolicy<M> + 'static) -> Self {
        Self::Rollout(RolloutEstimator::new(policy))
    }

    pub fn estimate(
        &mut self,
        mdp: &M,
        state: &M::State,
        depth: u32,
        rng: &mut ChaCha20Rng,
    ) -> Result<f64, EstimatorError> {
        match self {
            Self::Constant(v) => Ok(*v),
            Self::Fn(f) => Ok(f(mdp, state, depth, rng)),
            Self::Hooks(hooks) => Ok(hooks.borrow_mut().estimate_value(mdp, state, depth, rng)?),
            Self::Rollout(estimator) => estimator.run(mdp, state, depth, rng),
        }
    }
}

impl<M: Mdp> Default for ValueEstimate<M> {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

/// A policy driving rollout simulations.
///
/// Returning `None` at a non-terminal state aborts the evaluation with
/// [`EstimatorError::RolloutStuck`].
pub trait RolloutPolicy<M: Mdp> {
    fn rollout_action(
        &mut self,
        mdp: &M,
        state: &M::State,
        rng: &mut ChaCha20Rng,
    ) -> Option<M::Action>;
}

/// Uniform random rollout over the model's legal actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRollout;

impl RandomRollout {
    pub fn new() -> Self {
        Self
    }
}

impl<M: Mdp> RolloutPolicy<M> for RandomRollout {
    fn rollout_action(
        &mut self,
        mdp: &M,
        state: &M::State,
        rng: &mut ChaCha20Rng,
    ) -> Option<M::Action> {
        let actions = mdp.actions(state);
        if actions.is_empty() {
            return None;
        }
        let i = rng.gen_range(0..actions.len());
        Some(actions[i].clone())
    }
}

/// Adapter turning a closure into a rollout policy.
pub struct FnRollout<F>(pub F);

impl<M, F> RolloutPolicy<M> for FnRollout<F>
where
    M: Mdp,
    F: FnMut(&M, &M::State, &mut ChaCha20Rng) -> Option<M::Action>,
{
    fn rollout_action(
        &mut self,
        mdp: &M,
        state: &M::State,
        rng: &mut ChaCha20Rng,
    ) -> Option<M::Action> {
        (self.0)(mdp, state, rng)
    }
}

/// Estimates leaf values by simulating a rollout policy for the remaining
/// depth and accumulating the discounted return.
pub struct RolloutEstimator<M: Mdp> {
    policy: Box<dyn RolloutPolicy<M>>,
}

impl<M: Mdp> RolloutEstimator<M> {
    pub fn new(policy: impl RolloutPolicy<M> + 'static) -> Self {
        Self {
            policy: Box::new(policy),
        }
    }

    /// Uniform random rollouts.
    pub fn random() -> Self {
        Self::new(RandomRollout)
    }

    pub fn run(
        &mut self,
        mdp: &M,
        start: &M::State,
        depth: u32,
        rng: &mut ChaCha20Rng,
    ) -> Result<f64, EstimatorError> {
        let gamma = mdp.discount();
        let mut state = start.clone();
        let mut total = 0.0;
        let mut weight = 1.0;

        for _ in 0..depth {
            if mdp.is_terminal(&state) {
                break;
            }
            let action = self
                .policy
                .rollout_action(mdp, &state, rng)
                .ok_or(EstimatorError::RolloutStuck)?;
            let (next, reward) = mdp.step(&state, &action, rng);
            if !reward.is_finite() {
                return Err(EstimatorError::NonFiniteReward(reward));
            }
            total += weight * reward;
            weight *= gamma;
            state = next;
        }

        Ok(total)
    }
}
