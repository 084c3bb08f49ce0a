//! Core model contract for the mcts planning crates.
//!
//! This crate provides the single abstraction the planners consume:
//! the [`Mdp`] trait, a generative Markov Decision Process model. A model
//! supplies action enumeration, a sampling transition `(s, a, rng) -> (s', r)`,
//! a discount factor, and a terminal predicate. The planners never look
//! inside states or actions; they only clone, compare, and hash them.
//!
//! # Example
//!
//! ```rust
//! use mdp_core::Mdp;
//! use rand_chacha::ChaCha20Rng;
//!
//! /// A chain of states 0..=10; moving right pays 1, reaching 10 ends it.
//! struct Chain;
//!
//! impl Mdp for Chain {
//!     type State = u32;
//!     type Action = i32;
//!
//!     fn actions(&self, _state: &u32) -> Vec<i32> {
//!         vec![-1, 1]
//!     }
//!
//!     fn step(&self, state: &u32, action: &i32, _rng: &mut ChaCha20Rng) -> (u32, f64) {
//!         let next = state.saturating_add_signed(*action).min(10);
//!         let reward = if *action > 0 { 1.0 } else { 0.0 };
//!         (next, reward)
//!     }
//!
//!     fn discount(&self) -> f64 {
//!         0.9
//!     }
//!
//!     fn is_terminal(&self, state: &u32) -> bool {
//!         *state == 10
//!     }
//! }
//! ```

use std::fmt::Debug;
use std::hash::Hash;

use rand_chacha::ChaCha20Rng;

/// A generative Markov Decision Process model.
///
/// The planners drive the model exclusively through this trait: they sample
/// transitions with [`step`](Mdp::step), enumerate actions where the variant
/// needs them, and consult [`discount`](Mdp::discount) and
/// [`is_terminal`](Mdp::is_terminal). The model is read-only during planning;
/// all randomness flows through the caller-supplied `ChaCha20Rng` so that a
/// planning run is reproducible from one seed.
pub trait Mdp {
    /// State type. Cloned into the search tree and used as a lookup key.
    type State: Clone + Eq + Hash + Debug;

    /// Action type. Cloned into state-action edges. The widening planner
    /// additionally requires `Eq + Hash`, since only it keys maps by action.
    type Action: Clone + Debug;

    /// Enumerate the legal actions at `state`.
    ///
    /// Must be non-empty at every non-terminal state; the planners report a
    /// model contract violation otherwise. The returned order is the order
    /// children are created in, which also fixes tie-breaking.
    fn actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Sample one transition from the generative model: successor state and
    /// immediate reward.
    fn step(
        &self,
        state: &Self::State,
        action: &Self::Action,
        rng: &mut ChaCha20Rng,
    ) -> (Self::State, f64);

    /// Discount factor, in `[0, 1]`.
    fn discount(&self) -> f64;

    /// Whether `state` is terminal. Simulations stop here with zero
    /// remaining value.
    fn is_terminal(&self, state: &Self::State) -> bool;
}
