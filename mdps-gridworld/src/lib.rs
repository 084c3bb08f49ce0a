//! Grid-world reference MDP for the mcts planning crates.
//!
//! A `width x height` grid with 1-based `(x, y)` coordinates. Moves that
//! would leave the grid stay in place. Entering a goal cell yields that
//! cell's reward, and goal cells are terminal. With a positive slip
//! probability, a move is replaced by a uniformly random direction drawn
//! from the engine RNG.
//!
//! # Usage
//!
//! ```rust
//! use mdps_gridworld::{GridPos, GridWorld, Move};
//! use mdp_core::Mdp;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let world = GridWorld::new(10, 10).with_goal(GridPos::new(9, 3), 10.0);
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//!
//! let (next, reward) = world.step(&GridPos::new(8, 3), &Move::Right, &mut rng);
//! assert_eq!(next, GridPos::new(9, 3));
//! assert_eq!(reward, 10.0);
//! assert!(world.is_terminal(&next));
//! ```

use mdp_core::Mdp;
use rand::Rng;
use rand_chacha::ChaCha20Rng;

/// A cell of the grid, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// The four grid moves. `Up` increases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];
}

/// The move that closes the distance from `from` toward `goal`, preferring
/// horizontal progress. Useful as a greedy rollout policy.
pub fn greedy_toward(from: GridPos, goal: GridPos) -> Move {
    if from.x < goal.x {
        Move::Right
    } else if from.x > goal.x {
        Move::Left
    } else if from.y < goal.y {
        Move::Up
    } else {
        Move::Down
    }
}

/// A stochastic grid world with rewarded, terminal goal cells.
#[derive(Debug, Clone)]
pub struct GridWorld {
    width: u32,
    height: u32,
    goals: Vec<(GridPos, f64)>,
    slip_prob: f64,
    discount: f64,
}

impl GridWorld {
    /// A deterministic grid with no goals, discount `0.95`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            goals: Vec::new(),
            slip_prob: 0.0,
            discount: 0.95,
        }
    }

    /// The 10x10 world with a single goal worth `10.0` at `(9, 3)`.
    pub fn ten_by_ten() -> Self {
        Self::new(10, 10).with_goal(GridPos::new(9, 3), 10.0)
    }

    /// Add a rewarded, terminal goal cell.
    pub fn with_goal(mut self, pos: GridPos, reward: f64) -> Self {
        self.goals.push((pos, reward));
        self
    }

    /// Probability that a move is replaced by a random direction.
    pub fn with_slip(mut self, slip_prob: f64) -> Self {
        self.slip_prob = slip_prob;
        self
    }

    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The reward attached to `pos`, if it is a goal cell.
    pub fn goal_reward(&self, pos: &GridPos) -> Option<f64> {
        self.goals
            .iter()
            .find(|(goal, _)| goal == pos)
            .map(|(_, reward)| *reward)
    }

    /// Apply a move with clamping at the grid edges.
    fn apply(&self, pos: GridPos, mv: Move) -> GridPos {
        match mv {
            Move::Up => GridPos::new(pos.x, (pos.y + 1).min(self.height)),
            Move::Down => GridPos::new(pos.x, pos.y.saturating_sub(1).max(1)),
            Move::Left => GridPos::new(pos.x.saturating_sub(1).max(1), pos.y),
            Move::Right => GridPos::new((pos.x + 1).min(self.width), pos.y),
        }
    }
}

impl Mdp for GridWorld {
    type State = GridPos;
    type Action = Move;

    fn actions(&self, _state: &GridPos) -> Vec<Move> {
        Move::ALL.to_vec()
    }

    fn step(&self, state: &GridPos, action: &Move, rng: &mut ChaCha20Rng) -> (GridPos, f64) {
        let mv = if self.slip_prob > 0.0 && rng.gen::<f64>() < self.slip_prob {
            Move::ALL[rng.gen_range(0..Move::ALL.len())]
        } else {
            *action
        };

        let next = self.apply(*state, mv);
        let reward = self.goal_reward(&next).unwrap_or(0.0);
        (next, reward)
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    fn is_terminal(&self, state: &GridPos) -> bool {
        self.goal_reward(state).is_some()
    }
}
