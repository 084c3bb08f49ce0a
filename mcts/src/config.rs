//! Planner configuration parameters.

use thiserror::Error;

/// Errors found while validating a configuration. Reported at planner
/// construction or at the top of the first planning call, before any
/// simulation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("n_iterations must be positive, got {0}")]
    Iterations(u32),

    #[error("depth must be positive, got {0}")]
    Depth(u32),

    #[error("exploration constant must be finite and non-negative, got {0}")]
    Exploration(f64),

    #[error("widening parameter {name} must be positive and finite, got {value}")]
    Widening { name: &'static str, value: f64 },

    #[error("action progressive widening requires a next_action seam")]
    MissingNextAction,
}

fn validate_shared(n_iterations: u32, depth: u32, exploration: f64) -> Result<(), ConfigError> {
    if n_iterations == 0 {
        return Err(ConfigError::Iterations(n_iterations));
    }
    if depth == 0 {
        return Err(ConfigError::Depth(depth));
    }
    if !exploration.is_finite() || exploration < 0.0 {
        return Err(ConfigError::Exploration(exploration));
    }
    Ok(())
}

fn validate_widening(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Widening { name, value });
    }
    Ok(())
}

/// Configuration for the vanilla planner.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Simulations per planning call.
    pub n_iterations: u32,

    /// Maximum MDP steps per simulation.
    pub depth: u32,

    /// UCB exploration constant `c`. Zero makes selection purely greedy
    /// once every child has been visited.
    pub exploration_constant: f64,

    /// Retain the tree across planning calls. When false the tree is
    /// cleared at the top of every call.
    pub keep_tree: bool,

    /// Retain the successor edges observed through each state-action node,
    /// for tree inspection.
    pub enable_tree_vis: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            n_iterations: 100,
            depth: 10,
            exploration_constant: 1.0,
            keep_tree: false,
            enable_tree_vis: false,
        }
    }
}

impl MctsConfig {
    /// A small, fast configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            n_iterations: 16,
            depth: 5,
            ..Self::default()
        }
    }

    pub fn with_iterations(mut self, n: u32) -> Self {
        self.n_iterations = n;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    pub fn with_keep_tree(mut self, keep: bool) -> Self {
        self.keep_tree = keep;
        self
    }

    pub fn with_tree_vis(mut self, enable: bool) -> Self {
        self.enable_tree_vis = enable;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_shared(self.n_iterations, self.depth, self.exploration_constant)
    }
}

/// Configuration for the double-progressive-widening planner.
///
/// At a state with `N` visits, at most `ceil(k_action * N^alpha_action)`
/// action children are admitted; at an edge with `n` visits, at most
/// `ceil(k_state * n^alpha_state)` distinct successors. With
/// `enable_action_pw = false` the full action set is enumerated once at node
/// creation and only state widening applies.
#[derive(Debug, Clone, PartialEq)]
pub struct DpwConfig {
    /// Simulations per planning call.
    pub n_iterations: u32,

    /// Maximum MDP steps per simulation.
    pub depth: u32,

    /// UCB exploration constant `c`.
    pub exploration_constant: f64,

    /// Retain the tree across planning calls.
    pub keep_tree: bool,

    /// Action widening linear coefficient.
    pub k_action: f64,

    /// Action widening exponent.
    pub alpha_action: f64,

    /// State widening linear coefficient.
    pub k_state: f64,

    /// State widening exponent.
    pub alpha_state: f64,

    /// Grow the action set progressively via the `next_action` seam. When
    /// false, all legal actions are created with the node.
    pub enable_action_pw: bool,
}

impl Default for DpwConfig {
    fn default() -> Self {
        Self {
            n_iterations: 100,
            depth: 10,
            exploration_constant: 1.0,
            keep_tree: false,
            k_action: 10.0,
            alpha_action: 0.5,
            k_state: 10.0,
            alpha_state: 0.5,
            enable_action_pw: true,
        }
    }
}

impl DpwConfig {
    /// A small, fast configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            n_iterations: 16,
            depth: 5,
            ..Self::default()
        }
    }

    pub fn with_iterations(mut self, n: u32) -> Self {
        self.n_iterations = n;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    pub fn with_keep_tree(mut self, keep: bool) -> Self {
        self.keep_tree = keep;
        self
    }

    pub fn with_action_widening(mut self, k: f64, alpha: f64) -> Self {
        self.k_action = k;
        self.alpha_action = alpha;
        self
    }

    pub fn with_state_widening(mut self, k: f64, alpha: f64) -> Self {
        self.k_state = k;
        self.alpha_state = alpha;
        self
    }

    pub fn with_action_pw(mut self, enable: bool) -> Self {
        self.enable_action_pw = enable;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_shared(self.n_iterations, self.depth, self.exploration_constant)?;
        validate_widening("k_action", self.k_action)?;
        validate_widening("alpha_action", self.alpha_action)?;
        validate_widening("k_state", self.k_state)?;
        validate_widening("alpha_state", self.alpha_state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(MctsConfig::default().validate().is_ok());
        assert!(DpwConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_chain() {
        let config = MctsConfig::default()
            .with_iterations(3)
            .with_depth(4)
            .with_exploration(0.0)
            .with_keep_tree(true);

        assert_eq!(config.n_iterations, 3);
        assert_eq!(config.depth, 4);
        assert_eq!(config.exploration_constant, 0.0);
        assert!(config.keep_tree);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_iterations_rejected() {
        let config = MctsConfig::default().with_iterations(0);
        assert_eq!(config.validate(), Err(ConfigError::Iterations(0)));
    }

    #[test]
    fn zero_depth_rejected() {
        let config = DpwConfig::default().with_depth(0);
        assert_eq!(config.validate(), Err(ConfigError::Depth(0)));
    }

    #[test]
    fn negative_exploration_rejected() {
        let config = MctsConfig::default().with_exploration(-0.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Exploration(c)) if c == -0.5
        ));
    }

    #[test]
    fn non_positive_widening_rejected() {
        let config = DpwConfig::default().with_action_widening(0.0, 0.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Widening { name: "k_action", .. })
        ));

        let config = DpwConfig::default().with_state_widening(10.0, f64::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Widening { name: "alpha_state", .. })
        ));
    }
}
