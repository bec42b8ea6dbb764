//! Planner tuning knobs, loadable from configuration with defaults.

use serde::{Deserialize, Serialize};

/// Configuration for the planning agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Default hop bound for incident correlation and impact analysis.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
}

fn default_max_hops() -> usize {
    3
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
        }
    }
}
