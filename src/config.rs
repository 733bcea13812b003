//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::movegen::SEARCH_LIMIT;
use crate::resolve::DEFAULT_SWEEP_CAP_FACTOR;

/// Tunables for one [`Engine`](crate::engine::Engine).
///
/// Every field has a default, so a JSON document only needs the keys it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ticks are driven by [`Engine::update`](crate::engine::Engine::update);
    /// manual tick requests are ignored while this is set.
    pub automatic_ticks: bool,
    /// Ticks per second in automatic mode.
    pub tick_rate: f64,
    /// Manhattan radius each unit sees.
    pub vision_radius: i32,
    /// Frontier expansions before a path search gives up.
    pub path_search_limit: usize,
    /// Sweep cap as a multiple of the occupied tile count.
    pub sweep_cap_factor: usize,
    /// Fight out cancelled head-on swaps between opposite factions.
    pub head_on_combat: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            automatic_ticks: true,
            tick_rate: 0.5,
            vision_radius: 3,
            path_search_limit: SEARCH_LIMIT,
            sweep_cap_factor: DEFAULT_SWEEP_CAP_FACTOR,
            head_on_combat: false,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Seconds between automatic ticks, or `None` if ticking is disabled or
    /// the rate is not a finite positive number.
    pub fn tick_interval(&self) -> Option<f64> {
        (self.tick_rate > 0.0 && self.tick_rate.is_finite()).then(|| 1.0 / self.tick_rate)
    }
}
