//! Tick resolution.
//!
//! Collects every unit's intent, resolves conflicts between simultaneous
//! intents to a fixed point, applies the verdicts and arbitrates combat
//! between units that end up contesting a tile.

pub mod apply;
pub mod combat;
pub mod intent;
pub mod tick;

pub use apply::{apply_resolution, Applied, Step};
pub use combat::{collide_swaps, control_balance, resolve_collision, resolve_same_tile, Contender};
pub use intent::{Intent, IntentGroups};
pub use tick::{
    resolve_intents, NonConvergence, Resolution, TickResolver, Verdict, DEFAULT_SWEEP_CAP_FACTOR,
};
