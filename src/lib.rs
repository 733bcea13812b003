//! Tactica engine library.
//!
//! Simultaneous-movement resolution for a tick-based grid tactics game:
//! the board model, move generation, the tick resolver, vision, and a
//! headless skirmish runner used by the binary and the integration tests.

pub mod board;
pub mod config;
pub mod engine;
pub mod movegen;
pub mod resolve;
pub mod skirmish;
pub mod vision;
