//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Tick-driven only, one advance call per frame
//! - Seeded RNG only, a single stream owned by the playfield
//! - Stable ball iteration order (launch order)
//! - No rendering or platform dependencies

pub mod bounce;
pub mod grid;
pub mod round;
pub mod state;

pub use grid::{Grid, Sides, Special};
pub use round::{LoopVar, Round};
pub use state::{Ball, DegenerateAim, Difficulty, Playfield, ScoreboardChange, TickResult};
