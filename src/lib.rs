//! Ballfall - a falling-block bouncer simulation core
//!
//! Core modules:
//! - `sim`: deterministic simulation (grid, bounce physics, rounds)
//! - `snapshot`: versioned binary save/restore
//! - `tuning`: data-driven content-generation odds
//!
//! The crate has no rendering or windowing surface. A driver shell feeds aim
//! points and tick signals in, reads plain-data queries out, and subscribes
//! to a single scoreboard-change callback for its HUD.

pub mod sim;
pub mod snapshot;
pub mod tuning;

pub use sim::{
    Ball, DegenerateAim, Difficulty, Grid, Playfield, ScoreboardChange, Sides, Special,
    TickResult,
};
pub use snapshot::{SNAPSHOT_VERSION, SnapshotError};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Grid width in cells
    pub const COLUMNS: usize = 6;
    /// Grid height in cells
    pub const ROWS: usize = 8;
    /// Cell side length in field units
    pub const CELL_SIDE: i32 = 100;

    /// Ball radius
    pub const BALL_RADIUS: i32 = 10;
    /// Ball speed in field units per tick (fixed magnitude except right
    /// after a random-turn or corner bounce)
    pub const BALL_SPEED: f64 = 25.0;

    /// Play-area width; the last column's right edge is the right wall
    pub const FIELD_WIDTH: i32 = CELL_SIDE * COLUMNS as i32 - 1;
    /// Play-area height; crossing the bottom edge ends a ball
    pub const FIELD_HEIGHT: i32 = CELL_SIDE * ROWS as i32 - 1;

    /// Control-circle glyph size; a circle triggers within
    /// `CIRCLE_SIZE / 2 + BALL_RADIUS + 10` of the cell center
    pub const CIRCLE_SIZE: i32 = 50;

    /// Ticks between ball launches within a round
    pub const SPAWN_INTERVAL: i32 = 3;
}
