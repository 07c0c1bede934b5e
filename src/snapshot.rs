//! Versioned binary save/restore
//!
//! The snapshot is a flat sequence of fixed-width little-endian fields, no
//! compression and no checksum; integrity rests entirely on the leading
//! version tag and on every field keeping its exact order and width. The
//! RNG stream is deliberately not persisted: a restored game replays
//! exactly until the next fresh draw, then continues as if reseeded.

use std::io::{Read, Write};

use glam::DVec2;
use thiserror::Error;

use crate::consts::{COLUMNS, ROWS};
use crate::sim::round::{LoopVar, Round};
use crate::sim::state::{Ball, Difficulty, Playfield};

/// Format tag written first and checked on load.
pub const SNAPSHOT_VERSION: i32 = 2;

/// Active-ball counts beyond this are garbage, not a game.
const MAX_BALLS: u64 = 65_536;

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot was written by an incompatible build. Recoverable: the
    /// caller keeps its current state untouched.
    #[error("unsupported snapshot version {found} (expected {SNAPSHOT_VERSION})")]
    VersionMismatch { found: i32 },

    /// A field decoded to a value no reachable game state can hold.
    #[error("invalid {field} value {value}")]
    InvalidField { field: &'static str, value: i64 },

    /// Short read or underlying I/O failure; truncated snapshots surface
    /// here as `UnexpectedEof`.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn put_i32(w: &mut impl Write, v: i32) -> Result<(), SnapshotError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn put_u64(w: &mut impl Write, v: u64) -> Result<(), SnapshotError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn put_f64(w: &mut impl Write, v: f64) -> Result<(), SnapshotError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn put_point(w: &mut impl Write, p: DVec2) -> Result<(), SnapshotError> {
    put_f64(w, p.x)?;
    put_f64(w, p.y)
}

fn get_i32(r: &mut impl Read) -> Result<i32, SnapshotError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn get_u64(r: &mut impl Read) -> Result<u64, SnapshotError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn get_f64(r: &mut impl Read) -> Result<f64, SnapshotError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn get_point(r: &mut impl Read) -> Result<DVec2, SnapshotError> {
    let x = get_f64(r)?;
    let y = get_f64(r)?;
    Ok(DVec2::new(x, y))
}

/// Everything decoded from a snapshot, validated but not yet applied.
/// Decoding fully before touching the playfield makes the load
/// all-or-nothing.
struct Decoded {
    ball_num: i32,
    start_position: DVec2,
    end_position: DVec2,
    start_velocity: DVec2,
    double_score: bool,
    score: u64,
    difficulty: Difficulty,
    cells: [[i32; COLUMNS]; ROWS],
    round_total: i32,
    round_exited: i32,
    cadence_value: i32,
    balls: Vec<Ball>,
}

fn decode(r: &mut impl Read) -> Result<Decoded, SnapshotError> {
    let found = get_i32(r)?;
    if found != SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch { found });
    }

    let ball_num = get_i32(r)?;
    if ball_num < 1 {
        return Err(SnapshotError::InvalidField {
            field: "ball count",
            value: ball_num as i64,
        });
    }
    let start_position = get_point(r)?;
    let end_position = get_point(r)?;
    let start_velocity = get_point(r)?;
    let double_score = get_i32(r)? != 0;
    let score = get_u64(r)?;
    let difficulty_code = get_i32(r)?;
    let difficulty =
        Difficulty::from_code(difficulty_code).ok_or(SnapshotError::InvalidField {
            field: "difficulty",
            value: difficulty_code as i64,
        })?;

    let mut cells = [[0i32; COLUMNS]; ROWS];
    for row in cells.iter_mut() {
        for cell in row.iter_mut() {
            *cell = get_i32(r)?;
        }
    }

    let round_total = get_i32(r)?;
    let round_exited = get_i32(r)?;
    if round_total < 0 || round_exited < 0 {
        return Err(SnapshotError::InvalidField {
            field: "round counters",
            value: round_total.min(round_exited) as i64,
        });
    }
    let cadence_value = get_i32(r)?;
    let count = get_u64(r)?;
    if count > MAX_BALLS {
        return Err(SnapshotError::InvalidField {
            field: "active ball count",
            value: count as i64,
        });
    }
    let mut balls = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let pos = get_point(r)?;
        let vel = get_point(r)?;
        balls.push(Ball::new(pos, vel));
    }

    Ok(Decoded {
        ball_num,
        start_position,
        end_position,
        start_velocity,
        double_score,
        score,
        difficulty,
        cells,
        round_total,
        round_exited,
        cadence_value,
        balls,
    })
}

impl Playfield {
    /// Write the full simulation state in the fixed snapshot layout.
    pub fn save(&self, w: &mut impl Write) -> Result<(), SnapshotError> {
        put_i32(w, SNAPSHOT_VERSION)?;
        put_i32(w, self.ball_num)?;
        put_point(w, self.start_position)?;
        put_point(w, self.end_position)?;
        put_point(w, self.start_velocity)?;
        put_i32(w, self.double_score as i32)?;
        put_u64(w, self.score)?;
        put_i32(w, self.difficulty.code())?;
        for row in self.grid.rows() {
            for &cell in row {
                put_i32(w, cell)?;
            }
        }

        // the round section is unconditional: with nothing in flight it
        // records an already-finished round
        match &self.round {
            Some(round) => {
                put_i32(w, round.total)?;
                put_i32(w, round.exited)?;
                put_i32(w, round.cadence.value())?;
                put_u64(w, round.balls.len() as u64)?;
                for ball in &round.balls {
                    put_point(w, ball.pos)?;
                    put_point(w, ball.vel)?;
                }
            }
            None => {
                put_i32(w, self.ball_num)?;
                put_i32(w, self.ball_num)?;
                put_i32(w, self.tuning.spawn_interval)?;
                put_u64(w, 0)?;
            }
        }
        Ok(())
    }

    /// Replace this playfield's state with a decoded snapshot. All-or-
    /// nothing: on any error the current state is untouched. The RNG stream,
    /// the tuning, and the subscribed callback all survive the load; the
    /// scoreboard callback observes the restored counter values.
    pub fn restore(&mut self, r: &mut impl Read) -> Result<(), SnapshotError> {
        let decoded = decode(r)?;

        self.set_ball_num(decoded.ball_num);
        self.start_position = decoded.start_position;
        self.end_position = decoded.end_position;
        self.start_velocity = decoded.start_velocity;
        self.sample_position = decoded.start_position;
        self.set_double_score(decoded.double_score);
        self.set_score(decoded.score);
        self.difficulty = decoded.difficulty;
        for (row, values) in decoded.cells.iter().enumerate() {
            for (col, &v) in values.iter().enumerate() {
                self.grid.set(col as i32, row as i32, v);
            }
        }

        let launched = decoded.balls.len() as i32 + decoded.round_exited;
        let round = Round::restore(
            decoded.round_total,
            decoded.round_exited,
            LoopVar::new(decoded.cadence_value, 0, self.tuning.spawn_interval),
            decoded.balls,
        );
        if round.is_finished() {
            self.round = None;
            self.set_remain_ball_num(0);
        } else {
            self.set_remain_ball_num((decoded.round_total - launched).max(0));
            self.round = Some(round);
        }
        Ok(())
    }
}
