//! Playfield state and round lifecycle
//!
//! Everything that must be persisted for save/restore lives here, plus the
//! row-shift/content-generation pass that runs between rounds.

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg32;
use thiserror::Error;

use super::grid::{Grid, Special};
use super::round::Round;
use crate::consts::*;
use crate::tuning::Tuning;

/// A ball in flight: continuous position plus per-tick velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub pos: DVec2,
    pub vel: DVec2,
}

impl Ball {
    pub fn new(pos: DVec2, vel: DVec2) -> Self {
        Self { pos, vel }
    }
}

/// Difficulty presets for the between-round block distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    Simple,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub(crate) const fn code(self) -> i32 {
        match self {
            Difficulty::Simple => 0,
            Difficulty::Normal => 1,
            Difficulty::Hard => 2,
        }
    }

    pub(crate) const fn from_code(code: i32) -> Option<Difficulty> {
        match code {
            0 => Some(Difficulty::Simple),
            1 => Some(Difficulty::Normal),
            2 => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Mean and deviation of the block-count distribution for `n` balls.
    fn distribution(self, n: i32) -> (f64, f64) {
        let n = n as f64;
        match self {
            Difficulty::Simple => (n / 2.0, n / 6.0),
            Difficulty::Normal => (n, n / 3.0),
            Difficulty::Hard => (n * 1.5, n / 2.0),
        }
    }
}

/// Snapshot of the co-observed scoreboard fields, delivered to the
/// subscribed callback on every change of any one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreboardChange {
    pub ball_num: i32,
    pub remain_ball_num: i32,
    pub score: u64,
}

/// Outcome of one `advance_tick` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// No round in progress; nothing moved.
    Idle,
    /// Balls are still in flight.
    Flying,
    /// The last ball just left the field; call `reset` for the next round.
    RoundOver,
}

/// The aim point coincides with the launch point; no launch direction
/// exists. Callers must pick a distinct aim point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("aim point coincides with the launch point")]
pub struct DegenerateAim;

type ChangeSink = Box<dyn FnMut(ScoreboardChange)>;

/// The playfield: grid, scoreboard, launch state, and the active round.
///
/// Owns the single RNG stream; every draw the simulation makes goes through
/// it, so a fixed seed replays a whole game exactly.
pub struct Playfield {
    pub(crate) ball_num: i32,
    pub(crate) remain_ball_num: i32,
    pub(crate) score: u64,
    pub(crate) start_position: DVec2,
    pub(crate) end_position: DVec2,
    pub(crate) start_velocity: DVec2,
    pub(crate) sample_position: DVec2,
    pub(crate) double_score: bool,
    pub(crate) difficulty: Difficulty,
    pub(crate) grid: Grid,
    pub(crate) rng: Pcg32,
    pub(crate) tuning: Tuning,
    pub(crate) round: Option<Round>,
    on_change: Option<ChangeSink>,
}

/// Default launch point: bottom center, resting on the floor.
pub(crate) fn default_start() -> DVec2 {
    DVec2::new((FIELD_WIDTH / 2) as f64, (FIELD_HEIGHT - BALL_RADIUS) as f64)
}

impl Playfield {
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        let start = default_start();
        Playfield {
            ball_num: 1,
            remain_ball_num: 1,
            score: 0,
            start_position: start,
            end_position: start,
            start_velocity: DVec2::ZERO,
            sample_position: start,
            double_score: false,
            difficulty: Difficulty::default(),
            grid: Grid::default(),
            rng: Pcg32::seed_from_u64(seed),
            tuning,
            round: None,
            on_change: None,
        }
    }

    // --- queries -----------------------------------------------------------

    pub fn ball_num(&self) -> i32 {
        self.ball_num
    }

    pub fn remain_ball_num(&self) -> i32 {
        self.remain_ball_num
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn start_position(&self) -> DVec2 {
        self.start_position
    }

    pub fn end_position(&self) -> DVec2 {
        self.end_position
    }

    pub fn start_velocity(&self) -> DVec2 {
        self.start_velocity
    }

    pub fn sample_position(&self) -> DVec2 {
        self.sample_position
    }

    pub fn double_score(&self) -> bool {
        self.double_score
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Balls currently in flight, in launch order.
    pub fn active_balls(&self) -> &[Ball] {
        self.round.as_ref().map_or(&[], |r| r.balls())
    }

    /// A round exists (balls are flying or still waiting to launch).
    pub fn in_flight(&self) -> bool {
        self.round.is_some()
    }

    /// Every ball of the current round has left the field (vacuously true
    /// with no round running).
    pub fn round_finished(&self) -> bool {
        self.round.as_ref().is_none_or(|r| r.is_finished())
    }

    /// The stack has reached the floor.
    pub fn is_over(&self) -> bool {
        self.grid.bottom_row_occupied()
    }

    // --- scoreboard observables --------------------------------------------

    /// Subscribe the scoreboard listener. Replaces any previous one. The
    /// callback fires synchronously from whichever mutation changed a field,
    /// in field-mutation order, and always carries the full tuple.
    pub fn on_scoreboard_change(&mut self, sink: impl FnMut(ScoreboardChange) + 'static) {
        self.on_change = Some(Box::new(sink));
    }

    fn notify(&mut self) {
        let change = ScoreboardChange {
            ball_num: self.ball_num,
            remain_ball_num: self.remain_ball_num,
            score: self.score,
        };
        if let Some(sink) = self.on_change.as_mut() {
            sink(change);
        }
    }

    pub fn set_ball_num(&mut self, n: i32) {
        if self.ball_num != n {
            self.ball_num = n;
            self.notify();
        }
    }

    pub(crate) fn set_remain_ball_num(&mut self, n: i32) {
        if self.remain_ball_num != n {
            self.remain_ball_num = n;
            self.notify();
        }
    }

    pub fn set_score(&mut self, score: u64) {
        if self.score != score {
            self.score = score;
            self.notify();
        }
    }

    /// One scored bounce: a point, or two while double score is lit.
    pub(crate) fn award_bounce_score(&mut self) {
        let add = if self.double_score { 2 } else { 1 };
        self.set_score(self.score + add);
    }

    pub(crate) fn set_double_score(&mut self, on: bool) {
        self.double_score = on;
    }

    pub(crate) fn set_end_position(&mut self, p: DVec2) {
        self.end_position = p;
    }

    // --- commands ----------------------------------------------------------

    /// Launch velocity of magnitude `speed` toward `aim`, with the vertical
    /// component clamped so every shot leaves the floor.
    pub fn launch_velocity(&self, aim: DVec2, speed: f64) -> Result<DVec2, DegenerateAim> {
        let dir = aim - self.start_position;
        let len = dir.length();
        if len == 0.0 {
            return Err(DegenerateAim);
        }
        let mut v = dir * (speed / len);
        if v.y > -speed / BALL_SPEED {
            v.y = -speed / BALL_SPEED;
        }
        Ok(v)
    }

    /// Aim at `aim` and begin a new round.
    pub fn start_round(&mut self, aim: DVec2) -> Result<(), DegenerateAim> {
        self.start_velocity = self.launch_velocity(aim, BALL_SPEED)?;
        self.round = Some(Round::new(self.ball_num, self.tuning.spawn_interval));
        log::debug!(
            "round started: {} balls toward {:?}",
            self.ball_num,
            self.start_velocity
        );
        Ok(())
    }

    /// Advance the simulation one tick.
    pub fn advance_tick(&mut self) -> TickResult {
        match self.round.take() {
            None => TickResult::Idle,
            Some(mut round) => {
                if round.advance(self) {
                    self.round = Some(round);
                    TickResult::Flying
                } else {
                    log::debug!("round complete, score {}", self.score);
                    TickResult::RoundOver
                }
            }
        }
    }

    /// Move the preview ball: push a slow probe along the aim line until the
    /// next step would leave the field or clip a live block, and rest one
    /// step short of it.
    pub fn set_sample(&mut self, aim: DVec2) -> Result<(), DegenerateAim> {
        let v = self.launch_velocity(aim, 0.5)?;
        let mut tp = self.start_position;
        loop {
            tp += v;
            let c1 = (tp.x - BALL_RADIUS as f64).round() as i32 / CELL_SIDE;
            let c2 = (tp.x + BALL_RADIUS as f64).round() as i32 / CELL_SIDE;
            let row = (tp.y - BALL_RADIUS as f64).round() as i32 / CELL_SIDE;
            let in_field = tp.x >= BALL_RADIUS as f64
                && tp.x <= (FIELD_WIDTH - BALL_RADIUS) as f64
                && tp.y >= BALL_RADIUS as f64;
            let clear =
                |col: i32| self.grid.get(col, row).is_some_and(|cell| cell <= 0);
            if !(in_field && clear(c1) && clear(c2)) {
                break;
            }
        }
        self.sample_position = tp - v;
        Ok(())
    }

    /// Shift the grid down one row and seed the next round's content.
    /// Returns `false` when the descended stack has reached the floor; row 0
    /// then keeps its stale contents and no new content is generated.
    pub fn reset(&mut self) -> bool {
        self.set_remain_ball_num(self.ball_num);
        self.start_position = self.end_position;
        self.sample_position = self.start_position;
        self.double_score = false;
        self.grid.shift_rows_down();

        if self.is_over() {
            log::info!("bottom row occupied, game over at score {}", self.score);
            return false;
        }

        let (mean, dev) = self.difficulty.distribution(self.ball_num);
        for col in 0..COLUMNS as i32 {
            if self.rng.random::<f64>() < self.tuning.block_probability {
                let z: f64 = self.rng.sample(StandardNormal);
                let v = (mean + z * dev).round() as i32;
                self.grid.set(col, 0, v.max(0));
            } else {
                self.grid.set(col, 0, 0);
            }
        }

        // Control circles land on independent columns and overwrite whatever
        // the block pass put there.
        if self.rng.random::<f64>() < self.tuning.random_turn_probability {
            let col = self.rng.random_range(0..COLUMNS) as i32;
            self.grid.set(col, 0, Special::RandomTurn.code());
        }
        if self.rng.random::<f64>() < self.tuning.delete_ball_probability {
            let col = self.rng.random_range(0..COLUMNS) as i32;
            self.grid.set(col, 0, Special::DeleteBall.code());
        }
        if self.rng.random::<f64>() < self.tuning.double_score_probability {
            let col = self.rng.random_range(0..COLUMNS) as i32;
            self.grid.set(col, 0, Special::DoubleScore.code());
        }
        // no new-ball circles once the count nears the overflow guard
        if self.ball_num < i32::MAX / 2
            && self.rng.random::<f64>() < self.tuning.new_ball_probability
        {
            let col = self.rng.random_range(0..COLUMNS) as i32;
            self.grid.set(col, 0, Special::NewBall.code());
        }
        true
    }

    /// Return every counter and cell to the new-game state.
    pub fn reset_all(&mut self) {
        self.set_ball_num(1);
        self.set_remain_ball_num(1);
        self.start_position = default_start();
        self.end_position = self.start_position;
        self.grid.clear();
        self.set_score(0);
        self.round = None;
    }
}
