//! Round controller: launch cadence and the active-ball roster

use glam::DVec2;

use super::bounce::step_ball;
use super::state::{Ball, Playfield};
use crate::consts::{BALL_RADIUS, FIELD_HEIGHT, FIELD_WIDTH};

/// Bounded wrapping counter driving the launch cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopVar {
    value: i32,
    min: i32,
    max: i32,
}

impl LoopVar {
    pub fn new(value: i32, min: i32, max: i32) -> Self {
        Self { value, min, max }
    }

    /// Step the counter; returns whether it wrapped back to the minimum.
    pub fn advance(&mut self) -> bool {
        self.value += 1;
        if self.value >= self.max {
            self.value = self.min;
        }
        self.value == self.min
    }

    pub fn value(&self) -> i32 {
        self.value
    }
}

/// One round of play: the roster of balls in flight plus the counters that
/// decide when the next ball launches and when the round is done.
///
/// Created with a snapshot of the playfield's ball count so that new-ball
/// circles touched mid-round only take effect next round.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub(crate) total: i32,
    pub(crate) exited: i32,
    pub(crate) cadence: LoopVar,
    pub(crate) balls: Vec<Ball>,
}

impl Round {
    /// Start at the cadence maximum so the first ball launches on the first
    /// tick.
    pub(crate) fn new(total: i32, spawn_interval: i32) -> Self {
        Round {
            total,
            exited: 0,
            cadence: LoopVar::new(spawn_interval, 0, spawn_interval),
            balls: Vec::new(),
        }
    }

    pub(crate) fn restore(total: i32, exited: i32, cadence: LoopVar, balls: Vec<Ball>) -> Self {
        Round {
            total,
            exited,
            cadence,
            balls,
        }
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    /// Every ball this round will ever launch is out of the field.
    pub fn is_finished(&self) -> bool {
        self.exited >= self.total
    }

    fn done_launching(&self) -> bool {
        self.balls.len() as i32 + self.exited >= self.total
    }

    /// One tick: maybe launch a ball, then step every ball in flight.
    /// Returns whether the round is still running.
    pub(crate) fn advance(&mut self, map: &mut Playfield) -> bool {
        if self.cadence.advance() && !self.done_launching() {
            self.balls
                .push(Ball::new(map.start_position(), map.start_velocity()));
            map.set_remain_ball_num(map.remain_ball_num() - 1);
        }

        let mut i = 0;
        while i < self.balls.len() {
            if step_ball(map, &mut self.balls[i]) {
                self.exited += 1;
                let ball = self.balls.remove(i);
                self.note_exit(map, ball);
            } else {
                i += 1;
            }
        }
        self.total > self.exited
    }

    /// The first ball to cross the floor fixes where next round launches
    /// from: its pre-step trajectory extended to the exact floor line.
    fn note_exit(&self, map: &mut Playfield, ball: Ball) {
        let floor = (FIELD_HEIGHT - BALL_RADIUS) as f64;
        if ball.pos.y + BALL_RADIUS as f64 >= FIELD_HEIGHT as f64
            && map.end_position() == map.start_position()
        {
            let tp = ball.pos - ball.vel;
            let h = floor - tp.y;
            let x = tp.x + h / ball.vel.y * ball.vel.x;
            let end = DVec2::new(
                x.clamp(BALL_RADIUS as f64, (FIELD_WIDTH - BALL_RADIUS) as f64),
                tp.y + h,
            );
            map.set_end_position(end);
            log::trace!("next launch point fixed at {end:?}");
        }
    }
}
