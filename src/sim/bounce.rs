//! Per-ball, per-tick collision resolution
//!
//! A ball only ever collides with the boundaries of the cell it occupies:
//! whether an edge actually reflects depends on the obstruction mask taken
//! before the step (is there a wall or block on that side at all) and the
//! contact mask taken after it (did the step reach that edge). Requiring
//! both kills phantom bounces at cell seams.

use glam::DVec2;
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::{FRAC_PI_2, PI};

use super::grid::{Sides, Special};
use super::state::{Ball, Playfield};
use crate::consts::*;

/// Straight reflection: flip one velocity component and mirror the position
/// about the boundary by twice the overshoot of the ball's near edge.
fn reflect_axis(vel: &mut f64, pos: &mut f64, boundary: i32, low_edge: bool) {
    *vel = -*vel;
    let radius = if low_edge { -BALL_RADIUS } else { BALL_RADIUS };
    let overshoot = boundary as f64 - (*pos + radius as f64);
    *pos += 2.0 * overshoot;
}

/// Corner bounce about the rounded corner's tangent circle at `center`:
/// the position offset and the negated velocity both swap components, with
/// the sign flipped for the two corners whose arc runs the other way.
fn reflect_corner(ball: &mut Ball, center: DVec2, flip: bool) {
    let off = center - ball.pos;
    let swapped = DVec2::new(off.y, off.x);
    ball.pos = if flip { center - swapped } else { center + swapped };
    let turned = DVec2::new(-ball.vel.y, -ball.vel.x);
    ball.vel = if flip { -turned } else { turned };
}

/// Which of one cell's edges the ball is touching or past.
///
/// The bottom edge of the bottom row is the floor, not a wall; it never
/// counts here and is handled by the exit branch instead.
fn edge_contacts(pos: DVec2, ls: i32, ts: i32, rs: i32, bs: i32) -> Sides {
    let mut result = Sides::empty();
    let x = pos.x.round() as i32;
    let y = pos.y.round() as i32;
    if x - BALL_RADIUS <= ls {
        result.insert(Sides::LEFT);
    }
    if x + BALL_RADIUS >= rs {
        result.insert(Sides::RIGHT);
    }
    if y - BALL_RADIUS <= ts {
        result.insert(Sides::TOP);
    }
    if bs < FIELD_HEIGHT && y + BALL_RADIUS >= bs {
        result.insert(Sides::BOTTOM);
    }
    result
}

/// Redraw a direction after a random-turn circle: normally distributed
/// around straight-left or straight-right, picked against the current
/// travel direction.
fn random_turn(map: &mut Playfield, ball: &mut Ball) {
    let mean = if (ball.vel.y / ball.vel.x).atan() + ball.vel.x < 0.0 {
        0.0
    } else {
        PI
    };
    let z: f64 = map.rng.sample(StandardNormal);
    let theta = mean + z * FRAC_PI_2;
    ball.vel = DVec2::new(BALL_SPEED * theta.cos(), BALL_SPEED * theta.sin());
}

/// Advance one ball by one velocity step and resolve every collision for
/// the step. Returns whether the ball left play (floor exit or a delete
/// circle).
pub(crate) fn step_ball(map: &mut Playfield, ball: &mut Ball) -> bool {
    let c = ball.pos.x.round() as i32 / CELL_SIDE;
    let r = ball.pos.y.round() as i32 / CELL_SIDE;
    let ls = c * CELL_SIDE;
    let rs = (c + 1) * CELL_SIDE - 1;
    let ts = r * CELL_SIDE;
    let bs = (r + 1) * CELL_SIDE - 1;
    let sides = map.grid.bounce_sides(c, r);

    if map.grid.at(c, r) < 0 {
        let center = DVec2::new((ls + CELL_SIDE / 2) as f64, (ts + CELL_SIDE / 2) as f64);
        let trigger = (CIRCLE_SIZE / 2 + BALL_RADIUS + 10) as f64;
        if ball.pos.distance(center) <= trigger {
            match Special::from_code(map.grid.at(c, r)) {
                Some(Special::NewBall) => {
                    map.set_ball_num(map.ball_num() + 1);
                    map.grid.set(c, r, 0);
                }
                Some(Special::DeleteBall) => {
                    map.grid.set(c, r, 0);
                    return true;
                }
                Some(Special::RandomTurn) | Some(Special::RandomTurnSpent) => {
                    random_turn(map, ball);
                    map.grid.set(c, r, Special::RandomTurnSpent.code());
                }
                Some(Special::DoubleScore) => {
                    map.set_double_score(true);
                    map.grid.set(c, r, 0);
                }
                None => {}
            }
        }
    }

    ball.pos += ball.vel;
    let contacts = edge_contacts(ball.pos, ls, ts, rs, bs);

    // an edge reflects only if it was obstructed before the step and the
    // step actually reached it
    if sides.contains(Sides::LEFT) && contacts.contains(Sides::LEFT) {
        reflect_axis(&mut ball.vel.x, &mut ball.pos.x, ls, true);
        if c > 0 {
            map.grid.decrement(c - 1, r);
            map.award_bounce_score();
        }
    } else if sides.contains(Sides::RIGHT) && contacts.contains(Sides::RIGHT) {
        reflect_axis(&mut ball.vel.x, &mut ball.pos.x, rs, false);
        if c < COLUMNS as i32 - 1 {
            map.grid.decrement(c + 1, r);
            map.award_bounce_score();
        }
    }

    if sides.contains(Sides::TOP) && contacts.contains(Sides::TOP) {
        reflect_axis(&mut ball.vel.y, &mut ball.pos.y, ts, true);
        if r > 0 {
            map.grid.decrement(c, r - 1);
            map.award_bounce_score();
        }
    } else if sides.contains(Sides::BOTTOM)
        && ball.pos.y + BALL_RADIUS as f64 >= FIELD_HEIGHT as f64
        && ball.vel.y > 0.0
    {
        // crossed the floor: the ball is done, nothing reflects or scores
        return true;
    } else if sides.contains(Sides::BOTTOM) && contacts.contains(Sides::BOTTOM) {
        reflect_axis(&mut ball.vel.y, &mut ball.pos.y, bs, false);
        if r < ROWS as i32 - 1 {
            map.grid.decrement(c, r + 1);
            map.award_bounce_score();
        }
    }

    // convex corners: only when the step landed on both edges at once, and
    // at most one corner per step
    if sides.contains(Sides::LEFT_TOP) && contacts.contains(Sides::LEFT | Sides::TOP) {
        let center = DVec2::new((ls + BALL_RADIUS) as f64, (ts + BALL_RADIUS) as f64);
        reflect_corner(ball, center, false);
        map.grid.decrement(c - 1, r - 1);
        map.award_bounce_score();
    } else if sides.contains(Sides::RIGHT_TOP) && contacts.contains(Sides::RIGHT | Sides::TOP) {
        let center = DVec2::new((rs - BALL_RADIUS) as f64, (ts + BALL_RADIUS) as f64);
        reflect_corner(ball, center, true);
        map.grid.decrement(c + 1, r - 1);
        map.award_bounce_score();
    } else if sides.contains(Sides::LEFT_BOTTOM) && contacts.contains(Sides::LEFT | Sides::BOTTOM)
    {
        let center = DVec2::new((ls + BALL_RADIUS) as f64, (bs - BALL_RADIUS) as f64);
        reflect_corner(ball, center, true);
        map.grid.decrement(c - 1, r + 1);
        map.award_bounce_score();
    } else if sides.contains(Sides::RIGHT_BOTTOM) && contacts.contains(Sides::RIGHT | Sides::BOTTOM)
    {
        let center = DVec2::new((rs - BALL_RADIUS) as f64, (bs - BALL_RADIUS) as f64);
        reflect_corner(ball, center, false);
        map.grid.decrement(c + 1, r + 1);
        map.award_bounce_score();
    }

    // a near-horizontal ball would stall in one row forever
    if ball.vel.y.abs() < 1.0 {
        ball.vel.y = if ball.vel.y > 0.0 { 1.0 } else { -1.0 };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until_exit(map: &mut Playfield, ball: &mut Ball, cap: u32) -> u32 {
        for tick in 0..cap {
            if step_ball(map, ball) {
                return tick;
            }
        }
        panic!("ball never exited within {cap} ticks");
    }

    #[test]
    fn unobstructed_fall_exits_without_scoring() {
        let mut map = Playfield::new(1);
        let mut ball = Ball::new(DVec2::new(299.0, 500.0), DVec2::new(0.0, BALL_SPEED));
        run_until_exit(&mut map, &mut ball, 50);
        assert!(ball.pos.y + BALL_RADIUS as f64 >= FIELD_HEIGHT as f64);
        assert_eq!(map.score(), 0);
    }

    #[test]
    fn wall_bounce_reflects_without_scoring() {
        let mut map = Playfield::new(1);
        let mut ball = Ball::new(DVec2::new(15.0, 400.0), DVec2::new(-BALL_SPEED, -5.0));
        assert!(!step_ball(&mut map, &mut ball));
        assert_eq!(ball.vel.x, BALL_SPEED);
        assert_eq!(map.score(), 0);
        // mirrored about the wall, accounting for the radius
        assert_eq!(ball.pos.x, 2.0 * BALL_RADIUS as f64 - (15.0 - BALL_SPEED));
    }

    #[test]
    fn block_bounce_decrements_and_scores() {
        let mut map = Playfield::new(1);
        map.grid.set(1, 4, 3);
        let mut ball = Ball::new(DVec2::new(215.0, 450.0), DVec2::new(-BALL_SPEED, -5.0));
        assert!(!step_ball(&mut map, &mut ball));
        assert_eq!(ball.vel.x, BALL_SPEED);
        assert_eq!(map.grid.at(1, 4), 2);
        assert_eq!(map.score(), 1);
    }

    #[test]
    fn double_score_doubles_the_award() {
        let mut map = Playfield::new(1);
        map.set_double_score(true);
        map.grid.set(1, 4, 3);
        let mut ball = Ball::new(DVec2::new(215.0, 450.0), DVec2::new(-BALL_SPEED, -5.0));
        step_ball(&mut map, &mut ball);
        assert_eq!(map.score(), 2);
    }

    #[test]
    fn top_wall_round_trip_scores_nothing() {
        // straight up from the default launch point over an empty grid:
        // reach the top wall, reflect, come back down, exit at the floor
        let mut map = Playfield::new(1);
        let mut ball = Ball::new(
            DVec2::new(299.0, (FIELD_HEIGHT - BALL_RADIUS) as f64),
            DVec2::new(0.0, -BALL_SPEED),
        );
        let mut peak = f64::MAX;
        let mut exited = false;
        for _ in 0..200 {
            if step_ball(&mut map, &mut ball) {
                exited = true;
                break;
            }
            peak = peak.min(ball.pos.y);
        }
        assert!(exited, "ball never exited");
        // it actually reached the top row before turning around
        assert!(peak <= CELL_SIDE as f64);
        assert!(peak >= BALL_RADIUS as f64 - 1.0);
        assert_eq!(map.score(), 0);
    }

    #[test]
    fn new_ball_circle_fires_once() {
        let mut map = Playfield::new(1);
        map.grid.set(2, 0, Special::NewBall.code());
        // drift through the cell center, inside the trigger distance
        let mut ball = Ball::new(DVec2::new(250.0, 60.0), DVec2::new(0.0, -5.0));
        let before = map.ball_num();
        step_ball(&mut map, &mut ball);
        assert_eq!(map.ball_num(), before + 1);
        assert_eq!(map.grid.at(2, 0), 0);

        // second pass over the now-empty cell changes nothing
        let mut again = Ball::new(DVec2::new(250.0, 60.0), DVec2::new(0.0, -5.0));
        step_ball(&mut map, &mut again);
        assert_eq!(map.ball_num(), before + 1);
    }

    #[test]
    fn circle_outside_trigger_distance_stays_armed() {
        let mut map = Playfield::new(1);
        map.grid.set(2, 0, Special::NewBall.code());
        // same cell, but the corner is farther than the trigger distance
        let mut ball = Ball::new(DVec2::new(215.0, 15.0), DVec2::new(1.0, 5.0));
        step_ball(&mut map, &mut ball);
        assert_eq!(map.grid.at(2, 0), Special::NewBall.code());
    }

    #[test]
    fn delete_circle_swallows_the_ball() {
        let mut map = Playfield::new(1);
        map.grid.set(2, 3, Special::DeleteBall.code());
        let mut ball = Ball::new(DVec2::new(250.0, 350.0), DVec2::new(0.0, 5.0));
        let before = ball.pos;
        assert!(step_ball(&mut map, &mut ball));
        assert_eq!(map.grid.at(2, 3), 0);
        // swallowed before the step: the position never advanced
        assert_eq!(ball.pos, before);
        assert_eq!(map.score(), 0);
    }

    #[test]
    fn random_turn_spends_the_circle_and_keeps_the_speed() {
        let mut map = Playfield::new(7);
        map.grid.set(2, 3, Special::RandomTurn.code());
        let mut ball = Ball::new(DVec2::new(250.0, 350.0), DVec2::new(BALL_SPEED, 5.0));
        step_ball(&mut map, &mut ball);
        assert_eq!(map.grid.at(2, 3), Special::RandomTurnSpent.code());
        assert!((ball.vel.length() - BALL_SPEED).abs() < 1e-9 || ball.vel.y.abs() == 1.0);

        // a spent circle still redirects but stays spent
        let vel_before = ball.vel;
        let mut second = Ball::new(DVec2::new(250.0, 350.0), vel_before);
        step_ball(&mut map, &mut second);
        assert_eq!(map.grid.at(2, 3), Special::RandomTurnSpent.code());
    }

    #[test]
    fn double_score_circle_lights_the_flag() {
        let mut map = Playfield::new(1);
        map.grid.set(2, 3, Special::DoubleScore.code());
        let mut ball = Ball::new(DVec2::new(250.0, 350.0), DVec2::new(0.0, -5.0));
        step_ball(&mut map, &mut ball);
        assert!(map.double_score());
        assert_eq!(map.grid.at(2, 3), 0);
    }

    #[test]
    fn corner_bounce_hits_the_diagonal_block() {
        let mut map = Playfield::new(1);
        // block diagonally up-left of cell (2, 3); both adjoining sides open
        map.grid.set(1, 2, 5);
        // ball near the top-left corner of its cell, heading into it
        let mut ball = Ball::new(
            DVec2::new(215.0, 315.0),
            DVec2::new(-BALL_SPEED, -BALL_SPEED),
        );
        let sides = map.grid.bounce_sides(2, 3);
        assert!(sides.contains(Sides::LEFT_TOP));

        assert!(!step_ball(&mut map, &mut ball));
        assert_eq!(map.grid.at(1, 2), 4);
        assert_eq!(map.score(), 1);
        // velocity components swapped and negated: up-left becomes
        // down-right
        assert!(ball.vel.x > 0.0 && ball.vel.y > 0.0);
    }

    #[test]
    fn shallow_vertical_velocity_is_clamped() {
        let mut map = Playfield::new(1);
        let mut ball = Ball::new(DVec2::new(250.0, 350.0), DVec2::new(BALL_SPEED, 0.5));
        step_ball(&mut map, &mut ball);
        assert_eq!(ball.vel.y, 1.0);

        let mut ball = Ball::new(DVec2::new(250.0, 350.0), DVec2::new(BALL_SPEED, -0.5));
        step_ball(&mut map, &mut ball);
        assert_eq!(ball.vel.y, -1.0);
    }
}
