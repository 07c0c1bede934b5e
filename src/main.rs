//! Headless autoplayer
//!
//! Drives the simulation core exactly the way a UI shell would: one
//! `advance_tick` per frame, `reset` between rounds, the scoreboard
//! callback for the HUD. Useful for balance checks and as a reference
//! driver. Pass a seed as the first argument to replay a specific game.

use ballfall::sim::{Difficulty, Playfield, TickResult};
use glam::DVec2;

/// Stop runaway games; a real shell just keeps ticking.
const MAX_ROUNDS: u32 = 500;
const MAX_TICKS_PER_ROUND: u32 = 100_000;

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or_else(rand::random);
    log::info!("ballfall autoplayer, seed {seed}");

    let mut field = Playfield::new(seed);
    field.set_difficulty(Difficulty::Normal);
    field.on_scoreboard_change(|change| {
        log::debug!(
            "balls {} ({} to launch), score {}",
            change.ball_num,
            change.remain_ball_num,
            change.score
        );
    });

    field.reset_all();
    let mut rounds = 0;
    while rounds < MAX_ROUNDS && field.reset() {
        rounds += 1;
        let start = field.start_position();
        // sweep shots left and right of the launch column
        let lean = if rounds % 2 == 0 { 40.0 } else { -40.0 };
        let aim = DVec2::new(start.x + lean, start.y - 200.0);
        if let Err(e) = field.start_round(aim) {
            log::error!("round {rounds} refused: {e}");
            break;
        }

        let mut ticks = 0;
        while field.advance_tick() == TickResult::Flying {
            ticks += 1;
            if ticks >= MAX_TICKS_PER_ROUND {
                log::warn!("round {rounds} ran away, abandoning the game");
                return;
            }
        }
        log::info!(
            "round {rounds}: {ticks} ticks, {} balls, score {}",
            field.ball_num(),
            field.score()
        );
    }

    println!(
        "game over after {rounds} rounds - final score {}",
        field.score()
    );
}
