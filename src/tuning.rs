//! Content-generation tuning
//!
//! The odds that drive the between-round content pass, persisted as JSON so
//! a shell can rebalance the game without a rebuild. Defaults reproduce the
//! built-in balance.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::consts::SPAWN_INTERVAL;

/// Content-generation odds and launch cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Chance that a fresh top-row cell receives a numbered block.
    pub block_probability: f64,
    /// Chance of overlaying a random-turn circle on the fresh row.
    pub random_turn_probability: f64,
    /// Chance of overlaying a delete-ball circle.
    pub delete_ball_probability: f64,
    /// Chance of overlaying a double-score circle.
    pub double_score_probability: f64,
    /// Chance of overlaying a new-ball circle (skipped near the ball-count
    /// cap).
    pub new_ball_probability: f64,
    /// Ticks between ball launches within a round.
    pub spawn_interval: i32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            block_probability: 0.6,
            random_turn_probability: 0.5,
            delete_ball_probability: 0.2,
            double_score_probability: 0.2,
            new_ball_probability: 0.5,
            spawn_interval: SPAWN_INTERVAL,
        }
    }
}

impl Tuning {
    pub fn load(reader: impl Read) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }

    pub fn save(&self, writer: impl Write) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }

    /// Every probability in range and a usable cadence.
    pub fn is_valid(&self) -> bool {
        let probabilities = [
            self.block_probability,
            self.random_turn_probability,
            self.delete_ball_probability,
            self.double_score_probability,
            self.new_ball_probability,
        ];
        probabilities.iter().all(|p| (0.0..=1.0).contains(p)) && self.spawn_interval >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Tuning::default().is_valid());
    }

    #[test]
    fn json_round_trip() {
        let tuning = Tuning {
            block_probability: 0.8,
            spawn_interval: 5,
            ..Tuning::default()
        };
        let mut bytes = Vec::new();
        tuning.save(&mut bytes).unwrap();
        let loaded = Tuning::load(bytes.as_slice()).unwrap();
        assert_eq!(loaded, tuning);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let loaded = Tuning::load(br#"{ "block_probability": 0.3 }"#.as_slice()).unwrap();
        assert_eq!(loaded.block_probability, 0.3);
        assert_eq!(loaded.spawn_interval, SPAWN_INTERVAL);
    }

    #[test]
    fn out_of_range_odds_are_invalid() {
        let tuning = Tuning {
            delete_ball_probability: 1.5,
            ..Tuning::default()
        };
        assert!(!tuning.is_valid());
        let tuning = Tuning {
            spawn_interval: 0,
            ..Tuning::default()
        };
        assert!(!tuning.is_valid());
    }
}
