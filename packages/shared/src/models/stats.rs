use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::game_session::PlayerResult;

pub const DEFAULT_RATING: i32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStats {
    pub rating: i32,
}

impl Default for TopicStats {
    fn default() -> Self {
        TopicStats {
            rating: DEFAULT_RATING,
        }
    }
}

/// Per-player skill aggregate. Written only by the rating engine at game
/// completion; a plain read-modify-write is safe because no two games for the
/// same player settle concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: String,
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
    pub games_played: u32,
    #[serde(default)]
    pub topics: HashMap<String, TopicStats>,
}

impl PlayerStats {
    pub fn new(player_id: &str) -> Self {
        PlayerStats {
            player_id: player_id.to_string(),
            rating: DEFAULT_RATING,
            wins: 0,
            losses: 0,
            games_played: 0,
            topics: HashMap::new(),
        }
    }

    /// Folds one finished duel into the aggregate: overall rating, win/loss
    /// counters, games played, and the per-topic rating for the duel's topic.
    pub fn apply_game_result(&mut self, result: PlayerResult, rating_change: i32, topic: &str) {
        self.games_played += 1;
        self.rating += rating_change;

        match result {
            PlayerResult::Win => self.wins += 1,
            PlayerResult::Loss => self.losses += 1,
            PlayerResult::Draw => {}
        }

        let topic_stats = self.topics.entry(topic.to_string()).or_default();
        topic_stats.rating += rating_change;
    }
}
