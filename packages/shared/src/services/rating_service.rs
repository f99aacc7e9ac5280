use std::sync::Arc;

use tracing::info;

use crate::models::game_session::PlayerResult;
use crate::models::stats::PlayerStats;
use crate::repositories::stats_repository::StatsRepository;
use crate::services::errors::rating_service_errors::RatingServiceError;

const ELO_K_FACTOR: f64 = 32.0;

/// Probability of `rating` beating `opponent` under the Elo model.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// Rating delta for one player of a finished duel.
pub fn rating_delta(rating: i32, opponent: i32, result: PlayerResult) -> i32 {
    let actual = match result {
        PlayerResult::Win => 1.0,
        PlayerResult::Loss => 0.0,
        PlayerResult::Draw => 0.5,
    };
    (ELO_K_FACTOR * (actual - expected_score(rating, opponent))).round() as i32
}

/// Deltas for both sides. The second delta is the negation of the first
/// rather than an independent computation, so every duel is exactly zero-sum
/// even where rounding would otherwise drift by a point.
pub fn duel_deltas(rating_1: i32, rating_2: i32, result_1: PlayerResult) -> (i32, i32) {
    let delta_1 = rating_delta(rating_1, rating_2, result_1);
    (delta_1, -delta_1)
}

/// Rating Engine: the only writer of player stats, invoked once per duel at
/// the FINISHED transition.
#[derive(Clone)]
pub struct RatingService {
    repository: Arc<dyn StatsRepository>,
}

impl RatingService {
    pub fn new(repository: Arc<dyn StatsRepository>) -> Self {
        RatingService { repository }
    }

    /// First game for an unseen player starts from the default rating.
    pub async fn get_or_default(&self, player_id: &str) -> Result<PlayerStats, RatingServiceError> {
        Ok(self
            .repository
            .get_stats(player_id)
            .await?
            .unwrap_or_else(|| PlayerStats::new(player_id)))
    }

    /// Read-modify-write of one player's aggregate. Safe without a guard:
    /// no two settlements for the same player run concurrently.
    pub async fn apply_result(
        &self,
        player_id: &str,
        result: PlayerResult,
        rating_change: i32,
        topic: &str,
    ) -> Result<PlayerStats, RatingServiceError> {
        let mut stats = self.get_or_default(player_id).await?;
        stats.apply_game_result(result, rating_change, topic);
        self.repository.put_stats(&stats).await?;

        info!(
            "Applied rating change {} to player {} (now {})",
            rating_change, player_id, stats.rating
        );
        Ok(stats)
    }
}
