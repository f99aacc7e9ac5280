use chrono::{DateTime, Utc};

/// Seam for the per-round deadline timer. The coordinator implements this
/// with a dedicated task; the game service only tells it when a round's
/// clock starts and when a game no longer needs one.
pub trait RoundScheduler: Send + Sync {
    /// Arm (or re-arm) the timer for a game: at `deadline` the round for
    /// `question_id` is force-closed if still open.
    fn schedule_round(&self, game_id: &str, question_id: &str, deadline: DateTime<Utc>);

    /// Disarm any pending timer for the game; called when a round completes
    /// normally or the game ends.
    fn cancel_rounds(&self, game_id: &str);
}

/// Scheduler that does nothing; for contexts without a timer task.
pub struct NoopScheduler;

impl RoundScheduler for NoopScheduler {
    fn schedule_round(&self, _game_id: &str, _question_id: &str, _deadline: DateTime<Utc>) {}

    fn cancel_rounds(&self, _game_id: &str) {}
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    pub struct RecordingScheduler {
        pub scheduled: Mutex<Vec<(String, String, DateTime<Utc>)>>,
        pub cancelled: Mutex<Vec<String>>,
    }

    impl RecordingScheduler {
        pub fn new() -> Self {
            Self {
                scheduled: Mutex::new(Vec::new()),
                cancelled: Mutex::new(Vec::new()),
            }
        }
    }

    impl RoundScheduler for RecordingScheduler {
        fn schedule_round(&self, game_id: &str, question_id: &str, deadline: DateTime<Utc>) {
            self.scheduled.lock().unwrap().push((
                game_id.to_string(),
                question_id.to_string(),
                deadline,
            ));
        }

        fn cancel_rounds(&self, game_id: &str) {
            self.cancelled.lock().unwrap().push(game_id.to_string());
        }
    }
}
