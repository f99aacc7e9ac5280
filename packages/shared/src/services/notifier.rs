use async_trait::async_trait;

use crate::models::events::ServerEvent;

/// Delivery seam between the domain services and whatever owns the live
/// connections. Implementations resolve the player's current connection at
/// send time; a player with no connection is skipped silently — delivery
/// failure must never bleed into game state.
#[async_trait]
pub trait ConnectionNotifier: Send + Sync {
    async fn send_to_player(&self, player_id: &str, event: &ServerEvent);
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;
    use std::sync::Mutex;

    /// Captures every event for assertion.
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, ServerEvent)>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn events_for(&self, player_id: &str) -> Vec<ServerEvent> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(p, _)| p == player_id)
                .map(|(_, e)| e.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ConnectionNotifier for RecordingNotifier {
        async fn send_to_player(&self, player_id: &str, event: &ServerEvent) {
            self.sent
                .lock()
                .unwrap()
                .push((player_id.to_string(), event.clone()));
        }
    }
}
