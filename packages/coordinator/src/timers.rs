use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use shared::services::game_service::GameService;
use shared::services::round_timer::RoundScheduler;

pub enum TimerCommand {
    Schedule {
        game_id: String,
        question_id: String,
        deadline: DateTime<Utc>,
    },
    Cancel {
        game_id: String,
    },
}

/// Cheap clonable scheduler handle; commands go to the timer task's mailbox.
#[derive(Clone)]
pub struct RoundTimerHandle {
    tx: mpsc::UnboundedSender<TimerCommand>,
}

pub fn round_timer_channel() -> (RoundTimerHandle, mpsc::UnboundedReceiver<TimerCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RoundTimerHandle { tx }, rx)
}

impl RoundScheduler for RoundTimerHandle {
    fn schedule_round(&self, game_id: &str, question_id: &str, deadline: DateTime<Utc>) {
        let _ = self.tx.send(TimerCommand::Schedule {
            game_id: game_id.to_string(),
            question_id: question_id.to_string(),
            deadline,
        });
    }

    fn cancel_rounds(&self, game_id: &str) {
        let _ = self.tx.send(TimerCommand::Cancel {
            game_id: game_id.to_string(),
        });
    }
}

/// Owns at most one armed timer per game. Re-arming replaces the previous
/// timer; cancelling aborts it. On expiry the round is force-closed through
/// the normal pipeline.
pub async fn run_round_timer(mut rx: mpsc::UnboundedReceiver<TimerCommand>, games: GameService) {
    let mut pending: HashMap<String, JoinHandle<()>> = HashMap::new();

    while let Some(command) = rx.recv().await {
        match command {
            TimerCommand::Schedule {
                game_id,
                question_id,
                deadline,
            } => {
                if let Some(previous) = pending.remove(&game_id) {
                    previous.abort();
                }
                debug!(
                    "Armed round timer for game {} question {} at {}",
                    game_id, question_id, deadline
                );
                let games = games.clone();
                let task_game_id = game_id.clone();
                let handle = tokio::spawn(async move {
                    let wait = (deadline - Utc::now()).to_std().unwrap_or_default();
                    tokio::time::sleep(wait).await;
                    if let Err(err) = games.force_close_round(&task_game_id, &question_id).await {
                        error!(
                            "Failed to force-close round {} of game {}: {}",
                            question_id, task_game_id, err
                        );
                    }
                });
                pending.insert(game_id, handle);
            }
            TimerCommand::Cancel { game_id } => {
                if let Some(handle) = pending.remove(&game_id) {
                    handle.abort();
                    debug!("Cancelled round timer for game {}", game_id);
                }
            }
        }
    }
}
