use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game_session::{GameSession, GameStatus, PlayerResult};
use crate::models::question::{PublicQuestion, Question};

/// One player's line in a `round_over` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub player_id: String,
    pub is_correct: bool,
    pub points: i32,
    pub score: i32,
}

/// Live score snapshot used by `game_sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreView {
    pub player_id: String,
    pub score: i32,
}

/// One player's final line in a `game_over` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerOutcome {
    pub player_id: String,
    pub score: i32,
    pub result: PlayerResult,
    pub rating_change: i32,
    pub rating_after: i32,
}

/// Everything the server pushes to a connection. Serialized as JSON with an
/// `event` tag; this enum is the single source of truth for the outbound
/// wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    QueueJoined {
        message: String,
    },
    MatchFound {
        game_id: String,
    },
    PrivateCreated {
        game_id: String,
        code: String,
    },
    GameStarted {
        game_id: String,
        players: Vec<String>,
        questions: Vec<PublicQuestion>,
        start_time: DateTime<Utc>,
    },
    AnswerResult {
        question_id: String,
        is_correct: bool,
        points: i32,
        new_score: i32,
    },
    WaitingForOpponent {
        message: String,
    },
    OpponentAnswered {
        user_id: String,
    },
    RoundOver {
        question_id: String,
        correct_answer: Option<String>,
        results: Vec<RoundResult>,
        next_round_start_time: DateTime<Utc>,
    },
    GameSync {
        game_id: String,
        status: GameStatus,
        current_question_index: usize,
        current_round_started_at: DateTime<Utc>,
        players: Vec<ScoreView>,
        questions: Vec<PublicQuestion>,
    },
    GameOver {
        game_id: String,
        winner_id: Option<String>,
        results: Vec<PlayerOutcome>,
    },
    Error {
        message: String,
    },
    Pong,
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn queue_joined() -> Self {
        ServerEvent::QueueJoined {
            message: "Waiting for opponent...".to_string(),
        }
    }

    pub fn waiting_for_opponent() -> Self {
        ServerEvent::WaitingForOpponent {
            message: "Waiting for opponent...".to_string(),
        }
    }

    /// The kick-off payload both players receive, with the sampled questions
    /// reduced to their public views.
    pub fn game_started(session: &GameSession, questions: &[Question]) -> Self {
        ServerEvent::GameStarted {
            game_id: session.id.clone(),
            players: session
                .players
                .iter()
                .map(|p| p.player_id.clone())
                .collect(),
            questions: questions.iter().map(|q| q.public_view()).collect(),
            start_time: session.started_at.unwrap_or(session.current_round_started_at),
        }
    }
}
