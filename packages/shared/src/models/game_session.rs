use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Waiting,
    InProgress,
    Finished,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerResult {
    Win,
    Loss,
    Draw,
}

impl PlayerResult {
    /// The opponent's result in a 1v1 duel.
    pub fn opposite(self) -> Self {
        match self {
            PlayerResult::Win => PlayerResult::Loss,
            PlayerResult::Loss => PlayerResult::Win,
            PlayerResult::Draw => PlayerResult::Draw,
        }
    }
}

/// A question attached to a session, with the time limit frozen at sampling
/// time so later edits to the question bank cannot change an in-flight game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRef {
    pub question_id: String,
    pub time_limit_secs: u32,
}

/// Immutable once written. `points_awarded` is persisted so a duplicate
/// submission can be answered with the exact original payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub submitted_answer: String,
    pub is_correct: bool,
    pub time_taken_secs: f64,
    pub points_awarded: i32,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: String,
    pub connection_id: String,
    pub score: i32,
    /// Keyed by question id; the storage layer enforces at most one entry
    /// per question with a conditional write on the map path.
    pub answers: HashMap<String, AnswerRecord>,
    pub result: Option<PlayerResult>,
    pub rating_change: Option<i32>,
    pub rating_after: Option<i32>,
}

impl PlayerState {
    pub fn new(player_id: &str, connection_id: &str) -> Self {
        PlayerState {
            player_id: player_id.to_string(),
            connection_id: connection_id.to_string(),
            score: 0,
            answers: HashMap::new(),
            result: None,
            rating_change: None,
            rating_after: None,
        }
    }

    pub fn has_answered(&self, question_id: &str) -> bool {
        self.answers.contains_key(question_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub mode: GameMode,
    pub status: GameStatus,
    /// Present only for PRIVATE sessions; omitted from the stored item when
    /// absent so the join-code index stays sparse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_code: Option<String>,
    pub topic: String,
    pub category: String,
    pub questions: Vec<QuestionRef>,
    pub players: Vec<PlayerState>,
    /// Monotonic round counter used as the optimistic guard for round
    /// advancement; only one of two racing completion checks may bump it.
    pub rounds_completed: u32,
    pub current_round_started_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl GameSession {
    /// A public session starts immediately: both players are known and the
    /// first round clock begins now.
    pub fn new_public(
        player_1: PlayerState,
        player_2: PlayerState,
        topic: &str,
        category: &str,
        questions: Vec<QuestionRef>,
    ) -> Self {
        let now = Utc::now();
        GameSession {
            id: Uuid::new_v4().to_string(),
            mode: GameMode::Public,
            status: GameStatus::InProgress,
            join_code: None,
            topic: topic.to_string(),
            category: category.to_string(),
            questions,
            players: vec![player_1, player_2],
            rounds_completed: 0,
            current_round_started_at: now,
            started_at: Some(now),
            ended_at: None,
        }
    }

    /// A private session waits for a second player; questions are sampled
    /// when the opponent joins.
    pub fn new_private(creator: PlayerState, topic: &str, category: &str, join_code: &str) -> Self {
        GameSession {
            id: Uuid::new_v4().to_string(),
            mode: GameMode::Private,
            status: GameStatus::Waiting,
            join_code: Some(join_code.to_string()),
            topic: topic.to_string(),
            category: category.to_string(),
            questions: Vec::new(),
            players: vec![creator],
            rounds_completed: 0,
            current_round_started_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.player_id == player_id)
    }

    pub fn opponent_of(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.player_id != player_id)
    }

    pub fn question_ref(&self, question_id: &str) -> Option<&QuestionRef> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }

    /// A round is complete once every player holds an answer for the question.
    pub fn round_complete(&self, question_id: &str) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.has_answered(question_id))
    }

    pub fn all_answered(&self) -> bool {
        !self.players.is_empty()
            && self
                .players
                .iter()
                .all(|p| p.answers.len() >= self.questions.len())
    }

    /// The question the session is currently on: the first one some player
    /// has not answered yet.
    pub fn current_question(&self) -> Option<&QuestionRef> {
        self.questions
            .iter()
            .find(|q| !self.round_complete(&q.question_id))
    }
}
