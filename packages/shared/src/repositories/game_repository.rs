use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_attribute_value, to_item};

use crate::models::game_session::{AnswerRecord, GameSession, PlayerResult};
use crate::repositories::errors::game_repository_errors::GameSessionRepositoryError;

/// Sparse GSI over `join_code`; only WAITING private sessions carry the
/// attribute.
const JOIN_CODE_INDEX: &str = "join_code-index";

/// Final standing for one player, written together with the FINISHED flip.
#[derive(Debug, Clone)]
pub struct PlayerSettlement {
    pub result: PlayerResult,
    pub rating_change: i32,
    pub rating_after: i32,
}

/// Storage contract for game sessions. Every mutation of an IN_PROGRESS
/// session is a single conditional write; a lost condition comes back as
/// `ConditionalCheckFailed` so the caller can re-read and replay.
#[async_trait]
pub trait GameSessionRepository: Send + Sync {
    async fn create_game_session(
        &self,
        game_session: &GameSession,
    ) -> Result<(), GameSessionRepositoryError>;

    async fn get_game_session(
        &self,
        session_id: &str,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError>;

    async fn get_by_join_code(
        &self,
        join_code: &str,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError>;

    /// Replaces a WAITING private session with its started form. Guarded on
    /// the stored status still being WAITING so two racing joiners resolve
    /// to exactly one winner.
    async fn start_private_session(
        &self,
        game_session: &GameSession,
    ) -> Result<(), GameSessionRepositoryError>;

    /// Appends one answer and bumps the player's score in one operation,
    /// guarded on no answer existing yet for that question.
    async fn record_answer(
        &self,
        session_id: &str,
        player_index: usize,
        record: &AnswerRecord,
    ) -> Result<(), GameSessionRepositoryError>;

    /// Bumps `rounds_completed` and resets the round clock, guarded on the
    /// expected round counter — at most one of two concurrent completion
    /// checks can win.
    async fn advance_round(
        &self,
        session_id: &str,
        expected_rounds_completed: u32,
        next_round_started_at: DateTime<Utc>,
    ) -> Result<(), GameSessionRepositoryError>;

    /// Flips the session to FINISHED and writes both players' settlements,
    /// guarded on the status still being IN_PROGRESS.
    async fn finish_session(
        &self,
        session_id: &str,
        settlements: &[PlayerSettlement],
        ended_at: DateTime<Utc>,
    ) -> Result<(), GameSessionRepositoryError>;
}

pub struct DynamoDbGameSessionRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbGameSessionRepository {
    pub fn new(client: Client) -> Self {
        let table_name = std::env::var("GAME_SESSIONS_TABLE")
            .expect("GAME_SESSIONS_TABLE environment variable must be set");
        Self { client, table_name }
    }
}

fn map_conditional<E>(err: SdkError<E>) -> GameSessionRepositoryError
where
    E: aws_sdk_dynamodb::error::ProvideErrorMetadata + std::fmt::Debug,
{
    if let SdkError::ServiceError(service_err) = &err {
        if service_err.err().code() == Some("ConditionalCheckFailedException") {
            return GameSessionRepositoryError::ConditionalCheckFailed;
        }
    }
    GameSessionRepositoryError::DynamoDb(format!("{:?}", err))
}

#[async_trait]
impl GameSessionRepository for DynamoDbGameSessionRepository {
    async fn create_game_session(
        &self,
        game_session: &GameSession,
    ) -> Result<(), GameSessionRepositoryError> {
        let item = to_item(game_session)
            .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| GameSessionRepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    async fn get_game_session(
        &self,
        session_id: &str,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(session_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| GameSessionRepositoryError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.item {
            let game_session: GameSession = from_item(item)
                .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;
            Ok(Some(game_session))
        } else {
            Ok(None)
        }
    }

    async fn get_by_join_code(
        &self,
        join_code: &str,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(JOIN_CODE_INDEX)
            .key_condition_expression("join_code = :code")
            .expression_attribute_values(":code", AttributeValue::S(join_code.to_string()))
            .send()
            .await
            .map_err(|e| GameSessionRepositoryError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.items.and_then(|items| items.into_iter().next()) {
            let game_session: GameSession = from_item(item)
                .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;
            Ok(Some(game_session))
        } else {
            Ok(None)
        }
    }

    async fn start_private_session(
        &self,
        game_session: &GameSession,
    ) -> Result<(), GameSessionRepositoryError> {
        let item = to_item(game_session)
            .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_exists(id) AND #st = :waiting")
            .expression_attribute_names("#st", "status")
            .expression_attribute_values(":waiting", AttributeValue::S("WAITING".to_string()))
            .send()
            .await
            .map_err(map_conditional)?;

        Ok(())
    }

    async fn record_answer(
        &self,
        session_id: &str,
        player_index: usize,
        record: &AnswerRecord,
    ) -> Result<(), GameSessionRepositoryError> {
        let record_value: AttributeValue = to_attribute_value(record)
            .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;

        let update = format!(
            "SET players[{i}].answers.#qid = :rec, players[{i}].score = players[{i}].score + :pts",
            i = player_index
        );
        let condition = format!(
            "attribute_not_exists(players[{i}].answers.#qid) AND #st = :in_progress",
            i = player_index
        );

        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(session_id.to_string()))
            .update_expression(update)
            .condition_expression(condition)
            .expression_attribute_names("#qid", &record.question_id)
            .expression_attribute_names("#st", "status")
            .expression_attribute_values(":rec", record_value)
            .expression_attribute_values(
                ":pts",
                AttributeValue::N(record.points_awarded.to_string()),
            )
            .expression_attribute_values(
                ":in_progress",
                AttributeValue::S("IN_PROGRESS".to_string()),
            )
            .send()
            .await
            .map_err(map_conditional)?;

        Ok(())
    }

    async fn advance_round(
        &self,
        session_id: &str,
        expected_rounds_completed: u32,
        next_round_started_at: DateTime<Utc>,
    ) -> Result<(), GameSessionRepositoryError> {
        let started_value: AttributeValue = to_attribute_value(next_round_started_at)
            .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;

        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(session_id.to_string()))
            .update_expression(
                "SET rounds_completed = :next, current_round_started_at = :started",
            )
            .condition_expression("rounds_completed = :expected AND #st = :in_progress")
            .expression_attribute_names("#st", "status")
            .expression_attribute_values(
                ":expected",
                AttributeValue::N(expected_rounds_completed.to_string()),
            )
            .expression_attribute_values(
                ":next",
                AttributeValue::N((expected_rounds_completed + 1).to_string()),
            )
            .expression_attribute_values(":started", started_value)
            .expression_attribute_values(
                ":in_progress",
                AttributeValue::S("IN_PROGRESS".to_string()),
            )
            .send()
            .await
            .map_err(map_conditional)?;

        Ok(())
    }

    async fn finish_session(
        &self,
        session_id: &str,
        settlements: &[PlayerSettlement],
        ended_at: DateTime<Utc>,
    ) -> Result<(), GameSessionRepositoryError> {
        let ended_value: AttributeValue = to_attribute_value(ended_at)
            .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;

        let mut update = "SET #st = :finished, ended_at = :ended".to_string();
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(session_id.to_string()))
            .condition_expression("#st = :in_progress")
            .expression_attribute_names("#st", "status")
            .expression_attribute_names("#res", "result")
            .expression_attribute_values(":finished", AttributeValue::S("FINISHED".to_string()))
            .expression_attribute_values(
                ":in_progress",
                AttributeValue::S("IN_PROGRESS".to_string()),
            )
            .expression_attribute_values(":ended", ended_value);

        for (i, settlement) in settlements.iter().enumerate() {
            update.push_str(&format!(
                ", players[{i}].#res = :res{i}, players[{i}].rating_change = :rc{i}, \
                 players[{i}].rating_after = :ra{i}",
                i = i
            ));
            let result_value: AttributeValue = to_attribute_value(settlement.result)
                .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;
            request = request
                .expression_attribute_values(format!(":res{}", i), result_value)
                .expression_attribute_values(
                    format!(":rc{}", i),
                    AttributeValue::N(settlement.rating_change.to_string()),
                )
                .expression_attribute_values(
                    format!(":ra{}", i),
                    AttributeValue::N(settlement.rating_after.to_string()),
                );
        }

        request
            .update_expression(update)
            .send()
            .await
            .map_err(map_conditional)?;

        Ok(())
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;
    use crate::models::game_session::GameStatus;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in with the same conditional semantics the DynamoDB
    /// implementation gets from condition expressions.
    pub struct InMemoryGameSessionRepository {
        pub sessions: Mutex<HashMap<String, GameSession>>,
    }

    impl InMemoryGameSessionRepository {
        pub fn new() -> Self {
            Self {
                sessions: Mutex::new(HashMap::new()),
            }
        }

        pub fn insert(&self, session: GameSession) {
            self.sessions
                .lock()
                .unwrap()
                .insert(session.id.clone(), session);
        }

        pub fn snapshot(&self, session_id: &str) -> Option<GameSession> {
            self.sessions.lock().unwrap().get(session_id).cloned()
        }
    }

    #[async_trait]
    impl GameSessionRepository for InMemoryGameSessionRepository {
        async fn create_game_session(
            &self,
            game_session: &GameSession,
        ) -> Result<(), GameSessionRepositoryError> {
            self.insert(game_session.clone());
            Ok(())
        }

        async fn get_game_session(
            &self,
            session_id: &str,
        ) -> Result<Option<GameSession>, GameSessionRepositoryError> {
            Ok(self.snapshot(session_id))
        }

        async fn get_by_join_code(
            &self,
            join_code: &str,
        ) -> Result<Option<GameSession>, GameSessionRepositoryError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .values()
                .find(|s| s.join_code.as_deref() == Some(join_code))
                .cloned())
        }

        async fn start_private_session(
            &self,
            game_session: &GameSession,
        ) -> Result<(), GameSessionRepositoryError> {
            let mut sessions = self.sessions.lock().unwrap();
            match sessions.get(&game_session.id) {
                Some(existing) if existing.status == GameStatus::Waiting => {
                    sessions.insert(game_session.id.clone(), game_session.clone());
                    Ok(())
                }
                _ => Err(GameSessionRepositoryError::ConditionalCheckFailed),
            }
        }

        async fn record_answer(
            &self,
            session_id: &str,
            player_index: usize,
            record: &AnswerRecord,
        ) -> Result<(), GameSessionRepositoryError> {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(session_id)
                .ok_or(GameSessionRepositoryError::ConditionalCheckFailed)?;

            if session.status != GameStatus::InProgress {
                return Err(GameSessionRepositoryError::ConditionalCheckFailed);
            }
            let player = session
                .players
                .get_mut(player_index)
                .ok_or(GameSessionRepositoryError::ConditionalCheckFailed)?;
            if player.answers.contains_key(&record.question_id) {
                return Err(GameSessionRepositoryError::ConditionalCheckFailed);
            }

            player.score += record.points_awarded;
            player
                .answers
                .insert(record.question_id.clone(), record.clone());
            Ok(())
        }

        async fn advance_round(
            &self,
            session_id: &str,
            expected_rounds_completed: u32,
            next_round_started_at: DateTime<Utc>,
        ) -> Result<(), GameSessionRepositoryError> {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(session_id)
                .ok_or(GameSessionRepositoryError::ConditionalCheckFailed)?;

            if session.status != GameStatus::InProgress
                || session.rounds_completed != expected_rounds_completed
            {
                return Err(GameSessionRepositoryError::ConditionalCheckFailed);
            }

            session.rounds_completed = expected_rounds_completed + 1;
            session.current_round_started_at = next_round_started_at;
            Ok(())
        }

        async fn finish_session(
            &self,
            session_id: &str,
            settlements: &[PlayerSettlement],
            ended_at: DateTime<Utc>,
        ) -> Result<(), GameSessionRepositoryError> {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(session_id)
                .ok_or(GameSessionRepositoryError::ConditionalCheckFailed)?;

            if session.status != GameStatus::InProgress {
                return Err(GameSessionRepositoryError::ConditionalCheckFailed);
            }

            session.status = GameStatus::Finished;
            session.ended_at = Some(ended_at);
            for (player, settlement) in session.players.iter_mut().zip(settlements) {
                player.result = Some(settlement.result);
                player.rating_change = Some(settlement.rating_change);
                player.rating_after = Some(settlement.rating_after);
            }
            Ok(())
        }
    }

}
