use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::info;

use crate::models::game_session::{GameSession, GameStatus, PlayerState, QuestionRef};
use crate::models::question::Question;
use crate::repositories::errors::game_repository_errors::GameSessionRepositoryError;
use crate::repositories::game_repository::GameSessionRepository;
use crate::services::errors::game_session_service_errors::GameSessionServiceError;
use crate::services::question_service::{QuestionService, QUESTIONS_PER_MATCH};

/// Short shareable token for a private room, e.g. "3FA9C1".
pub fn generate_join_code() -> String {
    let bytes: [u8; 3] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Owns session creation and the private-room lifecycle. Uniqueness of join
/// codes is not verified against existing WAITING sessions; a collision makes
/// the older room unreachable by code until it starts.
#[derive(Clone)]
pub struct GameSessionService {
    repository: Arc<dyn GameSessionRepository>,
    questions: QuestionService,
}

impl GameSessionService {
    pub fn new(repository: Arc<dyn GameSessionRepository>, questions: QuestionService) -> Self {
        GameSessionService {
            repository,
            questions,
        }
    }

    pub async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<Option<GameSession>, GameSessionServiceError> {
        Ok(self.repository.get_game_session(session_id).await?)
    }

    /// Creates a matched public duel, already IN_PROGRESS. Returns the full
    /// sampled questions alongside the session so the caller can emit
    /// `game_started` without a second read.
    pub async fn create_public_session(
        &self,
        player_1: PlayerState,
        player_2: PlayerState,
        topic: &str,
        category: &str,
    ) -> Result<(GameSession, Vec<Question>), GameSessionServiceError> {
        let questions = self
            .questions
            .sample(category, topic, QUESTIONS_PER_MATCH)
            .await?;

        let session = GameSession::new_public(
            player_1,
            player_2,
            topic,
            category,
            question_refs(&questions),
        );
        self.repository.create_game_session(&session).await?;

        info!(
            "Created public session {} ({} / {})",
            session.id, session.category, session.topic
        );
        Ok((session, questions))
    }

    pub async fn create_private_session(
        &self,
        player_id: &str,
        connection_id: &str,
        topic: &str,
        category: &str,
    ) -> Result<GameSession, GameSessionServiceError> {
        let join_code = generate_join_code();
        let session = GameSession::new_private(
            PlayerState::new(player_id, connection_id),
            topic,
            category,
            &join_code,
        );
        self.repository.create_game_session(&session).await?;

        info!("Created private session {} code {}", session.id, join_code);
        Ok(session)
    }

    /// Second player joins by code: the session fills up, questions are
    /// sampled, and the duel starts. The storage write is guarded on the
    /// session still being WAITING, so of two racing joiners exactly one
    /// wins; the loser sees the same `InvalidCode` as a wrong code.
    pub async fn join_private_session(
        &self,
        player_id: &str,
        connection_id: &str,
        join_code: &str,
    ) -> Result<(GameSession, Vec<Question>), GameSessionServiceError> {
        let session = self
            .repository
            .get_by_join_code(join_code)
            .await?
            .ok_or(GameSessionServiceError::InvalidCode)?;

        if session.status != GameStatus::Waiting {
            return Err(GameSessionServiceError::InvalidCode);
        }
        if session.player(player_id).is_some() {
            return Err(GameSessionServiceError::AlreadyJoined);
        }

        let questions = self
            .questions
            .sample(&session.category, &session.topic, QUESTIONS_PER_MATCH)
            .await?;

        let mut started = session;
        started
            .players
            .push(PlayerState::new(player_id, connection_id));
        started.questions = question_refs(&questions);
        started.status = GameStatus::InProgress;
        let now = Utc::now();
        started.started_at = Some(now);
        started.current_round_started_at = now;

        match self.repository.start_private_session(&started).await {
            Ok(()) => {
                info!("Private session {} started", started.id);
                Ok((started, questions))
            }
            Err(GameSessionRepositoryError::ConditionalCheckFailed) => {
                Err(GameSessionServiceError::InvalidCode)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn question_refs(questions: &[Question]) -> Vec<QuestionRef> {
    questions
        .iter()
        .map(|q| QuestionRef {
            question_id: q.id.clone(),
            time_limit_secs: q.time_limit_secs(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, QuestionOption, QuestionType};
    use crate::repositories::game_repository::test_util::InMemoryGameSessionRepository;
    use crate::repositories::question_repository::test_util::InMemoryQuestionRepository;

    fn question(id: &str, difficulty: Difficulty) -> Question {
        Question {
            id: id.to_string(),
            title: format!("Question {}", id),
            description: "desc".to_string(),
            difficulty: Some(difficulty),
            topic: "DSA".to_string(),
            category: "CS".to_string(),
            question_type: QuestionType::MultipleChoice,
            options: vec![QuestionOption {
                text: "yes".to_string(),
                is_correct: true,
            }],
            correct_answer: None,
            explanation: None,
            is_active: true,
        }
    }

    fn service_with_questions(
        games: Arc<InMemoryGameSessionRepository>,
        questions: Vec<Question>,
    ) -> GameSessionService {
        let question_repository =
            Arc::new(InMemoryQuestionRepository::new().with_questions(questions));
        GameSessionService::new(games, QuestionService::new(question_repository))
    }

    #[test]
    fn test_join_codes_are_six_uppercase_hex_chars() {
        let code = generate_join_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(code, code.to_uppercase());
    }

    #[tokio::test]
    async fn test_public_session_freezes_time_limits_from_difficulty() {
        let games = Arc::new(InMemoryGameSessionRepository::new());
        let service = service_with_questions(
            games.clone(),
            vec![
                question("q1", Difficulty::Easy),
                question("q2", Difficulty::Medium),
                question("q3", Difficulty::Hard),
            ],
        );

        let (session, questions) = service
            .create_public_session(
                PlayerState::new("p1", "c1"),
                PlayerState::new("p2", "c2"),
                "DSA",
                "CS",
            )
            .await
            .unwrap();

        assert_eq!(session.status, GameStatus::InProgress);
        assert_eq!(questions.len(), 3);
        let mut limits: Vec<u32> = session.questions.iter().map(|q| q.time_limit_secs).collect();
        limits.sort_unstable();
        assert_eq!(limits, vec![15, 20, 25]);
        assert!(games.snapshot(&session.id).is_some());
    }

    #[tokio::test]
    async fn test_join_private_starts_the_game() {
        let games = Arc::new(InMemoryGameSessionRepository::new());
        let service =
            service_with_questions(games.clone(), vec![question("q1", Difficulty::Easy)]);

        let created = service
            .create_private_session("creator", "c1", "DSA", "CS")
            .await
            .unwrap();
        let code = created.join_code.clone().unwrap();

        let (started, questions) = service
            .join_private_session("joiner", "c2", &code)
            .await
            .unwrap();

        assert_eq!(started.id, created.id);
        assert_eq!(started.status, GameStatus::InProgress);
        assert_eq!(started.players.len(), 2);
        assert!(started.started_at.is_some());
        assert_eq!(questions.len(), 1);

        let stored = games.snapshot(&created.id).unwrap();
        assert_eq!(stored.status, GameStatus::InProgress);
    }

    #[tokio::test]
    async fn test_join_private_with_unknown_code_fails() {
        let games = Arc::new(InMemoryGameSessionRepository::new());
        let service = service_with_questions(games, vec![question("q1", Difficulty::Easy)]);

        let err = service
            .join_private_session("joiner", "c2", "ZZZZZZ")
            .await
            .unwrap_err();
        assert!(matches!(err, GameSessionServiceError::InvalidCode));
    }

    #[tokio::test]
    async fn test_join_private_twice_reports_started_room_as_invalid() {
        let games = Arc::new(InMemoryGameSessionRepository::new());
        let service =
            service_with_questions(games.clone(), vec![question("q1", Difficulty::Easy)]);

        let created = service
            .create_private_session("creator", "c1", "DSA", "CS")
            .await
            .unwrap();
        let code = created.join_code.clone().unwrap();

        service
            .join_private_session("joiner", "c2", &code)
            .await
            .unwrap();
        let err = service
            .join_private_session("late", "c3", &code)
            .await
            .unwrap_err();
        assert!(matches!(err, GameSessionServiceError::InvalidCode));
    }

    #[tokio::test]
    async fn test_creator_cannot_join_their_own_room() {
        let games = Arc::new(InMemoryGameSessionRepository::new());
        let service =
            service_with_questions(games.clone(), vec![question("q1", Difficulty::Easy)]);

        let created = service
            .create_private_session("creator", "c1", "DSA", "CS")
            .await
            .unwrap();
        let code = created.join_code.clone().unwrap();

        let err = service
            .join_private_session("creator", "c1-reconnected", &code)
            .await
            .unwrap_err();
        assert!(matches!(err, GameSessionServiceError::AlreadyJoined));
    }
}
