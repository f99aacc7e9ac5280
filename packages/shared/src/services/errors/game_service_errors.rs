use crate::repositories::errors::game_repository_errors::GameSessionRepositoryError;
use crate::services::errors::question_service_errors::QuestionServiceError;
use crate::services::errors::rating_service_errors::RatingServiceError;

#[derive(Debug)]
pub enum GameServiceError {
    /// The session is missing or not IN_PROGRESS.
    GameNotActive,
    /// The caller is not one of the session's two players.
    PlayerNotFound,
    QuestionNotFound,
    QuestionError(QuestionServiceError),
    RatingError(RatingServiceError),
    RepositoryError(GameSessionRepositoryError),
}

impl std::fmt::Display for GameServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameServiceError::GameNotActive => write!(f, "Game not active"),
            GameServiceError::PlayerNotFound => write!(f, "Player not found"),
            GameServiceError::QuestionNotFound => write!(f, "Question not found"),
            GameServiceError::QuestionError(err) => write!(f, "{}", err),
            GameServiceError::RatingError(err) => write!(f, "Rating error: {}", err),
            GameServiceError::RepositoryError(err) => write!(f, "Repository error: {}", err),
        }
    }
}

impl std::error::Error for GameServiceError {}

impl From<QuestionServiceError> for GameServiceError {
    fn from(err: QuestionServiceError) -> Self {
        GameServiceError::QuestionError(err)
    }
}

impl From<RatingServiceError> for GameServiceError {
    fn from(err: RatingServiceError) -> Self {
        GameServiceError::RatingError(err)
    }
}

impl From<GameSessionRepositoryError> for GameServiceError {
    fn from(err: GameSessionRepositoryError) -> Self {
        GameServiceError::RepositoryError(err)
    }
}
