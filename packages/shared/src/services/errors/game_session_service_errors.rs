use crate::repositories::errors::game_repository_errors::GameSessionRepositoryError;
use crate::services::errors::question_service_errors::QuestionServiceError;

#[derive(Debug)]
pub enum GameSessionServiceError {
    /// No WAITING session carries the presented join code.
    InvalidCode,
    /// The joining player already sits in the session.
    AlreadyJoined,
    QuestionError(QuestionServiceError),
    RepositoryError(GameSessionRepositoryError),
}

impl std::fmt::Display for GameSessionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSessionServiceError::InvalidCode => write!(f, "Invalid or expired code"),
            GameSessionServiceError::AlreadyJoined => {
                write!(f, "You are already in this game")
            }
            GameSessionServiceError::QuestionError(err) => write!(f, "{}", err),
            GameSessionServiceError::RepositoryError(err) => {
                write!(f, "Repository error: {}", err)
            }
        }
    }
}

impl std::error::Error for GameSessionServiceError {}

impl From<QuestionServiceError> for GameSessionServiceError {
    fn from(err: QuestionServiceError) -> Self {
        GameSessionServiceError::QuestionError(err)
    }
}

impl From<GameSessionRepositoryError> for GameSessionServiceError {
    fn from(err: GameSessionRepositoryError) -> Self {
        GameSessionServiceError::RepositoryError(err)
    }
}
