use crate::repositories::errors::question_repository_errors::QuestionRepositoryError;

#[derive(Debug)]
pub enum QuestionServiceError {
    /// The bank holds no active question for the requested category/topic.
    NoQuestionsAvailable,
    RepositoryError(QuestionRepositoryError),
}

impl std::fmt::Display for QuestionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionServiceError::NoQuestionsAvailable => {
                write!(f, "No questions available for this topic")
            }
            QuestionServiceError::RepositoryError(err) => write!(f, "Repository error: {}", err),
        }
    }
}

impl std::error::Error for QuestionServiceError {}

impl From<QuestionRepositoryError> for QuestionServiceError {
    fn from(err: QuestionRepositoryError) -> Self {
        QuestionServiceError::RepositoryError(err)
    }
}
