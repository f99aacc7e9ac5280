use crate::repositories::errors::stats_repository_errors::StatsRepositoryError;

#[derive(Debug)]
pub enum RatingServiceError {
    RepositoryError(StatsRepositoryError),
}

impl std::fmt::Display for RatingServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingServiceError::RepositoryError(err) => write!(f, "Repository error: {}", err),
        }
    }
}

impl std::error::Error for RatingServiceError {}

impl From<StatsRepositoryError> for RatingServiceError {
    fn from(err: StatsRepositoryError) -> Self {
        RatingServiceError::RepositoryError(err)
    }
}
