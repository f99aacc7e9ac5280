#[derive(Debug)]
pub enum GameSessionRepositoryError {
    /// A conditional write lost its guard: duplicate answer, stale round
    /// counter, or a status that already moved on. Callers resolve this by
    /// re-reading, never by surfacing an error.
    ConditionalCheckFailed,
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for GameSessionRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSessionRepositoryError::ConditionalCheckFailed => {
                write!(f, "Conditional check failed")
            }
            GameSessionRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            GameSessionRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for GameSessionRepositoryError {}
