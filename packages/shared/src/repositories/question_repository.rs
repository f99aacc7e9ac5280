use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::from_item;

use crate::models::question::Question;
use crate::repositories::errors::question_repository_errors::QuestionRepositoryError;

/// Read-only access to the question bank. Authoring lives elsewhere; the
/// coordinator only reads.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn get_question(
        &self,
        question_id: &str,
    ) -> Result<Option<Question>, QuestionRepositoryError>;

    /// All active questions for a category, optionally narrowed to a topic.
    /// The caller samples from the returned pool.
    async fn find_active_questions(
        &self,
        category: &str,
        topic: Option<&str>,
    ) -> Result<Vec<Question>, QuestionRepositoryError>;
}

pub struct DynamoDbQuestionRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbQuestionRepository {
    pub fn new(client: Client) -> Self {
        let table_name = std::env::var("QUESTIONS_TABLE")
            .expect("QUESTIONS_TABLE environment variable must be set");
        Self { client, table_name }
    }
}

#[async_trait]
impl QuestionRepository for DynamoDbQuestionRepository {
    async fn get_question(
        &self,
        question_id: &str,
    ) -> Result<Option<Question>, QuestionRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(question_id.to_string()))
            .send()
            .await
            .map_err(|e| QuestionRepositoryError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.item {
            let question: Question = from_item(item)
                .map_err(|e| QuestionRepositoryError::Serialization(e.to_string()))?;
            Ok(Some(question))
        } else {
            Ok(None)
        }
    }

    async fn find_active_questions(
        &self,
        category: &str,
        topic: Option<&str>,
    ) -> Result<Vec<Question>, QuestionRepositoryError> {
        let mut request = self
            .client
            .scan()
            .table_name(&self.table_name)
            .expression_attribute_values(":active", AttributeValue::Bool(true))
            .expression_attribute_values(":category", AttributeValue::S(category.to_string()));

        let filter = if let Some(topic) = topic {
            request = request
                .expression_attribute_values(":topic", AttributeValue::S(topic.to_string()));
            "is_active = :active AND category = :category AND topic = :topic"
        } else {
            "is_active = :active AND category = :category"
        };

        let scan_result = request
            .filter_expression(filter)
            .send()
            .await
            .map_err(|e| QuestionRepositoryError::DynamoDb(e.to_string()))?;

        let mut questions = Vec::new();
        if let Some(items) = scan_result.items {
            for item in items {
                let question: Question = from_item(item)
                    .map_err(|e| QuestionRepositoryError::Serialization(e.to_string()))?;
                questions.push(question);
            }
        }

        Ok(questions)
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub struct InMemoryQuestionRepository {
        pub questions: Mutex<HashMap<String, Question>>,
    }

    impl InMemoryQuestionRepository {
        pub fn new() -> Self {
            Self {
                questions: Mutex::new(HashMap::new()),
            }
        }

        pub fn with_questions(self, questions: Vec<Question>) -> Self {
            {
                let mut stored = self.questions.lock().unwrap();
                for question in questions {
                    stored.insert(question.id.clone(), question);
                }
            }
            self
        }
    }

    #[async_trait]
    impl QuestionRepository for InMemoryQuestionRepository {
        async fn get_question(
            &self,
            question_id: &str,
        ) -> Result<Option<Question>, QuestionRepositoryError> {
            Ok(self.questions.lock().unwrap().get(question_id).cloned())
        }

        async fn find_active_questions(
            &self,
            category: &str,
            topic: Option<&str>,
        ) -> Result<Vec<Question>, QuestionRepositoryError> {
            let mut matches: Vec<Question> = self
                .questions
                .lock()
                .unwrap()
                .values()
                .filter(|q| q.is_active && q.category == category)
                .filter(|q| topic.map(|t| q.topic == t).unwrap_or(true))
                .cloned()
                .collect();

            // Deterministic order so tests can reason about the pool.
            matches.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(matches)
        }
    }
}
