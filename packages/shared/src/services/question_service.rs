use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::debug;

use crate::models::question::{Question, RANDOM_TOPIC};
use crate::repositories::question_repository::QuestionRepository;
use crate::services::errors::question_service_errors::QuestionServiceError;

/// Questions per duel.
pub const QUESTIONS_PER_MATCH: usize = 3;

/// Question Sampler: picks a random set of active questions for a duel.
#[derive(Clone)]
pub struct QuestionService {
    repository: Arc<dyn QuestionRepository>,
}

impl QuestionService {
    pub fn new(repository: Arc<dyn QuestionRepository>) -> Self {
        QuestionService { repository }
    }

    pub async fn get(&self, question_id: &str) -> Result<Option<Question>, QuestionServiceError> {
        Ok(self.repository.get_question(question_id).await?)
    }

    /// Uniform sample without replacement from the active pool. The RANDOM
    /// topic wildcard disables the topic filter. A pool smaller than `count`
    /// yields a shorter game rather than an error; an empty pool fails.
    pub async fn sample(
        &self,
        category: &str,
        topic: &str,
        count: usize,
    ) -> Result<Vec<Question>, QuestionServiceError> {
        let topic_filter = if topic == RANDOM_TOPIC {
            None
        } else {
            Some(topic)
        };

        let pool = self
            .repository
            .find_active_questions(category, topic_filter)
            .await?;

        debug!(
            "Sampled pool of {} questions for category={}, topic={}",
            pool.len(),
            category,
            topic
        );

        if pool.is_empty() {
            return Err(QuestionServiceError::NoQuestionsAvailable);
        }

        let mut rng = rand::thread_rng();
        let sampled = pool
            .choose_multiple(&mut rng, count)
            .cloned()
            .collect::<Vec<_>>();

        Ok(sampled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, QuestionOption, QuestionType};
    use crate::repositories::question_repository::test_util::InMemoryQuestionRepository;

    pub fn question(id: &str, topic: &str, category: &str) -> Question {
        Question {
            id: id.to_string(),
            title: format!("Question {}", id),
            description: "desc".to_string(),
            difficulty: Some(Difficulty::Easy),
            topic: topic.to_string(),
            category: category.to_string(),
            question_type: QuestionType::MultipleChoice,
            options: vec![
                QuestionOption {
                    text: "yes".to_string(),
                    is_correct: true,
                },
                QuestionOption {
                    text: "no".to_string(),
                    is_correct: false,
                },
            ],
            correct_answer: None,
            explanation: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_sample_respects_topic_filter() {
        let repository = Arc::new(InMemoryQuestionRepository::new().with_questions(vec![
            question("q1", "DSA", "CS"),
            question("q2", "OS", "CS"),
            question("q3", "DSA", "CS"),
        ]));
        let service = QuestionService::new(repository);

        let sampled = service.sample("CS", "DSA", 3).await.unwrap();

        assert_eq!(sampled.len(), 2);
        assert!(sampled.iter().all(|q| q.topic == "DSA"));
    }

    #[tokio::test]
    async fn test_random_topic_samples_across_topics() {
        let repository = Arc::new(InMemoryQuestionRepository::new().with_questions(vec![
            question("q1", "DSA", "CS"),
            question("q2", "OS", "CS"),
            question("q3", "CN", "CS"),
        ]));
        let service = QuestionService::new(repository);

        let sampled = service.sample("CS", RANDOM_TOPIC, 3).await.unwrap();

        assert_eq!(sampled.len(), 3);
    }

    #[tokio::test]
    async fn test_sample_never_repeats_a_question() {
        let repository = Arc::new(InMemoryQuestionRepository::new().with_questions(vec![
            question("q1", "DSA", "CS"),
            question("q2", "DSA", "CS"),
            question("q3", "DSA", "CS"),
            question("q4", "DSA", "CS"),
        ]));
        let service = QuestionService::new(repository);

        let sampled = service.sample("CS", "DSA", 3).await.unwrap();
        let mut ids: Vec<&str> = sampled.iter().map(|q| q.id.as_str()).collect();
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_pool_is_an_error() {
        let repository = Arc::new(InMemoryQuestionRepository::new());
        let service = QuestionService::new(repository);

        let err = service.sample("CS", "DSA", 3).await.unwrap_err();
        assert!(matches!(err, QuestionServiceError::NoQuestionsAvailable));
    }

    #[tokio::test]
    async fn test_inactive_questions_are_excluded() {
        let mut inactive = question("q1", "DSA", "CS");
        inactive.is_active = false;
        let repository = Arc::new(
            InMemoryQuestionRepository::new()
                .with_questions(vec![inactive, question("q2", "DSA", "CS")]),
        );
        let service = QuestionService::new(repository);

        let sampled = service.sample("CS", "DSA", 3).await.unwrap();

        assert_eq!(sampled.len(), 1);
        assert_eq!(sampled[0].id, "q2");
    }
}
