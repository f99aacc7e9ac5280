use serde::{Deserialize, Serialize};

/// Wildcard topic: matches any topic in matchmaking and disables the topic
/// filter when sampling questions.
pub const RANDOM_TOPIC: &str = "RANDOM";

pub const DEFAULT_TIME_LIMIT_SECS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn time_limit_secs(&self) -> u32 {
        match self {
            Difficulty::Easy => 15,
            Difficulty::Medium => 20,
            Difficulty::Hard => 25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    Code,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub topic: String,
    pub category: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    /// Correct option text for multiple choice, expected solution otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub is_active: bool,
}

impl Question {
    pub fn time_limit_secs(&self) -> u32 {
        self.difficulty
            .map(|d| d.time_limit_secs())
            .unwrap_or(DEFAULT_TIME_LIMIT_SECS)
    }

    /// Validates a submitted answer. Multiple choice compares trimmed text
    /// against the option flagged correct; anything else is an exact match
    /// against the stored solution.
    pub fn is_correct_answer(&self, submitted: &str) -> bool {
        match self.question_type {
            QuestionType::MultipleChoice => self
                .options
                .iter()
                .find(|o| o.is_correct)
                .map(|o| o.text.trim() == submitted.trim())
                .unwrap_or(false),
            QuestionType::Code => self
                .correct_answer
                .as_deref()
                .map(|expected| expected == submitted)
                .unwrap_or(false),
        }
    }

    /// The text revealed to both players when a round closes.
    pub fn correct_answer_text(&self) -> Option<String> {
        match self.question_type {
            QuestionType::MultipleChoice => self
                .options
                .iter()
                .find(|o| o.is_correct)
                .map(|o| o.text.clone()),
            QuestionType::Code => self.correct_answer.clone(),
        }
    }

    /// What a player is allowed to see mid-game: no correctness flags, no
    /// solution, no explanation.
    pub fn public_view(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            question_type: self.question_type,
            options: self.options.iter().map(|o| o.text.clone()).collect(),
            time_limit_secs: self.time_limit_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub time_limit_secs: u32,
}
