use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::path::Path;

use super::{QuestionError, QuestionProvider, QuestionResult};
use crate::types::Question;

/// Number of wrong answers shown next to the correct one
const WRONG_PER_QUESTION: usize = 3;

/// One record of `questions.json`: the correct answer plus a pool of wrong ones
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    pub category: String,
    pub question: String,
    pub correct: String,
    #[serde(default, alias = "wrongAnswers")]
    pub wrong: Vec<String>,
}

/// In-memory question bank
pub struct QuestionBank {
    questions: Vec<RawQuestion>,
}

impl QuestionBank {
    pub fn new(raw: Vec<RawQuestion>) -> Self {
        let total = raw.len();
        let questions: Vec<RawQuestion> = raw
            .into_iter()
            .filter(|q| q.wrong.len() >= WRONG_PER_QUESTION)
            .collect();

        if questions.len() < total {
            tracing::warn!(
                "Skipped {} questions with fewer than {} wrong answers",
                total - questions.len(),
                WRONG_PER_QUESTION
            );
        }

        Self { questions }
    }

    /// Load a bank from a JSON array on disk
    pub async fn load(path: impl AsRef<Path>) -> QuestionResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let raw: Vec<RawQuestion> = serde_json::from_str(&content)?;
        let bank = Self::new(raw);

        if bank.is_empty() {
            return Err(QuestionError::Empty);
        }

        tracing::info!("Loaded {} questions from {}", bank.len(), path.display());
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    fn draw(&self, count: usize) -> Vec<Question> {
        let mut rng = rand::rng();
        let mut picks: Vec<&RawQuestion> = self.questions.iter().collect();
        picks.shuffle(&mut rng);

        picks
            .into_iter()
            .take(count)
            .filter_map(|raw| bundle(raw, &mut rng))
            .collect()
    }
}

/// Pick three wrong answers and shuffle them together with the correct one
fn bundle(raw: &RawQuestion, rng: &mut impl Rng) -> Option<Question> {
    let mut wrongs: Vec<&String> = raw.wrong.iter().collect();
    wrongs.shuffle(rng);

    let [a, b, c, ..] = wrongs.as_slice() else {
        return None;
    };

    let mut slots = [
        (raw.correct.clone(), true),
        ((*a).clone(), false),
        ((*b).clone(), false),
        ((*c).clone(), false),
    ];
    slots.shuffle(rng);

    let answer_index = slots.iter().position(|(_, correct)| *correct)?;

    Some(Question {
        category: raw.category.clone(),
        question: raw.question.clone(),
        options: slots.map(|(text, _)| text),
        answer_index,
    })
}

#[async_trait]
impl QuestionProvider for QuestionBank {
    async fn fetch(&self, count: usize) -> QuestionResult<Vec<Question>> {
        if self.questions.is_empty() {
            return Err(QuestionError::Empty);
        }
        Ok(self.draw(count))
    }

    fn name(&self) -> &str {
        "json-bank"
    }
}
