//! Quiz question bank
//!
//! Question data is loaded once per process (JSON, same shape as the web
//! client's `questions.json`). The bank picks questions for the quiz
//! collaborator, grades the answers it sends back and keeps per-question
//! history. Text is already resolved to a single language by the host.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading question data or grading answers
#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("failed to read question data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse question data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question data is empty")]
    Empty,
    #[error("duplicate question id `{0}`")]
    DuplicateId(String),
    #[error("question `{0}` has no answer options")]
    MissingOptions(String),
    #[error("question `{0}` has no option marked correct")]
    NoCorrectOption(String),
    #[error("open question `{0}` has no accepted answers")]
    NoAcceptedAnswers(String),
    #[error("unknown question `{0}`")]
    UnknownQuestion(String),
    #[error("option {index} out of range for question `{id}` ({len} options)")]
    OptionOutOfRange { id: String, index: usize, len: usize },
    #[error("question `{0}` expects a free-text answer")]
    ExpectsFreeText(String),
}

/// Question formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    YesNo,
    OpenQuestion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    #[serde(rename = "isCorrect", default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub text: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// Accepted replies for open questions
    #[serde(rename = "acceptedAnswers", default)]
    pub accepted_answers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// What the quiz collaborator sends back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerSubmission {
    /// Index into the prompted options
    Option(usize),
    FreeText(String),
}

impl Question {
    /// Index of the first correct option
    pub fn correct_option_index(&self) -> Option<usize> {
        self.options.iter().position(|o| o.is_correct)
    }

    pub fn option_texts(&self) -> Vec<String> {
        self.options.iter().map(|o| o.text.clone()).collect()
    }

    fn validate(&self) -> Result<(), QuestionError> {
        match self.kind {
            QuestionType::MultipleChoice | QuestionType::YesNo => {
                if self.options.is_empty() {
                    return Err(QuestionError::MissingOptions(self.id.clone()));
                }
                if self.correct_option_index().is_none() {
                    return Err(QuestionError::NoCorrectOption(self.id.clone()));
                }
            }
            QuestionType::OpenQuestion => {
                if self.accepted_answers.iter().all(|a| a.trim().is_empty()) {
                    return Err(QuestionError::NoAcceptedAnswers(self.id.clone()));
                }
            }
        }
        Ok(())
    }

    /// Decide whether a submission is correct
    pub fn grade(&self, submission: &AnswerSubmission) -> Result<bool, QuestionError> {
        match submission {
            AnswerSubmission::Option(index) => {
                if self.kind == QuestionType::OpenQuestion {
                    return Err(QuestionError::ExpectsFreeText(self.id.clone()));
                }
                self.options
                    .get(*index)
                    .map(|o| o.is_correct)
                    .ok_or_else(|| QuestionError::OptionOutOfRange {
                        id: self.id.clone(),
                        index: *index,
                        len: self.options.len(),
                    })
            }
            AnswerSubmission::FreeText(text) => {
                let reply = normalize(text);
                if reply.is_empty() {
                    return Ok(false);
                }
                let correct = match self.kind {
                    QuestionType::OpenQuestion => {
                        self.accepted_answers.iter().any(|a| normalize(a) == reply)
                    }
                    // Typed reply to a choice question: match an option's text
                    QuestionType::MultipleChoice | QuestionType::YesNo => self
                        .options
                        .iter()
                        .any(|o| o.is_correct && normalize(&o.text) == reply),
                };
                Ok(correct)
            }
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Per-question statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionHistory {
    pub times_shown: u32,
    pub times_correct: u32,
    pub times_incorrect: u32,
    /// Session clock time last shown
    pub last_shown: Option<f64>,
}

/// Loaded questions plus selection state
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
    history: HashMap<String, QuestionHistory>,
    rng: Pcg32,
}

impl QuestionBank {
    /// Build a bank from already-parsed questions
    pub fn new(questions: Vec<Question>, seed: u64) -> Result<Self, QuestionError> {
        if questions.is_empty() {
            return Err(QuestionError::Empty);
        }
        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.id.as_str()) {
                return Err(QuestionError::DuplicateId(q.id.clone()));
            }
            q.validate()?;
        }
        log::info!("Question bank ready with {} questions", questions.len());
        Ok(Self {
            questions,
            history: HashMap::new(),
            rng: Pcg32::seed_from_u64(seed),
        })
    }

    /// Parse a JSON array of questions
    pub fn from_json(json: &str, seed: u64) -> Result<Self, QuestionError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        Self::new(questions, seed)
    }

    pub fn load(path: impl AsRef<Path>, seed: u64) -> Result<Self, QuestionError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, seed)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn history(&self, id: &str) -> Option<&QuestionHistory> {
        self.history.get(id)
    }

    /// Pick a question not in `answered`, or any question once all are answered
    pub fn select(&mut self, answered: &HashSet<String>, now: f64) -> Option<&Question> {
        let unanswered: Vec<usize> = self
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| !answered.contains(&q.id))
            .map(|(i, _)| i)
            .collect();

        let index = if unanswered.is_empty() {
            log::debug!("All questions answered, allowing repeats");
            if self.questions.is_empty() {
                return None;
            }
            self.rng.random_range(0..self.questions.len())
        } else {
            unanswered[self.rng.random_range(0..unanswered.len())]
        };

        let question = &self.questions[index];
        let entry = self.history.entry(question.id.clone()).or_default();
        entry.times_shown += 1;
        entry.last_shown = Some(now);
        Some(question)
    }

    /// Grade a submission and record the outcome in the history
    pub fn grade(
        &mut self,
        id: &str,
        submission: &AnswerSubmission,
    ) -> Result<bool, QuestionError> {
        let question = self
            .get(id)
            .ok_or_else(|| QuestionError::UnknownQuestion(id.to_string()))?;
        let correct = question.grade(submission)?;
        self.record(id, correct);
        Ok(correct)
    }

    /// Record an outcome without grading (dismissals)
    pub fn record(&mut self, id: &str, correct: bool) {
        let entry = self.history.entry(id.to_string()).or_default();
        if correct {
            entry.times_correct += 1;
        } else {
            entry.times_incorrect += 1;
        }
    }
}
