use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Structural defect that makes a question unusable in a quiz.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionDefect {
    #[error("question text is empty")]
    EmptyText,
    #[error("correct answer is empty")]
    EmptyAnswer,
    #[error("multiple-choice question has no options")]
    MissingOptions,
    #[error("correct answer is not one of the options")]
    AnswerNotInOptions,
    #[error("short-answer question carries options")]
    UnexpectedOptions,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionError {
    #[error("malformed question {id}: {defect}")]
    MalformedQuestion { id: QuestionId, defect: QuestionDefect },
}

impl QuestionError {
    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        match self {
            QuestionError::MalformedQuestion { id, .. } => id,
        }
    }
}

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ", alias = "MultipleChoice")]
    MultipleChoice,
    ShortAnswer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Where a question came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionSource {
    #[default]
    Manual,
    #[serde(rename = "LLM", alias = "GeneratedByModel")]
    GeneratedByModel,
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Question as supplied by a bank, an author or a generation model, before
/// its structure has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(default)]
    pub id: Option<QuestionId>,
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub source: QuestionSource,
}

impl QuestionDraft {
    #[must_use]
    pub fn short_answer(
        topic: impl Into<String>,
        text: impl Into<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            question_text: text.into(),
            question_type: QuestionType::ShortAnswer,
            options: None,
            correct_answer: correct_answer.into(),
            explanation: String::new(),
            topic: topic.into(),
            difficulty: Difficulty::default(),
            source: QuestionSource::default(),
        }
    }

    #[must_use]
    pub fn multiple_choice(
        topic: impl Into<String>,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            question_text: text.into(),
            question_type: QuestionType::MultipleChoice,
            options: Some(options),
            correct_answer: correct_answer.into(),
            explanation: String::new(),
            topic: topic.into(),
            difficulty: Difficulty::default(),
            source: QuestionSource::default(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(QuestionId::new(id));
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: QuestionSource) -> Self {
        self.source = source;
        self
    }

    /// Check structural invariants and produce a usable `Question`.
    ///
    /// Drafts without an id receive a generated one.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::MalformedQuestion` when the text or answer is
    /// blank, when a multiple-choice answer is not an exact member of its
    /// options, or when a short-answer question carries options.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id.unwrap_or_else(QuestionId::generate);
        let malformed = |defect| QuestionError::MalformedQuestion {
            id: id.clone(),
            defect,
        };

        if self.question_text.trim().is_empty() {
            return Err(malformed(QuestionDefect::EmptyText));
        }
        if self.correct_answer.trim().is_empty() {
            return Err(malformed(QuestionDefect::EmptyAnswer));
        }

        let kind = match (self.question_type, self.options) {
            (QuestionType::MultipleChoice, None) => {
                return Err(malformed(QuestionDefect::MissingOptions));
            }
            (QuestionType::MultipleChoice, Some(options)) if options.is_empty() => {
                return Err(malformed(QuestionDefect::MissingOptions));
            }
            (QuestionType::MultipleChoice, Some(options)) => {
                if !options.iter().any(|o| *o == self.correct_answer) {
                    return Err(malformed(QuestionDefect::AnswerNotInOptions));
                }
                QuestionKind::MultipleChoice { options }
            }
            (QuestionType::ShortAnswer, Some(options)) if !options.is_empty() => {
                return Err(malformed(QuestionDefect::UnexpectedOptions));
            }
            (QuestionType::ShortAnswer, _) => QuestionKind::ShortAnswer,
        };

        Ok(Question {
            id,
            text: self.question_text,
            kind,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            topic: self.topic,
            difficulty: self.difficulty,
            source: self.source,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice { options: Vec<String> },
    ShortAnswer,
}

/// A structurally valid question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    kind: QuestionKind,
    correct_answer: String,
    explanation: String,
    topic: String,
    difficulty: Difficulty,
    source: QuestionSource,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::ShortAnswer => QuestionType::ShortAnswer,
        }
    }

    /// Choice set for multiple-choice questions.
    #[must_use]
    pub fn options(&self) -> Option<&[String]> {
        match &self.kind {
            QuestionKind::MultipleChoice { options } => Some(options),
            QuestionKind::ShortAnswer => None,
        }
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Name of the topic this question belongs to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn source(&self) -> QuestionSource {
        self.source
    }

    #[must_use]
    pub fn is_correct(&self, candidate: &str) -> bool {
        answers_match(candidate, &self.correct_answer)
    }

    /// Convert back into the draft shape used at the boundaries.
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            id: Some(self.id.clone()),
            question_text: self.text.clone(),
            question_type: self.question_type(),
            options: self.options().map(<[String]>::to_vec),
            correct_answer: self.correct_answer.clone(),
            explanation: self.explanation.clone(),
            topic: self.topic.clone(),
            difficulty: self.difficulty,
            source: self.source,
        }
    }
}

/// Exact comparison, ignoring case and surrounding whitespace.
#[must_use]
pub fn answers_match(candidate: &str, expected: &str) -> bool {
    candidate.trim().to_lowercase() == expected.trim().to_lowercase()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["Paris".into(), "Lyon".into(), "Nice".into()]
    }

    #[test]
    fn answer_matching_ignores_case_and_outer_whitespace() {
        assert!(answers_match("Paris ", "paris"));
        assert!(answers_match("PARIS", "  Paris"));
        assert!(!answers_match("Pari", "Paris"));
        assert!(!answers_match("Par is", "Paris"));
    }

    #[test]
    fn multiple_choice_answer_must_be_an_option() {
        let err = QuestionDraft::multiple_choice("Geo", "Capital?", options(), "paris")
            .with_id("q1")
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            QuestionError::MalformedQuestion {
                id: QuestionId::new("q1"),
                defect: QuestionDefect::AnswerNotInOptions,
            }
        );
    }

    #[test]
    fn multiple_choice_requires_options() {
        let mut draft = QuestionDraft::multiple_choice("Geo", "Capital?", Vec::new(), "Paris");
        assert!(draft.clone().validate().is_err());
        draft.options = None;
        assert!(matches!(
            draft.validate(),
            Err(QuestionError::MalformedQuestion {
                defect: QuestionDefect::MissingOptions,
                ..
            })
        ));
    }

    #[test]
    fn short_answer_cannot_carry_options() {
        let mut draft = QuestionDraft::short_answer("Geo", "Capital?", "Paris");
        draft.options = Some(options());
        assert!(matches!(
            draft.validate(),
            Err(QuestionError::MalformedQuestion {
                defect: QuestionDefect::UnexpectedOptions,
                ..
            })
        ));
    }

    #[test]
    fn blank_text_is_rejected() {
        let err = QuestionDraft::short_answer("Geo", "   ", "Paris")
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            QuestionError::MalformedQuestion {
                defect: QuestionDefect::EmptyText,
                ..
            }
        ));
    }

    #[test]
    fn valid_draft_gets_generated_id() {
        let question = QuestionDraft::multiple_choice("Geo", "Capital?", options(), "Paris")
            .with_explanation("Paris is the capital.")
            .validate()
            .unwrap();
        assert!(!question.id().as_str().is_empty());
        assert_eq!(question.options().map(<[String]>::len), Some(3));
        assert!(question.is_correct(" paris"));
        assert_eq!(question.explanation(), "Paris is the capital.");
    }

    #[test]
    fn deserializes_question_bank_records() {
        let json = r#"{
            "id": "q2",
            "topic": "Components & Props",
            "questionText": "What is a component in React?",
            "questionType": "MCQ",
            "options": ["A function that returns HTML", "A reusable piece of UI"],
            "correctAnswer": "A reusable piece of UI",
            "explanation": "Components split the UI into pieces.",
            "difficulty": "Easy",
            "source": "LLM"
        }"#;
        let draft: QuestionDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.source, QuestionSource::GeneratedByModel);
        let question = draft.validate().unwrap();
        assert_eq!(question.question_type(), QuestionType::MultipleChoice);
        assert_eq!(question.difficulty(), Difficulty::Easy);
        assert_eq!(question.to_draft().id, Some(QuestionId::new("q2")));
    }
}
