//! Submitted answers

use qsurvey_common::db::QuestionType;
use serde::{Deserialize, Serialize};

/// Answer value as declared by the caller
///
/// The variant is the declared question type; it must match the stored type
/// of the question it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerPayload {
    /// Selected option id; `None` means unanswered
    Single(Option<i64>),
    /// Selected option ids; empty means unanswered
    Multi(Vec<i64>),
    Text(String),
    /// Kept as entered; parsed leniently when stored
    Number(String),
}

impl AnswerPayload {
    /// Question type this payload is meant for
    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerPayload::Single(_) => QuestionType::SingleChoice,
            AnswerPayload::Multi(_) => QuestionType::MultiChoice,
            AnswerPayload::Text(_) => QuestionType::Text,
            AnswerPayload::Number(_) => QuestionType::Number,
        }
    }
}

/// One answer in a submit call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub payload: AnswerPayload,
}

impl SubmittedAnswer {
    pub fn single(question_id: i64, option_id: i64) -> Self {
        Self {
            question_id,
            payload: AnswerPayload::Single(Some(option_id)),
        }
    }

    pub fn multi(question_id: i64, option_ids: Vec<i64>) -> Self {
        Self {
            question_id,
            payload: AnswerPayload::Multi(option_ids),
        }
    }

    pub fn text(question_id: i64, text: impl Into<String>) -> Self {
        Self {
            question_id,
            payload: AnswerPayload::Text(text.into()),
        }
    }

    pub fn number(question_id: i64, value: impl Into<String>) -> Self {
        Self {
            question_id,
            payload: AnswerPayload::Number(value.into()),
        }
    }
}
