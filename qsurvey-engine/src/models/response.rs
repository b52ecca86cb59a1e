//! Response session views and the consent token

use chrono::{DateTime, Utc};
use qsurvey_common::db::{Question, QuestionOption, QuestionType, SessionStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Proof that a respondent went through `start_response` for this session
///
/// Issued by `start_response` and required by `submit`. Hex SHA-256 over the
/// survey id, response id and respondent key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentToken(String);

impl ConsentToken {
    pub fn issue(survey_id: i64, response_id: i64, respondent_key: &str) -> Self {
        let digest = Sha256::digest(format!("{}:{}:{}", survey_id, response_id, respondent_key));
        Self(format!("{:x}", digest))
    }

    /// Wrap a token received from a caller
    pub fn from_string(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this token was issued for exactly this session
    pub fn verify(&self, survey_id: i64, response_id: i64, respondent_key: &str) -> bool {
        *self == Self::issue(survey_id, response_id, respondent_key)
    }
}

/// A question with its options, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSnapshot {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

/// Returned by `start_response`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseStart {
    pub response_id: i64,
    pub respondent_key: String,
    pub consent_token: ConsentToken,
    pub questions: Vec<QuestionSnapshot>,
}

/// One line of the response listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRow {
    pub response_id: i64,
    pub respondent_key: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub answer_count: i64,
}

/// One answer line of a response: one per SINGLE/TEXT/NUMBER answer, one per
/// MULTI selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDetail {
    pub answer_id: i64,
    pub response_id: i64,
    pub question_id: i64,
    pub question_order: i32,
    pub question_text: String,
    pub question_type: QuestionType,
    pub option_id: Option<i64>,
    pub option_text: Option<String>,
    pub answer_number: Option<f64>,
    pub answer_text: Option<String>,
    pub created_at: DateTime<Utc>,
}
