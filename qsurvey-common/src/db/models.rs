//! Database models
//!
//! String-typed columns (status, question type, role) are decoded into closed
//! enums once, at the storage boundary.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Storage / wire representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            /// Case-insensitive; surrounding whitespace ignored
            fn from_str(s: &str) -> Result<Self> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(Error::InvalidInput(format!(
                        "unknown {}: '{}'",
                        stringify!($name),
                        s.trim()
                    ))),
                }
            }
        }
    };
}

string_enum!(
    /// Survey lifecycle status as stored
    SurveyStatus {
        Draft => "DRAFT",
        Open => "OPEN",
        Closed => "CLOSED",
    }
);

string_enum!(
    /// How a question is answered
    QuestionType {
        SingleChoice => "SINGLE_CHOICE",
        MultiChoice => "MULTI_CHOICE",
        Text => "TEXT",
        Number => "NUMBER",
    }
);

string_enum!(
    /// What a question is used for
    QuestionRole {
        Normal => "NORMAL",
        AttentionCheck => "ATTENTION_CHECK",
        ValidityCheck => "VALIDITY_CHECK",
    }
);

string_enum!(
    /// Response session state; IN_PROGRESS -> COMPLETED only
    SessionStatus {
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
    }
);

impl QuestionType {
    /// Choice questions carry an option set of at least two rows
    pub fn needs_options(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }
}

impl Default for QuestionRole {
    fn default() -> Self {
        QuestionRole::Normal
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub survey_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub consent_text: Option<String>,
    pub status: SurveyStatus,
    pub open_at: Option<DateTime<Utc>>,
    pub close_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: i64,
    pub survey_id: i64,
    /// 1-based, unique per survey; also the import identity
    pub display_order: i32,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_role: QuestionRole,
    pub is_reverse: bool,
    pub is_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub option_id: i64,
    pub question_id: i64,
    /// Unique per question; also the option's import identity
    pub display_order: i32,
    pub option_text: String,
    pub score: Option<i32>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub scale_id: i64,
    pub survey_id: i64,
    pub scale_code: String,
    pub scale_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleWeight {
    pub scale_id: i64,
    pub question_id: i64,
    pub weight: Decimal,
}

/// Parse a stored decimal weight
pub fn parse_weight(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|e| Error::InvalidInput(format!("bad weight '{}': {}", raw, e)))
}
