//! Survey administration and authoring inputs

use chrono::{DateTime, Utc};
use qsurvey_common::db::{QuestionRole, QuestionType, Survey, SurveyStatus};
use serde::{Deserialize, Serialize};

/// Input for `create_survey`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSurvey {
    pub title: String,
    pub description: Option<String>,
    pub consent_text: Option<String>,
}

/// Input for `update_publish_settings`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSettings {
    pub status: SurveyStatus,
    pub open_at: Option<DateTime<Utc>>,
    pub close_at: Option<DateTime<Utc>>,
}

/// Survey plus its completed response count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySummary {
    #[serde(flatten)]
    pub survey: Survey,
    pub completed_count: i64,
}

/// How option scores are assigned when authoring a question
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionTemplate {
    /// Scores 1..N in row order
    #[default]
    Likert5,
    /// Scores 1..N in row order
    Likert7,
    /// Every option carries its own score
    Custom,
}

/// One option row as entered
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOption {
    pub option_text: String,
    pub score: Option<i32>,
    #[serde(default)]
    pub is_correct: bool,
}

/// Input for `create_question`; display order is always assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub question_role: QuestionRole,
    #[serde(default)]
    pub is_reverse: bool,
    #[serde(default = "default_required")]
    pub is_required: bool,
    #[serde(default)]
    pub template: OptionTemplate,
    #[serde(default)]
    pub options: Vec<NewOption>,
}

fn default_required() -> bool {
    true
}

/// Whether a survey accepts responses at a given moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Open,
    NotOpenYet,
    Closed,
}

impl Availability {
    /// CLOSED status wins over the window. A DRAFT survey inside its window
    /// is open; `close_at` itself is already closed.
    pub fn of(survey: &Survey, now: DateTime<Utc>) -> Self {
        if survey.status == SurveyStatus::Closed {
            return Availability::Closed;
        }
        if survey.open_at.is_some_and(|open_at| now < open_at) {
            return Availability::NotOpenYet;
        }
        if survey.close_at.is_some_and(|close_at| now >= close_at) {
            return Availability::Closed;
        }
        Availability::Open
    }
}
