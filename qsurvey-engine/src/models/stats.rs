//! Aggregation outputs

use serde::{Deserialize, Serialize};

/// Completed responses that answered a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionCount {
    pub question_id: i64,
    pub display_order: i32,
    pub answered_count: i64,
}

/// Times an option was chosen (SINGLE answers plus MULTI selections)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionCount {
    pub question_id: i64,
    pub option_id: i64,
    pub display_order: i32,
    pub option_text: String,
    pub selection_count: i64,
}

/// Mean selected-option score of a SINGLE_CHOICE question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageScore {
    pub question_id: i64,
    pub display_order: i32,
    pub scored_count: i64,
    pub average: f64,
}

/// Distribution of per-respondent scale scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleStatistics {
    pub scale_id: i64,
    pub scale_code: String,
    pub scale_name: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation; `None` below two respondents
    pub stddev: Option<f64>,
    pub median: Option<f64>,
}
