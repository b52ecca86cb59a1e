//! qsurvey-engine library interface
//!
//! Definition import, response recording and scoring over the shared
//! SQLite store. The `qsurvey` binary is a thin front end over these APIs.

pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{EngineError, EngineResult};
pub use crate::models::{
    AnswerPayload, ConsentToken, ImportIssue, ImportResult, IssueKind, SubmittedAnswer,
};
pub use crate::services::import::{
    import_answers, import_options, import_questions, import_scale_weights, import_scales,
};
pub use crate::services::recorder::{start_response, submit};
pub use crate::services::scoring::{average_scores, option_counts, question_counts, scale_statistics};
