//! Engine data models

pub mod answer;
pub mod import_result;
pub mod response;
pub mod stats;
pub mod survey;

pub use answer::{AnswerPayload, SubmittedAnswer};
pub use import_result::{ImportIssue, ImportResult, IssueKind};
pub use response::{AnswerDetail, ConsentToken, QuestionSnapshot, ResponseRow, ResponseStart};
pub use stats::{AverageScore, OptionCount, QuestionCount, ScaleStatistics};
pub use survey::{
    Availability, NewOption, NewQuestion, NewSurvey, OptionTemplate, PublishSettings, SurveySummary,
};
