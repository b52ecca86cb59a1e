//! Engine services
//!
//! Each public entry point owns its transaction. Import entry points and
//! `create_question` check the ethics guard before anything else.

pub mod admin;
pub mod authoring;
pub mod availability;
pub mod ethics_guard;
pub mod import;
pub mod recorder;
pub mod scoring;

use crate::db;
use crate::error::{EngineError, EngineResult};
use sqlx::SqliteConnection;

/// Fail with `NotFound` unless the survey exists
pub(crate) async fn ensure_survey_exists(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<()> {
    if db::surveys::survey_exists(conn, survey_id).await? {
        Ok(())
    } else {
        Err(EngineError::NotFound(format!("survey {}", survey_id)))
    }
}
