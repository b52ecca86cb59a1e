//! Ethics guard
//!
//! Once any response session exists for a survey (in progress or completed),
//! its questions, options, scales and weights are frozen.

use crate::db;
use crate::error::{EngineError, EngineResult};
use sqlx::SqliteConnection;
use tracing::warn;

/// Fail with `EthicsGuard` if the survey already has a response
pub async fn ensure_definitions_mutable(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<()> {
    if db::responses::any_response_exists(conn, survey_id).await? {
        warn!(survey_id, "Definition change refused: survey already has responses");
        return Err(EngineError::EthicsGuard { survey_id });
    }
    Ok(())
}
