//! Survey availability for respondents

use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::models::Availability;
use chrono::{DateTime, Utc};
use qsurvey_common::time;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::warn;

/// Availability of `survey_id` right now
pub async fn check(pool: &SqlitePool, survey_id: i64) -> EngineResult<Availability> {
    let mut conn = pool.acquire().await?;
    availability_at(&mut conn, survey_id, time::now()).await
}

async fn availability_at(
    conn: &mut SqliteConnection,
    survey_id: i64,
    now: DateTime<Utc>,
) -> EngineResult<Availability> {
    let survey = db::surveys::load_survey(conn, survey_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("survey {}", survey_id)))?;
    Ok(Availability::of(&survey, now))
}

/// Fail with `State` unless the survey accepts responses at `now`
pub(crate) async fn ensure_accepting_responses(
    conn: &mut SqliteConnection,
    survey_id: i64,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    match availability_at(conn, survey_id, now).await? {
        Availability::Open => Ok(()),
        Availability::NotOpenYet => {
            warn!(survey_id, "Response refused: survey not open yet");
            Err(EngineError::State(format!("survey {} is not open yet", survey_id)))
        }
        Availability::Closed => {
            warn!(survey_id, "Response refused: survey closed");
            Err(EngineError::State(format!("survey {} is closed", survey_id)))
        }
    }
}
