//! Respondent and response session persistence

use super::enum_column;
use crate::error::EngineResult;
use crate::models::ResponseRow;
use chrono::{DateTime, Utc};
use qsurvey_common::db::SessionStatus;
use qsurvey_common::time;
use sqlx::{Row, SqliteConnection};

/// Who a response session belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOwner {
    pub response_id: i64,
    pub survey_id: i64,
    pub respondent_key: String,
    pub status: SessionStatus,
}

/// True when any response session (any status) exists for the survey
pub async fn any_response_exists(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1
        FROM response_sessions rs
        JOIN respondents r ON r.respondent_id = rs.respondent_id
        WHERE r.survey_id = ?
        LIMIT 1
        "#,
    )
    .bind(survey_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found.is_some())
}

pub async fn insert_respondent(
    conn: &mut SqliteConnection,
    survey_id: i64,
    respondent_key: &str,
    now: DateTime<Utc>,
) -> EngineResult<i64> {
    let result = sqlx::query(
        "INSERT INTO respondents (survey_id, respondent_key, created_at) VALUES (?, ?, ?)",
    )
    .bind(survey_id)
    .bind(respondent_key)
    .bind(time::to_db(now))
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Insert a session; `completed_at` is set only for COMPLETED sessions
pub async fn insert_session(
    conn: &mut SqliteConnection,
    respondent_id: i64,
    status: SessionStatus,
    started_at: DateTime<Utc>,
) -> EngineResult<i64> {
    let completed_at = match status {
        SessionStatus::Completed => Some(time::to_db(started_at)),
        SessionStatus::InProgress => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO response_sessions (respondent_id, status, started_at, completed_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(respondent_id)
    .bind(status.as_str())
    .bind(time::to_db(started_at))
    .bind(completed_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn load_session_owner(
    conn: &mut SqliteConnection,
    response_id: i64,
) -> EngineResult<Option<SessionOwner>> {
    let row = sqlx::query(
        r#"
        SELECT rs.response_id, r.survey_id, r.respondent_key, rs.status
        FROM response_sessions rs
        JOIN respondents r ON r.respondent_id = rs.respondent_id
        WHERE rs.response_id = ?
        "#,
    )
    .bind(response_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(SessionOwner {
            response_id: row.get("response_id"),
            survey_id: row.get("survey_id"),
            respondent_key: row.get("respondent_key"),
            status: enum_column(&row, "status")?,
        })),
        None => Ok(None),
    }
}

/// Mark the session COMPLETED at `now`
pub async fn complete_session(
    conn: &mut SqliteConnection,
    response_id: i64,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    sqlx::query("UPDATE response_sessions SET status = ?, completed_at = ? WHERE response_id = ?")
        .bind(SessionStatus::Completed.as_str())
        .bind(time::to_db(now))
        .bind(response_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Response sessions of a survey, newest first
pub async fn list_responses(
    conn: &mut SqliteConnection,
    survey_id: i64,
    completed_only: bool,
) -> EngineResult<Vec<ResponseRow>> {
    let rows = sqlx::query(
        r#"
        SELECT rs.response_id, r.respondent_key, rs.status, rs.started_at, rs.completed_at,
               (SELECT COUNT(*) FROM question_answers a WHERE a.response_id = rs.response_id) AS answer_count
        FROM response_sessions rs
        JOIN respondents r ON r.respondent_id = rs.respondent_id
        WHERE r.survey_id = ? AND (? = 0 OR rs.status = 'COMPLETED')
        ORDER BY rs.response_id DESC
        "#,
    )
    .bind(survey_id)
    .bind(completed_only)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let started_at: String = row.get("started_at");
            Ok(ResponseRow {
                response_id: row.get("response_id"),
                respondent_key: row.get("respondent_key"),
                status: enum_column(row, "status")?,
                started_at: time::from_db(&started_at)?,
                completed_at: time::from_db_opt(row.get("completed_at"))?,
                answer_count: row.get("answer_count"),
            })
        })
        .collect()
}

pub async fn count_responses(
    conn: &mut SqliteConnection,
    survey_id: i64,
    completed_only: bool,
) -> EngineResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM response_sessions rs
        JOIN respondents r ON r.respondent_id = rs.respondent_id
        WHERE r.survey_id = ? AND (? = 0 OR rs.status = 'COMPLETED')
        "#,
    )
    .bind(survey_id)
    .bind(completed_only)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}
