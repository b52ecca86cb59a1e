//! Survey persistence

use super::enum_column;
use crate::error::EngineResult;
use crate::models::SurveySummary;
use chrono::{DateTime, Utc};
use qsurvey_common::db::{Survey, SurveyStatus};
use qsurvey_common::time;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

const SURVEY_COLUMNS: &str =
    "s.survey_id, s.title, s.description, s.consent_text, s.status, s.open_at, s.close_at";

fn survey_from_row(row: &SqliteRow) -> EngineResult<Survey> {
    Ok(Survey {
        survey_id: row.get("survey_id"),
        title: row.get("title"),
        description: row.get("description"),
        consent_text: row.get("consent_text"),
        status: enum_column(row, "status")?,
        open_at: time::from_db_opt(row.get("open_at"))?,
        close_at: time::from_db_opt(row.get("close_at"))?,
    })
}

/// Insert a DRAFT survey, returning its id
pub async fn insert_survey(
    conn: &mut SqliteConnection,
    title: &str,
    description: Option<&str>,
    consent_text: Option<&str>,
) -> EngineResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO surveys (title, description, consent_text, status)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(consent_text)
    .bind(SurveyStatus::Draft.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load survey by id
pub async fn load_survey(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<Option<Survey>> {
    let sql = format!("SELECT {} FROM surveys s WHERE s.survey_id = ?", SURVEY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(survey_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(survey_from_row).transpose()
}

pub async fn survey_exists(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM surveys WHERE survey_id = ?")
        .bind(survey_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(found.is_some())
}

/// All surveys, newest first, with their completed response counts
pub async fn list_survey_summaries(conn: &mut SqliteConnection) -> EngineResult<Vec<SurveySummary>> {
    let sql = format!(
        r#"
        SELECT {},
            (SELECT COUNT(*)
               FROM response_sessions rs
               JOIN respondents r ON r.respondent_id = rs.respondent_id
              WHERE r.survey_id = s.survey_id AND rs.status = 'COMPLETED') AS completed_count
        FROM surveys s
        ORDER BY s.survey_id DESC
        "#,
        SURVEY_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    rows.iter()
        .map(|row| {
            Ok(SurveySummary {
                survey: survey_from_row(row)?,
                completed_count: row.get("completed_count"),
            })
        })
        .collect()
}

/// Update status and publication window; returns rows affected
pub async fn update_publish_settings(
    conn: &mut SqliteConnection,
    survey_id: i64,
    status: SurveyStatus,
    open_at: Option<DateTime<Utc>>,
    close_at: Option<DateTime<Utc>>,
) -> EngineResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE surveys
        SET status = ?, open_at = ?, close_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE survey_id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(open_at.map(time::to_db))
    .bind(close_at.map(time::to_db))
    .bind(survey_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
