//! Survey administration and response listing

use super::ensure_survey_exists;
use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AnswerDetail, NewSurvey, PublishSettings, QuestionSnapshot, ResponseRow, SurveySummary,
};
use qsurvey_common::db::{QuestionOption, Scale, ScaleWeight, Survey};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::info;

/// Create a survey in DRAFT status
pub async fn create_survey(pool: &SqlitePool, input: &NewSurvey) -> EngineResult<Survey> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(EngineError::Validation("survey title is required".to_string()));
    }

    let mut conn = pool.acquire().await?;
    let survey_id = db::surveys::insert_survey(
        &mut conn,
        title,
        blank_to_none(input.description.as_deref()),
        blank_to_none(input.consent_text.as_deref()),
    )
    .await?;
    info!(survey_id, "Survey created");

    load_required(&mut conn, survey_id).await
}

pub async fn get_survey(pool: &SqlitePool, survey_id: i64) -> EngineResult<Survey> {
    let mut conn = pool.acquire().await?;
    load_required(&mut conn, survey_id).await
}

/// All surveys, newest first, with completed response counts
pub async fn list_surveys(pool: &SqlitePool) -> EngineResult<Vec<SurveySummary>> {
    let mut conn = pool.acquire().await?;
    db::surveys::list_survey_summaries(&mut conn).await
}

/// Set status and publication window
///
/// When both ends of the window are given, `close_at` must be after `open_at`.
pub async fn update_publish_settings(
    pool: &SqlitePool,
    survey_id: i64,
    settings: &PublishSettings,
) -> EngineResult<Survey> {
    if let (Some(open_at), Some(close_at)) = (settings.open_at, settings.close_at) {
        if close_at <= open_at {
            return Err(EngineError::Validation(format!(
                "close_at ({}) must be after open_at ({})",
                close_at, open_at
            )));
        }
    }

    let mut conn = pool.acquire().await?;
    let updated = db::surveys::update_publish_settings(
        &mut conn,
        survey_id,
        settings.status,
        settings.open_at,
        settings.close_at,
    )
    .await?;
    if updated == 0 {
        return Err(EngineError::NotFound(format!("survey {}", survey_id)));
    }
    info!(survey_id, status = %settings.status, "Publish settings updated");

    load_required(&mut conn, survey_id).await
}

/// Questions of a survey with their options, in display order
pub async fn list_questions(pool: &SqlitePool, survey_id: i64) -> EngineResult<Vec<QuestionSnapshot>> {
    let mut conn = pool.acquire().await?;
    ensure_survey_exists(&mut conn, survey_id).await?;
    question_snapshot(&mut conn, survey_id).await
}

/// Scales of a survey and their weight edges
pub async fn list_scales(pool: &SqlitePool, survey_id: i64) -> EngineResult<(Vec<Scale>, Vec<ScaleWeight>)> {
    let mut conn = pool.acquire().await?;
    ensure_survey_exists(&mut conn, survey_id).await?;
    let scales = db::scales::load_scales(&mut conn, survey_id).await?;
    let weights = db::scales::load_weights(&mut conn, survey_id).await?;
    Ok((scales, weights))
}

/// Response sessions of a survey, newest first
pub async fn list_responses(
    pool: &SqlitePool,
    survey_id: i64,
    completed_only: bool,
) -> EngineResult<Vec<ResponseRow>> {
    let mut conn = pool.acquire().await?;
    ensure_survey_exists(&mut conn, survey_id).await?;
    db::responses::list_responses(&mut conn, survey_id, completed_only).await
}

pub async fn count_responses(pool: &SqlitePool, survey_id: i64, completed_only: bool) -> EngineResult<i64> {
    let mut conn = pool.acquire().await?;
    ensure_survey_exists(&mut conn, survey_id).await?;
    db::responses::count_responses(&mut conn, survey_id, completed_only).await
}

/// Answer lines of one response, in question order
pub async fn response_detail(pool: &SqlitePool, response_id: i64) -> EngineResult<Vec<AnswerDetail>> {
    let mut conn = pool.acquire().await?;
    if db::responses::load_session_owner(&mut conn, response_id).await?.is_none() {
        return Err(EngineError::NotFound(format!("response {}", response_id)));
    }
    db::answers::load_answer_details(&mut conn, response_id).await
}

/// Read-only question/option snapshot
pub(crate) async fn question_snapshot(
    conn: &mut SqliteConnection,
    survey_id: i64,
) -> EngineResult<Vec<QuestionSnapshot>> {
    let questions = db::questions::load_questions(conn, survey_id).await?;
    let mut options: BTreeMap<i64, Vec<QuestionOption>> = BTreeMap::new();
    for option in db::options::load_options_for_survey(conn, survey_id).await? {
        options.entry(option.question_id).or_default().push(option);
    }

    Ok(questions
        .into_iter()
        .map(|question| QuestionSnapshot {
            options: options.remove(&question.question_id).unwrap_or_default(),
            question,
        })
        .collect())
}

async fn load_required(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<Survey> {
    db::surveys::load_survey(conn, survey_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("survey {}", survey_id)))
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
