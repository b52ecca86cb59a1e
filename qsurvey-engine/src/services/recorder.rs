//! Response Recorder
//!
//! `start_response` opens an IN_PROGRESS session; `submit` replaces the
//! session's answers and marks it COMPLETED. A later `submit` on the same
//! session is a correction: answers are replaced again, no new session.
//! Both refuse with a `State` error while the survey is not available.

use super::{admin, availability};
use crate::db;
use crate::db::answers::AnswerValues;
use crate::error::{EngineError, EngineResult};
use crate::models::{AnswerPayload, ConsentToken, ResponseStart, SubmittedAnswer};
use chrono::{DateTime, Utc};
use qsurvey_common::db::{Question, SessionStatus};
use qsurvey_common::time;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

/// Begin a response for `survey_id`
///
/// `respondent_key` is generated when not supplied. Returns the session id,
/// the consent token `submit` requires, and the question snapshot.
pub async fn start_response(
    pool: &SqlitePool,
    survey_id: i64,
    respondent_key: Option<&str>,
) -> EngineResult<ResponseStart> {
    let respondent_key = match respondent_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => key.to_string(),
        None => Uuid::new_v4().to_string(),
    };
    let now = time::now();

    let mut tx = pool.begin().await?;
    availability::ensure_accepting_responses(&mut tx, survey_id, now).await?;

    let respondent_id = db::responses::insert_respondent(&mut tx, survey_id, &respondent_key, now)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                EngineError::Validation(format!(
                    "respondent key '{}' already used for survey {}",
                    respondent_key, survey_id
                ))
            } else {
                e
            }
        })?;
    let response_id =
        db::responses::insert_session(&mut tx, respondent_id, SessionStatus::InProgress, now).await?;
    let questions = admin::question_snapshot(&mut tx, survey_id).await?;

    tx.commit().await?;
    info!(survey_id, response_id, "Response started");

    Ok(ResponseStart {
        response_id,
        consent_token: ConsentToken::issue(survey_id, response_id, &respondent_key),
        respondent_key,
        questions,
    })
}

/// Record `answers` for a response and mark it COMPLETED
///
/// Existing answers of the response are replaced as a whole. A payload whose
/// kind differs from the question's stored type rejects the whole call.
pub async fn submit(
    pool: &SqlitePool,
    response_id: i64,
    survey_id: i64,
    token: &ConsentToken,
    answers: &[SubmittedAnswer],
) -> EngineResult<()> {
    let mut tx = pool.begin().await?;

    let owner = db::responses::load_session_owner(&mut tx, response_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("response {}", response_id)))?;
    if owner.survey_id != survey_id {
        return Err(EngineError::State(format!(
            "response {} does not belong to survey {}",
            response_id, survey_id
        )));
    }
    if !token.verify(survey_id, response_id, &owner.respondent_key) {
        return Err(EngineError::State(format!(
            "consent token does not match response {}",
            response_id
        )));
    }
    let now = time::now();
    availability::ensure_accepting_responses(&mut tx, survey_id, now).await?;

    let questions: HashMap<i64, Question> = db::questions::load_questions(&mut tx, survey_id)
        .await?
        .into_iter()
        .map(|q| (q.question_id, q))
        .collect();

    let removed = db::answers::delete_answers(&mut tx, response_id).await?;
    let mut seen = HashSet::new();
    let mut written = 0usize;

    for answer in answers {
        let question = questions.get(&answer.question_id).ok_or_else(|| {
            EngineError::Validation(format!(
                "question {} is not part of survey {}",
                answer.question_id, survey_id
            ))
        })?;
        if !seen.insert(answer.question_id) {
            return Err(EngineError::Validation(format!(
                "question {} answered more than once",
                answer.question_id
            )));
        }
        if answer.payload.question_type() != question.question_type {
            return Err(EngineError::Validation(format!(
                "question {} is {}, answer was given as {}",
                question.question_id,
                question.question_type,
                answer.payload.question_type()
            )));
        }

        if write_answer(&mut tx, response_id, question, &answer.payload, now).await? {
            written += 1;
        }
    }

    db::responses::complete_session(&mut tx, response_id, now).await?;
    tx.commit().await?;

    info!(
        survey_id,
        response_id,
        answers = written,
        replaced = removed,
        previous_status = %owner.status,
        "Response submitted"
    );
    Ok(())
}

/// Write one answer whose payload already matches the question type
///
/// Unanswered payloads (no option, empty selection, blank text) write nothing
/// and return `false`. Every option id must belong to the question.
pub(crate) async fn write_answer(
    conn: &mut SqliteConnection,
    response_id: i64,
    question: &Question,
    payload: &AnswerPayload,
    now: DateTime<Utc>,
) -> EngineResult<bool> {
    match payload {
        AnswerPayload::Single(None) => Ok(false),
        AnswerPayload::Single(Some(option_id)) => {
            ensure_option_of(conn, *option_id, question).await?;
            let values = AnswerValues {
                option_id: Some(*option_id),
                ..Default::default()
            };
            db::answers::insert_answer(conn, response_id, question.question_id, &values, now).await?;
            Ok(true)
        }
        AnswerPayload::Multi(option_ids) => {
            let selected: BTreeSet<i64> = option_ids.iter().copied().collect();
            if selected.is_empty() {
                return Ok(false);
            }
            for option_id in &selected {
                ensure_option_of(conn, *option_id, question).await?;
            }
            let answer_id = db::answers::insert_answer(
                conn,
                response_id,
                question.question_id,
                &AnswerValues::default(),
                now,
            )
            .await?;
            for option_id in &selected {
                db::answers::insert_multi_selection(conn, answer_id, *option_id).await?;
            }
            debug!(response_id, answer_id, selections = selected.len(), "Multi answer written");
            Ok(true)
        }
        AnswerPayload::Text(text) | AnswerPayload::Number(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(false);
            }
            let answer_number = match payload {
                AnswerPayload::Number(_) => text.parse::<f64>().ok().filter(|n| n.is_finite()),
                _ => None,
            };
            let values = AnswerValues {
                option_id: None,
                answer_number,
                answer_text: Some(text),
            };
            db::answers::insert_answer(conn, response_id, question.question_id, &values, now).await?;
            Ok(true)
        }
    }
}

async fn ensure_option_of(conn: &mut SqliteConnection, option_id: i64, question: &Question) -> EngineResult<()> {
    if db::options::option_belongs_to(conn, option_id, question.question_id).await? {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "option {} is not an option of question {}",
            option_id, question.question_id
        )))
    }
}
