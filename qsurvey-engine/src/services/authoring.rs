//! Ad-hoc question authoring

use super::import::options::MIN_CHOICE_OPTIONS;
use super::{ensure_survey_exists, ethics_guard};
use crate::db;
use crate::db::options::OptionDraft;
use crate::db::questions::QuestionDraft;
use crate::error::{EngineError, EngineResult};
use crate::models::{NewOption, NewQuestion, OptionTemplate, QuestionSnapshot};
use qsurvey_common::db::QuestionRole;
use sqlx::SqlitePool;
use tracing::info;

/// Append a question (and its options) to the end of a survey
pub async fn create_question(
    pool: &SqlitePool,
    survey_id: i64,
    input: &NewQuestion,
) -> EngineResult<QuestionSnapshot> {
    let mut tx = pool.begin().await?;
    ethics_guard::ensure_definitions_mutable(&mut tx, survey_id).await?;
    ensure_survey_exists(&mut tx, survey_id).await?;

    let question_text = input.question_text.trim();
    if question_text.is_empty() {
        return Err(EngineError::Validation("question text is required".to_string()));
    }

    let options = if input.question_type.needs_options() {
        let options = normalize_options(input)?;
        if options.len() < MIN_CHOICE_OPTIONS {
            return Err(EngineError::Validation(format!(
                "choice question needs at least {} options",
                MIN_CHOICE_OPTIONS
            )));
        }
        options
    } else {
        Vec::new()
    };

    let draft = QuestionDraft {
        display_order: db::questions::next_display_order(&mut tx, survey_id).await?,
        question_text: question_text.to_string(),
        question_type: input.question_type,
        question_role: input.question_role,
        is_reverse: input.is_reverse,
        is_required: input.is_required,
    };
    let question_id = db::questions::upsert_question(&mut tx, survey_id, &draft).await?;
    if !options.is_empty() {
        db::options::replace_options(&mut tx, question_id, &options).await?;
    }

    let question = db::questions::load_questions(&mut tx, survey_id)
        .await?
        .into_iter()
        .find(|q| q.question_id == question_id)
        .ok_or_else(|| EngineError::NotFound(format!("question {}", question_id)))?;
    let options = db::options::load_options(&mut tx, question_id).await?;

    tx.commit().await?;
    info!(survey_id, question_id, display_order = draft.display_order, "Question created");

    Ok(QuestionSnapshot { question, options })
}

/// Drop blank rows, assign scores by template, clear `is_correct` outside
/// attention checks. Option display orders are 1..N in row order.
fn normalize_options(input: &NewQuestion) -> EngineResult<Vec<OptionDraft>> {
    let attention = input.question_role == QuestionRole::AttentionCheck;
    let rows: Vec<&NewOption> = input
        .options
        .iter()
        .filter(|o| !o.option_text.trim().is_empty())
        .collect();

    rows.into_iter()
        .zip(1..)
        .map(|(option, position)| {
            let score = match input.template {
                OptionTemplate::Likert5 | OptionTemplate::Likert7 => position,
                OptionTemplate::Custom => option.score.ok_or_else(|| {
                    EngineError::Validation(format!(
                        "option '{}' needs a score with the CUSTOM template",
                        option.option_text.trim()
                    ))
                })?,
            };
            Ok(OptionDraft {
                display_order: position,
                option_text: option.option_text.trim().to_string(),
                score: Some(score),
                is_correct: attention && option.is_correct,
            })
        })
        .collect()
}
