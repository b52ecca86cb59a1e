//! Question persistence
//!
//! `(survey_id, display_order)` is the identity used by imports; surrogate ids
//! are resolved from it on every import.

use super::enum_column;
use crate::error::EngineResult;
use qsurvey_common::db::{Question, QuestionRole, QuestionType};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::collections::BTreeMap;

/// Question fields without identity, as written by imports and authoring
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub display_order: i32,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_role: QuestionRole,
    pub is_reverse: bool,
    pub is_required: bool,
}

fn question_from_row(row: &SqliteRow) -> EngineResult<Question> {
    Ok(Question {
        question_id: row.get("question_id"),
        survey_id: row.get("survey_id"),
        display_order: row.get("display_order"),
        question_text: row.get("question_text"),
        question_type: enum_column(row, "question_type")?,
        question_role: enum_column(row, "question_role")?,
        is_reverse: row.get("is_reverse"),
        is_required: row.get("is_required"),
    })
}

/// Questions of a survey in display order
pub async fn load_questions(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<Vec<Question>> {
    let rows = sqlx::query(
        r#"
        SELECT question_id, survey_id, display_order, question_text, question_type,
               question_role, is_reverse, is_required
        FROM questions
        WHERE survey_id = ?
        ORDER BY display_order
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(question_from_row).collect()
}

/// Display order -> question, rebuilt at the start of each import
pub async fn load_order_index(
    conn: &mut SqliteConnection,
    survey_id: i64,
) -> EngineResult<BTreeMap<i32, Question>> {
    Ok(load_questions(conn, survey_id)
        .await?
        .into_iter()
        .map(|q| (q.display_order, q))
        .collect())
}

/// Insert or update by natural key, returning the surrogate id
pub async fn upsert_question(
    conn: &mut SqliteConnection,
    survey_id: i64,
    draft: &QuestionDraft,
) -> EngineResult<i64> {
    let question_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions (
            survey_id, display_order, question_text, question_type, question_role,
            is_reverse, is_required
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(survey_id, display_order) DO UPDATE SET
            question_text = excluded.question_text,
            question_type = excluded.question_type,
            question_role = excluded.question_role,
            is_reverse = excluded.is_reverse,
            is_required = excluded.is_required,
            updated_at = CURRENT_TIMESTAMP
        RETURNING question_id
        "#,
    )
    .bind(survey_id)
    .bind(draft.display_order)
    .bind(&draft.question_text)
    .bind(draft.question_type.as_str())
    .bind(draft.question_role.as_str())
    .bind(draft.is_reverse)
    .bind(draft.is_required)
    .fetch_one(&mut *conn)
    .await?;

    Ok(question_id)
}

/// Next free display order (max + 1, starting at 1)
pub async fn next_display_order(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<i32> {
    let next: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(display_order), 0) + 1 FROM questions WHERE survey_id = ?",
    )
    .bind(survey_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(next)
}
