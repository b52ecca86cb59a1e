//! Option persistence
//!
//! The option set of a question is only ever replaced as a whole.

use crate::error::EngineResult;
use qsurvey_common::db::QuestionOption;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// Option fields without identity
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDraft {
    pub display_order: i32,
    pub option_text: String,
    pub score: Option<i32>,
    pub is_correct: bool,
}

fn option_from_row(row: &SqliteRow) -> QuestionOption {
    QuestionOption {
        option_id: row.get("option_id"),
        question_id: row.get("question_id"),
        display_order: row.get("display_order"),
        option_text: row.get("option_text"),
        score: row.get("score"),
        is_correct: row.get("is_correct"),
    }
}

/// Options of every question in a survey, by question then option order
pub async fn load_options_for_survey(
    conn: &mut SqliteConnection,
    survey_id: i64,
) -> EngineResult<Vec<QuestionOption>> {
    let rows = sqlx::query(
        r#"
        SELECT o.option_id, o.question_id, o.display_order, o.option_text, o.score, o.is_correct
        FROM question_options o
        JOIN questions q ON q.question_id = o.question_id
        WHERE q.survey_id = ?
        ORDER BY q.display_order, o.display_order
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(option_from_row).collect())
}

pub async fn load_options(conn: &mut SqliteConnection, question_id: i64) -> EngineResult<Vec<QuestionOption>> {
    let rows = sqlx::query(
        r#"
        SELECT option_id, question_id, display_order, option_text, score, is_correct
        FROM question_options
        WHERE question_id = ?
        ORDER BY display_order
        "#,
    )
    .bind(question_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(option_from_row).collect())
}

/// Delete every current option of the question, then insert `drafts` in
/// display order
pub async fn replace_options(
    conn: &mut SqliteConnection,
    question_id: i64,
    drafts: &[OptionDraft],
) -> EngineResult<()> {
    sqlx::query("DELETE FROM question_options WHERE question_id = ?")
        .bind(question_id)
        .execute(&mut *conn)
        .await?;

    let mut ordered: Vec<&OptionDraft> = drafts.iter().collect();
    ordered.sort_by_key(|d| d.display_order);

    for draft in ordered {
        sqlx::query(
            r#"
            INSERT INTO question_options (question_id, display_order, option_text, score, is_correct)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(question_id)
        .bind(draft.display_order)
        .bind(&draft.option_text)
        .bind(draft.score)
        .bind(draft.is_correct)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// True when `option_id` is one of `question_id`'s options
pub async fn option_belongs_to(
    conn: &mut SqliteConnection,
    option_id: i64,
    question_id: i64,
) -> EngineResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM question_options WHERE option_id = ? AND question_id = ?",
    )
    .bind(option_id)
    .bind(question_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found.is_some())
}
