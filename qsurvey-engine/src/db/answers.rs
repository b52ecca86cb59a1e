//! Answer persistence

use super::enum_column;
use crate::error::EngineResult;
use crate::models::AnswerDetail;
use chrono::{DateTime, Utc};
use qsurvey_common::time;
use sqlx::{Row, SqliteConnection};

/// Answer columns; at most one payload kind is set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerValues<'a> {
    pub option_id: Option<i64>,
    pub answer_number: Option<f64>,
    pub answer_text: Option<&'a str>,
}

/// Delete every answer of a response along with its multi selections
pub async fn delete_answers(conn: &mut SqliteConnection, response_id: i64) -> EngineResult<u64> {
    sqlx::query(
        r#"
        DELETE FROM answer_multi_selections
        WHERE answer_id IN (SELECT answer_id FROM question_answers WHERE response_id = ?)
        "#,
    )
    .bind(response_id)
    .execute(&mut *conn)
    .await?;

    let result = sqlx::query("DELETE FROM question_answers WHERE response_id = ?")
        .bind(response_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn insert_answer(
    conn: &mut SqliteConnection,
    response_id: i64,
    question_id: i64,
    values: &AnswerValues<'_>,
    now: DateTime<Utc>,
) -> EngineResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO question_answers (
            response_id, question_id, option_id, answer_number, answer_text, created_at
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(response_id)
    .bind(question_id)
    .bind(values.option_id)
    .bind(values.answer_number)
    .bind(values.answer_text)
    .bind(time::to_db(now))
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_multi_selection(
    conn: &mut SqliteConnection,
    answer_id: i64,
    option_id: i64,
) -> EngineResult<()> {
    sqlx::query("INSERT INTO answer_multi_selections (answer_id, option_id) VALUES (?, ?)")
        .bind(answer_id)
        .bind(option_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Answer lines of a response ordered by question order, answer id, option id
pub async fn load_answer_details(
    conn: &mut SqliteConnection,
    response_id: i64,
) -> EngineResult<Vec<AnswerDetail>> {
    let rows = sqlx::query(
        r#"
        SELECT a.answer_id, a.response_id, a.question_id, q.display_order AS question_order,
               q.question_text, q.question_type, a.option_id, o.option_text,
               a.answer_number, a.answer_text, a.created_at
        FROM question_answers a
        JOIN questions q ON q.question_id = a.question_id
        LEFT JOIN question_options o ON o.option_id = a.option_id
        WHERE a.response_id = ? AND q.question_type <> 'MULTI_CHOICE'

        UNION ALL

        SELECT a.answer_id, a.response_id, a.question_id, q.display_order AS question_order,
               q.question_text, q.question_type, m.option_id, o.option_text,
               NULL AS answer_number, NULL AS answer_text, a.created_at
        FROM question_answers a
        JOIN questions q ON q.question_id = a.question_id
        JOIN answer_multi_selections m ON m.answer_id = a.answer_id
        JOIN question_options o ON o.option_id = m.option_id
        WHERE a.response_id = ? AND q.question_type = 'MULTI_CHOICE'

        ORDER BY question_order, answer_id, option_id
        "#,
    )
    .bind(response_id)
    .bind(response_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let created_at: String = row.get("created_at");
            Ok(AnswerDetail {
                answer_id: row.get("answer_id"),
                response_id: row.get("response_id"),
                question_id: row.get("question_id"),
                question_order: row.get("question_order"),
                question_text: row.get("question_text"),
                question_type: enum_column(row, "question_type")?,
                option_id: row.get("option_id"),
                option_text: row.get("option_text"),
                answer_number: row.get("answer_number"),
                answer_text: row.get("answer_text"),
                created_at: time::from_db(&created_at)?,
            })
        })
        .collect()
}
