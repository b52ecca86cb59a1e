//! Read-only aggregation queries
//!
//! Only COMPLETED sessions are visible here. Every query has a full ORDER BY
//! ending in a surrogate id.

use crate::error::EngineResult;
use crate::models::{OptionCount, QuestionCount};
use qsurvey_common::db::parse_weight;
use rust_decimal::Decimal;
use sqlx::{Row, SqliteConnection};

/// Per-question score totals used to derive averages
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTotal {
    pub question_id: i64,
    pub display_order: i32,
    pub scored_count: i64,
    pub score_sum: i64,
}

/// One answered scale item of one respondent
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleItemRow {
    pub scale_id: i64,
    pub respondent_id: i64,
    pub question_id: i64,
    pub weight: Decimal,
    pub score: i64,
    pub is_reverse: bool,
    pub min_score: i64,
    pub max_score: i64,
}

pub async fn question_counts(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<Vec<QuestionCount>> {
    let rows = sqlx::query(
        r#"
        SELECT q.question_id, q.display_order,
            (SELECT COUNT(DISTINCT a.response_id)
               FROM question_answers a
               JOIN response_sessions rs ON rs.response_id = a.response_id
              WHERE a.question_id = q.question_id AND rs.status = 'COMPLETED') AS answered_count
        FROM questions q
        WHERE q.survey_id = ?
        ORDER BY q.display_order, q.question_id
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| QuestionCount {
            question_id: row.get("question_id"),
            display_order: row.get("display_order"),
            answered_count: row.get("answered_count"),
        })
        .collect())
}

/// SINGLE answers plus MULTI selections per option
pub async fn option_counts(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<Vec<OptionCount>> {
    let rows = sqlx::query(
        r#"
        SELECT o.question_id, o.option_id, o.display_order, o.option_text,
            (SELECT COUNT(*)
               FROM question_answers a
               JOIN response_sessions rs ON rs.response_id = a.response_id
              WHERE a.option_id = o.option_id AND rs.status = 'COMPLETED')
          + (SELECT COUNT(*)
               FROM answer_multi_selections m
               JOIN question_answers a ON a.answer_id = m.answer_id
               JOIN response_sessions rs ON rs.response_id = a.response_id
              WHERE m.option_id = o.option_id AND rs.status = 'COMPLETED') AS selection_count
        FROM question_options o
        JOIN questions q ON q.question_id = o.question_id
        WHERE q.survey_id = ?
        ORDER BY q.display_order, o.display_order, o.option_id
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| OptionCount {
            question_id: row.get("question_id"),
            option_id: row.get("option_id"),
            display_order: row.get("display_order"),
            option_text: row.get("option_text"),
            selection_count: row.get("selection_count"),
        })
        .collect())
}

/// Score sums of SINGLE_CHOICE questions with at least one scored answer
pub async fn score_totals(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<Vec<ScoreTotal>> {
    let rows = sqlx::query(
        r#"
        SELECT q.question_id, q.display_order,
               COUNT(o.score) AS scored_count,
               COALESCE(SUM(o.score), 0) AS score_sum
        FROM questions q
        JOIN question_answers a ON a.question_id = q.question_id
        JOIN response_sessions rs ON rs.response_id = a.response_id
        JOIN question_options o ON o.option_id = a.option_id
        WHERE q.survey_id = ? AND q.question_type = 'SINGLE_CHOICE' AND rs.status = 'COMPLETED'
        GROUP BY q.question_id, q.display_order
        HAVING COUNT(o.score) > 0
        ORDER BY q.display_order, q.question_id
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ScoreTotal {
            question_id: row.get("question_id"),
            display_order: row.get("display_order"),
            scored_count: row.get("scored_count"),
            score_sum: row.get("score_sum"),
        })
        .collect())
}

/// Scored SINGLE_CHOICE items of every completed respondent, for every
/// weight edge of the survey
///
/// Min/max are taken over the scored options of the item's question.
pub async fn scale_items(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<Vec<ScaleItemRow>> {
    let rows = sqlx::query(
        r#"
        SELECT sw.scale_id, r.respondent_id, q.question_id, sw.weight, o.score, q.is_reverse,
            (SELECT MIN(mo.score) FROM question_options mo WHERE mo.question_id = q.question_id) AS min_score,
            (SELECT MAX(mo.score) FROM question_options mo WHERE mo.question_id = q.question_id) AS max_score
        FROM scale_weights sw
        JOIN scales s ON s.scale_id = sw.scale_id
        JOIN questions q ON q.question_id = sw.question_id
        JOIN question_answers a ON a.question_id = q.question_id
        JOIN question_options o ON o.option_id = a.option_id
        JOIN response_sessions rs ON rs.response_id = a.response_id
        JOIN respondents r ON r.respondent_id = rs.respondent_id
        WHERE s.survey_id = ?
          AND q.question_type = 'SINGLE_CHOICE'
          AND rs.status = 'COMPLETED'
          AND o.score IS NOT NULL
        ORDER BY sw.scale_id, r.respondent_id, q.display_order, q.question_id
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let weight: String = row.get("weight");
            Ok(ScaleItemRow {
                scale_id: row.get("scale_id"),
                respondent_id: row.get("respondent_id"),
                question_id: row.get("question_id"),
                weight: parse_weight(&weight)?,
                score: row.get("score"),
                is_reverse: row.get("is_reverse"),
                min_score: row.get("min_score"),
                max_score: row.get("max_score"),
            })
        })
        .collect()
}
