//! Scale and scale-weight persistence

use crate::error::EngineResult;
use qsurvey_common::db::{parse_weight, Scale, ScaleWeight};
use rust_decimal::Decimal;
use sqlx::{Row, SqliteConnection};
use std::collections::BTreeMap;

/// Insert or update by `(survey_id, scale_code)`, returning the surrogate id
pub async fn upsert_scale(
    conn: &mut SqliteConnection,
    survey_id: i64,
    scale_code: &str,
    scale_name: &str,
    description: Option<&str>,
) -> EngineResult<i64> {
    let scale_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO scales (survey_id, scale_code, scale_name, description)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(survey_id, scale_code) DO UPDATE SET
            scale_name = excluded.scale_name,
            description = excluded.description
        RETURNING scale_id
        "#,
    )
    .bind(survey_id)
    .bind(scale_code)
    .bind(scale_name)
    .bind(description)
    .fetch_one(&mut *conn)
    .await?;

    Ok(scale_id)
}

pub async fn load_scales(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<Vec<Scale>> {
    let rows = sqlx::query(
        r#"
        SELECT scale_id, survey_id, scale_code, scale_name, description
        FROM scales
        WHERE survey_id = ?
        ORDER BY scale_id
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Scale {
            scale_id: row.get("scale_id"),
            survey_id: row.get("survey_id"),
            scale_code: row.get("scale_code"),
            scale_name: row.get("scale_name"),
            description: row.get("description"),
        })
        .collect())
}

/// Scale code -> scale id for a survey
pub async fn load_code_index(
    conn: &mut SqliteConnection,
    survey_id: i64,
) -> EngineResult<BTreeMap<String, i64>> {
    Ok(load_scales(conn, survey_id)
        .await?
        .into_iter()
        .map(|s| (s.scale_code, s.scale_id))
        .collect())
}

/// Weight edges of a survey, by scale then question order
pub async fn load_weights(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<Vec<ScaleWeight>> {
    let rows = sqlx::query(
        r#"
        SELECT sw.scale_id, sw.question_id, sw.weight
        FROM scale_weights sw
        JOIN scales s ON s.scale_id = sw.scale_id
        JOIN questions q ON q.question_id = sw.question_id
        WHERE s.survey_id = ?
        ORDER BY sw.scale_id, q.display_order
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let weight: String = row.get("weight");
            Ok(ScaleWeight {
                scale_id: row.get("scale_id"),
                question_id: row.get("question_id"),
                weight: parse_weight(&weight)?,
            })
        })
        .collect()
}

/// Remove every weight edge of the survey
pub async fn delete_weights_for_survey(conn: &mut SqliteConnection, survey_id: i64) -> EngineResult<u64> {
    let result = sqlx::query(
        "DELETE FROM scale_weights WHERE scale_id IN (SELECT scale_id FROM scales WHERE survey_id = ?)",
    )
    .bind(survey_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Remove every weight edge of one question
pub async fn delete_weights_for_question(conn: &mut SqliteConnection, question_id: i64) -> EngineResult<u64> {
    let result = sqlx::query("DELETE FROM scale_weights WHERE question_id = ?")
        .bind(question_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn insert_weight(
    conn: &mut SqliteConnection,
    scale_id: i64,
    question_id: i64,
    weight: Decimal,
) -> EngineResult<()> {
    sqlx::query("INSERT INTO scale_weights (scale_id, question_id, weight) VALUES (?, ?, ?)")
        .bind(scale_id)
        .bind(question_id)
        .bind(weight.normalize().to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}
