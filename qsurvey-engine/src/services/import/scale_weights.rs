//! scale_weights.csv import
//!
//! Columns: scaleCode, questionOrder (required; `questionDisplayOrder` is
//! accepted too); weight (optional, default 1). The survey's whole weight set
//! is replaced by the file.

use super::cells::RowReader;
use super::{begin_definition_import, read_table, required_column};
use crate::db;
use crate::error::EngineResult;
use crate::models::{ImportIssue, ImportResult};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::info;

struct WeightRow {
    line: usize,
    code: String,
    question_order: i32,
    weight: Decimal,
}

/// Import scale_weights.csv into `survey_id` (all-or-nothing)
pub async fn import_scale_weights(
    pool: &SqlitePool,
    survey_id: i64,
    csv: &[u8],
) -> EngineResult<ImportResult> {
    let mut tx = begin_definition_import(pool, survey_id).await?;

    let table = match read_table(csv) {
        Ok(table) => table,
        Err(result) => return Ok(result),
    };
    let mut missing = Vec::new();
    let code_col = required_column(&table, &["scaleCode"], &mut missing);
    let order_col = required_column(&table, &["questionOrder", "questionDisplayOrder"], &mut missing);
    let (code_col, order_col) = match (code_col, order_col) {
        (Some(code), Some(order)) => (code, order),
        _ => return Ok(ImportResult::structural(missing)),
    };
    let weight_col = table.column("weight");
    let total = table.records().len();

    // Phase 1: cells and duplicate (scale, question) edges
    let mut issues: Vec<ImportIssue> = Vec::new();
    let mut rows = Vec::with_capacity(total);
    let mut seen: BTreeMap<(String, i32), usize> = BTreeMap::new();

    for record in table.records() {
        let mut reader = RowReader::new(record);
        let code = reader.text(code_col, "scaleCode");
        let question_order = reader.order(order_col, "questionOrder");
        let weight = reader.weight_or(weight_col, "weight", Decimal::ONE);

        if let (Some(code), Some(order)) = (&code, question_order) {
            if let Some(first) = seen.insert((code.clone(), order), record.line) {
                reader.fail(
                    "questionOrder",
                    format!("duplicate weight for this scale and question (first seen on row {})", first),
                );
            }
        }

        let key = match (&code, question_order) {
            (Some(code), Some(order)) => Some(format!("{}/Q{}", code, order)),
            (Some(code), None) => Some(code.clone()),
            (None, Some(order)) => Some(format!("Q{}", order)),
            (None, None) => None,
        };
        match (code, question_order, weight) {
            (Some(code), Some(question_order), Some(weight)) if !reader.has_issues() => {
                rows.push(WeightRow {
                    line: record.line,
                    code,
                    question_order,
                    weight,
                })
            }
            _ => issues.extend(reader.finish(key)),
        }
    }

    if !issues.is_empty() {
        info!(survey_id, rows = total, issues = issues.len(), "Scale weights import aborted during validation");
        return Ok(ImportResult::aborted(total, issues));
    }

    // Phase 2: both ends of every edge must exist
    let scale_index = db::scales::load_code_index(&mut tx, survey_id).await?;
    let question_index = db::questions::load_order_index(&mut tx, survey_id).await?;
    let mut edges = Vec::with_capacity(rows.len());

    for row in &rows {
        let key = format!("{}/Q{}", row.code, row.question_order);
        let scale_id = scale_index.get(&row.code).copied();
        let question_id = question_index.get(&row.question_order).map(|q| q.question_id);

        if scale_id.is_none() {
            issues.push(
                ImportIssue::referential(row.line, format!("unknown scale code '{}'", row.code))
                    .with_field("scaleCode")
                    .with_key(key.clone()),
            );
        }
        if question_id.is_none() {
            issues.push(
                ImportIssue::referential(
                    row.line,
                    format!("no question with display order {}", row.question_order),
                )
                .with_field("questionOrder")
                .with_key(key),
            );
        }
        if let (Some(scale_id), Some(question_id)) = (scale_id, question_id) {
            edges.push((scale_id, question_id, row.weight));
        }
    }

    if !issues.is_empty() {
        info!(survey_id, rows = total, issues = issues.len(), "Scale weights import aborted on references");
        return Ok(ImportResult::aborted(total, issues));
    }

    // Phase 3: wipe and rewrite
    let removed = db::scales::delete_weights_for_survey(&mut tx, survey_id).await?;
    for (scale_id, question_id, weight) in edges {
        db::scales::insert_weight(&mut tx, scale_id, question_id, weight).await?;
    }

    tx.commit().await?;
    info!(survey_id, rows = total, removed, "Scale weights imported");

    Ok(ImportResult::completed(total))
}
