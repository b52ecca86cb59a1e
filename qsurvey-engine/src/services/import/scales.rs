//! scales.csv import
//!
//! Columns: scaleCode, scaleName (required); description (optional). Scales
//! are upserted by code.

use super::cells::RowReader;
use super::{begin_definition_import, read_table, required_column};
use crate::db;
use crate::error::EngineResult;
use crate::models::{ImportIssue, ImportResult};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::info;

struct ScaleRow {
    code: String,
    name: String,
    description: Option<String>,
}

/// Import scales.csv into `survey_id` (all-or-nothing)
pub async fn import_scales(pool: &SqlitePool, survey_id: i64, csv: &[u8]) -> EngineResult<ImportResult> {
    let mut tx = begin_definition_import(pool, survey_id).await?;

    let table = match read_table(csv) {
        Ok(table) => table,
        Err(result) => return Ok(result),
    };
    let mut missing = Vec::new();
    let code_col = required_column(&table, &["scaleCode"], &mut missing);
    let name_col = required_column(&table, &["scaleName"], &mut missing);
    let (code_col, name_col) = match (code_col, name_col) {
        (Some(code), Some(name)) => (code, name),
        _ => return Ok(ImportResult::structural(missing)),
    };
    let description_col = table.column("description");
    let total = table.records().len();

    let mut issues: Vec<ImportIssue> = Vec::new();
    let mut rows = Vec::with_capacity(total);
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();

    for record in table.records() {
        let mut reader = RowReader::new(record);
        let code = reader.text(code_col, "scaleCode");
        let name = reader.text(name_col, "scaleName");
        let description = reader.optional_text(description_col);

        if let Some(code) = &code {
            if let Some(first) = seen.insert(code.clone(), record.line) {
                reader.fail(
                    "scaleCode",
                    format!("duplicate scale code (first seen on row {})", first),
                );
            }
        }

        match (code, name) {
            (Some(code), Some(name)) if !reader.has_issues() => rows.push(ScaleRow {
                code,
                name,
                description,
            }),
            (code, _) => issues.extend(reader.finish(code)),
        }
    }

    if !issues.is_empty() {
        info!(survey_id, rows = total, issues = issues.len(), "Scales import aborted during validation");
        return Ok(ImportResult::aborted(total, issues));
    }

    for row in &rows {
        db::scales::upsert_scale(&mut tx, survey_id, &row.code, &row.name, row.description.as_deref())
            .await?;
    }

    tx.commit().await?;
    info!(survey_id, rows = total, "Scales imported");

    Ok(ImportResult::completed(total))
}
