//! Definition Importer and bulk answer ingestion
//!
//! Definition imports (questions, options, scales, scale weights) are
//! all-or-nothing: ethics guard, header check, cell validation, reference
//! check, then one transaction that either commits every row or none.
//!
//! [`import_answers`] is the best-effort exception. Each row commits on its
//! own and a failing row is reported without stopping the others.

pub mod answers;
pub mod cells;
pub mod options;
pub mod questions;
pub mod scale_weights;
pub mod scales;

pub use answers::import_answers;
pub use options::import_options;
pub use questions::import_questions;
pub use scale_weights::import_scale_weights;
pub use scales::import_scales;

use super::{ensure_survey_exists, ethics_guard};
use crate::error::EngineResult;
use crate::models::{ImportIssue, ImportResult};
use qsurvey_common::csv::CsvTable;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Open the import transaction after the guard and existence checks
pub(crate) async fn begin_definition_import(
    pool: &SqlitePool,
    survey_id: i64,
) -> EngineResult<Transaction<'static, Sqlite>> {
    let mut tx = pool.begin().await?;
    ethics_guard::ensure_definitions_mutable(&mut tx, survey_id).await?;
    ensure_survey_exists(&mut tx, survey_id).await?;
    Ok(tx)
}

/// Decode the payload, or the structural result to return
pub(crate) fn read_table(csv: &[u8]) -> Result<CsvTable, ImportResult> {
    CsvTable::parse(csv)
        .map_err(|e| ImportResult::structural(vec![ImportIssue::structural(e.to_string())]))
}

/// Index of a required column, recording a structural issue when absent
///
/// `names[0]` is the name used in messages; the rest are accepted aliases.
pub(crate) fn required_column(
    table: &CsvTable,
    names: &[&str],
    missing: &mut Vec<ImportIssue>,
) -> Option<usize> {
    let found = table.column_any(names);
    if found.is_none() {
        missing.push(
            ImportIssue::structural(format!("missing required column '{}'", names[0]))
                .with_field(names[0]),
        );
    }
    found
}

/// Record an issue if `survey_id` in the file differs from the target survey
pub(crate) fn check_survey_id(
    reader: &mut cells::RowReader<'_>,
    col: usize,
    target: i64,
) {
    if let Some(found) = reader.int(col, "surveyId") {
        if found != target {
            reader.fail(
                "surveyId",
                format!("survey id {} does not match target survey {}", found, target),
            );
        }
    }
}
