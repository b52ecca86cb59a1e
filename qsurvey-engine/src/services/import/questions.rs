//! questions.csv import
//!
//! Columns: surveyId, displayOrder, questionText, questionType (required);
//! questionRole, isReverse, isRequired, scales (optional). Questions are
//! upserted by display order; questions absent from the file are untouched.

use super::cells::RowReader;
use super::{begin_definition_import, check_survey_id, read_table, required_column};
use crate::db;
use crate::db::questions::QuestionDraft;
use crate::error::EngineResult;
use crate::models::{ImportIssue, ImportResult};
use qsurvey_common::csv::CsvTable;
use qsurvey_common::db::{QuestionRole, QuestionType};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, info};

struct Columns {
    survey_id: usize,
    display_order: usize,
    question_text: usize,
    question_type: usize,
    question_role: Option<usize>,
    is_reverse: Option<usize>,
    is_required: Option<usize>,
    scales: Option<usize>,
}

impl Columns {
    fn locate(table: &CsvTable) -> Result<Self, Vec<ImportIssue>> {
        let mut missing = Vec::new();
        let survey_id = required_column(table, &["surveyId"], &mut missing);
        let display_order = required_column(table, &["displayOrder"], &mut missing);
        let question_text = required_column(table, &["questionText"], &mut missing);
        let question_type = required_column(table, &["questionType"], &mut missing);

        match (survey_id, display_order, question_text, question_type) {
            (Some(survey_id), Some(display_order), Some(question_text), Some(question_type)) => {
                Ok(Self {
                    survey_id,
                    display_order,
                    question_text,
                    question_type,
                    question_role: table.column("questionRole"),
                    is_reverse: table.column("isReverse"),
                    is_required: table.column("isRequired"),
                    scales: table.column("scales"),
                })
            }
            _ => Err(missing),
        }
    }
}

/// A validated questions.csv row
struct QuestionRow {
    line: usize,
    draft: QuestionDraft,
    scales: Vec<(String, Decimal)>,
}

/// Import questions.csv into `survey_id` (all-or-nothing)
pub async fn import_questions(pool: &SqlitePool, survey_id: i64, csv: &[u8]) -> EngineResult<ImportResult> {
    let mut tx = begin_definition_import(pool, survey_id).await?;

    let table = match read_table(csv) {
        Ok(table) => table,
        Err(result) => return Ok(result),
    };
    let cols = match Columns::locate(&table) {
        Ok(cols) => cols,
        Err(missing) => return Ok(ImportResult::structural(missing)),
    };
    let total = table.records().len();

    // Phase 1: cells and duplicate natural keys
    let mut issues = Vec::new();
    let mut rows: Vec<QuestionRow> = Vec::with_capacity(total);
    let mut seen: BTreeMap<i32, usize> = BTreeMap::new();

    for record in table.records() {
        let mut reader = RowReader::new(record);
        check_survey_id(&mut reader, cols.survey_id, survey_id);
        let display_order = reader.order(cols.display_order, "displayOrder");
        let question_text = reader.text(cols.question_text, "questionText");
        let question_type = reader.parsed::<QuestionType>(cols.question_type, "questionType");
        let question_role = reader.parsed_or(cols.question_role, "questionRole", QuestionRole::Normal);
        let is_reverse = reader.bool_or(cols.is_reverse, "isReverse", false);
        let is_required = reader.bool_or(cols.is_required, "isRequired", true);
        let scales = reader.scales_spec(cols.scales, "scales");

        if let Some(order) = display_order {
            if let Some(first) = seen.insert(order, record.line) {
                reader.fail(
                    "displayOrder",
                    format!("duplicate display order {} (first seen on row {})", order, first),
                );
            }
        }

        let key = display_order.map(|o| format!("Q{}", o));
        match (display_order, question_text, question_type, question_role, is_reverse, is_required, scales) {
            (Some(display_order), Some(question_text), Some(question_type), Some(question_role), Some(is_reverse), Some(is_required), Some(scales))
                if !reader.has_issues() =>
            {
                rows.push(QuestionRow {
                    line: record.line,
                    draft: QuestionDraft {
                        display_order,
                        question_text,
                        question_type,
                        question_role,
                        is_reverse,
                        is_required,
                    },
                    scales,
                });
            }
            _ => issues.extend(reader.finish(key)),
        }
    }

    if !issues.is_empty() {
        info!(survey_id, rows = total, issues = issues.len(), "Questions import aborted during validation");
        return Ok(ImportResult::aborted(total, issues));
    }

    // Phase 2: inline scale codes must already exist
    let scale_index = db::scales::load_code_index(&mut tx, survey_id).await?;
    for row in &rows {
        for (code, _) in &row.scales {
            if !scale_index.contains_key(code) {
                issues.push(
                    ImportIssue::referential(row.line, format!("unknown scale code '{}'", code))
                        .with_field("scales")
                        .with_key(format!("Q{}", row.draft.display_order)),
                );
            }
        }
    }

    if !issues.is_empty() {
        info!(survey_id, rows = total, issues = issues.len(), "Questions import aborted on references");
        return Ok(ImportResult::aborted(total, issues));
    }

    // Phase 3: apply
    for row in &rows {
        let question_id = db::questions::upsert_question(&mut tx, survey_id, &row.draft).await?;
        debug!(survey_id, question_id, display_order = row.draft.display_order, "Question upserted");

        if !row.draft.question_type.needs_options() {
            db::options::replace_options(&mut tx, question_id, &[]).await?;
        }

        if cols.scales.is_some() {
            db::scales::delete_weights_for_question(&mut tx, question_id).await?;
            for (code, weight) in &row.scales {
                if let Some(&scale_id) = scale_index.get(code) {
                    db::scales::insert_weight(&mut tx, scale_id, question_id, *weight).await?;
                }
            }
        }
    }

    tx.commit().await?;
    info!(survey_id, rows = total, "Questions imported");

    Ok(ImportResult::completed(total))
}
