//! Bulk answer ingestion (best-effort)
//!
//! Header: optional `respondentKey`, then one `Q<n>` column per question where
//! `n` is the question's display order. SINGLE cells hold an option display
//! order, MULTI cells a comma-separated list of them, TEXT/NUMBER cells the raw
//! value. Blank cells are unanswered.
//!
//! Every row becomes its own respondent with a COMPLETED session, written in
//! its own transaction. A failing row is reported and skipped.

use super::cells::parse_int;
use super::read_table;
use crate::db;
use crate::error::EngineResult;
use crate::models::{AnswerPayload, ImportIssue, ImportResult};
use crate::services::ensure_survey_exists;
use crate::services::recorder::write_answer;
use qsurvey_common::csv::{normalize_header, CsvRecord, CsvTable};
use qsurvey_common::db::{Question, QuestionType, SessionStatus};
use qsurvey_common::time;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of generated respondent keys
pub const GENERATED_KEY_PREFIX: &str = "imp-";

/// A question column and what its cells resolve against
struct AnswerColumn {
    index: usize,
    question: Question,
    /// Option display order -> option id
    options: BTreeMap<i32, i64>,
}

impl AnswerColumn {
    fn label(&self) -> String {
        format!("Q{}", self.question.display_order)
    }

    /// Payload for one cell; `None` when the cell is blank
    fn payload(&self, raw: &str) -> Result<Option<AnswerPayload>, String> {
        if raw.is_empty() {
            return Ok(None);
        }
        let payload = match self.question.question_type {
            QuestionType::SingleChoice => AnswerPayload::Single(Some(self.option_id(raw)?)),
            QuestionType::MultiChoice => {
                let ids = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| self.option_id(p))
                    .collect::<Result<Vec<_>, _>>()?;
                AnswerPayload::Multi(ids)
            }
            QuestionType::Text => AnswerPayload::Text(raw.to_string()),
            QuestionType::Number => AnswerPayload::Number(raw.to_string()),
        };
        Ok(Some(payload))
    }

    fn option_id(&self, raw: &str) -> Result<i64, String> {
        let order = parse_int(raw).map_err(|e| format!("{}: {}", self.label(), e))?;
        i32::try_from(order)
            .ok()
            .and_then(|o| self.options.get(&o).copied())
            .ok_or_else(|| format!("{}: no option with display order {}", self.label(), order))
    }
}

/// Question number named by a `Q<n>` header
fn question_header(header: &str) -> Option<i32> {
    let normalized = normalize_header(header);
    let digits = normalized.strip_prefix('q')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Import respondent answers, one respondent per row (best-effort)
///
/// Header problems return an empty result. Otherwise every row is attempted;
/// `success_rows + error_rows == total_rows`.
pub async fn import_answers(pool: &SqlitePool, survey_id: i64, csv: &[u8]) -> EngineResult<ImportResult> {
    let (questions, options) = {
        let mut conn = pool.acquire().await?;
        ensure_survey_exists(&mut conn, survey_id).await?;
        let questions = db::questions::load_order_index(&mut conn, survey_id).await?;
        let mut options: HashMap<i64, BTreeMap<i32, i64>> = HashMap::new();
        for option in db::options::load_options_for_survey(&mut conn, survey_id).await? {
            options
                .entry(option.question_id)
                .or_default()
                .insert(option.display_order, option.option_id);
        }
        (questions, options)
    };

    let table = match read_table(csv) {
        Ok(table) => table,
        Err(result) => return Ok(result),
    };
    let key_col = table.column("respondentKey");
    let columns = match locate_answer_columns(&table, &questions, &options) {
        Ok(columns) => columns,
        Err(issues) => return Ok(ImportResult::structural(issues)),
    };

    let mut result = ImportResult {
        total_rows: table.records().len(),
        ..Default::default()
    };

    for record in table.records() {
        let key = key_col
            .map(|c| record.cell(c))
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", GENERATED_KEY_PREFIX, Uuid::new_v4()));

        match import_row(pool, survey_id, &key, record, &columns).await {
            Ok(response_id) => {
                result.success_rows += 1;
                debug!(survey_id, response_id, row = record.line, "Answer row imported");
            }
            Err(message) => {
                warn!(survey_id, row = record.line, "Answer row failed: {}", message);
                result.error_rows += 1;
                result.errors.push(
                    ImportIssue::row_import(record.line, message).with_key(key),
                );
            }
        }
    }

    info!(
        survey_id,
        rows = result.total_rows,
        imported = result.success_rows,
        failed = result.error_rows,
        "Answers imported"
    );
    Ok(result)
}

fn locate_answer_columns(
    table: &CsvTable,
    questions: &BTreeMap<i32, Question>,
    options: &HashMap<i64, BTreeMap<i32, i64>>,
) -> Result<Vec<AnswerColumn>, Vec<ImportIssue>> {
    let mut columns: Vec<AnswerColumn> = Vec::new();
    let mut issues = Vec::new();

    for (index, header) in table.headers().iter().enumerate() {
        let Some(order) = question_header(header) else {
            if normalize_header(header) != "respondentkey" {
                debug!("Ignoring column '{}'", header);
            }
            continue;
        };
        if columns.iter().any(|c| c.question.display_order == order) {
            issues.push(
                ImportIssue::structural(format!("column Q{} appears more than once", order))
                    .with_field(header.clone()),
            );
            continue;
        }
        match questions.get(&order) {
            Some(question) => columns.push(AnswerColumn {
                index,
                options: options.get(&question.question_id).cloned().unwrap_or_default(),
                question: question.clone(),
            }),
            None => issues.push(
                ImportIssue::structural(format!("no question with display order {}", order))
                    .with_field(header.clone()),
            ),
        }
    }

    if columns.is_empty() && issues.is_empty() {
        issues.push(ImportIssue::structural("no Q<n> answer columns found"));
    }
    if issues.is_empty() {
        Ok(columns)
    } else {
        Err(issues)
    }
}

/// Parse and write one row in its own transaction
async fn import_row(
    pool: &SqlitePool,
    survey_id: i64,
    respondent_key: &str,
    record: &CsvRecord,
    columns: &[AnswerColumn],
) -> Result<i64, String> {
    let mut answers = Vec::with_capacity(columns.len());
    for column in columns {
        if let Some(payload) = column.payload(record.cell(column.index))? {
            answers.push((&column.question, payload));
        }
    }

    write_row(pool, survey_id, respondent_key, &answers)
        .await
        .map_err(|e| match e {
            e if e.is_unique_violation() => {
                format!("respondent key '{}' already exists", respondent_key)
            }
            e => e.to_string(),
        })
}

async fn write_row(
    pool: &SqlitePool,
    survey_id: i64,
    respondent_key: &str,
    answers: &[(&Question, AnswerPayload)],
) -> EngineResult<i64> {
    let now = time::now();
    let mut tx = pool.begin().await?;

    let respondent_id = db::responses::insert_respondent(&mut tx, survey_id, respondent_key, now).await?;
    let response_id =
        db::responses::insert_session(&mut tx, respondent_id, SessionStatus::Completed, now).await?;
    for (question, payload) in answers {
        write_answer(&mut tx, response_id, question, payload, now).await?;
    }

    tx.commit().await?;
    Ok(response_id)
}
