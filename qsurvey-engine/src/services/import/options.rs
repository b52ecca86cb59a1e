//! options.csv import
//!
//! Columns: surveyId, questionDisplayOrder, displayOrder, optionText, score
//! (required); isCorrect (optional). Every question named in the file gets
//! its option set replaced by the rows given for it.

use super::cells::RowReader;
use super::{begin_definition_import, check_survey_id, read_table, required_column};
use crate::db;
use crate::db::options::OptionDraft;
use crate::error::EngineResult;
use crate::models::{ImportIssue, ImportResult};
use qsurvey_common::csv::CsvTable;
use qsurvey_common::db::QuestionRole;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Minimum option count for choice questions
pub const MIN_CHOICE_OPTIONS: usize = 2;

struct Columns {
    survey_id: usize,
    question_order: usize,
    display_order: usize,
    option_text: usize,
    score: usize,
    is_correct: Option<usize>,
}

impl Columns {
    fn locate(table: &CsvTable) -> Result<Self, Vec<ImportIssue>> {
        let mut missing = Vec::new();
        let survey_id = required_column(table, &["surveyId"], &mut missing);
        let question_order = required_column(
            table,
            &["questionDisplayOrder", "questionOrder"],
            &mut missing,
        );
        let display_order = required_column(table, &["displayOrder"], &mut missing);
        let option_text = required_column(table, &["optionText"], &mut missing);
        let score = required_column(table, &["score"], &mut missing);

        match (survey_id, question_order, display_order, option_text, score) {
            (Some(survey_id), Some(question_order), Some(display_order), Some(option_text), Some(score)) => {
                Ok(Self {
                    survey_id,
                    question_order,
                    display_order,
                    option_text,
                    score,
                    is_correct: table.column("isCorrect"),
                })
            }
            _ => Err(missing),
        }
    }
}

struct OptionRow {
    line: usize,
    question_order: i32,
    draft: OptionDraft,
}

/// Import options.csv into `survey_id` (all-or-nothing)
pub async fn import_options(pool: &SqlitePool, survey_id: i64, csv: &[u8]) -> EngineResult<ImportResult> {
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

    // Phase 1: cells and duplicate (question, option) keys
    let mut issues = Vec::new();
    let mut rows: Vec<OptionRow> = Vec::with_capacity(total);
    let mut seen: BTreeMap<(i32, i32), usize> = BTreeMap::new();

    for record in table.records() {
        let mut reader = RowReader::new(record);
        check_survey_id(&mut reader, cols.survey_id, survey_id);
        let question_order = reader.order(cols.question_order, "questionDisplayOrder");
        let display_order = reader.order(cols.display_order, "displayOrder");
        let option_text = reader.text(cols.option_text, "optionText");
        let score = reader.optional_score(cols.score, "score");
        let is_correct = reader.bool_or(cols.is_correct, "isCorrect", false);

        if let (Some(q), Some(o)) = (question_order, display_order) {
            if let Some(first) = seen.insert((q, o), record.line) {
                reader.fail(
                    "displayOrder",
                    format!("duplicate option {} for question {} (first seen on row {})", o, q, first),
                );
            }
        }

        let key = match (question_order, display_order) {
            (Some(q), Some(o)) => Some(format!("Q{}/{}", q, o)),
            (Some(q), None) => Some(format!("Q{}", q)),
            _ => None,
        };
        match (question_order, display_order, option_text, score, is_correct) {
            (Some(question_order), Some(display_order), Some(option_text), Some(score), Some(is_correct))
                if !reader.has_issues() =>
            {
                rows.push(OptionRow {
                    line: record.line,
                    question_order,
                    draft: OptionDraft {
                        display_order,
                        option_text,
                        score,
                        is_correct,
                    },
                });
            }
            _ => issues.extend(reader.finish(key)),
        }
    }

    if !issues.is_empty() {
        info!(survey_id, rows = total, issues = issues.len(), "Options import aborted during validation");
        return Ok(ImportResult::aborted(total, issues));
    }

    // Phase 2: every question order must resolve, and the grouped sets must fit
    // the question type
    let index = db::questions::load_order_index(&mut tx, survey_id).await?;
    let mut groups: BTreeMap<i32, Vec<&OptionRow>> = BTreeMap::new();
    for row in &rows {
        if index.contains_key(&row.question_order) {
            groups.entry(row.question_order).or_default().push(row);
        } else {
            issues.push(
                ImportIssue::referential(
                    row.line,
                    format!("no question with display order {}", row.question_order),
                )
                .with_field("questionDisplayOrder")
                .with_key(format!("Q{}/{}", row.question_order, row.draft.display_order)),
            );
        }
    }

    for (order, group) in &groups {
        let Some(question) = index.get(order) else {
            continue;
        };
        let first_line = group.iter().map(|r| r.line).min().unwrap_or(0);
        if !question.question_type.needs_options() {
            issues.push(
                ImportIssue::validation(
                    first_line,
                    format!("{} questions do not take options", question.question_type),
                )
                .with_key(format!("Q{}", order)),
            );
        } else if group.len() < MIN_CHOICE_OPTIONS {
            issues.push(
                ImportIssue::validation(
                    first_line,
                    format!(
                        "choice question needs at least {} options, got {}",
                        MIN_CHOICE_OPTIONS,
                        group.len()
                    ),
                )
                .with_key(format!("Q{}", order)),
            );
        }
    }

    if !issues.is_empty() {
        info!(survey_id, rows = total, issues = issues.len(), "Options import aborted on references");
        return Ok(ImportResult::aborted(total, issues));
    }

    // Phase 3: replace each named question's option set
    for (order, group) in &groups {
        let Some(question) = index.get(order) else {
            continue;
        };
        let attention = question.question_role == QuestionRole::AttentionCheck;
        let drafts: Vec<OptionDraft> = group
            .iter()
            .map(|row| OptionDraft {
                is_correct: attention && row.draft.is_correct,
                ..row.draft.clone()
            })
            .collect();

        db::options::replace_options(&mut tx, question.question_id, &drafts).await?;
        debug!(survey_id, question_id = question.question_id, options = drafts.len(), "Options replaced");
    }

    tx.commit().await?;
    info!(survey_id, rows = total, questions = groups.len(), "Options imported");

    Ok(ImportResult::completed(total))
}
