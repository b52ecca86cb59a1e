//! Import reports
//!
//! Every import entry point returns an [`ImportResult`]. Aborted imports carry
//! their reasons in `errors`; nothing was written in that case.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Category of an import problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// Header missing or unreadable; nothing past the header was examined
    StructuralCsv,
    /// Bad cell value, duplicate natural key, too few options
    Validation,
    /// Unknown question order or scale code
    Referential,
    /// One bulk answer row failed; other rows continue
    RowImport,
}

/// One import problem with enough context to locate it in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub kind: IssueKind,

    /// Physical line number (header is line 1)
    pub row: Option<usize>,

    /// Column name as the caller knows it
    pub field: Option<String>,

    /// Natural key of the offending entity (e.g. "Q3", "Q3/2", "ANX")
    pub key: Option<String>,

    pub message: String,
}

impl ImportIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            row: None,
            field: None,
            key: None,
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(IssueKind::StructuralCsv, message)
    }

    pub fn validation(row: usize, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Validation, message).at_row(row)
    }

    pub fn referential(row: usize, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Referential, message).at_row(row)
    }

    pub fn row_import(row: usize, message: impl Into<String>) -> Self {
        Self::new(IssueKind::RowImport, message).at_row(row)
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(row) = self.row {
            write!(f, "row {}: ", row)?;
        }
        if let Some(field) = &self.field {
            write!(f, "[{}] ", field)?;
        }
        if let Some(key) = &self.key {
            write!(f, "({}) ", key)?;
        }
        f.write_str(&self.message)
    }
}

/// Import completion result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Data rows read from the file (0 when the header could not be read)
    pub total_rows: usize,

    /// Rows written
    pub success_rows: usize,

    /// Rows with at least one problem
    pub error_rows: usize,

    pub errors: Vec<ImportIssue>,
}

impl ImportResult {
    /// Every row applied
    pub fn completed(total_rows: usize) -> Self {
        Self {
            total_rows,
            success_rows: total_rows,
            error_rows: 0,
            errors: Vec::new(),
        }
    }

    /// Header-level failure; no rows examined
    pub fn structural(errors: Vec<ImportIssue>) -> Self {
        Self {
            total_rows: 0,
            success_rows: 0,
            error_rows: 0,
            errors,
        }
    }

    /// Whole import rolled back because of `errors`
    pub fn aborted(total_rows: usize, errors: Vec<ImportIssue>) -> Self {
        let error_rows = errors
            .iter()
            .filter_map(|e| e.row)
            .collect::<BTreeSet<_>>()
            .len();
        Self {
            total_rows,
            success_rows: 0,
            error_rows,
            errors,
        }
    }

    /// True when the import committed with no problems
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Rendered messages, one per issue
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display_includes_context() {
        let issue = ImportIssue::validation(4, "not an integer: 'x'")
            .with_field("score")
            .with_key("Q3/2");
        assert_eq!(issue.to_string(), "row 4: [score] (Q3/2) not an integer: 'x'");
    }

    #[test]
    fn test_aborted_counts_distinct_rows() {
        let result = ImportResult::aborted(
            5,
            vec![
                ImportIssue::validation(2, "a"),
                ImportIssue::validation(2, "b"),
                ImportIssue::referential(4, "c"),
            ],
        );
        assert_eq!(result.total_rows, 5);
        assert_eq!(result.success_rows, 0);
        assert_eq!(result.error_rows, 2);
        assert!(!result.is_success());
    }

    #[test]
    fn test_structural_is_empty_result() {
        let result = ImportResult::structural(vec![ImportIssue::structural("missing column")]);
        assert_eq!(result.total_rows, 0);
        assert_eq!(result.error_messages(), vec!["missing column".to_string()]);
    }
}
