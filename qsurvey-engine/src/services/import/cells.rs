//! Cell coercion for import rows
//!
//! [`RowReader`] reads one record and collects every problem it finds with the
//! row number and column name attached, so a single pass reports all of them.

use crate::models::ImportIssue;
use qsurvey_common::csv::CsvRecord;
use rust_decimal::Decimal;
use std::str::FromStr;

pub fn parse_int(raw: &str) -> Result<i64, String> {
    raw.parse::<i64>()
        .map_err(|_| format!("not an integer: '{}'", raw))
}

/// "1"/"true" are true, "0"/"false" are false (case-insensitive)
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(format!("not a boolean (expected 1/0/true/false): '{}'", raw)),
    }
}

/// Largest accepted scale weight
pub const MAX_WEIGHT: i64 = 1_000_000;

pub fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw).map_err(|_| format!("not a decimal: '{}'", raw))
}

/// Scale weight in `0..=MAX_WEIGHT`
pub fn parse_weight(raw: &str) -> Result<Decimal, String> {
    let weight = parse_decimal(raw)?;
    if weight < Decimal::ZERO || weight > Decimal::from(MAX_WEIGHT) {
        return Err(format!("weight must be between 0 and {}: '{}'", MAX_WEIGHT, raw));
    }
    Ok(weight)
}

/// Parse an inline scales cell: `CODE:weight|CODE2:weight`, weight defaults to 1
pub fn parse_scales_spec(raw: &str) -> Result<Vec<(String, Decimal)>, String> {
    let mut out = Vec::new();
    for part in raw.split('|').map(str::trim).filter(|p| !p.is_empty()) {
        let (code, weight) = match part.split_once(':') {
            Some((code, weight)) => (code.trim(), parse_weight(weight.trim())?),
            None => (part, Decimal::ONE),
        };
        if code.is_empty() {
            return Err(format!("scale code missing in '{}'", part));
        }
        if out.iter().any(|(c, _): &(String, Decimal)| c == code) {
            return Err(format!("scale '{}' listed twice", code));
        }
        out.push((code.to_string(), weight));
    }
    Ok(out)
}

/// Reads typed cells from one record, collecting issues
pub struct RowReader<'a> {
    record: &'a CsvRecord,
    issues: Vec<ImportIssue>,
}

impl<'a> RowReader<'a> {
    pub fn new(record: &'a CsvRecord) -> Self {
        Self {
            record,
            issues: Vec::new(),
        }
    }

    pub fn line(&self) -> usize {
        self.record.line
    }

    /// Record an issue against this row
    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.issues
            .push(ImportIssue::validation(self.record.line, message).with_field(field));
    }

    /// Non-empty text
    pub fn text(&mut self, col: usize, field: &str) -> Option<String> {
        let value = self.record.cell(col);
        if value.is_empty() {
            self.fail(field, "value is required");
            return None;
        }
        Some(value.to_string())
    }

    /// Optional text; `None` when the column is absent or the cell is blank
    pub fn optional_text(&self, col: Option<usize>) -> Option<String> {
        col.map(|c| self.record.cell(c))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn int(&mut self, col: usize, field: &str) -> Option<i64> {
        let value = self.record.cell(col);
        if value.is_empty() {
            self.fail(field, "value is required");
            return None;
        }
        self.coerce(field, parse_int(value))
    }

    /// Positive 32-bit order value
    pub fn order(&mut self, col: usize, field: &str) -> Option<i32> {
        let value = self.int(col, field)?;
        match i32::try_from(value) {
            Ok(v) if v >= 1 => Some(v),
            _ => {
                self.fail(field, format!("must be a positive integer: {}", value));
                None
            }
        }
    }

    /// Integer or blank; `Some(None)` for a blank cell
    pub fn optional_score(&mut self, col: usize, field: &str) -> Option<Option<i32>> {
        let value = self.record.cell(col);
        if value.is_empty() {
            return Some(None);
        }
        let parsed = parse_int(value).and_then(|v| {
            i32::try_from(v).map_err(|_| format!("out of range: {}", v))
        });
        self.coerce(field, parsed).map(Some)
    }

    pub fn bool_or(&mut self, col: Option<usize>, field: &str, default: bool) -> Option<bool> {
        match col.map(|c| self.record.cell(c)).filter(|v| !v.is_empty()) {
            Some(value) => self.coerce(field, parse_bool(value)),
            None => Some(default),
        }
    }

    /// Scale weight, `default` on a blank or absent cell
    pub fn weight_or(&mut self, col: Option<usize>, field: &str, default: Decimal) -> Option<Decimal> {
        match col.map(|c| self.record.cell(c)).filter(|v| !v.is_empty()) {
            Some(value) => self.coerce(field, parse_weight(value)),
            None => Some(default),
        }
    }

    /// Parse with `FromStr`, defaulting on a blank or absent cell
    pub fn parsed_or<T: FromStr>(&mut self, col: Option<usize>, field: &str, default: T) -> Option<T>
    where
        T::Err: ToString,
    {
        match col.map(|c| self.record.cell(c)).filter(|v| !v.is_empty()) {
            Some(value) => self.coerce(field, value.parse::<T>().map_err(|e| e.to_string())),
            None => Some(default),
        }
    }

    /// Required `FromStr` value
    pub fn parsed<T: FromStr>(&mut self, col: usize, field: &str) -> Option<T>
    where
        T::Err: ToString,
    {
        let value = self.record.cell(col);
        if value.is_empty() {
            self.fail(field, "value is required");
            return None;
        }
        self.coerce(field, value.parse::<T>().map_err(|e| e.to_string()))
    }

    pub fn scales_spec(&mut self, col: Option<usize>, field: &str) -> Option<Vec<(String, Decimal)>> {
        match col {
            Some(c) => {
                let value = self.record.cell(c).to_string();
                self.coerce(field, parse_scales_spec(&value))
            }
            None => Some(Vec::new()),
        }
    }

    /// Issues found so far, each tagged with `key` when given
    pub fn finish(self, key: Option<String>) -> Vec<ImportIssue> {
        match key {
            Some(key) => self
                .issues
                .into_iter()
                .map(|i| i.with_key(key.clone()))
                .collect(),
            None => self.issues,
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    fn coerce<T>(&mut self, field: &str, parsed: Result<T, String>) -> Option<T> {
        match parsed {
            Ok(v) => Some(v),
            Err(message) => {
                self.fail(field, message);
                None
            }
        }
    }
}
