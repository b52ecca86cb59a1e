//! Minimal quoted-CSV reader
//!
//! Line oriented: one physical line is one record. Supports comma separators,
//! double-quoted cells and `""` escapes inside quotes. A leading byte-order
//! mark is stripped, and header lookup ignores case and underscores.

use thiserror::Error;

const BOM: char = '\u{FEFF}';

/// Problems that prevent the file from being read at all
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsvError {
    /// Payload is not valid UTF-8
    #[error("file is not valid UTF-8 (near byte {0})")]
    NotUtf8(usize),

    /// First line is missing or blank
    #[error("header row is empty")]
    EmptyHeader,
}

/// One data line with its 1-based physical line number (header is line 1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    pub line: usize,
    cells: Vec<String>,
}

impl CsvRecord {
    /// Trimmed cell at `idx`; `None` when the row is shorter than the header
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(|c| c.trim_matches(BOM).trim())
    }

    /// Trimmed cell at `idx`, empty string when absent
    pub fn cell(&self, idx: usize) -> &str {
        self.get(idx).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Parsed header plus data records
#[derive(Debug, Clone)]
pub struct CsvTable {
    headers: Vec<String>,
    records: Vec<CsvRecord>,
}

impl CsvTable {
    /// Decode and split a CSV payload. Blank data lines are skipped.
    pub fn parse(bytes: &[u8]) -> Result<Self, CsvError> {
        let text = std::str::from_utf8(bytes).map_err(|e| CsvError::NotUtf8(e.valid_up_to()))?;
        let text = text.strip_prefix(BOM).unwrap_or(text);

        let mut lines = text.lines().enumerate();
        let headers = match lines.next() {
            Some((_, line)) if !line.trim().is_empty() => parse_line(line)
                .into_iter()
                .map(|h| h.trim_matches(BOM).trim().to_string())
                .collect::<Vec<_>>(),
            _ => return Err(CsvError::EmptyHeader),
        };

        let records = lines
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| CsvRecord {
                line: idx + 1,
                cells: parse_line(line),
            })
            .collect();

        Ok(Self { headers, records })
    }

    /// Header names as written in the file (BOM and whitespace removed)
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[CsvRecord] {
        &self.records
    }

    /// Column index of the first header matching `name`
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(name);
        self.headers.iter().position(|h| normalize_header(h) == wanted)
    }

    /// First column matching any of `names`, in priority order
    pub fn column_any(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.column(n))
    }
}

/// Canonical header key: lowercase with underscores and spaces removed
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '_' && *c != BOM && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split one line into cells
pub fn parse_line(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    out.push(cell);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_plain() {
        assert_eq!(parse_line("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_line_quoted_comma_and_escape() {
        assert_eq!(
            parse_line(r#"1,"x, ""y""",3"#),
            vec!["1", r#"x, "y""#, "3"]
        );
    }

    #[test]
    fn test_parse_line_trailing_empty_cell() {
        assert_eq!(parse_line("a,"), vec!["a", ""]);
    }

    #[test]
    fn test_bom_stripped_and_headers_case_insensitive() {
        let table = CsvTable::parse("\u{FEFF}Survey_ID,displayOrder\n1,2\n".as_bytes()).unwrap();
        assert_eq!(table.column("surveyId"), Some(0));
        assert_eq!(table.column("display_order"), Some(1));
        assert_eq!(table.column("missing"), None);
    }

    #[test]
    fn test_blank_lines_skipped_line_numbers_kept() {
        let table = CsvTable::parse(b"h\r\n1\r\n\r\n3\r\n").unwrap();
        let lines: Vec<usize> = table.records().iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 4]);
        assert_eq!(table.records()[1].cell(0), "3");
    }

    #[test]
    fn test_empty_header_rejected() {
        assert_eq!(CsvTable::parse(b"").unwrap_err(), CsvError::EmptyHeader);
        assert_eq!(CsvTable::parse(b"  \n1,2").unwrap_err(), CsvError::EmptyHeader);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(matches!(
            CsvTable::parse(&[b'a', 0xff, b'\n']),
            Err(CsvError::NotUtf8(1))
        ));
    }

    #[test]
    fn test_short_row_cells_are_absent() {
        let table = CsvTable::parse(b"a,b,c\n1\n").unwrap();
        let row = &table.records()[0];
        assert_eq!(row.get(2), None);
        assert_eq!(row.cell(2), "");
    }

    #[test]
    fn test_column_any_priority() {
        let table = CsvTable::parse(b"question_display_order,weight\n").unwrap();
        assert_eq!(
            table.column_any(&["questionOrder", "questionDisplayOrder"]),
            Some(0)
        );
    }
}
