//! Tabular source access for the loader.
//!
//! The pipeline treats the spreadsheet as an external collaborator behind the
//! [`TabularSource`] trait: a source hands out one [`Sheet`] per logical table.
//! [`XlsxSource`] reads real workbooks through calamine; [`MemorySource`] backs
//! fixtures and tests.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDate;

use crate::error::{PipelineError, Result};

/// A single cell value, normalized from the underlying spreadsheet types
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Blank cell
    Empty,
    /// Text content
    Text(String),
    /// Numeric content
    Number(f64),
    /// Date content
    Date(NaiveDate),
}

impl Cell {
    /// Interpret the cell as trimmed, non-empty text
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Cell::Number(n) => Some(n.to_string()),
            Cell::Date(d) => Some(d.to_string()),
            Cell::Empty => None,
        }
    }

    /// Interpret the cell as a number; numeric-looking text is parsed
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the cell as an integer; rejects fractional values
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        let n = self.as_number()?;
        if n.fract() == 0.0 && n.abs() < 9.0e15 {
            Some(n as i64)
        } else {
            None
        }
    }

    /// Interpret the cell as a date; ISO-formatted text is parsed
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }
}

/// One logical table: a header row and data rows
#[derive(Debug, Clone)]
pub struct Sheet {
    /// Sheet name as found in the source
    pub name: String,
    /// Header labels, lowercased and trimmed
    pub header: Vec<String>,
    /// Data rows, one `Vec<Cell>` per source row
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Position of a column in the header, if present
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| h == column)
    }

    /// Verify every required column is present; structural failure otherwise
    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        for column in columns {
            if self.column_index(column).is_none() {
                return Err(PipelineError::MissingColumn {
                    sheet: self.name.clone(),
                    column: (*column).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Cell at a given row and column position; missing trailing cells read as empty
    #[must_use]
    pub fn cell<'a>(&'a self, row: &'a [Cell], index: usize) -> &'a Cell {
        row.get(index).unwrap_or(&Cell::Empty)
    }
}

/// A multi-sheet tabular source
pub trait TabularSource {
    /// Fetch a sheet by name; a missing sheet is a structural error
    fn sheet(&mut self, name: &str) -> Result<Sheet>;
}

/// Workbook-backed source (xlsx, xls, ods) read through calamine
pub struct XlsxSource {
    workbook: Sheets<std::io::BufReader<std::fs::File>>,
}

impl XlsxSource {
    /// Open a workbook file, failing fast when it is absent or unreadable
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::Source(format!(
                "workbook not found at {}",
                path.display()
            )));
        }

        let workbook =
            open_workbook_auto(path).map_err(|e| PipelineError::Source(e.to_string()))?;

        Ok(Self { workbook })
    }

    fn convert(data: &Data) -> Cell {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map_or(Cell::Empty, |naive| Cell::Date(naive.date())),
            // Split instead of slicing: a byte-index slice can land inside a
            // multi-byte character and panic on malformed cells
            Data::DateTimeIso(s) => {
                let date_part = s.split('T').next().unwrap_or("");
                NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                    .map_or_else(|_| Cell::Text(s.clone()), Cell::Date)
            }
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Text(format!("{e:?}")),
        }
    }
}

impl TabularSource for XlsxSource {
    fn sheet(&mut self, name: &str) -> Result<Sheet> {
        if !self.workbook.sheet_names().iter().any(|s| s == name) {
            return Err(PipelineError::MissingSheet(name.to_string()));
        }

        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| PipelineError::Source(e.to_string()))?;

        let mut rows_iter = range.rows();
        let header = rows_iter
            .next()
            .map(|row| {
                row.iter()
                    .map(|cell| Self::convert(cell).as_text().unwrap_or_default().to_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows_iter
            .map(|row| row.iter().map(Self::convert).collect())
            .collect();

        Ok(Sheet {
            name: name.to_string(),
            header,
            rows,
        })
    }
}

/// In-memory source for fixtures and tests
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    sheets: HashMap<String, Sheet>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet from a header and rows; header labels are normalized
    pub fn add_sheet(&mut self, name: &str, header: &[&str], rows: Vec<Vec<Cell>>) {
        self.sheets.insert(
            name.to_string(),
            Sheet {
                name: name.to_string(),
                header: header.iter().map(|h| h.trim().to_lowercase()).collect(),
                rows,
            },
        );
    }
}

impl TabularSource for MemorySource {
    fn sheet(&mut self, name: &str) -> Result<Sheet> {
        self.sheets
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::MissingSheet(name.to_string()))
    }
}
