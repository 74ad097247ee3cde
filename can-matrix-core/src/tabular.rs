//! Tabular communication matrix
//!
//! The spreadsheet itself is read by an external tool and exported as JSON
//! in "split" orientation, one object per sheet:
//!
//! ```json
//! { "Matrix": { "columns": ["Msg Name\n报文名称", "..."], "data": [["Speed_Status", "..."]] } }
//! ```
//!
//! Empty cells (`null`) are stored as the `"nan"` sentinel, exactly as the
//! spreadsheet reader reports them.

use crate::config::TabularLayout;
use crate::types::{MatrixError, Result, NAN_SENTINEL};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// One sheet of the tabular specification
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    /// Sheet name the rows were read from
    pub sheet: String,
    /// Column headers, exactly as written in the sheet
    pub columns: Vec<String>,
    /// Cell text per row; missing cells hold `"nan"`
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SplitSheet {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

impl TabularDataset {
    /// Build a dataset from headers and rows
    ///
    /// Short rows are padded with `"nan"`.
    pub fn new(sheet: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, NAN_SENTINEL.to_string());
                }
                row
            })
            .collect();
        Self {
            sheet: sheet.into(),
            columns,
            rows,
        }
    }

    /// Load the configured sheet from a JSON workbook export
    pub fn load_json(path: &Path, layout: &TabularLayout) -> Result<Self> {
        log::info!("Loading tabular file: {:?} (sheet {:?})", path, layout.sheet);

        let content = std::fs::read_to_string(path)?;
        let dataset = Self::from_json_str(&content, &layout.sheet).map_err(|e| match e {
            MatrixError::TabularParse { reason, .. } => MatrixError::TabularParse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        log::info!(
            "Loaded {} rows x {} columns from {:?}",
            dataset.rows.len(),
            dataset.columns.len(),
            path
        );
        Ok(dataset)
    }

    /// Parse a JSON workbook held in memory and pick one sheet
    pub fn from_json_str(content: &str, sheet: &str) -> Result<Self> {
        let mut workbook: HashMap<String, Value> =
            serde_json::from_str(content).map_err(|e| MatrixError::TabularParse {
                path: Default::default(),
                reason: e.to_string(),
            })?;

        let raw = workbook
            .remove(sheet)
            .ok_or_else(|| MatrixError::SheetNotFound {
                sheet: sheet.to_string(),
            })?;

        let split: SplitSheet =
            serde_json::from_value(raw).map_err(|e| MatrixError::TabularParse {
                path: Default::default(),
                reason: format!("sheet {:?}: {}", sheet, e),
            })?;

        let rows = split
            .data
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        Ok(Self::new(sheet, split.columns, rows))
    }

    /// All cells of one column, sentinel included
    pub fn column(&self, header: &str) -> Result<Vec<&str>> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == header)
            .ok_or_else(|| MatrixError::MissingColumn {
                column: header.to_string(),
            })?;

        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str).unwrap_or(NAN_SENTINEL))
            .collect())
    }

    /// Message-name column per the layout
    pub fn message_column(&self, layout: &TabularLayout) -> Result<Vec<&str>> {
        self.column(&layout.message_column)
    }

    /// Signal-name column per the layout
    pub fn signal_column(&self, layout: &TabularLayout) -> Result<Vec<&str>> {
        self.column(&layout.signal_column)
    }
}

/// Render a JSON cell the way a spreadsheet reader stringifies it
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => NAN_SENTINEL.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
