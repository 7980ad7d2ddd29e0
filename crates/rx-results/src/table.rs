//! Reader for `.dat` streams.

use std::path::Path;

use crate::format::TIME_LABEL;
use crate::{ResultsError, ResultsResult};

/// A stream parsed back into memory. Each row starts with the sample time.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column labels, without the leading time column.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn times(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r[0]).collect()
    }

    pub fn column(&self, label: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| c == label)?;
        Some(self.rows.iter().map(|r| r[index + 1]).collect())
    }

    pub fn last(&self) -> Option<&[f64]> {
        self.rows.last().map(Vec::as_slice)
    }
}

pub fn read_table(path: &Path) -> ResultsResult<Table> {
    let file = path.display().to_string();
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();

    let header = lines.next().ok_or_else(|| ResultsError::Format {
        file: file.clone(),
        line: 1,
        what: "empty stream".to_string(),
    })?;
    let mut labels = header.split_whitespace();
    if labels.next() != Some(TIME_LABEL) {
        return Err(ResultsError::Format {
            file,
            line: 1,
            what: format!("header must start with '{TIME_LABEL}'"),
        });
    }
    let columns: Vec<String> = labels.map(str::to_string).collect();

    let mut rows = Vec::new();
    for (i, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ResultsError::Format {
                file: file.clone(),
                line: i + 2,
                what: e.to_string(),
            })?;
        if row.len() != columns.len() + 1 {
            return Err(ResultsError::Format {
                file,
                line: i + 2,
                what: format!("expected {} values, found {}", columns.len() + 1, row.len()),
            });
        }
        rows.push(row);
    }
    Ok(Table { columns, rows })
}
