use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use anyhow::{Context, Result};

/// A single value in a report table
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No data for this cell, written as an empty field
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(v) => write!(f, "{}", v),
            // Debug keeps the trailing ".0" on whole numbers
            Cell::Float(v) => write!(f, "{:?}", v),
            Cell::Text(v) => f.write_str(v),
        }
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

/// Rectangular table with a named row index and named columns
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index_name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq)]
struct Row {
    key: String,
    cells: Vec<Cell>,
}

impl Table {
    pub fn new(index_name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            index_name: index_name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with empty cells, long rows truncated.
    pub fn push_row(&mut self, key: impl Into<String>, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), Cell::Empty);
        self.rows.push(Row {
            key: key.into(),
            cells,
        });
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, key: &str) -> Option<&[Cell]> {
        self.rows
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.cells.as_slice())
    }

    pub fn get(&self, key: &str, column: &str) -> Option<&Cell> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.row(key).map(|cells| &cells[col])
    }

    /// Stable sort of rows by their index key
    pub fn sort_rows_by(&mut self, mut compare: impl FnMut(&str, &str) -> Ordering) {
        self.rows.sort_by(|a, b| compare(&a.key, &b.key));
    }

    /// Outer join on the row index.
    ///
    /// Rows keep first-seen order across the inputs; cells missing in one input
    /// stay empty.
    pub fn join(index_name: impl Into<String>, tables: &[Table]) -> Table {
        let columns: Vec<String> = tables
            .iter()
            .flat_map(|t| t.columns.iter().cloned())
            .collect();
        let mut joined = Table::new(index_name, columns);
        let mut positions: HashMap<String, usize> = HashMap::new();

        let mut offset = 0;
        for table in tables {
            for row in &table.rows {
                let pos = *positions.entry(row.key.clone()).or_insert_with(|| {
                    joined.push_row(row.key.clone(), Vec::new());
                    joined.rows.len() - 1
                });
                for (i, cell) in row.cells.iter().enumerate() {
                    joined.rows[pos].cells[offset + i] = cell.clone();
                }
            }
            offset += table.columns.len();
        }

        joined
    }

    /// Stack tables vertically, aligning cells by column name
    pub fn concat(index_name: impl Into<String>, tables: &[Table]) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for column in tables.iter().flat_map(|t| t.columns.iter()) {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }

        let mut stacked = Table::new(index_name, columns.clone());
        for table in tables {
            for row in &table.rows {
                let cells = columns
                    .iter()
                    .map(|c| {
                        table
                            .columns
                            .iter()
                            .position(|tc| tc == c)
                            .map(|i| row.cells[i].clone())
                            .unwrap_or(Cell::Empty)
                    })
                    .collect();
                stacked.push_row(row.key.clone(), cells);
            }
        }

        stacked
    }

    /// Serialize with the index as first column
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut csv = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        let header = std::iter::once(self.index_name.as_str())
            .chain(self.columns.iter().map(String::as_str));
        csv.write_record(header).context("CSV write error")?;

        for row in &self.rows {
            let fields = std::iter::once(row.key.clone())
                .chain(row.cells.iter().map(Cell::to_string));
            csv.write_record(fields).context("CSV write error")?;
        }

        csv.into_inner()
            .map_err(|e| anyhow::anyhow!("CSV flush error: {}", e.error()))
    }
}
