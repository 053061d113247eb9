//! Row codec: record types ↔ ordered lists of scalar cells.
//!
//! Each persisted record type declares its columns once, in display order,
//! in a static [`Column`] table. `to_row`, `header_row` and `from_row` are
//! all driven by that table, so the header and the data can never drift
//! apart, and reading a row back resolves positions from the same table
//! instead of hard-coded offsets.

pub mod auction_item;
pub mod order_item;
pub mod reference;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auction_item::AuctionItem;
pub use order_item::OrderItem;
pub use reference::{Brand, CaseHit, Player};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single scalar cell value as exchanged with the tabular store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Display form. Whole numbers render without a fractional part.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// One declared column of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    /// Non-persisted columns are omitted from both data rows and the header.
    pub persisted: bool,
}

impl Column {
    pub const fn stored(name: &'static str) -> Self {
        Self { name, persisted: true }
    }

    pub const fn transient(name: &'static str) -> Self {
        Self { name, persisted: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row has {found} cells, expected at least {expected}")]
    TooShort { expected: usize, found: usize },

    #[error("column {column}: '{value}' is not a number")]
    InvalidNumber { column: &'static str, value: String },

    #[error("unknown column {0}")]
    UnknownColumn(&'static str),
}

/// A record type persisted as one row per record.
pub trait TableRow: Sized {
    /// Declared display order, including non-persisted columns.
    const COLUMNS: &'static [Column];

    /// Minimum number of persisted cells a stored row must carry to be read.
    const MIN_CELLS: usize;

    /// Value of a named column for this record.
    fn cell(&self, column: &str) -> Cell;

    /// Rebuild a record from a stored row.
    fn from_row(row: &[Cell]) -> Result<Self, RowError>;

    fn to_row(&self) -> Vec<Cell> {
        persisted_columns::<Self>().map(|c| self.cell(c.name)).collect()
    }

    fn header_row() -> Vec<String> {
        persisted_columns::<Self>().map(|c| c.name.to_string()).collect()
    }
}

fn persisted_columns<T: TableRow>() -> impl Iterator<Item = &'static Column> {
    T::COLUMNS.iter().filter(|c| c.persisted)
}

/// Positional reader over a stored row, addressed by column name.
pub struct RowReader<'a> {
    row: &'a [Cell],
    columns: &'static [Column],
}

impl<'a> RowReader<'a> {
    pub fn new<T: TableRow>(row: &'a [Cell]) -> Result<Self, RowError> {
        if row.len() < T::MIN_CELLS {
            return Err(RowError::TooShort {
                expected: T::MIN_CELLS,
                found: row.len(),
            });
        }
        Ok(Self {
            row,
            columns: T::COLUMNS,
        })
    }

    fn index_of(&self, column: &'static str) -> Result<usize, RowError> {
        self.columns
            .iter()
            .filter(|c| c.persisted)
            .position(|c| c.name == column)
            .ok_or(RowError::UnknownColumn(column))
    }

    /// Cell text, empty when the stored row is shorter than the schema.
    pub fn text(&self, column: &'static str) -> Result<String, RowError> {
        let idx = self.index_of(column)?;
        Ok(self.row.get(idx).map(Cell::as_text).unwrap_or_default())
    }

    pub fn text_or(&self, column: &'static str, default: &str) -> Result<String, RowError> {
        let value = self.text(column)?;
        Ok(if value.is_empty() { default.to_string() } else { value })
    }

    /// Integer cell, `0` when empty or unparsable.
    pub fn int_or_zero(&self, column: &'static str) -> Result<i64, RowError> {
        Ok(self.text(column)?.trim().parse::<i64>().unwrap_or(0))
    }

    /// Integer cell that must parse.
    pub fn int(&self, column: &'static str) -> Result<i64, RowError> {
        let value = self.text(column)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|_| RowError::InvalidNumber { column, value })
    }
}
