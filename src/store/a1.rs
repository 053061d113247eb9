//! Spreadsheet-style range addressing (`'Tab'!A2:Z`).

use std::fmt;

/// Widest column read back when the exact width is unknown.
pub const DEFAULT_LAST_COLUMN: u32 = 26;

/// 1-based column index to its letter name: 1 → `A`, 27 → `AA`.
/// Zero is clamped to `A`.
pub fn column_letter(index: u32) -> String {
    let mut n = index.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - rem - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A rectangular range anchored at column A.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub tab: String,
    /// First row, 1-based.
    pub start_row: u32,
    /// Last row, 1-based and inclusive. `None` reads to the last populated row.
    pub end_row: Option<u32>,
    /// Last column, 1-based and inclusive.
    pub end_column: u32,
}

impl A1Range {
    /// Every row from `start_row` down, columns A..Z.
    pub fn rows_from(tab: &str, start_row: u32) -> Self {
        Self {
            tab: tab.to_string(),
            start_row,
            end_row: None,
            end_column: DEFAULT_LAST_COLUMN,
        }
    }

    /// The header row, columns A..Z.
    pub fn header(tab: &str) -> Self {
        Self {
            tab: tab.to_string(),
            start_row: 1,
            end_row: Some(1),
            end_column: DEFAULT_LAST_COLUMN,
        }
    }

    /// `rows` × `columns` block starting at A1.
    pub fn from_top_left(tab: &str, rows: u32, columns: u32) -> Self {
        Self {
            tab: tab.to_string(),
            start_row: 1,
            end_row: Some(rows.max(1)),
            end_column: columns.max(1),
        }
    }

    /// Tab name quoted for A1 notation, inner quotes doubled.
    pub fn quoted_tab(&self) -> String {
        format!("'{}'", self.tab.replace('\'', "''"))
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = column_letter(self.end_column);
        match self.end_row {
            Some(end) => write!(f, "{}!A{}:{}{}", self.quoted_tab(), self.start_row, last, end),
            None => write!(f, "{}!A{}:{}", self.quoted_tab(), self.start_row, last),
        }
    }
}
