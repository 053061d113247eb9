//! Filter + sort descriptors ("basic filter") installed on a tab.
//!
//! A [`SheetView`] names columns by header; it is resolved against the
//! tab's actual header row into a positional [`BasicFilter`] covering the
//! populated rectangle. Columns the header does not contain are skipped.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Condition {
    NumberEq(String),
    DateEq(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_api_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASCENDING",
            SortOrder::Descending => "DESCENDING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    pub column: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSort {
    pub column: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetView {
    pub filters: Vec<ColumnFilter>,
    pub sort: Vec<ColumnSort>,
}

/// Positional descriptor ready for a backend. Indices are 0-based; the row
/// span is half-open and starts at the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicFilter {
    pub start_row_index: u32,
    pub end_row_index: u32,
    pub column_count: u32,
    pub conditions: Vec<(u32, Condition)>,
    pub sort: Vec<(u32, SortOrder)>,
}

impl SheetView {
    pub fn filter(mut self, column: &str, condition: Condition) -> Self {
        self.filters.push(ColumnFilter {
            column: column.to_string(),
            condition,
        });
        self
    }

    pub fn sort_by(mut self, column: &str, order: SortOrder) -> Self {
        self.sort.push(ColumnSort {
            column: column.to_string(),
            order,
        });
        self
    }

    /// Resolve against `header` for a tab holding `data_rows` rows below it.
    pub fn resolve(&self, header: &[String], data_rows: usize) -> BasicFilter {
        let position = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .map(|i| i as u32)
        };
        BasicFilter {
            start_row_index: 0,
            end_row_index: data_rows as u32 + 1,
            column_count: header.len() as u32,
            conditions: self
                .filters
                .iter()
                .filter_map(|f| position(&f.column).map(|i| (i, f.condition.clone())))
                .collect(),
            sort: self
                .sort
                .iter()
                .filter_map(|s| position(&s.column).map(|i| (i, s.order)))
                .collect(),
        }
    }
}

/// Unbid auctions ending on `today` (local `YYYY-MM-DD`), lowest print run first.
pub fn auction_view(today: &str) -> SheetView {
    SheetView::default()
        .filter("BidCount", Condition::NumberEq("0".to_string()))
        .filter("EndDate", Condition::DateEq(today.to_string()))
        .sort_by("OutOf", SortOrder::Ascending)
}

/// Newest purchases first.
pub fn orders_view() -> SheetView {
    SheetView::default().sort_by("Created", SortOrder::Descending)
}
