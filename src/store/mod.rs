//! Tabular store synchronization.
//!
//! [`SheetBackend`] is the thin capability surface of the spreadsheet
//! service; [`TabSync`] layers the tab-level protocol on top of it
//! (idempotent tab creation, header-relative reads, full rewrites,
//! range-compressed row deletion, and filter descriptors).

pub mod a1;
pub mod memory;
pub mod sheets;
pub mod sync;
pub mod view;

use async_trait::async_trait;

use crate::error::Result;
use crate::rows::Cell;

pub use a1::{column_letter, A1Range};
pub use memory::MemoryBackend;
pub use sheets::SheetsBackend;
pub use sync::{compress_ranges, TabSync};
pub use view::{auction_view, orders_view, BasicFilter, Condition, SheetView, SortOrder};

/// A tab as listed in the spreadsheet metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: i64,
    pub title: String,
}

/// Inclusive, 1-based span of sheet rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: u32,
    pub end: u32,
}

impl RowRange {
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

#[async_trait]
pub trait SheetBackend: Send + Sync {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>>;

    async fn add_tab(&self, title: &str) -> Result<TabInfo>;

    /// Rows in `range`. Trailing empty cells and trailing empty rows are
    /// omitted, as the spreadsheet service does.
    async fn read_range(&self, range: &A1Range) -> Result<Vec<Vec<Cell>>>;

    /// Write `rows` starting at the range's top-left cell.
    async fn write_range(&self, range: &A1Range, rows: &[Vec<Cell>]) -> Result<()>;

    /// Delete each range in order, each applied to the tab as left by the
    /// previous one.
    async fn delete_rows(&self, tab_id: i64, ranges: &[RowRange]) -> Result<()>;

    async fn clear_basic_filters(&self, tab_ids: &[i64]) -> Result<()>;

    /// Install `filter`, replacing any descriptor already on the tab.
    async fn set_basic_filter(&self, tab_id: i64, filter: &BasicFilter) -> Result<()>;
}
