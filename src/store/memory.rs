use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{A1Range, BasicFilter, RowRange, SheetBackend, TabInfo};
use crate::error::{AppError, Result};
use crate::rows::Cell;

// ---------------------------------------------------------------------------
// MemTab
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemTab {
    title: String,
    rows: Vec<Vec<Cell>>,
    filter: Option<BasicFilter>,
}

impl MemTab {
    /// Index one past the last row holding a non-blank cell.
    fn populated_len(&self) -> usize {
        self.rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_blank()))
            .map_or(0, |i| i + 1)
    }
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

/// In-process spreadsheet. Mirrors the service's observable behavior:
/// case-insensitive titles, sequential row deletion, refusal to delete
/// every row, and one filter descriptor per tab.
pub struct MemoryBackend {
    /// tab id → contents
    tabs: DashMap<i64, MemTab>,
    next_id: AtomicI64,
    /// Every range handed to `delete_rows`, in request order.
    deletions: Mutex<Vec<RowRange>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tabs: DashMap::new(),
            next_id: AtomicI64::new(1),
            deletions: Mutex::new(Vec::new()),
        }
    }

    fn tab_id(&self, title: &str) -> Option<i64> {
        self.tabs
            .iter()
            .find(|t| t.title.eq_ignore_ascii_case(title))
            .map(|t| *t.key())
    }

    fn range_tab_id(&self, range: &A1Range) -> Result<i64> {
        self.tab_id(&range.tab).ok_or_else(|| AppError::StoreRejected {
            status: 400,
            body: format!("Unable to parse range: {range}"),
        })
    }

    /// Raw grid of a tab, including blank rows.
    pub fn rows(&self, title: &str) -> Option<Vec<Vec<Cell>>> {
        let id = self.tab_id(title)?;
        self.tabs.get(&id).map(|t| t.rows.clone())
    }

    /// Rows of a tab rendered as text, for assertions.
    pub fn text_rows(&self, title: &str) -> Option<Vec<Vec<String>>> {
        self.rows(title)
            .map(|rows| rows.iter().map(|r| r.iter().map(Cell::as_text).collect()).collect())
    }

    pub fn filter(&self, title: &str) -> Option<BasicFilter> {
        let id = self.tab_id(title)?;
        self.tabs.get(&id).and_then(|t| t.filter.clone())
    }

    pub fn deletions(&self) -> Vec<RowRange> {
        self.deletions.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SheetBackend for MemoryBackend {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        let mut tabs: Vec<TabInfo> = self
            .tabs
            .iter()
            .map(|t| TabInfo {
                id: *t.key(),
                title: t.title.clone(),
            })
            .collect();
        tabs.sort_by_key(|t| t.id);
        Ok(tabs)
    }

    async fn add_tab(&self, title: &str) -> Result<TabInfo> {
        if self.tab_id(title).is_some() {
            return Err(AppError::StoreRejected {
                status: 400,
                body: format!("A sheet with the name \"{title}\" already exists"),
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tabs.insert(
            id,
            MemTab {
                title: title.to_string(),
                ..MemTab::default()
            },
        );
        Ok(TabInfo {
            id,
            title: title.to_string(),
        })
    }

    async fn read_range(&self, range: &A1Range) -> Result<Vec<Vec<Cell>>> {
        let id = self.range_tab_id(range)?;
        let Some(tab) = self.tabs.get(&id) else {
            return Ok(Vec::new());
        };
        let first = range.start_row.saturating_sub(1) as usize;
        let mut last = tab.populated_len();
        if let Some(end) = range.end_row {
            last = last.min(end as usize);
        }
        if first >= last {
            return Ok(Vec::new());
        }
        let width = range.end_column as usize;
        let mut rows: Vec<Vec<Cell>> = tab.rows[first..last]
            .iter()
            .map(|r| {
                let mut row: Vec<Cell> = r.iter().take(width).cloned().collect();
                while row.last().is_some_and(Cell::is_blank) {
                    row.pop();
                }
                row
            })
            .collect();
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        Ok(rows)
    }

    async fn write_range(&self, range: &A1Range, rows: &[Vec<Cell>]) -> Result<()> {
        let id = self.range_tab_id(range)?;
        let Some(mut tab) = self.tabs.get_mut(&id) else {
            return Ok(());
        };
        let first = range.start_row.saturating_sub(1) as usize;
        for (offset, values) in rows.iter().enumerate() {
            let idx = first + offset;
            if tab.rows.len() <= idx {
                tab.rows.resize_with(idx + 1, Vec::new);
            }
            let target = &mut tab.rows[idx];
            if target.len() < values.len() {
                target.resize(values.len(), Cell::text(""));
            }
            for (col, value) in values.iter().enumerate() {
                target[col] = value.clone();
            }
        }
        Ok(())
    }

    async fn delete_rows(&self, tab_id: i64, ranges: &[RowRange]) -> Result<()> {
        let Some(mut tab) = self.tabs.get_mut(&tab_id) else {
            return Err(AppError::StoreRejected {
                status: 400,
                body: format!("No grid with id: {tab_id}"),
            });
        };
        let total: usize = ranges.iter().map(|r| r.len() as usize).sum();
        if total >= tab.rows.len() {
            return Err(AppError::StoreRejected {
                status: 400,
                body: "You can't delete all the rows in the sheet.".to_string(),
            });
        }
        for range in ranges {
            let start = range.start.saturating_sub(1) as usize;
            let end = range.end as usize;
            if range.is_empty() || start >= tab.rows.len() {
                continue;
            }
            let end = end.min(tab.rows.len());
            tab.rows.drain(start..end);
        }
        if let Ok(mut log) = self.deletions.lock() {
            log.extend_from_slice(ranges);
        }
        Ok(())
    }

    async fn clear_basic_filters(&self, tab_ids: &[i64]) -> Result<()> {
        for id in tab_ids {
            if let Some(mut tab) = self.tabs.get_mut(id) {
                tab.filter = None;
            }
        }
        Ok(())
    }

    async fn set_basic_filter(&self, tab_id: i64, filter: &BasicFilter) -> Result<()> {
        match self.tabs.get_mut(&tab_id) {
            Some(mut tab) => {
                tab.filter = Some(filter.clone());
                Ok(())
            }
            None => Err(AppError::StoreRejected {
                status: 400,
                body: format!("No grid with id: {tab_id}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::text(*v)).collect()
    }

    #[tokio::test]
    async fn titles_are_unique_ignoring_case() {
        let mem = MemoryBackend::new();
        mem.add_tab("Orders").await.unwrap();
        assert!(matches!(
            mem.add_tab("ORDERS").await,
            Err(AppError::StoreRejected { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn reads_trim_trailing_blanks() {
        let mem = MemoryBackend::new();
        mem.add_tab("T").await.unwrap();
        let rows = vec![
            text_row(&["h1", "h2"]),
            text_row(&["a", ""]),
            text_row(&["", ""]),
            text_row(&["b", "c"]),
            text_row(&["", ""]),
        ];
        mem.write_range(&A1Range::from_top_left("T", 5, 2), &rows).await.unwrap();
        let read = mem.read_range(&A1Range::rows_from("t", 2)).await.unwrap();
        assert_eq!(read, vec![text_row(&["a"]), vec![], text_row(&["b", "c"])]);
    }

    #[tokio::test]
    async fn refuses_to_delete_every_row() {
        let mem = MemoryBackend::new();
        let tab = mem.add_tab("T").await.unwrap();
        mem.write_range(&A1Range::from_top_left("T", 2, 1), &[text_row(&["h"]), text_row(&["x"])])
            .await
            .unwrap();
        let all = [RowRange { start: 1, end: 2 }];
        assert!(mem.delete_rows(tab.id, &all).await.is_err());
        mem.delete_rows(tab.id, &[RowRange { start: 2, end: 2 }]).await.unwrap();
        assert_eq!(mem.text_rows("T").unwrap(), vec![vec!["h".to_string()]]);
    }

    #[tokio::test]
    async fn unknown_tab_range_is_rejected() {
        let mem = MemoryBackend::new();
        let err = mem.read_range(&A1Range::rows_from("missing", 2)).await.unwrap_err();
        assert!(matches!(err, AppError::StoreRejected { status: 400, .. }));
    }
}
