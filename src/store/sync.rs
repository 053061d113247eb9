use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{A1Range, RowRange, SheetBackend, SheetView, TabInfo};
use crate::error::{AppError, Result};
use crate::rows::{Cell, RowError, TableRow};

/// Tab-level synchronization protocol over a [`SheetBackend`].
///
/// Row numbers are 1-based sheet rows; row 1 is the header and data
/// starts at row 2.
#[derive(Clone)]
pub struct TabSync {
    backend: Arc<dyn SheetBackend>,
}

impl TabSync {
    pub fn new(backend: Arc<dyn SheetBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn SheetBackend> {
        &self.backend
    }

    async fn find_tab(&self, name: &str) -> Result<Option<TabInfo>> {
        let tabs = self.backend.list_tabs().await?;
        Ok(tabs.into_iter().find(|t| t.title.eq_ignore_ascii_case(name)))
    }

    async fn require_tab(&self, name: &str) -> Result<TabInfo> {
        self.find_tab(name)
            .await?
            .ok_or_else(|| AppError::TabNotFound(name.to_string()))
    }

    /// Create `name` unless a tab with that name exists (ignoring case).
    /// Returns whether a tab was created. A supplied header is written as
    /// row 1 of a newly created tab only.
    pub async fn ensure_tab(&self, name: &str, header: Option<&[String]>) -> Result<bool> {
        if self.find_tab(name).await?.is_some() {
            return Ok(false);
        }
        self.backend.add_tab(name).await?;
        if let Some(header) = header.filter(|h| !h.is_empty()) {
            let row: Vec<Cell> = header.iter().map(|h| Cell::text(h.as_str())).collect();
            let range = A1Range::from_top_left(name, 1, row.len() as u32);
            self.backend.write_range(&range, &[row]).await?;
        }
        info!(tab = name, "Created tab");
        Ok(true)
    }

    /// Every row below the header, converted by `factory`. Rows that fail
    /// conversion are logged and skipped. A missing tab reads as empty.
    pub async fn read_all_rows<T, F>(&self, name: &str, factory: F) -> Result<Vec<T>>
    where
        F: Fn(&[Cell]) -> std::result::Result<T, RowError>,
    {
        if self.find_tab(name).await?.is_none() {
            debug!(tab = name, "Tab missing, nothing to read");
            return Ok(Vec::new());
        }
        let rows = self.backend.read_range(&A1Range::rows_from(name, 2)).await?;
        let mut records = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            match factory(row) {
                Ok(record) => records.push(record),
                Err(e) => warn!(tab = name, row = idx + 2, error = %e, "Skipping unreadable row"),
            }
        }
        Ok(records)
    }

    pub async fn read_records<T: TableRow>(&self, name: &str) -> Result<Vec<T>> {
        self.read_all_rows(name, T::from_row).await
    }

    /// Write `header` then one row per record in a single batch anchored at
    /// A1. Rows beyond the new content are left untouched.
    pub async fn overwrite_all<T, F>(
        &self,
        name: &str,
        header: &[String],
        records: &[T],
        selector: F,
    ) -> Result<()>
    where
        F: Fn(&T) -> Vec<Cell>,
    {
        self.require_tab(name).await?;
        let mut values: Vec<Vec<Cell>> = Vec::with_capacity(records.len() + 1);
        values.push(header.iter().map(|h| Cell::text(h.as_str())).collect());
        values.extend(records.iter().map(selector));
        let width = values.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let range = A1Range::from_top_left(name, values.len() as u32, width);
        self.backend.write_range(&range, &values).await?;
        info!(tab = name, rows = records.len(), "Wrote tab");
        Ok(())
    }

    pub async fn overwrite_records<T: TableRow>(&self, name: &str, records: &[T]) -> Result<()> {
        self.overwrite_all(name, &T::header_row(), records, T::to_row)
            .await
    }

    /// Delete every data row but the last one. Returns the number of rows
    /// deleted. Follow with [`TabSync::overwrite_all`].
    pub async fn delete_rows_except_header(&self, name: &str) -> Result<usize> {
        let data_rows = self
            .read_all_rows(name, |row| Ok::<_, RowError>(row.len()))
            .await?
            .len() as u32;
        if data_rows <= 1 {
            return Ok(0);
        }
        // Data occupies rows 2..=data_rows + 1; the last one stays.
        self.delete_rows(name, 2..=data_rows).await
    }

    /// Delete the given 1-based rows, numbered as before any deletion.
    /// Returns the number of distinct rows deleted.
    pub async fn delete_rows<I>(&self, name: &str, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = u32>,
    {
        let rows: BTreeSet<u32> = rows.into_iter().filter(|r| *r >= 1).collect();
        if rows.is_empty() {
            return Ok(0);
        }
        let tab = self.require_tab(name).await?;
        let sorted: Vec<u32> = rows.into_iter().collect();
        let mut ranges = compress_ranges(&sorted);
        // Bottom-up so earlier deletions never shift later ranges.
        ranges.reverse();
        self.backend.delete_rows(tab.id, &ranges).await?;
        debug!(tab = name, rows = sorted.len(), ranges = ranges.len(), "Deleted rows");
        Ok(sorted.len())
    }

    pub async fn clear_filter(&self, name: &str) -> Result<()> {
        let tab = self.require_tab(name).await?;
        self.backend.clear_basic_filters(&[tab.id]).await
    }

    /// Clear filters on every tab. Returns the number of tabs touched.
    pub async fn clear_all_filters(&self) -> Result<usize> {
        let ids: Vec<i64> = self.backend.list_tabs().await?.iter().map(|t| t.id).collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.backend.clear_basic_filters(&ids).await?;
        Ok(ids.len())
    }

    /// Install `view` as the tab's only filter, spanning the header through
    /// the last populated row.
    pub async fn set_sort_or_filter(&self, name: &str, view: &SheetView) -> Result<()> {
        let tab = self.require_tab(name).await?;
        let header: Vec<String> = self
            .backend
            .read_range(&A1Range::header(name))
            .await?
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .map(Cell::as_text)
            .collect();
        if header.is_empty() {
            return Err(AppError::MissingHeader(name.to_string()));
        }
        let data_rows = self.backend.read_range(&A1Range::rows_from(name, 2)).await?.len();
        let filter = view.resolve(&header, data_rows);
        self.backend.set_basic_filter(tab.id, &filter).await
    }

    /// Replace the tab's content with `records`: create it if needed, drop
    /// any filter, shrink to one data row, then overwrite from A1.
    pub async fn rewrite_tab<T: TableRow>(&self, name: &str, records: &[T]) -> Result<()> {
        let header = T::header_row();
        self.ensure_tab(name, Some(&header)).await?;
        self.clear_filter(name).await?;
        self.delete_rows_except_header(name).await?;
        if records.is_empty() {
            // Blank out the one surviving data row.
            let filler = vec![Cell::text(""); header.len()];
            return self
                .overwrite_all(name, &header, &[filler], Vec::<Cell>::clone)
                .await;
        }
        self.overwrite_records(name, records).await
    }
}

/// Coalesce sorted, distinct row numbers into maximal inclusive ranges.
pub fn compress_ranges(sorted_distinct: &[u32]) -> Vec<RowRange> {
    let mut ranges: Vec<RowRange> = Vec::new();
    for &row in sorted_distinct {
        match ranges.last_mut() {
            Some(last) if row == last.end + 1 => last.end = row,
            _ => ranges.push(RowRange { start: row, end: row }),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::AuctionItem;
    use crate::store::{auction_view, Condition, MemoryBackend};

    fn setup() -> (Arc<MemoryBackend>, TabSync) {
        let mem = Arc::new(MemoryBackend::new());
        let sync = TabSync::new(mem.clone());
        (mem, sync)
    }

    fn item(title: &str, bids: &str) -> AuctionItem {
        AuctionItem {
            title: title.to_string(),
            out_of: "50".to_string(),
            bid_count: bids.to_string(),
            end_date: "2030-06-01".to_string(),
            item_web_url: format!("https://example.test/{title}"),
            ..AuctionItem::default()
        }
    }

    #[test]
    fn compresses_contiguous_runs() {
        let ranges = compress_ranges(&[2, 3, 4, 7, 8, 10]);
        assert_eq!(
            ranges,
            vec![
                RowRange { start: 2, end: 4 },
                RowRange { start: 7, end: 8 },
                RowRange { start: 10, end: 10 },
            ]
        );
        assert!(compress_ranges(&[]).is_empty());
    }

    #[tokio::test]
    async fn ensure_tab_is_idempotent() {
        let (mem, sync) = setup();
        let header = vec!["A".to_string(), "B".to_string()];
        assert!(sync.ensure_tab("Runs", Some(&header)).await.unwrap());
        assert!(!sync.ensure_tab("RUNS", Some(&header)).await.unwrap());
        assert_eq!(mem.text_rows("Runs").unwrap(), vec![header]);
        assert_eq!(mem.list_tabs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_tab_reads_empty() {
        let (_mem, sync) = setup();
        let items: Vec<AuctionItem> = sync.read_records("nowhere").await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn bad_rows_are_skipped() {
        let (mem, sync) = setup();
        sync.ensure_tab("T", None).await.unwrap();
        let rows = vec![
            vec![Cell::text("Value")],
            vec![Cell::text("1")],
            vec![Cell::text("oops")],
            vec![Cell::text("3")],
        ];
        mem.write_range(&A1Range::from_top_left("T", 4, 1), &rows).await.unwrap();
        let values = sync
            .read_all_rows("T", |row| {
                let text = row.first().map(Cell::as_text).unwrap_or_default();
                text.parse::<i64>().map_err(|_| RowError::InvalidNumber {
                    column: "Value",
                    value: text,
                })
            })
            .await
            .unwrap();
        assert_eq!(values, vec![1, 3]);
    }

    #[tokio::test]
    async fn deletes_ranges_bottom_up() {
        let (mem, sync) = setup();
        sync.ensure_tab("T", None).await.unwrap();
        let rows: Vec<Vec<Cell>> = (1..=12).map(|n| vec![Cell::from(n as i64)]).collect();
        mem.write_range(&A1Range::from_top_left("T", 12, 1), &rows).await.unwrap();

        let deleted = sync.delete_rows("T", [10, 2, 3, 4, 7, 8, 3, 0]).await.unwrap();
        assert_eq!(deleted, 6);
        assert_eq!(
            mem.deletions(),
            vec![
                RowRange { start: 10, end: 10 },
                RowRange { start: 7, end: 8 },
                RowRange { start: 2, end: 4 },
            ]
        );
        let left: Vec<String> = mem
            .text_rows("T")
            .unwrap()
            .into_iter()
            .map(|r| r[0].clone())
            .collect();
        assert_eq!(left, vec!["1", "5", "6", "9", "11", "12"]);
    }

    #[tokio::test]
    async fn delete_rows_requires_tab() {
        let (_mem, sync) = setup();
        assert_eq!(sync.delete_rows("T", []).await.unwrap(), 0);
        assert!(matches!(
            sync.delete_rows("T", [2]).await,
            Err(AppError::TabNotFound(_))
        ));
    }

    #[tokio::test]
    async fn rewrite_shrinks_stale_rows() {
        let (mem, sync) = setup();
        let first: Vec<AuctionItem> = (0..4).map(|i| item(&format!("card {i}"), "0")).collect();
        sync.rewrite_tab("PC - seller", &first).await.unwrap();
        assert_eq!(mem.text_rows("PC - seller").unwrap().len(), 5);

        let second = vec![item("only card", "2")];
        sync.rewrite_tab("PC - seller", &second).await.unwrap();
        let back: Vec<AuctionItem> = sync.read_records("PC - seller").await.unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].title, "only card");
        assert_eq!(back[0].bid_count, "2");
    }

    #[tokio::test]
    async fn rewrite_with_nothing_leaves_header_only() {
        let (_mem, sync) = setup();
        let first: Vec<AuctionItem> = (0..3).map(|i| item(&format!("card {i}"), "1")).collect();
        sync.rewrite_tab("CASE HITS - s", &first).await.unwrap();
        sync.rewrite_tab::<AuctionItem>("CASE HITS - s", &[]).await.unwrap();
        let back: Vec<AuctionItem> = sync.read_records("CASE HITS - s").await.unwrap();
        assert!(back.is_empty());
    }

    #[tokio::test]
    async fn filter_spans_populated_rectangle() {
        let (mem, sync) = setup();
        let items: Vec<AuctionItem> = (0..3).map(|i| item(&format!("card {i}"), "0")).collect();
        sync.rewrite_tab("BIDS", &items).await.unwrap();
        sync.set_sort_or_filter("BIDS", &auction_view("2030-06-01")).await.unwrap();
        let filter = mem.filter("BIDS").unwrap();
        assert_eq!(filter.end_row_index, 4);
        assert_eq!(filter.column_count, 13);
        assert!(filter
            .conditions
            .contains(&(9, Condition::NumberEq("0".to_string()))));

        sync.clear_filter("bids").await.unwrap();
        assert!(mem.filter("BIDS").is_none());
    }

    #[tokio::test]
    async fn filter_needs_a_header() {
        let (_mem, sync) = setup();
        sync.ensure_tab("Empty", None).await.unwrap();
        assert!(matches!(
            sync.set_sort_or_filter("Empty", &auction_view("2030-06-01")).await,
            Err(AppError::MissingHeader(_))
        ));
    }

    #[tokio::test]
    async fn clears_filters_on_every_tab() {
        let (_mem, sync) = setup();
        assert_eq!(sync.clear_all_filters().await.unwrap(), 0);
        sync.ensure_tab("A", None).await.unwrap();
        sync.ensure_tab("B", None).await.unwrap();
        assert_eq!(sync.clear_all_filters().await.unwrap(), 2);
    }
}
