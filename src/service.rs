use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::config::RunsFile;
use crate::error::Result;
use crate::fetcher::{ListingSource, OrderSource};
use crate::planner::{plan_case_hit_runs, plan_runs, CASE_HITS_TAB};
use crate::reconcile::{mark_case_hits, merge_orders, reconcile_at};
use crate::rows::{AuctionItem, CaseHit, OrderItem};
use crate::store::{auction_view, orders_view, TabSync};
use crate::types::{ListingRecord, Run, RunResult};

pub const ORDERS_TAB: &str = "ORDERS";

/// Per-deployment knobs for [`SyncService`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub runs: RunsFile,
    pub timezone: Tz,
    pub order_lookback_days: u32,
    pub apply_auction_view: bool,
}

/// Drives every sync: fetch from the marketplace, reconcile against the
/// stored tab, rewrite the tab. Syncs are serialized; two never write the
/// same spreadsheet at once.
pub struct SyncService {
    tabs: TabSync,
    listings: Arc<dyn ListingSource>,
    orders: Arc<dyn OrderSource>,
    settings: SyncSettings,
    health: Arc<HealthState>,
    sync_lock: Mutex<()>,
}

impl SyncService {
    pub fn new(
        tabs: TabSync,
        listings: Arc<dyn ListingSource>,
        orders: Arc<dyn OrderSource>,
        settings: SyncSettings,
        health: Arc<HealthState>,
    ) -> Self {
        Self {
            tabs,
            listings,
            orders,
            settings,
            health,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    /// Case-hit runs, then every configured run, for every seller.
    pub async fn sync_auctions(&self) -> Result<Vec<RunResult>> {
        let _guard = self.sync_lock.lock().await;
        let outcome = self.sync_auctions_locked().await;
        self.record(outcome.as_ref().map(|r| r.iter().map(|x| x.items).sum()));
        outcome
    }

    /// Merge recent purchases into the ORDERS tab.
    pub async fn sync_orders(&self) -> Result<RunResult> {
        let _guard = self.sync_lock.lock().await;
        let outcome = self.sync_orders_locked().await;
        self.record(outcome.as_ref().map(|r| r.items));
        outcome
    }

    async fn sync_auctions_locked(&self) -> Result<Vec<RunResult>> {
        let sellers = &self.settings.runs.sellers;
        let case_hits: Vec<CaseHit> = self.tabs.read_records(CASE_HITS_TAB).await?;

        let mut runs = Vec::new();
        if case_hits.is_empty() {
            info!("No case hits listed, skipping case-hit runs");
        } else {
            runs.extend(plan_case_hit_runs(&case_hits, sellers));
        }
        runs.extend(plan_runs(&self.settings.runs.runs, sellers));

        let mut results = Vec::with_capacity(runs.len());
        for run in &runs {
            match self.sync_run(run, &case_hits, Utc::now()).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(tab = %run.tab_name, seller = %run.seller, "Run failed: {e}");
                    return Err(e);
                }
            }
        }
        Ok(results)
    }

    async fn sync_run(
        &self,
        run: &Run,
        case_hits: &[CaseHit],
        now: DateTime<Utc>,
    ) -> Result<RunResult> {
        let tz = self.settings.timezone;
        let fresh = self.fetch_all(&run.queries).await?;
        let existing: Vec<AuctionItem> = self.tabs.read_records(&run.tab_name).await?;

        let (mut items, stats) =
            reconcile_at(&fresh, existing, &self.settings.runs.filterwords, tz, now);
        mark_case_hits(&mut items, case_hits);

        info!(
            tab = %run.tab_name,
            seller = %run.seller,
            fresh = stats.fresh,
            existing = stats.existing,
            blocked = stats.rejected_blocked,
            era = stats.rejected_era,
            dup_url = stats.duplicate_url,
            dup_title = stats.duplicate_title,
            expired = stats.rejected_expired,
            bid = stats.rejected_bids,
            kept = stats.kept,
            "Run reconciled: {} fresh + {} stored -> {} kept",
            stats.fresh,
            stats.existing,
            stats.kept,
        );

        self.tabs.rewrite_tab(&run.tab_name, &items).await?;

        if self.settings.apply_auction_view {
            let today = now.with_timezone(&tz).format("%Y-%m-%d").to_string();
            self.tabs
                .set_sort_or_filter(&run.tab_name, &auction_view(&today))
                .await?;
        }

        Ok(RunResult {
            tab: run.tab_name.clone(),
            items: items.len(),
        })
    }

    async fn fetch_all(&self, queries: &[String]) -> Result<Vec<ListingRecord>> {
        let mut all = Vec::new();
        for query in queries {
            all.extend(self.listings.search(query).await?);
        }
        Ok(all)
    }

    async fn sync_orders_locked(&self) -> Result<RunResult> {
        let purchases = self
            .orders
            .line_items(self.settings.order_lookback_days)
            .await?;
        let fresh: Vec<OrderItem> = purchases.iter().map(OrderItem::from_line_item).collect();
        let existing: Vec<OrderItem> = self.tabs.read_records(ORDERS_TAB).await?;
        let (fresh_count, stored_count) = (fresh.len(), existing.len());

        let merged = merge_orders(existing, fresh);
        self.tabs.rewrite_tab(ORDERS_TAB, &merged).await?;
        self.tabs.set_sort_or_filter(ORDERS_TAB, &orders_view()).await?;

        info!(
            fresh = fresh_count,
            stored = stored_count,
            written = merged.len(),
            "Orders synced"
        );
        Ok(RunResult {
            tab: ORDERS_TAB.to_string(),
            items: merged.len(),
        })
    }

    fn record<E>(&self, outcome: std::result::Result<usize, E>) {
        match outcome {
            Ok(rows) => self.health.record_success(now_secs(), rows as u64),
            Err(_) => self.health.record_failure(),
        }
    }

    /// Sync auctions then orders every `every`, starting immediately.
    pub async fn run_periodic(self: Arc<Self>, every: Duration) {
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            match self.sync_auctions().await {
                Ok(results) => info!(runs = results.len(), "Scheduled auction sync complete"),
                Err(e) => warn!("Scheduled auction sync failed: {e}"),
            }
            if let Err(e) = self.sync_orders().await {
                warn!("Scheduled orders sync failed: {e}");
            }
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    use crate::config::RunConfig;
    use crate::error::AppError;
    use crate::rows::TableRow;
    use crate::store::{MemoryBackend, SortOrder};
    use crate::types::LineItem;

    #[derive(Default)]
    struct FakeListings {
        by_query: HashMap<String, Vec<ListingRecord>>,
    }

    #[async_trait]
    impl ListingSource for FakeListings {
        async fn search(&self, query: &str) -> Result<Vec<ListingRecord>> {
            Ok(self.by_query.get(query).cloned().unwrap_or_default())
        }
    }

    struct FakeOrders(Vec<LineItem>);

    #[async_trait]
    impl OrderSource for FakeOrders {
        async fn line_items(&self, _days: u32) -> Result<Vec<LineItem>> {
            Ok(self.0.clone())
        }
    }

    struct FailingOrders;

    #[async_trait]
    impl OrderSource for FailingOrders {
        async fn line_items(&self, _days: u32) -> Result<Vec<LineItem>> {
            Err(AppError::Marketplace("GetOrders failed (500)".to_string()))
        }
    }

    fn listing(id: &str, title: &str, bids: u32, ends_in_hours: i64) -> ListingRecord {
        ListingRecord {
            item_id: id.to_string(),
            title: title.to_string(),
            current_bid: Some("1.00".to_string()),
            bid_count: Some(bids),
            end_time: Utc::now() + ChronoDuration::hours(ends_in_hours),
            item_url: format!("https://www.ebay.com/itm/{id}"),
        }
    }

    fn settings(runs: RunsFile) -> SyncSettings {
        SyncSettings {
            runs,
            timezone: chrono_tz::America::Chicago,
            order_lookback_days: 30,
            apply_auction_view: true,
        }
    }

    fn service(
        mem: &Arc<MemoryBackend>,
        listings: FakeListings,
        orders: Arc<dyn OrderSource>,
        runs: RunsFile,
    ) -> SyncService {
        SyncService::new(
            TabSync::new(mem.clone()),
            Arc::new(listings),
            orders,
            settings(runs),
            Arc::new(HealthState::new()),
        )
    }

    fn pc_runs() -> RunsFile {
        RunsFile {
            sellers: vec!["s1".to_string()],
            runs: vec![RunConfig {
                sheet: "PC".to_string(),
                queries: vec!["prizm".to_string()],
            }],
            filterwords: vec!["reprint".to_string()],
        }
    }

    #[tokio::test]
    async fn auction_run_reconciles_into_seller_tab() {
        let mem = Arc::new(MemoryBackend::new());
        let mut listings = FakeListings::default();
        listings.by_query.insert(
            "prizm,sellers:{s1}".to_string(),
            vec![
                listing("1", "2023 Prizm Star RC #10/50", 0, 5),
                listing("2", "2023 Prizm Star RC #10/50", 0, 5),
                listing("3", "2023 Prizm Star REPRINT", 0, 5),
                listing("4", "2023 Prizm Other /99", 2, 5),
            ],
        );
        let svc = service(&mem, listings, Arc::new(FakeOrders(vec![])), pc_runs());

        let results = svc.sync_auctions().await.unwrap();
        assert_eq!(
            results,
            vec![RunResult {
                tab: "PC - s1".to_string(),
                items: 1
            }]
        );

        let tabs = TabSync::new(mem.clone());
        let stored: Vec<AuctionItem> = tabs.read_records("PC - s1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].out_of, "50");
        assert_eq!(stored[0].rookie, "Yes");

        let filter = mem.filter("PC - s1").unwrap();
        assert_eq!(filter.sort, vec![(3, SortOrder::Ascending)]);
        assert_eq!(svc.health().syncs_completed(), 1);
        assert_eq!(svc.health().last_rows_written(), 1);
    }

    #[tokio::test]
    async fn stored_rows_are_carried_and_expired_ones_dropped() {
        let mem = Arc::new(MemoryBackend::new());
        let tabs = TabSync::new(mem.clone());
        let chicago = chrono_tz::America::Chicago;
        let stored = vec![
            AuctionItem::from_listing(&listing("10", "2022 Select Kept /25", 0, 30), chicago),
            AuctionItem::from_listing(&listing("11", "2022 Select Gone /25", 0, -2), chicago),
        ];
        tabs.rewrite_tab("PC - s1", &stored).await.unwrap();

        let svc = service(&mem, FakeListings::default(), Arc::new(FakeOrders(vec![])), pc_runs());
        let results = svc.sync_auctions().await.unwrap();
        assert_eq!(results[0].items, 1);

        let after: Vec<AuctionItem> = tabs.read_records("PC - s1").await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].title, "2022 Select Kept /25");
    }

    #[tokio::test]
    async fn case_hits_drive_their_own_runs_and_flags() {
        let mem = Arc::new(MemoryBackend::new());
        let tabs = TabSync::new(mem.clone());
        let hits = vec![CaseHit {
            name: "Downtown".to_string(),
            set: "Optic".to_string(),
            image: String::new(),
            kind: "SSP".to_string(),
            value: 250,
            sport: "Football".to_string(),
        }];
        tabs.rewrite_tab(CASE_HITS_TAB, &hits).await.unwrap();

        let case_query = "Football Downtown Optic&limit=200&filter=price:[..10],sellers:{s1},priceCurrency:USD,buyingOptions:{AUCTION}";
        let mut listings = FakeListings::default();
        listings.by_query.insert(
            case_query.to_string(),
            vec![listing("7", "2023 Optic Downtown Star", 0, 3)],
        );
        let runs = RunsFile {
            sellers: vec!["s1".to_string()],
            ..RunsFile::default()
        };
        let svc = service(&mem, listings, Arc::new(FakeOrders(vec![])), runs);

        let results = svc.sync_auctions().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tab, "CASE HITS - s1");

        let written: Vec<AuctionItem> = tabs.read_records("CASE HITS - s1").await.unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].case_hit, "Yes");
    }

    #[tokio::test]
    async fn orders_merge_and_sort_newest_first() {
        let mem = Arc::new(MemoryBackend::new());
        let tabs = TabSync::new(mem.clone());
        let stored = vec![OrderItem {
            created: "2025-01-01 10:00:00".to_string(),
            title: "2023 Prizm Star RC /50".to_string(),
            price: "5.00".to_string(),
            tax_amount: "0.40".to_string(),
            shipping_amount: "1.25".to_string(),
            item_id: "111".to_string(),
        }];
        tabs.rewrite_tab(ORDERS_TAB, &stored).await.unwrap();

        let purchases = vec![
            LineItem {
                item_id: "111".to_string(),
                title: "2023 Prizm Star RC /50".to_string(),
                price: Some(5.0),
                created: Some("2025-01-02T10:00:00Z".parse().unwrap()),
                tax_amount: Some(0.4),
                shipping_amount: None,
            },
            LineItem {
                item_id: "222".to_string(),
                title: "2021 Bowman Chrome".to_string(),
                price: Some(2.5),
                created: Some("2025-01-03T10:00:00Z".parse().unwrap()),
                tax_amount: None,
                shipping_amount: Some(0.99),
            },
        ];
        let svc = service(
            &mem,
            FakeListings::default(),
            Arc::new(FakeOrders(purchases)),
            RunsFile::default(),
        );

        let result = svc.sync_orders().await.unwrap();
        assert_eq!(result.items, 2);

        let merged: Vec<OrderItem> = tabs.read_records(ORDERS_TAB).await.unwrap();
        assert_eq!(merged.len(), 2);
        // The stored row has shipping, so it beats the newer fresh one.
        assert_eq!(merged[0].shipping_amount, "1.25");
        assert_eq!(merged[1].item_id, "222");

        let header = OrderItem::header_row();
        let created_col = header.iter().position(|h| h == "Created").unwrap() as u32;
        let filter = mem.filter(ORDERS_TAB).unwrap();
        assert_eq!(filter.sort, vec![(created_col, SortOrder::Descending)]);
    }

    #[tokio::test]
    async fn failures_propagate_and_are_counted() {
        let mem = Arc::new(MemoryBackend::new());
        let svc = service(
            &mem,
            FakeListings::default(),
            Arc::new(FailingOrders),
            RunsFile::default(),
        );
        assert!(matches!(
            svc.sync_orders().await,
            Err(AppError::Marketplace(_))
        ));
        assert_eq!(svc.health().syncs_failed(), 1);
        assert_eq!(svc.health().syncs_completed(), 0);
    }

    #[tokio::test]
    async fn no_sellers_no_runs() {
        let mem = Arc::new(MemoryBackend::new());
        let listings = FakeListings::default();
        let svc = service(&mem, listings, Arc::new(FakeOrders(vec![])), RunsFile::default());
        assert!(svc.sync_auctions().await.unwrap().is_empty());
    }
}
