use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use super::keep_best_per_key;
use crate::parser::parse_case_hit;
use crate::rows::{AuctionItem, CaseHit};
use crate::types::ListingRecord;

/// How many items each stage removed. Logged per run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub fresh: usize,
    pub existing: usize,
    pub rejected_blocked: usize,
    pub rejected_era: usize,
    pub duplicate_url: usize,
    pub duplicate_title: usize,
    pub rejected_expired: usize,
    pub rejected_bids: usize,
    pub kept: usize,
}

/// Merge fresh listings into the stored items and filter, as of now.
pub fn reconcile(
    fresh: &[ListingRecord],
    existing: Vec<AuctionItem>,
    blocked_words: &[String],
    tz: Tz,
) -> Vec<AuctionItem> {
    reconcile_at(fresh, existing, blocked_words, tz, Utc::now()).0
}

/// [`reconcile`] against an explicit clock.
///
/// Stages run over the whole working set in order: blocked words, the two
/// era/brand rules, dedup by URL, dedup by normalized title, expiry, and
/// bid activity. Both dedup passes keep the entry with the most bids.
pub fn reconcile_at(
    fresh: &[ListingRecord],
    existing: Vec<AuctionItem>,
    blocked_words: &[String],
    tz: Tz,
    now: DateTime<Utc>,
) -> (Vec<AuctionItem>, ReconcileStats) {
    let mut stats = ReconcileStats {
        fresh: fresh.len(),
        existing: existing.len(),
        ..ReconcileStats::default()
    };

    let mut items = existing;
    items.extend(fresh.iter().map(|l| AuctionItem::from_listing(l, tz)));

    let blocked: Vec<String> = blocked_words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    let before = items.len();
    items.retain(|item| passes_blocked_words(item, &blocked));
    stats.rejected_blocked = before - items.len();

    let before = items.len();
    items.retain(|item| passes_topps_finest_era(item) && passes_bowman_era(item));
    stats.rejected_era = before - items.len();

    let before = items.len();
    items = keep_best_per_key(
        items,
        |i| i.item_web_url.to_lowercase(),
        AuctionItem::bid_count_value,
    );
    stats.duplicate_url = before - items.len();

    let before = items.len();
    items = keep_best_per_key(
        items,
        |i| i.title.trim().to_lowercase(),
        AuctionItem::bid_count_value,
    );
    stats.duplicate_title = before - items.len();

    let before = items.len();
    items.retain(|item| is_still_open(item, tz, now));
    stats.rejected_expired = before - items.len();

    let before = items.len();
    items.retain(has_no_bids);
    stats.rejected_bids = before - items.len();

    stats.kept = items.len();
    debug!(?stats, "reconcile complete");
    (items, stats)
}

/// Flag items whose title names one of the tracked case hits.
pub fn mark_case_hits(items: &mut [AuctionItem], case_hits: &[CaseHit]) {
    if case_hits.is_empty() {
        return;
    }
    for item in items.iter_mut() {
        if parse_case_hit(&item.title, case_hits) == "Yes" {
            item.case_hit = "Yes".to_string();
        }
    }
}

fn passes_blocked_words(item: &AuctionItem, blocked: &[String]) -> bool {
    if item.title.trim().is_empty() {
        return false;
    }
    let title = item.title.to_lowercase();
    !blocked.iter().any(|w| title.contains(w.as_str()))
}

fn parsed_year(item: &AuctionItem) -> Option<i32> {
    item.year.trim().parse::<i32>().ok()
}

/// Modern Topps/Finest is dropped. Unknown years pass.
fn passes_topps_finest_era(item: &AuctionItem) -> bool {
    let title = item.title.to_lowercase();
    if !(title.contains("topps") || title.contains("finest")) {
        return true;
    }
    !matches!(parsed_year(item), Some(year) if (2016..=2026).contains(&year))
}

/// Bowman before 2020 is dropped. Unknown years pass.
fn passes_bowman_era(item: &AuctionItem) -> bool {
    if !item.title.to_lowercase().contains("bowman") {
        return true;
    }
    !matches!(parsed_year(item), Some(year) if year < 2020)
}

/// Fails closed: an end that cannot be parsed counts as already over.
fn is_still_open(item: &AuctionItem, tz: Tz, now: DateTime<Utc>) -> bool {
    item.ends_at(tz).is_some_and(|end| end > now)
}

/// Fails open: an unparsable bid count is treated as zero and kept. This is
/// the opposite policy to `is_still_open`; revisit with the sheet owner
/// before unifying them.
fn has_no_bids(item: &AuctionItem) -> bool {
    match item.bid_count.trim().parse::<i64>() {
        Ok(bids) => bids == 0,
        Err(_) => true,
    }
}
