use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Marketplace ingest records
// ---------------------------------------------------------------------------

/// One active listing as returned by a marketplace search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub item_id: String,
    pub title: String,
    /// Current bid price as the marketplace renders it (e.g. "1.25").
    pub current_bid: Option<String>,
    pub bid_count: Option<u32>,
    pub end_time: DateTime<Utc>,
    pub item_url: String,
}

/// One purchased line item from the buyer's order history.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub item_id: String,
    pub title: String,
    pub price: Option<f64>,
    pub created: Option<DateTime<Utc>>,
    pub tax_amount: Option<f64>,
    pub shipping_amount: Option<f64>,
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// A destination tab paired with the queries whose results land in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub tab_name: String,
    pub seller: String,
    pub queries: Vec<String>,
}

/// Outcome of one run, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub tab: String,
    pub items: usize,
}
