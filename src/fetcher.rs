use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::types::{LineItem, ListingRecord};

/// Marketplace search. `query` is passed through verbatim, including any
/// `&limit=` / `&filter=` suffix.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<ListingRecord>>;
}

/// Buyer-side purchase history.
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn line_items(&self, days: u32) -> Result<Vec<LineItem>>;
}

/// Trading API schema version sent with every call.
const TRADING_COMPATIBILITY_LEVEL: &str = "1207";
const ORDERS_PER_PAGE: u32 = 100;

// ---------------------------------------------------------------------------
// Browse API payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    item_summaries: Vec<ItemSummary>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSummary {
    #[serde(default)]
    item_id: String,
    #[serde(default)]
    title: String,
    bid_count: Option<u32>,
    current_bid_price: Option<Price>,
    item_end_date: Option<String>,
    #[serde(default)]
    item_web_url: String,
}

#[derive(Debug, Deserialize)]
struct Price {
    value: Option<String>,
}

impl ItemSummary {
    /// Listings without a readable end date cannot be an auction we track.
    fn into_record(self) -> Option<ListingRecord> {
        let end_time = self
            .item_end_date
            .as_deref()
            .and_then(parse_timestamp)?;
        Some(ListingRecord {
            item_id: self.item_id,
            title: self.title,
            current_bid: self.current_bid_price.and_then(|p| p.value),
            bid_count: self.bid_count,
            end_time,
            item_url: self.item_web_url,
        })
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Trading API site id for a marketplace id. Unknown marketplaces map to US.
pub fn marketplace_site_id(marketplace: &str) -> &'static str {
    match marketplace {
        "EBAY_US" => "0",
        "EBAY_CA" => "2",
        "EBAY_GB" => "3",
        "EBAY_AU" => "15",
        "EBAY_FR" => "71",
        "EBAY_DE" => "77",
        "EBAY_IT" => "101",
        "EBAY_NL" => "146",
        "EBAY_ES" => "186",
        _ => "0",
    }
}

// ---------------------------------------------------------------------------
// EbayClient
// ---------------------------------------------------------------------------

pub struct EbayClient {
    client: reqwest::Client,
    browse_url: String,
    trading_url: String,
    access_token: String,
    marketplace_id: String,
}

impl EbayClient {
    pub fn new(
        browse_url: &str,
        trading_url: &str,
        access_token: &str,
        marketplace_id: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            browse_url: browse_url.trim_end_matches('/').to_string(),
            trading_url: trading_url.to_string(),
            access_token: access_token.to_string(),
            marketplace_id: marketplace_id.to_string(),
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<SearchPage> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("X-EBAY-C-MARKETPLACE-ID", &self.marketplace_id)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Marketplace(format!(
                "search failed ({status}): {body}"
            )));
        }
        Ok(resp.json().await?)
    }

    async fn fetch_orders_page(&self, days: u32, page: u32) -> Result<String> {
        let resp = self
            .client
            .post(&self.trading_url)
            .header("Content-Type", "text/xml")
            .header("X-EBAY-API-COMPATIBILITY-LEVEL", TRADING_COMPATIBILITY_LEVEL)
            .header("X-EBAY-API-CALL-NAME", "GetOrders")
            .header("X-EBAY-API-SITEID", marketplace_site_id(&self.marketplace_id))
            .header("X-EBAY-API-IAF-TOKEN", &self.access_token)
            .body(get_orders_request(days, page))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(AppError::Marketplace(format!(
                "GetOrders failed ({status}): {body}"
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl ListingSource for EbayClient {
    async fn search(&self, query: &str) -> Result<Vec<ListingRecord>> {
        let first = format!("{}/item_summary/search?q={}", self.browse_url, query);
        let mut next = Some(first);
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut page = 1u32;

        while let Some(url) = next.take().filter(|u| !u.is_empty()) {
            let body = self.fetch_page(&url).await?;
            for summary in body.item_summaries {
                match summary.into_record() {
                    Some(r) => records.push(r),
                    None => skipped += 1,
                }
            }
            debug!(query, page, total = records.len(), "Fetched search page");
            next = body.next;
            page += 1;
        }

        if skipped > 0 {
            warn!(query, skipped, "Listings without an end date were skipped");
        }
        info!(query, items = records.len(), "Search complete");
        Ok(records)
    }
}

#[async_trait]
impl OrderSource for EbayClient {
    async fn line_items(&self, days: u32) -> Result<Vec<LineItem>> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let xml = self.fetch_orders_page(days, page).await?;
            let (mut batch, has_more) = parse_get_orders_response(&xml)?;
            debug!(page, items = batch.len(), has_more, "Fetched orders page");
            items.append(&mut batch);
            if !has_more {
                break;
            }
            page += 1;
        }
        info!(days, items = items.len(), "Order history fetched");
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// Trading API XML
// ---------------------------------------------------------------------------

fn get_orders_request(days: u32, page: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<GetOrdersRequest xmlns="urn:ebay:apis:eBLBaseComponents">
  <OrderRole>Buyer</OrderRole>
  <OrderStatus>All</OrderStatus>
  <NumberOfDays>{days}</NumberOfDays>
  <Pagination><EntriesPerPage>{ORDERS_PER_PAGE}</EntriesPerPage><PageNumber>{page}</PageNumber></Pagination>
</GetOrdersRequest>"#
    )
}

#[derive(Default)]
struct TransactionFields {
    item_id: String,
    title: String,
    price: Option<f64>,
    created: Option<DateTime<Utc>>,
    tax_amount: Option<f64>,
    shipping_amount: Option<f64>,
}

impl TransactionFields {
    fn into_line_item(self) -> Option<LineItem> {
        if self.item_id.is_empty() {
            return None;
        }
        Some(LineItem {
            item_id: self.item_id,
            title: self.title,
            price: self.price,
            created: self.created,
            tax_amount: self.tax_amount,
            shipping_amount: self.shipping_amount,
        })
    }
}

fn path_ends_with(stack: &[String], tail: &[&str]) -> bool {
    stack.len() >= tail.len()
        && stack[stack.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(a, b)| a == b)
}

fn parse_amount(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

fn entity_text(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let n = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(n)
        }
    }
}

/// Line items on one `GetOrders` page plus the `HasMoreOrders` flag.
/// Transactions without an item id are dropped. Any `Errors` element in
/// the response fails the whole page.
pub fn parse_get_orders_response(xml: &str) -> Result<(Vec<LineItem>, bool)> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut current: Option<TransactionFields> = None;
    let mut items = Vec::new();
    let mut has_more = false;
    let mut fault: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "Transaction" {
                    current = Some(TransactionFields::default());
                }
                stack.push(name);
                text.clear();
            }
            Ok(Event::Text(ref e)) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::CData(ref e)) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::GeneralRef(ref e)) => {
                if let Some(c) = entity_text(&String::from_utf8_lossy(e.as_ref())) {
                    text.push(c);
                }
            }
            Ok(Event::End(_)) => {
                let value = text.trim().to_string();
                if let Some(txn) = current.as_mut() {
                    if path_ends_with(&stack, &["Transaction", "Item", "ItemID"]) {
                        txn.item_id = value.clone();
                    } else if path_ends_with(&stack, &["Transaction", "Item", "Title"]) {
                        txn.title = value.clone();
                    } else if path_ends_with(&stack, &["Transaction", "TransactionPrice"]) {
                        txn.price = parse_amount(&value);
                    } else if path_ends_with(&stack, &["Transaction", "CreatedDate"]) {
                        txn.created = parse_timestamp(&value);
                    } else if path_ends_with(&stack, &["Transaction", "Taxes", "TotalTaxAmount"]) {
                        txn.tax_amount = parse_amount(&value);
                    } else if path_ends_with(&stack, &["Transaction", "ActualShippingCost"]) {
                        txn.shipping_amount = parse_amount(&value);
                    }
                }
                if path_ends_with(&stack, &["Transaction"]) {
                    if let Some(item) = current.take().and_then(TransactionFields::into_line_item) {
                        items.push(item);
                    }
                } else if path_ends_with(&stack, &["HasMoreOrders"]) {
                    has_more = value.eq_ignore_ascii_case("true");
                } else if path_ends_with(&stack, &["Errors", "LongMessage"])
                    || (path_ends_with(&stack, &["Errors", "ShortMessage"]) && fault.is_none())
                {
                    fault = Some(value);
                } else if path_ends_with(&stack, &["Errors"]) && fault.is_none() {
                    fault = Some("unspecified error".to_string());
                }
                stack.pop();
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AppError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(message) = fault {
        return Err(AppError::Marketplace(format!("Trading API error: {message}")));
    }
    Ok((items, has_more))
}
