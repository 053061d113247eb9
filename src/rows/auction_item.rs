use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::{Cell, Column, RowError, RowReader, TableRow};
use crate::parser::{
    format_url, parse_auto, parse_out_of, parse_patch, parse_psa, parse_rookie, parse_title,
    parse_year, NOT_NUMBERED,
};
use crate::types::ListingRecord;

pub const END_DATE_FORMAT: &str = "%Y-%m-%d";
pub const END_TIME_FORMAT: &str = "%H:%M:%S";

/// Layouts accepted when reading a stored end date + time back. The store
/// may hand back user-entered dates in its own display format.
const END_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

/// An active auction listing as persisted in a run's tab.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuctionItem {
    pub title: String,
    pub year: String,
    pub rookie: String,
    /// Print-run denominator as an integer string; `999999` when not numbered.
    pub out_of: String,
    pub psa: String,
    pub case_hit: String,
    pub patch: String,
    pub auto: String,
    pub price: String,
    pub bid_count: String,
    /// Local (configured timezone) end date, `YYYY-MM-DD`.
    pub end_date: String,
    /// Local (configured timezone) end time, `HH:MM:SS`.
    pub end_time: String,
    pub item_web_url: String,
    /// Marketplace id. Only known for freshly fetched listings; not stored.
    pub item_id: String,
}

impl AuctionItem {
    /// Convert a fetched listing, splitting its UTC end into local date/time.
    pub fn from_listing(listing: &ListingRecord, tz: Tz) -> Self {
        let local_end = listing.end_time.with_timezone(&tz);
        let title = listing.title.as_str();
        Self {
            title: parse_title(Some(title)),
            year: parse_year(title),
            rookie: parse_rookie(title),
            out_of: parse_out_of(title).to_string(),
            psa: parse_psa(title),
            case_hit: "No".to_string(),
            patch: parse_patch(title),
            auto: parse_auto(title),
            price: listing.current_bid.clone().unwrap_or_default(),
            bid_count: listing.bid_count.unwrap_or(0).to_string(),
            end_date: local_end.format(END_DATE_FORMAT).to_string(),
            end_time: local_end.format(END_TIME_FORMAT).to_string(),
            item_web_url: format_url(&listing.item_url),
            item_id: listing.item_id.clone(),
        }
    }

    /// Bid count as a number. Unparsable counts read as zero.
    pub fn bid_count_value(&self) -> i64 {
        self.bid_count.trim().parse::<i64>().unwrap_or(0)
    }

    /// End instant in UTC, interpreting the stored date/time in `tz`.
    /// `None` when either half is missing or unparsable, or the local time
    /// does not exist in `tz`. A time repeated by a DST fall-back reads as
    /// standard time, the later of the two instants.
    pub fn ends_at(&self, tz: Tz) -> Option<DateTime<Utc>> {
        if self.end_date.trim().is_empty() || self.end_time.trim().is_empty() {
            return None;
        }
        let joined = format!("{} {}", self.end_date.trim(), self.end_time.trim());
        let naive = END_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&joined, fmt).ok())?;
        tz.from_local_datetime(&naive)
            .latest()
            .map(|local| local.with_timezone(&Utc))
    }
}

impl TableRow for AuctionItem {
    const COLUMNS: &'static [Column] = &[
        Column::stored("Title"),
        Column::stored("Year"),
        Column::stored("Rookie"),
        Column::stored("OutOf"),
        Column::stored("PSA"),
        Column::stored("CaseHit"),
        Column::stored("Patch"),
        Column::stored("Auto"),
        Column::stored("Price"),
        Column::stored("BidCount"),
        Column::stored("EndDate"),
        Column::stored("EndTime"),
        Column::stored("ItemWebUrl"),
        Column::transient("ItemId"),
    ];

    // Title through BidCount.
    const MIN_CELLS: usize = 10;

    fn cell(&self, column: &str) -> Cell {
        let value = match column {
            "Title" => &self.title,
            "Year" => &self.year,
            "Rookie" => &self.rookie,
            "OutOf" => &self.out_of,
            "PSA" => &self.psa,
            "CaseHit" => &self.case_hit,
            "Patch" => &self.patch,
            "Auto" => &self.auto,
            "Price" => &self.price,
            "BidCount" => &self.bid_count,
            "EndDate" => &self.end_date,
            "EndTime" => &self.end_time,
            "ItemWebUrl" => &self.item_web_url,
            "ItemId" => &self.item_id,
            _ => return Cell::text(""),
        };
        Cell::text(value.as_str())
    }

    fn from_row(row: &[Cell]) -> Result<Self, RowError> {
        let r = RowReader::new::<Self>(row)?;
        let title = r.text("Title")?;
        let out_of = match r.text("OutOf")?.trim().parse::<u32>() {
            Ok(n) => n.to_string(),
            Err(_) if title.is_empty() => NOT_NUMBERED.to_string(),
            Err(_) => parse_out_of(&title).to_string(),
        };
        Ok(Self {
            year: r.text("Year")?,
            rookie: r.text("Rookie")?,
            out_of,
            psa: r.text_or("PSA", "0")?,
            case_hit: r.text_or("CaseHit", "No")?,
            patch: r.text_or("Patch", "No")?,
            auto: r.text_or("Auto", "No")?,
            price: r.text("Price")?,
            bid_count: r.text_or("BidCount", "0")?,
            end_date: r.text("EndDate")?,
            end_time: r.text("EndTime")?,
            item_web_url: r.text("ItemWebUrl")?,
            item_id: String::new(),
            title,
        })
    }
}
