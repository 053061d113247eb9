use chrono::NaiveDateTime;

use super::{Cell, Column, RowError, RowReader, TableRow};
use crate::parser::{
    format_amount, format_dollars, parse_dollar_amount, parse_out_of, parse_psa, parse_rookie,
};
use crate::types::LineItem;

pub const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const ITEM_LINK_BASE: &str = "https://www.ebay.com/itm/";

const CREATED_FORMATS: &[&str] = &[CREATED_FORMAT, "%m/%d/%Y %H:%M:%S", "%m/%d/%Y %I:%M:%S %p"];

/// A purchased item in the orders tab. Rookie, OutOf, PSA, the total and the
/// item link are derived on every read and never stored independently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderItem {
    pub created: String,
    pub title: String,
    pub price: String,
    pub tax_amount: String,
    pub shipping_amount: String,
    pub item_id: String,
}

impl OrderItem {
    pub fn from_line_item(line: &LineItem) -> Self {
        Self {
            created: line
                .created
                .map(|c| c.format(CREATED_FORMAT).to_string())
                .unwrap_or_default(),
            title: line.title.clone(),
            price: format_amount(line.price),
            tax_amount: format_amount(line.tax_amount),
            shipping_amount: format_amount(line.shipping_amount),
            item_id: line.item_id.clone(),
        }
    }

    pub fn rookie(&self) -> String {
        parse_rookie(&self.title)
    }

    pub fn out_of(&self) -> String {
        parse_out_of(&self.title).to_string()
    }

    pub fn psa(&self) -> String {
        parse_psa(&self.title)
    }

    /// Price + tax + shipping, always two decimals.
    pub fn total_amount(&self) -> String {
        let cents = parse_dollar_amount(&self.price)
            + parse_dollar_amount(&self.tax_amount)
            + parse_dollar_amount(&self.shipping_amount);
        format_dollars(cents)
    }

    pub fn item_link(&self) -> String {
        if self.item_id.trim().is_empty() {
            String::new()
        } else {
            format!("{ITEM_LINK_BASE}{}", self.item_id)
        }
    }

    pub fn has_shipping(&self) -> bool {
        parse_dollar_amount(&self.shipping_amount) != 0
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        let created = self.created.trim();
        CREATED_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(created, fmt).ok())
    }
}

impl TableRow for OrderItem {
    const COLUMNS: &'static [Column] = &[
        Column::stored("Created"),
        Column::stored("Title"),
        Column::stored("Rookie"),
        Column::stored("OutOf"),
        Column::stored("PSA"),
        Column::stored("Price"),
        Column::stored("TaxAmount"),
        Column::stored("ShippingAmount"),
        Column::stored("TotalAmount"),
        Column::stored("ItemId"),
        Column::stored("ItemLink"),
    ];

    // Created through TotalAmount; id and link may be blank.
    const MIN_CELLS: usize = 9;

    fn cell(&self, column: &str) -> Cell {
        match column {
            "Created" => Cell::text(self.created.as_str()),
            "Title" => Cell::text(self.title.as_str()),
            "Rookie" => Cell::text(self.rookie()),
            "OutOf" => Cell::text(self.out_of()),
            "PSA" => Cell::text(self.psa()),
            "Price" => Cell::text(self.price.as_str()),
            "TaxAmount" => Cell::text(self.tax_amount.as_str()),
            "ShippingAmount" => Cell::text(self.shipping_amount.as_str()),
            "TotalAmount" => Cell::text(self.total_amount()),
            "ItemId" => Cell::text(self.item_id.as_str()),
            "ItemLink" => Cell::text(self.item_link()),
            _ => Cell::text(""),
        }
    }

    fn from_row(row: &[Cell]) -> Result<Self, RowError> {
        let r = RowReader::new::<Self>(row)?;
        Ok(Self {
            created: r.text("Created")?,
            title: r.text("Title")?,
            price: r.text("Price")?,
            tax_amount: r.text("TaxAmount")?,
            shipping_amount: r.text("ShippingAmount")?,
            item_id: r.text("ItemId")?,
        })
    }
}
