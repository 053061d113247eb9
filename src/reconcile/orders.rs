use super::keep_best_per_key;
use crate::rows::OrderItem;

/// Merge stored order rows with freshly fetched ones, one row per item id.
///
/// Within an item id, rows with a shipping amount win over rows without
/// one; after that the most recent `Created` wins (unparsable dates rank
/// oldest) and remaining ties go to the first row seen.
pub fn merge_orders(existing: Vec<OrderItem>, fresh: Vec<OrderItem>) -> Vec<OrderItem> {
    let mut all = existing;
    all.extend(fresh);
    keep_best_per_key(
        all,
        |o| o.item_id.clone(),
        |o| (o.has_shipping(), o.created_at()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(item_id: &str, created: &str, shipping: &str, title: &str) -> OrderItem {
        OrderItem {
            created: created.to_string(),
            title: title.to_string(),
            price: "1.00".to_string(),
            tax_amount: "0.07".to_string(),
            shipping_amount: shipping.to_string(),
            item_id: item_id.to_string(),
        }
    }

    #[test]
    fn shipping_beats_recency() {
        let existing = vec![order("1", "2025-01-01 10:00:00", "1.25", "stored")];
        let fresh = vec![order("1", "2025-02-01 10:00:00", "0.00", "fresh")];
        let merged = merge_orders(existing, fresh);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "stored");
    }

    #[test]
    fn most_recent_wins_when_shipping_ties() {
        let existing = vec![order("1", "2025-01-01 10:00:00", "", "old")];
        let fresh = vec![order("1", "2025-02-01 10:00:00", "0", "new")];
        let merged = merge_orders(existing, fresh);
        assert_eq!(merged[0].title, "new");
    }

    #[test]
    fn unparsable_created_ranks_oldest() {
        let existing = vec![order("1", "whenever", "2.00", "garbled")];
        let fresh = vec![order("1", "2020-01-01 00:00:00", "2.00", "dated")];
        let merged = merge_orders(existing, fresh);
        assert_eq!(merged[0].title, "dated");
    }

    #[test]
    fn distinct_ids_keep_first_seen_order() {
        let existing = vec![order("2", "2025-01-01 10:00:00", "", "b")];
        let fresh = vec![
            order("1", "2025-01-02 10:00:00", "", "a"),
            order("2", "2025-01-01 10:00:00", "", "b-again"),
        ];
        let merged = merge_orders(existing, fresh);
        let titles: Vec<&str> = merged.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);
    }
}
