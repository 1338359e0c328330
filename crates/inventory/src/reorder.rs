//! Reorder thresholds and on-demand alert evaluation.

use serde::{Deserialize, Serialize};

use rollstock_core::{DomainError, DomainResult, ItemId};

use crate::category::ItemCategory;
use crate::item::StockItem;

/// Minimum-stock watermark for one item. `(category, item_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderLevel {
    pub category: ItemCategory,
    pub item_id: ItemId,
    pub threshold: f64,
}

impl ReorderLevel {
    pub fn new(category: ItemCategory, item_id: ItemId, threshold: f64) -> DomainResult<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(DomainError::validation(format!(
                "reorder threshold for {item_id} must be a non-negative number"
            )));
        }
        Ok(Self {
            category,
            item_id,
            threshold,
        })
    }
}

/// Raised when an item's stock is at or below its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderAlert {
    pub category: ItemCategory,
    pub item_id: ItemId,
    pub current_qty: f64,
    pub threshold: f64,
}

/// Evaluate alerts for `items`. Items without a threshold never alert.
pub fn evaluate_alerts<'a, F>(items: impl IntoIterator<Item = &'a StockItem>, threshold_for: F) -> Vec<ReorderAlert>
where
    F: Fn(&ItemId) -> Option<f64>,
{
    items
        .into_iter()
        .filter_map(|item| {
            let threshold = threshold_for(item.id_typed())?;
            (item.quantity() <= threshold).then(|| ReorderAlert {
                category: item.category(),
                item_id: item.id_typed().clone(),
                current_qty: item.quantity(),
                threshold,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemAttributes;
    use chrono::Utc;

    fn cut(id: &str, quantity: f64) -> StockItem {
        StockItem::new(
            ItemId::new(id).unwrap(),
            ItemAttributes::Cut {
                company: "ACME".to_string(),
                width_cm: 50.0,
                height_cm: 70.0,
                thickness_mm: 0.1,
            },
            quantity,
            Utc::now(),
        )
    }

    #[test]
    fn alert_raised_at_or_below_threshold_only() {
        let low = cut("C-1", 3.0);
        let equal = cut("C-2", 5.0);
        let fine = cut("C-3", 6.0);
        let no_threshold = cut("C-4", 0.0);

        let alerts = evaluate_alerts([&low, &equal, &fine, &no_threshold], |id| {
            (id.as_str() != "C-4").then_some(5.0)
        });

        let ids: Vec<&str> = alerts.iter().map(|a| a.item_id.as_str()).collect();
        assert_eq!(ids, vec!["C-1", "C-2"]);
        assert_eq!(alerts[0].current_qty, 3.0);
        assert_eq!(alerts[0].threshold, 5.0);
    }

    #[test]
    fn zero_threshold_is_a_real_threshold() {
        let empty = cut("C-1", 0.0);
        assert_eq!(evaluate_alerts([&empty], |_| Some(0.0)).len(), 1);
        assert!(evaluate_alerts([&empty], |_| None).is_empty());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let id = ItemId::new("C-1").unwrap();
        assert!(ReorderLevel::new(ItemCategory::Cut, id, -1.0).is_err());
    }
}
