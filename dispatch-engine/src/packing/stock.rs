//! Stock checks for marking an order ready

use super::traits::{CommandContext, PackingError};
use chrono::NaiveDate;
use shared::packing::{PackingItem, StockLevel, StockMovement, StockWarning, StockWarningKind};
use std::collections::BTreeMap;

/// Quantity needed per product (items sharing a product are summed)
pub fn aggregate_demand(items: &[PackingItem]) -> BTreeMap<String, i32> {
    let mut demand = BTreeMap::new();
    for item in items {
        *demand.entry(item.product_id.clone()).or_insert(0) += item.quantity;
    }
    demand
}

/// Warnings for one product after consuming from `before`
pub fn warnings_for(
    product_id: &str,
    before: &StockLevel,
    consumed: i32,
    low_stock_threshold: i32,
    today: NaiveDate,
    delivery_date: NaiveDate,
) -> Vec<StockWarning> {
    let mut warnings = Vec::new();
    let remaining = before.quantity - consumed;

    if remaining <= low_stock_threshold {
        warnings.push(StockWarning {
            product_id: product_id.to_string(),
            kind: StockWarningKind::LowStock { remaining },
        });
    }

    if let Some(expires_on) = before.expires_on {
        if expires_on < today {
            warnings.push(StockWarning {
                product_id: product_id.to_string(),
                kind: StockWarningKind::Expired { expires_on },
            });
        } else if expires_on < delivery_date {
            warnings.push(StockWarning {
                product_id: product_id.to_string(),
                kind: StockWarningKind::ExpiresBeforeDelivery {
                    expires_on,
                    delivery_date,
                },
            });
        }
    }

    warnings
}

/// Stock movements and warnings for consuming `items`
///
/// Fails on the first product (by id) whose stock cannot cover the demand;
/// nothing is written either way.
pub fn plan_consumption(
    ctx: &CommandContext<'_>,
    items: &[PackingItem],
    low_stock_threshold: i32,
    today: NaiveDate,
    delivery_date: NaiveDate,
) -> Result<(Vec<StockMovement>, Vec<StockWarning>), PackingError> {
    let mut movements = Vec::new();
    let mut warnings = Vec::new();

    for (product_id, requested) in aggregate_demand(items) {
        let level = ctx
            .load_stock(&product_id)?
            .unwrap_or_else(|| StockLevel::new(0));
        if level.quantity < requested {
            return Err(PackingError::InsufficientStock {
                product_id,
                requested,
                available: level.quantity,
            });
        }
        warnings.extend(warnings_for(
            &product_id,
            &level,
            requested,
            low_stock_threshold,
            today,
            delivery_date,
        ));
        movements.push(StockMovement {
            product_id,
            quantity: requested,
        });
    }

    Ok((movements, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, product: &str, quantity: i32) -> PackingItem {
        PackingItem {
            item_id: id.to_string(),
            product_id: product.to_string(),
            name: id.to_string(),
            quantity,
            packed: true,
            packed_by: None,
            packed_at: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_demand_is_summed_per_product() {
        let demand = aggregate_demand(&[item("a", "p1", 2), item("b", "p2", 1), item("c", "p1", 3)]);
        assert_eq!(demand.get("p1"), Some(&5));
        assert_eq!(demand.get("p2"), Some(&1));
    }

    #[test]
    fn test_low_stock_warning_at_threshold() {
        let warnings = warnings_for("p1", &StockLevel::new(5), 3, 2, day(18), day(19));
        assert_eq!(
            warnings,
            vec![StockWarning {
                product_id: "p1".into(),
                kind: StockWarningKind::LowStock { remaining: 2 },
            }]
        );
        assert!(warnings_for("p1", &StockLevel::new(10), 3, 2, day(18), day(19)).is_empty());
    }

    #[test]
    fn test_expiry_warnings() {
        let expired = StockLevel::new(10).with_expiry(day(17));
        let warnings = warnings_for("p1", &expired, 1, 0, day(18), day(20));
        assert!(matches!(warnings[0].kind, StockWarningKind::Expired { .. }));

        let soon = StockLevel::new(10).with_expiry(day(19));
        let warnings = warnings_for("p1", &soon, 1, 0, day(18), day(20));
        assert!(matches!(
            warnings[0].kind,
            StockWarningKind::ExpiresBeforeDelivery { .. }
        ));

        let fine = StockLevel::new(10).with_expiry(day(20));
        assert!(warnings_for("p1", &fine, 1, 0, day(18), day(20)).is_empty());
    }
}
