use chrono::{DateTime, Utc};
use serde::Serialize;

use vendops_core::{Money, ProductId};
use vendops_products::latest_cost;

use crate::snapshot::Snapshot;

/// Latest known unit cost of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestCost {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_type: String,
    pub latest_unit_cost: Money,
    pub latest_date: Option<DateTime<Utc>>,
    pub inventory_quantity: i64,
}

/// One row per catalog product, ordered by name.
pub fn latest_costs(snapshot: &Snapshot<'_>) -> Vec<LatestCost> {
    let mut rows: Vec<LatestCost> = snapshot
        .products
        .values()
        .map(|product| {
            let latest = latest_cost(snapshot.costs.values().filter(|c| c.product_id == product.id));
            LatestCost {
                product_id: product.id,
                product_name: product.name.clone(),
                unit_type: product.unit_type.clone(),
                latest_unit_cost: latest.map(|c| c.unit_cost).unwrap_or(Money::ZERO),
                latest_date: latest.map(|c| c.date),
                inventory_quantity: product.inventory_quantity,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.product_name.cmp(&b.product_name));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;
    use chrono::TimeZone;

    #[test]
    fn latest_or_zero() {
        let mut fx = Fixture::new();
        let cola = fx.product("Cola");
        fx.product("Chips");
        let d1 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        fx.cost(cola, d2, "0.55");
        fx.cost(cola, d1, "0.45");

        let rows = latest_costs(&fx.snapshot());
        assert_eq!(rows[0].product_name, "Chips");
        assert_eq!(rows[0].latest_unit_cost, Money::ZERO);
        assert_eq!(rows[0].latest_date, None);
        assert_eq!(rows[1].latest_unit_cost, "0.55".parse().unwrap());
        assert_eq!(rows[1].latest_date, Some(d2));
    }
}
