//! Historical unit-cost ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{
    DomainError, DomainResult, Entity, MAX_QUANTITY, Money, ProductCostId, ProductId, PurchaseId,
};

/// One cost observation for a product (usually written by a wholesale purchase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCost {
    pub id: ProductCostId,
    pub product_id: ProductId,
    pub purchase_id: Option<PurchaseId>,
    pub date: DateTime<Utc>,
    pub quantity: i64,
    pub unit_cost: Money,
    pub total_cost: Money,
    pub created_at: DateTime<Utc>,
}

impl Entity for ProductCost {
    type Id = ProductCostId;

    fn id(&self) -> ProductCostId {
        self.id
    }
}

/// Input for recording a cost observation by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCostDraft {
    pub product: ProductId,
    #[serde(default)]
    pub purchase: Option<PurchaseId>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub quantity: i64,
    pub unit_cost: Money,
    #[serde(default)]
    pub total_cost: Option<Money>,
}

impl ProductCostDraft {
    pub fn into_cost(self, id: ProductCostId, now: DateTime<Utc>) -> DomainResult<ProductCost> {
        if self.quantity <= 0 {
            return Err(DomainError::field("quantity", "Quantity must be greater than 0"));
        }
        if self.quantity > MAX_QUANTITY {
            return Err(DomainError::field(
                "quantity",
                format!("Quantity must be at most {MAX_QUANTITY}"),
            ));
        }
        if self.unit_cost.is_negative() {
            return Err(DomainError::field("unit_cost", "Unit cost cannot be negative"));
        }
        let total_cost = match self.total_cost {
            Some(total) => total,
            None => self.unit_cost.checked_times(self.quantity).ok_or_else(|| {
                DomainError::field("total_cost", "Ensure that there are no more than 10 digits in total.")
            })?,
        };
        if total_cost.is_negative() {
            return Err(DomainError::field("total_cost", "Total cost cannot be negative"));
        }
        Ok(ProductCost {
            id,
            product_id: self.product,
            purchase_id: self.purchase,
            date: self.date.unwrap_or(now),
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            total_cost,
            created_at: now,
        })
    }
}

/// Weighted average unit cost: Σ total / Σ quantity, rounded to cents.
///
/// Input is `(quantity, total_cost)` per purchase. Zero when nothing was bought.
pub fn average_cost<I>(purchases: I) -> Money
where
    I: IntoIterator<Item = (i64, Money)>,
{
    let (qty, total) = purchases
        .into_iter()
        .fold((0i64, Money::ZERO), |(q, t), (pq, pt)| (q + pq, t + pt));
    Money::ratio_rounded(total, qty)
}

/// Most recent cost record by date (ties broken by creation order).
pub fn latest_cost<'a, I>(costs: I) -> Option<&'a ProductCost>
where
    I: IntoIterator<Item = &'a ProductCost>,
{
    costs
        .into_iter()
        .max_by(|a, b| (a.date, a.created_at, a.id).cmp(&(b.date, b.created_at, b.id)))
}

pub fn latest_unit_cost<'a, I>(costs: I) -> Money
where
    I: IntoIterator<Item = &'a ProductCost>,
{
    latest_cost(costs).map(|c| c.unit_cost).unwrap_or(Money::ZERO)
}

/// Unit cost in effect at `at`.
///
/// Most recent record dated at or before `at`; if none precedes it, the
/// earliest record; zero without records.
pub fn historical_unit_cost<'a, I>(costs: I, at: DateTime<Utc>) -> Money
where
    I: IntoIterator<Item = &'a ProductCost>,
{
    let mut before: Option<&ProductCost> = None;
    let mut earliest: Option<&ProductCost> = None;
    for cost in costs {
        let key = (cost.date, cost.created_at, cost.id);
        if cost.date <= at && before.is_none_or(|b| (b.date, b.created_at, b.id) < key) {
            before = Some(cost);
        }
        if earliest.is_none_or(|e| (e.date, e.created_at, e.id) > key) {
            earliest = Some(cost);
        }
    }
    before
        .or(earliest)
        .map(|c| c.unit_cost)
        .unwrap_or(Money::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn cost_at(product: ProductId, day: u32, unit: &str) -> ProductCost {
        let date = Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap();
        ProductCostDraft {
            product,
            purchase: None,
            date: Some(date),
            quantity: 10,
            unit_cost: money(unit),
            total_cost: None,
        }
        .into_cost(ProductCostId::new(), date)
        .unwrap()
    }

    #[test]
    fn draft_defaults_total_cost() {
        let c = cost_at(ProductId::new(), 1, "0.45");
        assert_eq!(c.total_cost, money("4.50"));
    }

    #[test]
    fn draft_rejects_non_positive_quantity() {
        let err = ProductCostDraft {
            product: ProductId::new(),
            purchase: None,
            date: None,
            quantity: 0,
            unit_cost: money("1.00"),
            total_cost: None,
        }
        .into_cost(ProductCostId::new(), Utc::now())
        .unwrap_err();
        assert!(matches!(err, DomainError::Field { field: "quantity", .. }));
    }

    #[test]
    fn draft_bounds_quantity_and_derived_total() {
        let draft = |quantity, unit: &str| ProductCostDraft {
            product: ProductId::new(),
            purchase: None,
            date: None,
            quantity,
            unit_cost: money(unit),
            total_cost: None,
        };
        let err = draft(MAX_QUANTITY + 1, "0.01")
            .into_cost(ProductCostId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Field { field: "quantity", .. }));

        let err = draft(1_000, "50000000.00")
            .into_cost(ProductCostId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Field { field: "total_cost", .. }));
    }

    #[test]
    fn average_cost_is_weighted() {
        let avg = average_cost([(24, money("12.00")), (12, money("9.00"))]);
        // 21.00 / 36 = 0.5833..
        assert_eq!(avg, money("0.58"));
        assert_eq!(average_cost(std::iter::empty()), Money::ZERO);
    }

    #[test]
    fn latest_and_historical_costs() {
        let p = ProductId::new();
        let costs = vec![cost_at(p, 10, "0.50"), cost_at(p, 1, "0.40"), cost_at(p, 20, "0.60")];

        assert_eq!(latest_unit_cost(&costs), money("0.60"));

        let mid = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(historical_unit_cost(&costs, mid), money("0.50"));

        let early = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(historical_unit_cost(&costs, early), money("0.40"));

        let exact = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        assert_eq!(historical_unit_cost(&costs, exact), money("0.60"));

        let none: Vec<ProductCost> = Vec::new();
        assert_eq!(historical_unit_cost(&none, mid), Money::ZERO);
        assert_eq!(latest_unit_cost(&none), Money::ZERO);
    }

    proptest! {
        #[test]
        fn historical_cost_never_from_the_future_when_history_exists(offset in 0i64..40) {
            let p = ProductId::new();
            let costs = vec![cost_at(p, 1, "0.40"), cost_at(p, 10, "0.50"), cost_at(p, 20, "0.60")];
            let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::days(offset);
            let unit = historical_unit_cost(&costs, at);
            let expected = costs
                .iter()
                .filter(|c| c.date <= at)
                .max_by_key(|c| c.date)
                .map(|c| c.unit_cost)
                .unwrap_or(money("0.40"));
            prop_assert_eq!(unit, expected);
        }
    }
}
