//! Suppliers and wholesale purchases.
//!
//! A purchase adds its quantity to the product's warehouse stock and keeps
//! one linked cost record in the product cost ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vendops_core::{DomainError, Money, ProductCostId, ProductId, PurchaseId, SupplierId};
use vendops_products::{Product, ProductCost};
use vendops_purchasing::{
    PurchaseDraft, PurchasePatch, Supplier, SupplierDraft, SupplierPatch, WholesalePurchase,
    ensure_supplier_name_unique,
};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{Tables, Tx};

use super::{Services, adjust_inventory, ensure_ref};

/// List shape of a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierSummary {
    pub id: SupplierId,
    pub name: String,
    pub is_active: bool,
    pub purchase_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierDetail {
    #[serde(flatten)]
    pub supplier: Supplier,
    pub purchase_count: usize,
    pub total_spent: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseView {
    #[serde(flatten)]
    pub purchase: WholesalePurchase,
    pub product_name: String,
    pub supplier_name: Option<String>,
    pub unit_cost: Money,
    pub cost_per_unit: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierFilter {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseFilter {
    pub product: Option<ProductId>,
    pub supplier: Option<SupplierId>,
}

fn supplier_purchases(tables: &Tables, id: SupplierId) -> impl Iterator<Item = &WholesalePurchase> {
    tables
        .purchases
        .values()
        .filter(move |p| p.supplier_id == Some(id))
}

fn summary(tables: &Tables, s: &Supplier) -> SupplierSummary {
    SupplierSummary {
        id: s.id,
        name: s.name.clone(),
        is_active: s.is_active,
        purchase_count: supplier_purchases(tables, s.id).count(),
        created_at: s.created_at,
    }
}

fn detail(tables: &Tables, s: &Supplier) -> SupplierDetail {
    SupplierDetail {
        purchase_count: supplier_purchases(tables, s.id).count(),
        total_spent: supplier_purchases(tables, s.id).map(|p| p.total_cost).sum(),
        supplier: s.clone(),
    }
}

fn purchase_view(tables: &Tables, p: &WholesalePurchase) -> PurchaseView {
    PurchaseView {
        product_name: tables
            .products
            .get(&p.product_id)
            .map(|x| x.name.clone())
            .unwrap_or_default(),
        supplier_name: p
            .supplier_id
            .and_then(|s| tables.suppliers.get(&s))
            .map(|s| s.name.clone()),
        unit_cost: p.unit_cost(),
        cost_per_unit: p.unit_cost(),
        purchase: p.clone(),
    }
}

fn check_purchase_refs(tx: &Tx, p: &WholesalePurchase) -> ServiceResult<()> {
    ensure_ref::<Product>(tx, "product", p.product_id)?;
    if let Some(supplier) = p.supplier_id {
        ensure_ref::<Supplier>(tx, "supplier", supplier)?;
    }
    Ok(())
}

/// Rewrite (or create) the cost record linked to `purchase`.
fn sync_cost_record(tx: &mut Tx, purchase: &WholesalePurchase) -> ServiceResult<()> {
    let existing = tx
        .tables()
        .costs
        .values()
        .find(|c| c.purchase_id == Some(purchase.id))
        .map(|c| (c.id, c.created_at));
    let record = match existing {
        Some((id, created_at)) => purchase.cost_record(id, created_at),
        None => purchase.cost_record(ProductCostId::new(), tx.now()),
    };
    tx.put(record)
}

impl Services {
    // ---- suppliers

    pub async fn create_supplier(&self, draft: SupplierDraft) -> ServiceResult<SupplierDetail> {
        self.store
            .write(|tx| {
                let supplier = draft.into_supplier(SupplierId::new(), tx.now())?;
                ensure_supplier_name_unique(&supplier.name, None, tx.tables().suppliers.values())?;
                tx.put(supplier.clone())?;
                Ok(detail(tx.tables(), &supplier))
            })
            .await
    }

    /// Ordered by name.
    pub async fn list_suppliers(&self, filter: &SupplierFilter) -> Vec<SupplierSummary> {
        let tables = self.store.read().await;
        let mut suppliers: Vec<&Supplier> = tables
            .suppliers
            .values()
            .filter(|s| filter.is_active.is_none_or(|a| a == s.is_active))
            .filter(|s| filter.search.as_deref().is_none_or(|t| s.matches_search(t)))
            .collect();
        suppliers.sort_by_key(|s| s.name.to_lowercase());
        suppliers.into_iter().map(|s| summary(&tables, s)).collect()
    }

    pub async fn active_suppliers(&self) -> Vec<SupplierSummary> {
        self.list_suppliers(&SupplierFilter {
            is_active: Some(true),
            search: None,
        })
        .await
    }

    pub async fn get_supplier(&self, id: SupplierId) -> ServiceResult<SupplierDetail> {
        let tables = self.store.read().await;
        let supplier = tables
            .get::<Supplier>(id)
            .ok_or(ServiceError::NotFound("supplier"))?;
        Ok(detail(&tables, supplier))
    }

    pub async fn update_supplier(&self, id: SupplierId, patch: SupplierPatch) -> ServiceResult<SupplierDetail> {
        self.store
            .write(|tx| {
                let mut supplier = tx.require::<Supplier>(id)?.clone();
                supplier.apply(patch, tx.now())?;
                ensure_supplier_name_unique(&supplier.name, Some(id), tx.tables().suppliers.values())?;
                tx.put(supplier.clone())?;
                Ok(detail(tx.tables(), &supplier))
            })
            .await
    }

    /// Refused while the supplier still has purchases.
    pub async fn delete_supplier(&self, id: SupplierId) -> ServiceResult<()> {
        self.store
            .write(|tx| {
                tx.require::<Supplier>(id)?;
                if supplier_purchases(tx.tables(), id).next().is_some() {
                    return Err(DomainError::validation(
                        "Cannot delete supplier with existing purchases. Consider deactivating the supplier instead.",
                    )
                    .into());
                }
                tx.remove::<Supplier>(id);
                Ok(())
            })
            .await
    }

    pub async fn toggle_supplier_active(&self, id: SupplierId) -> ServiceResult<SupplierDetail> {
        let detail = self
            .store
            .write(|tx| {
                let now = tx.now();
                let supplier = tx.update::<Supplier, _>(id, |s| {
                    s.toggle_active(now);
                    Ok(())
                })?;
                Ok(detail(tx.tables(), &supplier))
            })
            .await?;
        tracing::info!(supplier = %id, active = detail.supplier.is_active, "supplier toggled");
        Ok(detail)
    }

    // ---- purchases

    pub async fn create_purchase(&self, draft: PurchaseDraft) -> ServiceResult<PurchaseView> {
        let view = self
            .mutate(|tx| {
                let mut purchase = draft.into_purchase(PurchaseId::new(), tx.now())?;
                check_purchase_refs(tx, &purchase)?;
                let added = purchase.stock_added();
                adjust_inventory(tx, added.product_id, added.delta)?;
                purchase.inventory_updated = true;
                sync_cost_record(tx, &purchase)?;
                tx.put(purchase.clone())?;
                Ok(purchase_view(tx.tables(), &purchase))
            })
            .await?;
        tracing::info!(
            purchase = %view.purchase.id,
            product = %view.purchase.product_id,
            quantity = view.purchase.quantity,
            "purchase recorded"
        );
        Ok(view)
    }

    /// Newest first.
    pub async fn list_purchases(&self, filter: &PurchaseFilter) -> Vec<PurchaseView> {
        let tables = self.store.read().await;
        let mut purchases: Vec<&WholesalePurchase> = tables
            .purchases
            .values()
            .filter(|p| filter.product.is_none_or(|x| x == p.product_id))
            .filter(|p| filter.supplier.is_none_or(|s| Some(s) == p.supplier_id))
            .collect();
        purchases.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        purchases
            .into_iter()
            .map(|p| purchase_view(&tables, p))
            .collect()
    }

    pub async fn get_purchase(&self, id: PurchaseId) -> ServiceResult<PurchaseView> {
        let tables = self.store.read().await;
        let purchase = tables
            .get::<WholesalePurchase>(id)
            .ok_or(ServiceError::NotFound("purchase"))?;
        Ok(purchase_view(&tables, purchase))
    }

    /// Moves warehouse stock by the quantity difference and rewrites the cost record.
    pub async fn update_purchase(&self, id: PurchaseId, patch: PurchasePatch) -> ServiceResult<PurchaseView> {
        self.mutate(|tx| {
            let old = tx.require::<WholesalePurchase>(id)?.clone();
            let mut updated = old.clone();
            updated.apply(patch, tx.now())?;
            check_purchase_refs(tx, &updated)?;
            for change in old.inventory_changes(&updated) {
                adjust_inventory(tx, change.product_id, change.delta)?;
            }
            updated.inventory_updated = true;
            sync_cost_record(tx, &updated)?;
            tx.put(updated.clone())?;
            Ok(purchase_view(tx.tables(), &updated))
        })
        .await
    }

    /// Takes the quantity back out of the warehouse and drops the cost record.
    pub async fn delete_purchase(&self, id: PurchaseId) -> ServiceResult<()> {
        self.mutate(|tx| {
            let purchase = tx.require::<WholesalePurchase>(id)?.clone();
            if purchase.inventory_updated {
                let removed = purchase.stock_removed();
                adjust_inventory(tx, removed.product_id, removed.delta)?;
            }
            tx.remove_where::<ProductCost, _>(|c| c.purchase_id == Some(id));
            tx.remove::<WholesalePurchase>(id);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use vendops_products::{ProductDraft, ProductType};

    fn services() -> Services {
        Services::in_memory(AppConfig::in_memory())
    }

    async fn product(svc: &Services, name: &str) -> ProductId {
        svc.create_product(ProductDraft::new(name, ProductType::Soda))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn purchase_lifecycle_moves_inventory_and_costs() {
        let svc = services();
        let cola = product(&svc, "Cola").await;
        let chips = product(&svc, "Chips").await;

        let mut draft = PurchaseDraft::with_total(cola, 3, "10.00".parse().unwrap());
        draft.total_cost = None;
        draft.cost_per_unit = Some("2.50".parse().unwrap());
        let view = svc.create_purchase(draft).await.unwrap();
        assert_eq!(view.purchase.total_cost, "7.50".parse().unwrap());
        assert_eq!(view.unit_cost, "2.50".parse().unwrap());
        assert!(view.purchase.inventory_updated);
        assert_eq!(svc.get_product(cola).await.unwrap().inventory_quantity, 3);

        let costs = svc.latest_costs().await;
        let cola_cost = costs.iter().find(|c| c.product_id == cola).unwrap();
        assert_eq!(cola_cost.latest_unit_cost, "2.50".parse().unwrap());

        svc.update_purchase(
            view.purchase.id,
            PurchasePatch {
                product: Some(chips),
                quantity: Some(5),
                total_cost: Some("10.00".parse().unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(svc.get_product(cola).await.unwrap().inventory_quantity, 0);
        assert_eq!(svc.get_product(chips).await.unwrap().inventory_quantity, 5);
        let store = svc.store().read().await;
        assert_eq!(store.costs.len(), 1);
        let cost = store.costs.values().next().unwrap();
        assert_eq!(cost.product_id, chips);
        assert_eq!(cost.unit_cost, "2.00".parse().unwrap());
        drop(store);

        svc.delete_purchase(view.purchase.id).await.unwrap();
        assert_eq!(svc.get_product(chips).await.unwrap().inventory_quantity, 0);
        assert!(svc.store().read().await.costs.is_empty());
    }

    #[tokio::test]
    async fn purchase_without_cost_is_a_field_error() {
        let svc = services();
        let cola = product(&svc, "Cola").await;
        let mut draft = PurchaseDraft::with_total(cola, 3, Money::ZERO);
        draft.total_cost = None;
        let err = svc.create_purchase(draft).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Field { field: "cost_per_unit", .. })
        ));
        assert_eq!(svc.get_product(cola).await.unwrap().inventory_quantity, 0);
    }

    #[tokio::test]
    async fn oversized_purchases_are_errors_not_panics() {
        let svc = services();
        let cola = product(&svc, "Cola").await;

        let huge = PurchaseDraft::with_total(cola, i64::MAX, "1.00".parse().unwrap());
        let err = svc.create_purchase(huge).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Field { field: "quantity", .. })
        ));

        let mut per_unit = PurchaseDraft::with_total(cola, 1_000, Money::ZERO);
        per_unit.total_cost = None;
        per_unit.cost_per_unit = Some("99999999.99".parse().unwrap());
        let err = svc.create_purchase(per_unit).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Field { field: "total_cost", .. })
        ));
        assert_eq!(svc.get_product(cola).await.unwrap().inventory_quantity, 0);

        // Warehouse stock already at the edge of the integer range.
        svc.store()
            .write(|tx| {
                tx.update::<Product, _>(cola, |p| {
                    p.inventory_quantity = i64::MAX - 1;
                    Ok(())
                })
                .map(|_| ())
            })
            .await
            .unwrap();
        let err = svc
            .create_purchase(PurchaseDraft::with_total(cola, 5, "1.00".parse().unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvariantViolation(_))));
        assert_eq!(svc.get_product(cola).await.unwrap().inventory_quantity, i64::MAX - 1);
        assert!(svc.store().read().await.purchases.is_empty());
    }

    #[tokio::test]
    async fn supplier_rules() {
        let svc = services();
        let acme = svc.create_supplier(SupplierDraft::named("Acme")).await.unwrap();
        let dup = svc.create_supplier(SupplierDraft::named("ACME")).await.unwrap_err();
        assert!(matches!(dup, ServiceError::Domain(DomainError::Field { field: "name", .. })));

        let cola = product(&svc, "Cola").await;
        let mut draft = PurchaseDraft::with_total(cola, 2, "3.00".parse().unwrap());
        draft.supplier = Some(acme.supplier.id);
        svc.create_purchase(draft).await.unwrap();

        let detail = svc.get_supplier(acme.supplier.id).await.unwrap();
        assert_eq!(detail.purchase_count, 1);
        assert_eq!(detail.total_spent, "3.00".parse().unwrap());

        let refused = svc.delete_supplier(acme.supplier.id).await.unwrap_err();
        assert!(matches!(refused, ServiceError::Domain(DomainError::Validation(_))));

        let toggled = svc.toggle_supplier_active(acme.supplier.id).await.unwrap();
        assert!(!toggled.supplier.is_active);
        assert!(svc.active_suppliers().await.is_empty());
        let inactive = svc
            .list_suppliers(&SupplierFilter {
                is_active: Some(false),
                search: Some("ac".into()),
            })
            .await;
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].purchase_count, 1);
    }
}
