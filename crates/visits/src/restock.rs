//! Machine restocks and the per-product restock entries recorded on a visit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{
    DomainError, DomainResult, Entity, MAX_QUANTITY, MachineId, MachineRestockId, ProductId, RestockEntryId,
    VisitId,
};

use crate::visit::normalize_notes;

/// The service of one machine during one visit. `(visit, machine)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRestock {
    pub id: MachineRestockId,
    pub visit_id: VisitId,
    pub machine_id: MachineId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for MachineRestock {
    type Id = MachineRestockId;

    fn id(&self) -> MachineRestockId {
        self.id
    }
}

impl MachineRestock {
    pub fn new(visit_id: VisitId, machine_id: MachineId, notes: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: MachineRestockId::new(),
            visit_id,
            machine_id,
            notes: normalize_notes(notes),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: MachineRestockPatch, now: DateTime<Utc>) {
        if let Some(visit) = patch.visit {
            self.visit_id = visit;
        }
        if let Some(machine) = patch.machine {
            self.machine_id = machine;
        }
        if let Some(notes) = patch.notes {
            self.notes = normalize_notes(Some(notes));
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRestockDraft {
    pub visit: VisitId,
    pub machine: MachineId,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineRestockPatch {
    pub visit: Option<VisitId>,
    pub machine: Option<MachineId>,
    pub notes: Option<String>,
}

impl From<MachineRestockDraft> for MachineRestockPatch {
    fn from(d: MachineRestockDraft) -> Self {
        Self {
            visit: Some(d.visit),
            machine: Some(d.machine),
            notes: Some(d.notes.unwrap_or_default()),
        }
    }
}

/// What was counted for one product: stock found, discarded and loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCounts {
    pub stock_before: i64,
    #[serde(default)]
    pub discarded: i64,
    pub restocked: i64,
}

impl EntryCounts {
    pub fn new(stock_before: i64, discarded: i64, restocked: i64) -> DomainResult<Self> {
        let counts = Self {
            stock_before,
            discarded,
            restocked,
        };
        counts.validate()?;
        Ok(counts)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.stock_before < 0 {
            return Err(DomainError::field("stock_before", "Stock before cannot be negative"));
        }
        if self.discarded < 0 {
            return Err(DomainError::field("discarded", "Discarded cannot be negative"));
        }
        if self.restocked < 0 {
            return Err(DomainError::field("restocked", "Restocked cannot be negative"));
        }
        for (field, value) in [
            ("stock_before", self.stock_before),
            ("discarded", self.discarded),
            ("restocked", self.restocked),
        ] {
            if value > MAX_QUANTITY {
                return Err(DomainError::field(field, format!("{field} must be at most {MAX_QUANTITY}")));
            }
        }
        if self.discarded > self.stock_before {
            return Err(DomainError::field(
                "discarded",
                "Discarded cannot exceed stock before",
            ));
        }
        Ok(())
    }

    /// Units left in the machine after the visit.
    pub fn stock_after(&self) -> i64 {
        self.stock_before - self.discarded + self.restocked
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockEntry {
    pub id: RestockEntryId,
    pub machine_restock_id: MachineRestockId,
    pub product_id: ProductId,
    pub stock_before: i64,
    pub discarded: i64,
    pub restocked: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for RestockEntry {
    type Id = RestockEntryId;

    fn id(&self) -> RestockEntryId {
        self.id
    }
}

impl RestockEntry {
    pub fn new(
        machine_restock_id: MachineRestockId,
        product_id: ProductId,
        counts: EntryCounts,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        counts.validate()?;
        Ok(Self {
            id: RestockEntryId::new(),
            machine_restock_id,
            product_id,
            stock_before: counts.stock_before,
            discarded: counts.discarded,
            restocked: counts.restocked,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn counts(&self) -> EntryCounts {
        EntryCounts {
            stock_before: self.stock_before,
            discarded: self.discarded,
            restocked: self.restocked,
        }
    }

    pub fn stock_after(&self) -> i64 {
        self.counts().stock_after()
    }

    pub fn apply(&mut self, patch: RestockEntryPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(restock) = patch.machine_restock {
            next.machine_restock_id = restock;
        }
        if let Some(product) = patch.product {
            next.product_id = product;
        }
        if let Some(v) = patch.stock_before {
            next.stock_before = v;
        }
        if let Some(v) = patch.discarded {
            next.discarded = v;
        }
        if let Some(v) = patch.restocked {
            next.restocked = v;
        }
        next.counts().validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockEntryDraft {
    pub machine_restock: MachineRestockId,
    pub product: ProductId,
    #[serde(flatten)]
    pub counts: EntryCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestockEntryPatch {
    pub machine_restock: Option<MachineRestockId>,
    pub product: Option<ProductId>,
    pub stock_before: Option<i64>,
    pub discarded: Option<i64>,
    pub restocked: Option<i64>,
}

impl From<RestockEntryDraft> for RestockEntryPatch {
    fn from(d: RestockEntryDraft) -> Self {
        Self {
            machine_restock: Some(d.machine_restock),
            product: Some(d.product),
            stock_before: Some(d.counts.stock_before),
            discarded: Some(d.counts.discarded),
            restocked: Some(d.counts.restocked),
        }
    }
}
