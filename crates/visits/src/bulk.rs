//! Bulk visit payload: a visit with all its machine restocks and entries.
//!
//! ```json
//! {
//!   "visit": { "location": "…", "visit_date": "2025-01-15T10:30:00Z", "notes": "", "user": null },
//!   "machine_restocks": [
//!     { "machine": "…", "notes": "", "restock_entries": [
//!         { "product": "…", "stock_before": 5, "discarded": 1, "restocked": 10 }
//!     ] }
//!   ]
//! }
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{DomainError, DomainResult, LocationId, MachineId, ProductId, UserId};

use crate::restock::EntryCounts;
use crate::visit::{VisitDraft, VisitPatch};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkVisitHeader {
    pub location: Option<LocationId>,
    pub visit_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub user: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRestockEntry {
    pub product: ProductId,
    #[serde(flatten)]
    pub counts: EntryCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMachineRestock {
    pub machine: MachineId,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub restock_entries: Vec<BulkRestockEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkVisitPayload {
    pub visit: BulkVisitHeader,
    pub machine_restocks: Vec<BulkMachineRestock>,
}

impl BulkVisitPayload {
    /// Visit to create. The location is mandatory.
    pub fn visit_draft(&self) -> DomainResult<VisitDraft> {
        let location = self
            .visit
            .location
            .ok_or_else(|| DomainError::validation("Location is required"))?;
        Ok(VisitDraft {
            location,
            visit_date: self.visit.visit_date,
            notes: self.visit.notes.clone(),
            user: self.visit.user,
        })
    }

    /// Partial visit update (bulk update keeps omitted fields).
    pub fn visit_patch(&self) -> VisitPatch {
        VisitPatch {
            location: self.visit.location,
            visit_date: self.visit.visit_date,
            notes: self.visit.notes.clone(),
            user: self.visit.user,
        }
    }

    /// Machine restocks that carry at least one entry.
    pub fn effective_restocks(&self) -> impl Iterator<Item = &BulkMachineRestock> {
        self.machine_restocks
            .iter()
            .filter(|r| !r.restock_entries.is_empty())
    }

    /// Shape checks that need no store access: each machine once, entry counts valid.
    pub fn validate_restocks(&self) -> DomainResult<()> {
        let mut seen = BTreeSet::new();
        for restock in self.effective_restocks() {
            if !seen.insert(restock.machine) {
                return Err(DomainError::validation(format!(
                    "Machine {} appears more than once in this visit",
                    restock.machine
                )));
            }
            for entry in &restock.restock_entries {
                entry.counts.validate()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> BulkVisitPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn location_is_required() {
        let p = payload(r#"{"visit": {}, "machine_restocks": []}"#);
        assert_eq!(
            p.visit_draft().unwrap_err(),
            DomainError::validation("Location is required")
        );
    }

    #[test]
    fn empty_restocks_are_skipped() {
        let m1 = MachineId::new();
        let m2 = MachineId::new();
        let p = ProductId::new();
        let json = format!(
            r#"{{"visit": {{"location": "{}"}}, "machine_restocks": [
                {{"machine": "{m1}", "restock_entries": []}},
                {{"machine": "{m2}", "restock_entries": [
                    {{"product": "{p}", "stock_before": 5, "restocked": 10}}
                ]}}
            ]}}"#,
            LocationId::new()
        );
        let payload = payload(&json);
        assert!(payload.validate_restocks().is_ok());
        let kept: Vec<_> = payload.effective_restocks().map(|r| r.machine).collect();
        assert_eq!(kept, vec![m2]);
        assert_eq!(payload.machine_restocks[1].restock_entries[0].counts.discarded, 0);
    }

    #[test]
    fn duplicate_machine_rejected() {
        let m = MachineId::new();
        let entry = BulkRestockEntry {
            product: ProductId::new(),
            counts: EntryCounts::new(1, 0, 1).unwrap(),
        };
        let restock = BulkMachineRestock {
            machine: m,
            notes: None,
            restock_entries: vec![entry],
        };
        let p = BulkVisitPayload {
            visit: BulkVisitHeader::default(),
            machine_restocks: vec![restock.clone(), restock],
        };
        assert!(matches!(p.validate_restocks(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn invalid_counts_rejected() {
        let p = BulkVisitPayload {
            visit: BulkVisitHeader::default(),
            machine_restocks: vec![BulkMachineRestock {
                machine: MachineId::new(),
                notes: None,
                restock_entries: vec![BulkRestockEntry {
                    product: ProductId::new(),
                    counts: EntryCounts {
                        stock_before: 1,
                        discarded: 2,
                        restocked: 0,
                    },
                }],
            }],
        };
        assert!(p.validate_restocks().is_err());
    }
}
