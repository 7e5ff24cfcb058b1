//! Keeping stored demand records in step with restock entries.

use std::collections::BTreeSet;

use vendops_analytics::{DemandRecord, derive_demand};
use vendops_core::{MachineId, ProductId, VisitId};

use crate::error::ServiceResult;
use crate::store::Tx;

/// `(machine, product)` pairs with entries in `visit`.
pub(crate) fn pairs_in_visit(tx: &Tx, visit: VisitId) -> BTreeSet<(MachineId, ProductId)> {
    let tables = tx.tables();
    tables
        .entries
        .values()
        .filter_map(|e| {
            let restock = tables.restocks.get(&e.machine_restock_id)?;
            (restock.visit_id == visit).then_some((restock.machine_id, e.product_id))
        })
        .collect()
}

/// Replace the demand records of `pairs` with ones derived from the current entries.
pub(crate) fn rebuild(tx: &mut Tx, pairs: &BTreeSet<(MachineId, ProductId)>) -> ServiceResult<usize> {
    if pairs.is_empty() {
        return Ok(0);
    }
    tx.remove_where::<DemandRecord, _>(|d| pairs.contains(&(d.machine_id, d.product_id)));
    let only: Vec<(MachineId, ProductId)> = pairs.iter().copied().collect();
    let records = derive_demand(&tx.tables().snapshot(), Some(&only), tx.now());
    let count = records.len();
    for record in records {
        tx.put(record)?;
    }
    tracing::debug!(pairs = pairs.len(), records = count, "demand records rebuilt");
    Ok(count)
}
