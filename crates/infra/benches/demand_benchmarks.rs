use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use vendops_analytics::derive_demand;
use vendops_core::{LocationId, MachineId, ProductId};
use vendops_fleet::{LocationDraft, MachineDraft, MachineType};
use vendops_infra::{AppConfig, Services};
use vendops_products::{ProductDraft, ProductType};
use vendops_purchasing::PurchaseDraft;
use vendops_visits::{
    BulkMachineRestock, BulkRestockEntry, BulkVisitHeader, BulkVisitPayload, EntryCounts,
};

struct Seeded {
    svc: Services,
    location: LocationId,
    machines: Vec<MachineId>,
    products: Vec<ProductId>,
}

async fn seed(machines: usize, products: usize) -> Seeded {
    let svc = Services::in_memory(AppConfig::in_memory());
    let location = svc
        .create_location(LocationDraft::new("Bench", ""))
        .await
        .unwrap()
        .id;
    let mut machine_ids = Vec::with_capacity(machines);
    for i in 0..machines {
        let m = svc
            .create_machine(MachineDraft {
                name: format!("M{i}"),
                location,
                machine_type: MachineType::Combo,
                model: None,
            })
            .await
            .unwrap();
        machine_ids.push(m.machine.id);
    }
    let mut product_ids = Vec::with_capacity(products);
    for i in 0..products {
        let p = svc
            .create_product(ProductDraft::new(format!("P{i}"), ProductType::Snack))
            .await
            .unwrap();
        svc.create_purchase(PurchaseDraft::with_total(p.id, 1_000_000_000, "1000000.00".parse().unwrap()))
            .await
            .unwrap();
        product_ids.push(p.id);
    }
    Seeded {
        svc,
        location,
        machines: machine_ids,
        products: product_ids,
    }
}

fn visit_payload(seeded: &Seeded, day: i64) -> BulkVisitPayload {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    BulkVisitPayload {
        visit: BulkVisitHeader {
            location: Some(seeded.location),
            visit_date: Some(start + Duration::days(day)),
            notes: None,
            user: None,
        },
        machine_restocks: seeded
            .machines
            .iter()
            .map(|m| BulkMachineRestock {
                machine: *m,
                notes: None,
                restock_entries: seeded
                    .products
                    .iter()
                    .map(|p| BulkRestockEntry {
                        product: *p,
                        counts: EntryCounts {
                            stock_before: 3,
                            discarded: 0,
                            restocked: 7,
                        },
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn bench_derive_demand(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("derive_demand");
    for visits in [10_i64, 50, 200] {
        let seeded = rt.block_on(async {
            let seeded = seed(4, 10).await;
            for day in 0..visits {
                seeded.svc.bulk_save(visit_payload(&seeded, day)).await.unwrap();
            }
            seeded
        });
        let tables = rt.block_on(seeded.svc.store().read());
        let entries = tables.entries.len() as u64;
        group.throughput(Throughput::Elements(entries));
        group.bench_with_input(BenchmarkId::new("visits", visits), &visits, |b, _| {
            b.iter(|| black_box(derive_demand(&tables.snapshot(), None, Utc::now())))
        });
    }
    group.finish();
}

fn bench_bulk_save(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let seeded = rt.block_on(seed(4, 10));
    let mut day = 0;
    c.bench_function("bulk_save_4x10", |b| {
        b.iter(|| {
            day += 1;
            rt.block_on(seeded.svc.bulk_save(visit_payload(&seeded, day)))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_derive_demand, bench_bulk_save);
criterion_main!(benches);
