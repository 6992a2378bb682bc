//! Concurrent debit races. Two debits for the last unit must never both win.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use terraview_core::config::StorageConfig;
use terraview_core::errors::EntitlementError;
use terraview_core::models::{ConsumptionDetails, PlanType, ReportPlan};
use terraview_core::traits::IEntitlementStorage;
use terraview_entitlements::storage::SqliteEntitlementStorage;

use common::{harness, t0};

fn tally<T>(results: Vec<Result<T, EntitlementError>>) -> (usize, usize) {
    let mut ok = 0;
    let mut exceeded = 0;
    for result in results {
        match result {
            Ok(_) => ok += 1,
            Err(EntitlementError::CapacityExceeded { .. }) => exceeded += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    (ok, exceeded)
}

#[test]
fn last_report_unit_goes_to_exactly_one_caller() {
    let h = Arc::new(harness());
    h.engine.store().create_report_plan("u1", 1, 12).unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let h = Arc::clone(&h);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                h.engine
                    .ledger()
                    .debit_report("u1", &ConsumptionDetails::default())
            })
        })
        .collect();
    let results = handles.into_iter().map(|j| j.join().unwrap()).collect();

    assert_eq!(tally(results), (1, 1));
    assert_eq!(h.engine.ledger().report_history("u1").unwrap().len(), 1);
}

#[test]
fn plan_cap_holds_under_contention() {
    let h = Arc::new(harness());
    let plan = h
        .engine
        .store()
        .create_plan("u1", PlanType::Taluka, "Parola")
        .unwrap();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let h = Arc::clone(&h);
            let barrier = Arc::clone(&barrier);
            let plan_id = plan.id.clone();
            thread::spawn(move || {
                barrier.wait();
                h.engine
                    .ledger()
                    .debit_plan("u1", &plan_id, &ConsumptionDetails::default())
            })
        })
        .collect();
    let results = handles.into_iter().map(|j| j.join().unwrap()).collect();

    assert_eq!(tally(results), (5, 3));
    let usage = h.engine.storage().get_plan(&plan.id).unwrap().unwrap();
    assert_eq!(usage.used, 5);
}

#[test]
fn separate_connections_to_one_file_serialize_debits() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        db_path: Some(dir.path().join("entitlements.db").display().to_string()),
        ..Default::default()
    };
    let first = Arc::new(SqliteEntitlementStorage::open(&config).unwrap());
    let second = Arc::new(SqliteEntitlementStorage::open(&config).unwrap());
    first
        .insert_report_plan(&ReportPlan::new("u1", 1, 12, t0()))
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [first.clone(), second.clone()]
        .into_iter()
        .map(|storage| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                storage.debit_report_pool("u1", &ConsumptionDetails::default(), t0())
            })
        })
        .collect();
    let results = handles.into_iter().map(|j| j.join().unwrap()).collect();

    assert_eq!(tally(results), (1, 1));
    assert_eq!(second.stats().unwrap().report_transaction_count, 1);
}
