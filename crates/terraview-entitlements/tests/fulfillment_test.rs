//! OrderFulfillment: verified payments become plans exactly once.

mod common;

use terraview_core::errors::EntitlementError;
use terraview_core::models::{
    CompletedOrder, FulfillmentOutcome, OrderKind, OrderProduct, PlanType,
};

use std::sync::Arc;

use terraview_core::EntitlementConfig;
use terraview_entitlements::storage::SqliteEntitlementStorage;

use common::{harness, harness_from, EditableSource};

fn map_view_order(id: &str, plan_type: PlanType, entity: &str) -> CompletedOrder {
    CompletedOrder {
        order_payment_id: id.into(),
        user_ref: "u1".into(),
        product: OrderProduct::MapView {
            plan_type,
            entity_name: entity.into(),
        },
        duration_months: None,
    }
}

#[test]
fn map_view_order_creates_a_plan() {
    let h = harness();
    let outcome = h
        .engine
        .fulfillment()
        .fulfill(&map_view_order("pay_1", PlanType::Taluka, "PAROLA"))
        .unwrap();
    let FulfillmentOutcome::Granted(granted) = outcome else {
        panic!("expected a new grant");
    };
    assert_eq!(granted.kind, OrderKind::MapView);

    let plan = h.engine.storage().get_plan(&granted.plan_id).unwrap().unwrap();
    assert_eq!(plan.plan.entity_name, "Parola");
    assert_eq!(plan.plan.duration_months, 12);
}

#[test]
fn repeated_verification_returns_the_original_plan() {
    let h = harness();
    let fulfillment = h.engine.fulfillment();
    let order = map_view_order("pay_1", PlanType::Village, "Mohadi");

    let first = fulfillment.fulfill(&order).unwrap();
    let second = fulfillment.fulfill(&order).unwrap();
    assert_eq!(
        second,
        FulfillmentOutcome::AlreadyFulfilled(first.granted().clone())
    );
    let stats = h.engine.storage().stats().unwrap();
    assert_eq!(stats.plan_count, 1);
    assert_eq!(stats.fulfilled_order_count, 1);
}

#[test]
fn report_order_uses_configured_defaults() {
    let h = harness();
    let order = CompletedOrder {
        order_payment_id: "pay_2".into(),
        user_ref: "u1".into(),
        product: OrderProduct::Report { quantity: None },
        duration_months: None,
    };
    let outcome = h.engine.fulfillment().fulfill(&order).unwrap();
    assert_eq!(outcome.granted().kind, OrderKind::Report);

    let pool = h.engine.store().valid_report_plans("u1").unwrap();
    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0].plan.quantity, 10);
    assert_eq!(pool[0].plan.duration_months, 12);
}

#[test]
fn order_for_unknown_entity_grants_nothing() {
    let h = harness();
    let err = h
        .engine
        .fulfillment()
        .fulfill(&map_view_order("pay_3", PlanType::District, "Nonexistent"))
        .unwrap_err();
    assert!(matches!(err, EntitlementError::InvalidEntity { .. }));
    assert_eq!(h.engine.storage().stats().unwrap().fulfilled_order_count, 0);
}

#[test]
fn payment_id_cannot_be_replayed_by_another_user() {
    let h = harness();
    let fulfillment = h.engine.fulfillment();
    fulfillment
        .fulfill(&map_view_order("pay_4", PlanType::Village, "Ozar"))
        .unwrap();

    let mut replay = map_view_order("pay_4", PlanType::Village, "Ozar");
    replay.user_ref = "u2".into();
    let err = fulfillment.fulfill(&replay).unwrap_err();
    assert!(matches!(err, EntitlementError::InvalidInput(_)));
    assert!(h.engine.store().all_plans("u2").unwrap().is_empty());
}

#[test]
fn replay_succeeds_after_the_entity_leaves_the_hierarchy() {
    let source = Arc::new(EditableSource::fixture());
    let h = harness_from(
        EntitlementConfig::default(),
        Arc::new(SqliteEntitlementStorage::open_in_memory().unwrap()),
        source.clone(),
    );
    let fulfillment = h.engine.fulfillment();
    let order = map_view_order("pay_5", PlanType::Village, "Ozar");
    let first = fulfillment.fulfill(&order).unwrap();

    source.remove_village("Ozar");
    h.engine.hierarchy().refresh().unwrap();
    assert!(h
        .engine
        .store()
        .prepare_plan("u1", PlanType::Village, "Ozar", 12)
        .is_err());

    let second = fulfillment.fulfill(&order).unwrap();
    assert_eq!(
        second,
        FulfillmentOutcome::AlreadyFulfilled(first.granted().clone())
    );
    assert_eq!(h.engine.storage().stats().unwrap().plan_count, 1);
}

#[test]
fn order_term_beyond_the_limit_grants_nothing() {
    let h = harness();
    let mut order = map_view_order("pay_6", PlanType::Village, "Mohadi");
    order.duration_months = Some(u32::MAX);
    let err = h.engine.fulfillment().fulfill(&order).unwrap_err();
    assert!(matches!(err, EntitlementError::InvalidInput(_)));

    let report = CompletedOrder {
        order_payment_id: "pay_7".into(),
        user_ref: "u1".into(),
        product: OrderProduct::Report { quantity: Some(5) },
        duration_months: Some(10_000_000),
    };
    let err = h.engine.fulfillment().fulfill(&report).unwrap_err();
    assert!(matches!(err, EntitlementError::InvalidInput(_)));

    let stats = h.engine.storage().stats().unwrap();
    assert_eq!(stats.fulfilled_order_count, 0);
    assert_eq!(stats.plan_count + stats.report_plan_count, 0);
}
