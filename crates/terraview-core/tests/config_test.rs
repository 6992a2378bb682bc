//! Config loading: TOML sections, defaults for missing fields, validation.

use terraview_core::config::{ConsumptionTarget, PlanMatchPolicy};
use terraview_core::models::{PlanType, MAX_DURATION_MONTHS};
use terraview_core::{EntitlementConfig, EntitlementError};

#[test]
fn empty_toml_yields_product_defaults() {
    let config = EntitlementConfig::from_toml("").unwrap();

    assert_eq!(config.plans.allowed_transactions(PlanType::Village), 5);
    assert_eq!(config.plans.allowed_transactions(PlanType::Taluka), 5);
    assert_eq!(config.plans.allowed_transactions(PlanType::District), 5);
    assert_eq!(config.plans.allowed_transactions(PlanType::Free), 3);
    assert_eq!(config.plans.default_duration(PlanType::District), 12);
    assert_eq!(config.plans.default_duration(PlanType::Free), 1);
    assert_eq!(config.reports.default_quantity, 10);
    assert_eq!(config.reports.default_duration_months, 12);
    assert_eq!(config.ledger.consumption_target, ConsumptionTarget::ReportPool);
    assert_eq!(config.ledger.plan_match, PlanMatchPolicy::Exact);
    assert_eq!(config.hierarchy.default_state, "maharashtra");
    assert_eq!(config.storage.busy_timeout_ms, 5000);
    assert!(config.storage.db_path.is_none());
}

#[test]
fn sections_override_only_what_they_name() {
    let toml = r#"
        [storage]
        db_path = "/var/lib/terraview/entitlements.db"

        [plans.allowed_transactions]
        village = 7
        taluka = 8
        district = 9
        free = 2

        [ledger]
        consumption_target = "matching_plan"
        plan_match = "narrowest"

        [observability]
        json = true
    "#;
    let config = EntitlementConfig::from_toml(toml).unwrap();

    assert_eq!(
        config.storage.db_path.as_deref(),
        Some("/var/lib/terraview/entitlements.db")
    );
    assert_eq!(config.storage.read_pool_size, 2);
    assert_eq!(config.plans.allowed_transactions(PlanType::District), 9);
    assert_eq!(config.plans.allowed_transactions(PlanType::Free), 2);
    // duration table untouched
    assert_eq!(config.plans.default_duration(PlanType::Village), 12);
    assert_eq!(config.ledger.consumption_target, ConsumptionTarget::MatchingPlan);
    assert_eq!(config.ledger.plan_match, PlanMatchPolicy::Narrowest);
    assert!(config.observability.json);
    assert_eq!(config.observability.log_filter, "info");
}

#[test]
fn zero_cap_is_rejected() {
    let toml = r#"
        [plans.allowed_transactions]
        village = 0
        taluka = 5
        district = 5
        free = 3
    "#;
    let err = EntitlementConfig::from_toml(toml).unwrap_err();
    match err {
        EntitlementError::Config(msg) => assert!(msg.contains("village"), "{msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn zero_report_quantity_is_rejected() {
    let err = EntitlementConfig::from_toml("[reports]\ndefault_quantity = 0\n").unwrap_err();
    assert!(matches!(err, EntitlementError::Config(_)));
}

#[test]
fn unknown_policy_value_is_a_config_error() {
    let err = EntitlementConfig::from_toml("[ledger]\nplan_match = \"random\"\n").unwrap_err();
    assert!(matches!(err, EntitlementError::Config(_)));
}

#[test]
fn term_above_limit_is_rejected() {
    let toml = r#"
        [plans.duration_months]
        village = 12
        taluka = 12
        district = 10000000
        free = 1
    "#;
    let err = EntitlementConfig::from_toml(toml).unwrap_err();
    match err {
        EntitlementError::Config(msg) => assert!(msg.contains("district"), "{msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }

    let err = EntitlementConfig::from_toml(&format!(
        "[reports]\ndefault_duration_months = {}\n",
        MAX_DURATION_MONTHS + 1
    ))
    .unwrap_err();
    assert!(matches!(err, EntitlementError::Config(_)));

    let ok = format!("[reports]\ndefault_duration_months = {MAX_DURATION_MONTHS}\n");
    assert!(EntitlementConfig::from_toml(&ok).is_ok());
}

#[test]
fn zero_refresh_interval_is_rejected() {
    let err =
        EntitlementConfig::from_toml("[hierarchy]\nrefresh_interval_secs = 0\n").unwrap_err();
    match err {
        EntitlementError::Config(msg) => assert!(msg.contains("refresh_interval_secs"), "{msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }
}
