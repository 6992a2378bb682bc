//! Schema SQL constants. Used by migrations.rs.

/// V1 schema: plans, report plans, both audit tables, fulfilled orders.
///
/// Audit rows carry no counter anywhere else: a plan's used count is always
/// `COUNT(*)` over its transactions. The UPDATE triggers make audit rows
/// append-only; deletes happen only by cascading an admin plan teardown.
pub const ENTITLEMENT_TABLES_V1: &str = "
    CREATE TABLE IF NOT EXISTS plans (
        id TEXT PRIMARY KEY NOT NULL,
        user_ref TEXT NOT NULL,
        plan_type TEXT NOT NULL,
        entity_name TEXT NOT NULL,
        duration_months INTEGER NOT NULL CHECK (duration_months >= 0),
        created_at TEXT NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS report_plans (
        id TEXT PRIMARY KEY NOT NULL,
        user_ref TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity >= 0),
        duration_months INTEGER NOT NULL CHECK (duration_months >= 0),
        created_at TEXT NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS transactions (
        id TEXT PRIMARY KEY NOT NULL,
        plan_id TEXT NOT NULL REFERENCES plans(id) ON DELETE CASCADE,
        details TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS report_transactions (
        id TEXT PRIMARY KEY NOT NULL,
        report_plan_id TEXT NOT NULL REFERENCES report_plans(id) ON DELETE CASCADE,
        details TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS fulfilled_orders (
        order_payment_id TEXT PRIMARY KEY NOT NULL,
        user_ref TEXT NOT NULL,
        order_kind TEXT NOT NULL,
        plan_id TEXT NOT NULL,
        fulfilled_at TEXT NOT NULL
    ) STRICT;

    CREATE INDEX IF NOT EXISTS idx_plans_user ON plans(user_ref);
    CREATE INDEX IF NOT EXISTS idx_report_plans_user ON report_plans(user_ref, created_at);
    CREATE INDEX IF NOT EXISTS idx_transactions_plan ON transactions(plan_id);
    CREATE INDEX IF NOT EXISTS idx_report_transactions_plan ON report_transactions(report_plan_id);

    CREATE TRIGGER IF NOT EXISTS transactions_append_only
    BEFORE UPDATE ON transactions
    BEGIN
        SELECT RAISE(ABORT, 'transactions are append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS report_transactions_append_only
    BEFORE UPDATE ON report_transactions
    BEGIN
        SELECT RAISE(ABORT, 'report_transactions are append-only');
    END;
";

/// All entitlement table names.
pub const ENTITLEMENT_TABLE_NAMES: [&str; 5] = [
    "plans",
    "report_plans",
    "transactions",
    "report_transactions",
    "fulfilled_orders",
];
