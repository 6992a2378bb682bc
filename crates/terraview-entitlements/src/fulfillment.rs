//! OrderFulfillment: turns a verified payment into exactly one plan.
//!
//! Keyed by `order_payment_id`. Verifying the same payment twice returns the
//! plan created the first time and writes nothing. The stored record is
//! checked before the order is validated, and again inside the write
//! transaction for concurrent verifications.

use std::sync::Arc;

use tracing::info;

use terraview_core::config::ReportConfig;
use terraview_core::errors::{EntitlementError, EntitlementResult};
use terraview_core::models::{CompletedOrder, FulfillmentOutcome, OrderProduct};

use crate::store::EntitlementStore;

pub struct OrderFulfillment {
    store: Arc<EntitlementStore>,
    reports: ReportConfig,
}

impl OrderFulfillment {
    pub fn new(store: Arc<EntitlementStore>, reports: ReportConfig) -> Self {
        Self { store, reports }
    }

    pub fn fulfill(&self, order: &CompletedOrder) -> EntitlementResult<FulfillmentOutcome> {
        if order.order_payment_id.trim().is_empty() {
            return Err(EntitlementError::InvalidInput(
                "order_payment_id must not be empty".to_string(),
            ));
        }

        // Replays are answered from the stored record, before any validation.
        if let Some(granted) = self.store.storage().fulfilled_order(order)? {
            info!(
                user = %order.user_ref,
                order = %order.order_payment_id,
                plan_id = %granted.plan_id,
                "order already fulfilled"
            );
            return Ok(FulfillmentOutcome::AlreadyFulfilled(granted));
        }

        let now = self.store.clock().now();
        let outcome = match &order.product {
            OrderProduct::MapView {
                plan_type,
                entity_name,
            } => {
                let duration = order
                    .duration_months
                    .unwrap_or_else(|| self.store.default_duration(*plan_type));
                let plan =
                    self.store
                        .prepare_plan(&order.user_ref, *plan_type, entity_name, duration)?;
                self.store
                    .storage()
                    .fulfill_order(order, Some(&plan), None, now)?
            }
            OrderProduct::Report { quantity } => {
                let plan = self.store.prepare_report_plan(
                    &order.user_ref,
                    quantity.unwrap_or(self.reports.default_quantity),
                    order
                        .duration_months
                        .unwrap_or(self.reports.default_duration_months),
                )?;
                self.store
                    .storage()
                    .fulfill_order(order, None, Some(&plan), now)?
            }
        };

        match &outcome {
            FulfillmentOutcome::Granted(granted) => info!(
                user = %order.user_ref,
                order = %order.order_payment_id,
                plan_id = %granted.plan_id,
                kind = granted.kind.as_str(),
                "order fulfilled"
            ),
            FulfillmentOutcome::AlreadyFulfilled(granted) => info!(
                user = %order.user_ref,
                order = %order.order_payment_id,
                plan_id = %granted.plan_id,
                "order already fulfilled"
            ),
        }
        Ok(outcome)
    }
}
