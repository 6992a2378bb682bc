//! Completed payment orders and their conversion into plans.

use serde::{Deserialize, Serialize};

use super::PlanType;

/// What a verified order bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "order_type", rename_all = "snake_case")]
pub enum OrderProduct {
    MapView {
        plan_type: PlanType,
        entity_name: String,
    },
    Report {
        /// Falls back to the configured default quantity.
        quantity: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    MapView,
    Report,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MapView => "map_view",
            Self::Report => "report",
        }
    }
}

impl OrderProduct {
    pub fn kind(&self) -> OrderKind {
        match self {
            Self::MapView { .. } => OrderKind::MapView,
            Self::Report { .. } => OrderKind::Report,
        }
    }
}

/// A payment whose signature the gateway layer already verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedOrder {
    pub order_payment_id: String,
    pub user_ref: String,
    pub product: OrderProduct,
    /// Falls back to the configured default for the product.
    pub duration_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedPlan {
    pub kind: OrderKind,
    pub plan_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    Granted(GrantedPlan),
    /// The order was fulfilled earlier; nothing new was created.
    AlreadyFulfilled(GrantedPlan),
}

impl FulfillmentOutcome {
    pub fn granted(&self) -> &GrantedPlan {
        match self {
            Self::Granted(g) | Self::AlreadyFulfilled(g) => g,
        }
    }
}
