//! Append-only consumption audit records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record identifier passed to the render service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactIdentifier {
    SurveyNo(u32),
    KhataNo(String),
    PlotId(String),
}

impl fmt::Display for ArtifactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurveyNo(n) => write!(f, "survey {n}"),
            Self::KhataNo(k) => write!(f, "khata {k}"),
            Self::PlotId(p) => write!(f, "plot {p}"),
        }
    }
}

/// Free-form descriptor of what a debit paid for. Stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taluka: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<ArtifactIdentifier>,
}

impl ConsumptionDetails {
    pub fn village(
        state: &str,
        district: &str,
        taluka: &str,
        village: &str,
        identifier: ArtifactIdentifier,
    ) -> Self {
        Self {
            state: Some(state.to_string()),
            district: Some(district.to_string()),
            taluka: Some(taluka.to_string()),
            village: Some(village.to_string()),
            identifier: Some(identifier),
        }
    }
}

/// One debit against a hierarchical `Plan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub plan_id: String,
    pub created_at: DateTime<Utc>,
    pub details: ConsumptionDetails,
}

/// One debit against a pooled `ReportPlan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTransaction {
    pub id: String,
    pub report_plan_id: String,
    pub created_at: DateTime<Utc>,
    pub details: ConsumptionDetails,
}

/// Result of a ledger debit, whichever plan kind paid for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionRecord {
    Plan(Transaction),
    Report(ReportTransaction),
}

impl TransactionRecord {
    pub fn id(&self) -> &str {
        match self {
            Self::Plan(t) => &t.id,
            Self::Report(t) => &t.id,
        }
    }

    /// Id of the plan or report plan that was debited.
    pub fn owning_plan_id(&self) -> &str {
        match self {
            Self::Plan(t) => &t.plan_id,
            Self::Report(t) => &t.report_plan_id,
        }
    }

    pub fn details(&self) -> &ConsumptionDetails {
        match self {
            Self::Plan(t) => &t.details,
            Self::Report(t) => &t.details,
        }
    }
}
