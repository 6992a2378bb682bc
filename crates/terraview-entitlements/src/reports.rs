//! ReportService: one report request from access check to debit.
//!
//! Order is fixed: validate, check access, preflight the paying plan,
//! render, then debit. A render failure consumes nothing. A debit that
//! loses a race after rendering discards the artifact.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use terraview_core::errors::{EntitlementError, EntitlementResult};
use terraview_core::models::{
    AccessGrant, AccessTarget, ArtifactIdentifier, ConsumptionDetails, EntityRef, Principal,
    TransactionRecord,
};
use terraview_core::traits::{ArtifactRequest, IRenderService};

use crate::ledger::{ConsumptionLedger, ConsumptionScope};
use crate::resolver::AccessResolver;

/// A caller's request for one land-record artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Falls back to the configured default state.
    #[serde(default)]
    pub state: Option<String>,
    pub district: String,
    pub taluka: String,
    pub village: String,
    pub identifier: ArtifactIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub artifact: Vec<u8>,
    /// `None` for admin requests, which consume nothing.
    pub record: Option<TransactionRecord>,
}

pub struct ReportService {
    resolver: Arc<AccessResolver>,
    ledger: Arc<ConsumptionLedger>,
    render: Arc<dyn IRenderService>,
    default_state: String,
}

impl ReportService {
    pub fn new(
        resolver: Arc<AccessResolver>,
        ledger: Arc<ConsumptionLedger>,
        render: Arc<dyn IRenderService>,
        default_state: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            ledger,
            render,
            default_state: default_state.into(),
        }
    }

    pub fn generate(
        &self,
        principal: &Principal,
        request: &ReportRequest,
    ) -> EntitlementResult<ReportOutcome> {
        let artifact_request = self.normalize(request)?;

        let grant = self.resolver.check_access(
            principal,
            &AccessTarget::Entity(EntityRef::village(&artifact_request.village)),
        )?;

        let scope = ConsumptionScope {
            entity: match &grant {
                AccessGrant::Entitled(entity) => entity.clone(),
                AccessGrant::Admin => EntityRef::village(&artifact_request.village),
            },
            details: ConsumptionDetails::village(
                &artifact_request.state,
                &artifact_request.district,
                &artifact_request.taluka,
                &artifact_request.village,
                artifact_request.identifier.clone(),
            ),
        };

        if grant == AccessGrant::Admin {
            let artifact = self.render(principal, &artifact_request)?;
            info!(user = %principal.user_ref, "admin report served without debit");
            return Ok(ReportOutcome {
                artifact,
                record: None,
            });
        }

        self.check_path(&artifact_request)?;
        self.ledger.preflight(&principal.user_ref, &scope)?;
        let artifact = self.render(principal, &artifact_request)?;
        let record = self.ledger.debit(&principal.user_ref, &scope)?;

        info!(
            user = %principal.user_ref,
            plan_id = %record.owning_plan_id(),
            entity = %scope.entity,
            identifier = %artifact_request.identifier,
            "report served"
        );
        Ok(ReportOutcome {
            artifact,
            record: Some(record),
        })
    }

    /// Table-key access for the tile server. Never debits.
    pub fn authorize_tile(
        &self,
        principal: &Principal,
        table_key: &str,
    ) -> EntitlementResult<AccessGrant> {
        self.resolver
            .check_access(principal, &AccessTarget::TableKey(table_key.to_string()))
    }

    fn normalize(&self, request: &ReportRequest) -> EntitlementResult<ArtifactRequest> {
        let field = |name: &str, value: &str| -> EntitlementResult<String> {
            let value = value.trim().to_lowercase();
            if value.is_empty() {
                return Err(EntitlementError::InvalidInput(format!("{name} is required")));
            }
            Ok(value)
        };
        Ok(ArtifactRequest {
            state: field(
                "state",
                request.state.as_deref().unwrap_or(&self.default_state),
            )?,
            district: field("district", &request.district)?,
            taluka: field("taluka", &request.taluka)?,
            village: field("village", &request.village)?,
            identifier: request.identifier.clone(),
        })
    }

    /// The village must sit under the named taluka and district.
    fn check_path(&self, request: &ArtifactRequest) -> EntitlementResult<()> {
        let index = self.resolver.store().hierarchy().index();
        if index.contains_path(&request.district, &request.taluka, &request.village) {
            return Ok(());
        }
        Err(EntitlementError::AccessDenied {
            reason: format!(
                "village '{}' is not in taluka '{}' of district '{}'",
                request.village, request.taluka, request.district
            ),
        })
    }

    fn render(&self, principal: &Principal, request: &ArtifactRequest) -> EntitlementResult<Vec<u8>> {
        self.render.artifact_by_identity(request).map_err(|e| {
            warn!(
                user = %principal.user_ref,
                village = %request.village,
                identifier = %request.identifier,
                error = %e,
                "artifact generation failed"
            );
            EntitlementError::GenerationFailed(e)
        })
    }
}
