//! Boundary to the external PDF / tile rendering engine.

use serde::{Deserialize, Serialize};

use crate::errors::RenderError;
use crate::models::ArtifactIdentifier;

/// Identity of one land-record artifact. Names are lower-cased by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRequest {
    pub state: String,
    pub district: String,
    pub taluka: String,
    pub village: String,
    pub identifier: ArtifactIdentifier,
}

/// Opaque render service: identity in, bytes or failure out.
pub trait IRenderService: Send + Sync {
    fn artifact_by_identity(&self, request: &ArtifactRequest) -> Result<Vec<u8>, RenderError>;
}
