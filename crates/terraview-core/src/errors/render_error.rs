/// Failures reported by the external artifact render service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("no artifact for {identity}")]
    NotFound { identity: String },

    #[error("render service unavailable: {0}")]
    Unavailable(String),

    #[error("render failed: {0}")]
    Failed(String),
}
