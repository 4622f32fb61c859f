//! Render-related error definitions

use thiserror::Error;

/// Errors raised while resolving render parameters
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid {name} parameter: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Asset '{0}' not found in STAC metadata")]
    AssetNotFound(String),

    #[error("Failed to fetch STAC item: {0}")]
    UpstreamNotFound(String),
}

impl RenderError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        RenderError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
