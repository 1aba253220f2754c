//! Cloud collaborator error types

use thiserror::Error;

/// Errors raised by the image catalog and the provisioning hand-off
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("No images matched: {0}")]
    EmptyResult(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Manifest version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
