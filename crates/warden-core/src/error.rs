//! Error types for the Warden platform

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Resource not found: {kind}/{id}")]
    NotFound { kind: String, id: String },

    #[error("Access denied: {rights} on {kind}/{resource}")]
    AccessDenied {
        kind: String,
        resource: String,
        rights: String,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Version conflict on {kind}/{id}: expected version {expected}")]
    VersionConflict {
        kind: String,
        id: String,
        expected: u64,
    },

    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String, retryable: bool },

    #[error("Unhandled command: {message}")]
    UnhandledCommand { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl WardenError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn access_denied(
        kind: impl Into<String>,
        resource: impl Into<String>,
        rights: impl Into<String>,
    ) -> Self {
        Self::AccessDenied {
            kind: kind.into(),
            resource: resource.into(),
            rights: rights.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn version_conflict(kind: impl Into<String>, id: impl Into<String>, expected: u64) -> Self {
        Self::VersionConflict {
            kind: kind.into(),
            id: id.into(),
            expected,
        }
    }

    /// Transient storage failure, eligible for the connectivity guard's retry.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            retryable: true,
        }
    }

    /// Hard storage failure (connection refused); never retried.
    pub fn storage_down(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unhandled_command(message: impl Into<String>) -> Self {
        Self::UnhandledCommand {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
