//! Relay errors and their HTTP rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Message returned to the caller whenever forwarding to upstream fails
pub const FORWARD_FAILURE_MESSAGE: &str = "Error generating visualization. Files missing.";

/// Message returned when the inbound upload could not be read
pub const UPLOAD_FAILURE_MESSAGE: &str = "Error receiving uploaded files.";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Inbound body is not readable multipart
    #[error("{0}")]
    Upload(String),

    /// Staging an inbound part to the upload directory failed
    #[error("failed to stage upload in {dir}: {source}")]
    Staging {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A staged file could not be reopened for the outbound request
    #[error("failed to open staged file {path}: {source}")]
    StagedFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Network failure, timeout, non-2xx status or unreadable response body
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),

    /// The detached forwarding task panicked or was aborted
    #[error("relay task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// JSON error payload returned to the caller
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub error: String,
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Upload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed human-readable message for this class of failure
    pub fn message(&self) -> &'static str {
        match self {
            RelayError::Upload(_) | RelayError::Staging { .. } => UPLOAD_FAILURE_MESSAGE,
            _ => FORWARD_FAILURE_MESSAGE,
        }
    }

    /// Status code upstream answered with, when the failure was a rejected request
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            RelayError::Upstream(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "{}", self.message());
        } else {
            tracing::debug!(error = %self, "Client error");
        }

        let body = ErrorBody {
            message: self.message().to_string(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
