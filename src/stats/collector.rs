//! Per-request relay metrics

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Terminal outcome of one relayed request
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RelayOutcome {
    /// Upstream returned data, relayed verbatim
    Success,
    /// Forwarding failed and the caller got the error payload
    Failure,
}

impl std::fmt::Display for RelayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayOutcome::Success => write!(f, "success"),
            RelayOutcome::Failure => write!(f, "failure"),
        }
    }
}

/// Collected metrics from an upload/forward cycle
#[derive(Debug, Clone, Serialize)]
pub struct RelayMetrics {
    /// Unique request ID
    pub request_id: String,
    /// Timestamp the request was received
    pub timestamp: DateTime<Utc>,
    /// Number of files received under the upload field
    pub file_count: usize,
    /// Total bytes staged to disk
    pub upload_bytes: u64,
    /// Status returned by upstream, if it answered at all
    pub upstream_status: Option<u16>,
    /// Bytes relayed back to the caller on success
    pub response_bytes: usize,
    pub outcome: RelayOutcome,
    /// Request duration in ms
    pub duration_ms: f64,
}

impl RelayMetrics {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
            file_count: 0,
            upload_bytes: 0,
            upstream_status: None,
            response_bytes: 0,
            outcome: RelayOutcome::Failure,
            duration_ms: 0.0,
        }
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_start_as_failure() {
        let m = RelayMetrics::new("req-1".to_string());
        assert_eq!(m.request_id, "req-1");
        assert_eq!(m.outcome, RelayOutcome::Failure);
        assert!(m.upstream_status.is_none());
    }

    #[test]
    fn test_default_generates_request_id() {
        let a = RelayMetrics::default();
        let b = RelayMetrics::default();
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_outcome_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RelayOutcome::Success).unwrap(), "\"success\"");
        assert_eq!(RelayOutcome::Failure.to_string(), "failure");
    }
}
