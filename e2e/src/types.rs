//! Shared types for the e2e test framework

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// PNG signature followed by a few payload bytes, served by default
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0xDE, 0xAD, 0xBE, 0xEF];

/// A mock response the upstream will serve for the next request to /process
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: String,
}

impl MockResponse {
    /// A rendered image
    pub fn png(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "image/png".to_string(),
        }
    }

    /// Create an error response, shaped like the processing service's plain-text errors
    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into().into_bytes(),
            content_type: "text/html; charset=utf-8".to_string(),
        }
    }
}

/// Shared state for the mock upstream server
#[derive(Debug, Default)]
pub struct UpstreamState {
    /// Queue of responses to serve - tests push responses, upstream pops and serves them
    pub response_queue: VecDeque<MockResponse>,
    /// All uploads received by the upstream (for inspection)
    pub received_uploads: Vec<ReceivedUpload>,
    /// Calls to /process since the last reset, unaffected by draining
    pub call_count: usize,
}

impl UpstreamState {
    /// Forget queued responses and recorded uploads between test cases
    pub fn reset(&mut self) {
        self.response_queue.clear();
        self.received_uploads.clear();
        self.call_count = 0;
    }
}

/// One multipart request received by the mock upstream
#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub files: Vec<ReceivedFile>,
    /// Parts that arrived under a field name other than `files`
    pub foreign_fields: Vec<String>,
}

/// A single part of a received upload
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

pub type SharedUpstreamState = Arc<Mutex<UpstreamState>>;

/// A file the test client uploads to the relay
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
        }
    }
}

/// Result of an upload request to the relay
#[derive(Debug)]
pub struct RelayResponse {
    pub status: u16,
    pub content_type: String,
    pub body: bytes::Bytes,
}

impl RelayResponse {
    /// Parse the body as the relay's JSON error payload
    pub fn json(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::from_slice(&self.body).map_err(|e| {
            anyhow::anyhow!(
                "Relay response is not valid JSON: {}: {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }
}

/// Result of a single test case
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
    /// Requests the mock upstream saw while the case ran
    pub upstream_calls: usize,
    /// Files left in the relay's upload dir afterwards, if the dir is known
    pub leaked_files: Option<usize>,
}
