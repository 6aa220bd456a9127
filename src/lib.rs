//! upload-relay: HTTP relay for multipart uploads
//!
//! Features:
//! - `POST /upload` stages the `files` parts and forwards them to the
//!   processing service as a fresh multipart request
//! - The upstream body is returned verbatim as `image/png`
//! - Staged files are removed after every request, whatever the outcome
//! - Static assets, permissive CORS and per-request stats logging

pub mod config;
pub mod relay;
pub mod stats;

pub use config::AppConfig;
pub use relay::{build_router, run_server, RelayState};
