//! Upload relay: receive, forward, respond, clean up

pub mod error;
mod handler;
pub mod server;
pub mod uploads;
pub mod upstream;

pub use error::RelayError;
pub use handler::{RelayHandler, RELAY_CONTENT_TYPE};
pub use server::{build_router, run_server, RelayState};
