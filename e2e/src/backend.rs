//! Mock upstream server that simulates the processing service
//!
//! Tests pre-configure responses via SharedUpstreamState before each request.

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::types::{MockResponse, ReceivedFile, ReceivedUpload, SharedUpstreamState, UpstreamState, PNG_BYTES};

/// Handle POST /process - records the upload, serves the next queued response
async fn handle_process(State(state): State<SharedUpstreamState>, mut multipart: Multipart) -> Response {
    let mut received = ReceivedUpload::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return (StatusCode::BAD_REQUEST, format!("bad multipart: {}", e)).into_response(),
        };

        let name = field.name().unwrap_or_default().to_string();
        if name != "files" {
            received.foreign_fields.push(name);
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = match field.bytes().await {
            Ok(data) => data.to_vec(),
            Err(e) => return (StatusCode::BAD_REQUEST, format!("bad part: {}", e)).into_response(),
        };
        received.files.push(ReceivedFile { file_name, data });
    }

    let mock_response = {
        let mut state = state.lock().unwrap();
        state.call_count += 1;
        state.received_uploads.push(received);
        state
            .response_queue
            .pop_front()
            .unwrap_or_else(|| MockResponse::png(PNG_BYTES))
    };

    Response::builder()
        .status(mock_response.status)
        .header("Content-Type", &mock_response.content_type)
        .body(Body::from(mock_response.body))
        .unwrap()
        .into_response()
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Start the mock upstream server and return the shared state handle
pub async fn start(port: u16) -> anyhow::Result<SharedUpstreamState> {
    let state: SharedUpstreamState = std::sync::Arc::new(std::sync::Mutex::new(UpstreamState::default()));

    let app = Router::new()
        .route("/process", post(handle_process))
        .route("/health", get(handle_health))
        .with_state(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind mock upstream to {}: {}", addr, e))?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock upstream server failed");
    });

    // Brief pause to let the server start accepting connections
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(state)
}

/// Helper to configure the next response for /process
pub fn queue_response(state: &SharedUpstreamState, response: MockResponse) {
    state.lock().unwrap().response_queue.push_back(response);
}

/// Helper to get all uploads received since last clear
pub fn drain_uploads(state: &SharedUpstreamState) -> Vec<ReceivedUpload> {
    let mut s = state.lock().unwrap();
    s.received_uploads.drain(..).collect()
}
