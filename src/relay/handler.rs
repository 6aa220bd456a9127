//! Upload request handler

use axum::{
    extract::{multipart::MultipartRejection, Multipart},
    http::header,
    response::{IntoResponse, Response},
};
use std::time::Instant;

use super::error::RelayError;
use super::server::RelayState;
use super::upstream::{self, UpstreamReply};
use super::uploads::UploadBatch;
use crate::stats::{format_metrics, format_upload_log, RelayMetrics, RelayOutcome};

/// Content type declared for every relayed upstream body
pub const RELAY_CONTENT_TYPE: &str = "image/png";

/// Upload relay handler
pub struct RelayHandler {
    state: RelayState,
}

impl RelayHandler {
    pub fn new(state: RelayState) -> Self {
        Self { state }
    }

    /// Handle an incoming upload
    pub async fn handle(&self, multipart: Result<Multipart, MultipartRejection>) -> Response {
        let start = Instant::now();
        let mut metrics = RelayMetrics::default();

        let result = self.relay(multipart, &mut metrics).await;
        metrics.duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        let response = match result {
            Ok(reply) => {
                metrics.outcome = RelayOutcome::Success;
                metrics.upstream_status = Some(reply.status);
                metrics.response_bytes = reply.body.len();
                ([(header::CONTENT_TYPE, RELAY_CONTENT_TYPE)], reply.body).into_response()
            }
            Err(e) => {
                metrics.outcome = RelayOutcome::Failure;
                metrics.upstream_status = e.upstream_status();
                e.into_response()
            }
        };

        let stats = &self.state.config.stats;
        if stats.enabled {
            tracing::info!("{}", format_metrics(&metrics, stats.format));
        }

        response
    }

    async fn relay(
        &self,
        multipart: Result<Multipart, MultipartRejection>,
        metrics: &mut RelayMetrics,
    ) -> Result<UpstreamReply, RelayError> {
        let multipart = multipart.map_err(|e| RelayError::Upload(e.body_text()))?;
        let uploads = &self.state.config.uploads;

        let batch = UploadBatch::receive(&uploads.dir, &uploads.field_name, multipart).await?;
        metrics.file_count = batch.len();
        metrics.upload_bytes = batch.total_bytes();

        tracing::info!(
            request_id = %metrics.request_id,
            "{}",
            format_upload_log(batch.files().iter().map(|f| f.original_name()), batch.total_bytes())
        );

        let client = self.state.http_client.clone();
        let url = self.state.config.upstream.url.clone();
        let field_name = uploads.field_name.clone();
        let request_id = metrics.request_id.clone();

        // Detached from the connection: a client hanging up must not cancel
        // the upstream call or the cleanup that follows it.
        let task = tokio::spawn(async move {
            let outcome = forward(&client, &url, &field_name, &batch).await;
            let failed = batch.cleanup();
            if failed > 0 {
                tracing::warn!(request_id = %request_id, failed, "Some staged files were not deleted");
            }
            outcome
        });

        task.await?
    }
}

async fn forward(
    client: &reqwest::Client,
    url: &str,
    field_name: &str,
    batch: &UploadBatch,
) -> Result<UpstreamReply, RelayError> {
    let form = upstream::build_form(batch, field_name).await?;
    tracing::debug!(url = %url, files = batch.len(), "Forwarding upload to upstream");
    upstream::send(client, url, form).await
}
