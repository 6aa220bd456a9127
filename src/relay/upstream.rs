//! Outbound request to the processing service

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use super::error::RelayError;
use super::uploads::UploadBatch;
use crate::config::UpstreamConfig;

/// Build the HTTP client used for every upstream call
pub fn build_http_client(config: &UpstreamConfig) -> Result<reqwest::Client, Box<dyn std::error::Error>> {
    let mut client_builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .pool_max_idle_per_host(10);

    if let Some(ref tls) = config.tls {
        if tls.accept_invalid_certs {
            client_builder = client_builder.danger_accept_invalid_certs(true);
            tracing::warn!("TLS: Accepting invalid certificates (use only for development/testing)");
        }

        if let Some(ref ca_path) = tls.ca_cert_path {
            let ca_cert = std::fs::read(ca_path)?;
            let ca_cert = reqwest::Certificate::from_pem(&ca_cert)?;
            client_builder = client_builder.add_root_certificate(ca_cert);
            tracing::info!("TLS: Loaded custom CA certificate from {}", ca_path);
        }
    }

    Ok(client_builder.build()?)
}

/// Multipart body for one upstream call
pub struct UploadForm {
    form: Form,
    parts: usize,
}

impl UploadForm {
    /// A form carrying no files
    pub fn empty() -> Self {
        Self {
            form: Form::new(),
            parts: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts == 0
    }

    pub fn boundary(&self) -> &str {
        self.form.boundary()
    }
}

/// Rebuild the staged files as a multipart form under `field_name`.
///
/// Each part streams from its staged file and carries the client's original
/// filename.
pub async fn build_form(batch: &UploadBatch, field_name: &str) -> Result<UploadForm, RelayError> {
    let mut upload = UploadForm::empty();
    for staged in batch.files() {
        let file = tokio::fs::File::open(staged.path())
            .await
            .map_err(|source| RelayError::StagedFile {
                path: staged.path().to_path_buf(),
                source,
            })?;
        let part = Part::stream_with_length(reqwest::Body::from(file), staged.size())
            .file_name(staged.original_name().to_string());
        upload.form = upload.form.part(field_name.to_string(), part);
        upload.parts += 1;
    }
    Ok(upload)
}

/// Upstream answer on the success path
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Bytes,
}

/// POST `upload` to `url` and return the raw response body.
///
/// Any non-2xx status is an error; the body is never inspected.
pub async fn send(client: &reqwest::Client, url: &str, upload: UploadForm) -> Result<UpstreamReply, RelayError> {
    let request = client.post(url);
    let request = if upload.is_empty() {
        // reqwest writes nothing at all for a form without parts, which no
        // multipart parser accepts. Send the bare closing delimiter instead.
        let boundary = upload.boundary().to_string();
        request
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(format!("--{}--\r\n", boundary))
    } else {
        request.multipart(upload.form)
    };

    let response = request.send().await?.error_for_status()?;
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    Ok(UpstreamReply { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes as BodyBytes,
        extract::{Multipart, State},
        http::HeaderMap,
        routing::post,
        Router,
    };
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone, Default)]
    struct Captured {
        content_type: String,
        body: Vec<u8>,
    }

    async fn capture(
        State(seen): State<Arc<Mutex<Vec<Captured>>>>,
        headers: HeaderMap,
        body: BodyBytes,
    ) -> &'static str {
        let content_type = headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        seen.lock().unwrap().push(Captured {
            content_type,
            body: body.to_vec(),
        });
        "ok"
    }

    /// Counts the parts of each request, failing the request if it is not valid multipart
    async fn count_parts(State(seen): State<Arc<Mutex<Vec<usize>>>>, mut multipart: Multipart) -> &'static str {
        let mut parts = 0;
        while multipart.next_field().await.unwrap().is_some() {
            parts += 1;
        }
        seen.lock().unwrap().push(parts);
        "ok"
    }

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/process", addr)
    }

    #[tokio::test]
    async fn test_empty_form_sends_closing_delimiter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let url = serve(Router::new().route("/process", post(capture)).with_state(seen.clone())).await;

        let reply = send(&reqwest::Client::new(), &url, UploadForm::empty()).await.unwrap();
        assert_eq!(reply.status, 200);

        let calls = seen.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        let boundary = calls[0]
            .content_type
            .strip_prefix("multipart/form-data; boundary=")
            .expect("multipart content type")
            .to_string();
        assert_eq!(calls[0].body, format!("--{}--\r\n", boundary).into_bytes());
    }

    #[tokio::test]
    async fn test_empty_form_parses_as_zero_parts() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let url = serve(Router::new().route("/process", post(count_parts)).with_state(seen.clone())).await;

        let reply = send(&reqwest::Client::new(), &url, UploadForm::empty()).await.unwrap();

        assert_eq!(reply.body.as_ref(), b"ok");
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_build_form_of_empty_batch_is_empty() {
        let upload = build_form(&UploadBatch::default(), "files").await.unwrap();
        assert!(upload.is_empty());
        assert_eq!(upload.len(), 0);
    }

    #[tokio::test]
    async fn test_form_with_parts_uses_regular_multipart() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let url = serve(Router::new().route("/process", post(count_parts)).with_state(seen.clone())).await;

        let mut upload = UploadForm::empty();
        for name in ["a.nodes", "b.pl"] {
            upload.form = upload
                .form
                .part("files", Part::bytes(name.as_bytes().to_vec()).file_name(name));
            upload.parts += 1;
        }
        assert_eq!(upload.len(), 2);

        send(&reqwest::Client::new(), &url, upload).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }
}
