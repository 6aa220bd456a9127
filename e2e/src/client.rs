//! HTTP client that simulates a browser posting files to the relay

use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::types::{RelayResponse, UploadFile};

/// Build an HTTP client
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to build reqwest client")
}

/// Build a multipart form with every file under `files`
pub fn upload_form(files: &[UploadFile]) -> Form {
    files.iter().fold(Form::new(), |form, file| {
        form.part("files", Part::bytes(file.data.clone()).file_name(file.name.clone()))
    })
}

/// Boundary used for hand-built empty multipart bodies
const EMPTY_BOUNDARY: &str = "e2e-empty-upload";

/// POST a prepared form to the relay's /upload endpoint
pub async fn send_form(client: &Client, relay_addr: &str, form: Form) -> anyhow::Result<RelayResponse> {
    let resp = client
        .post(format!("http://{relay_addr}/upload"))
        .multipart(form)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send upload to relay: {}", e))?;
    read_response(resp).await
}

/// POST a multipart body with no parts at all.
///
/// reqwest sends an empty body for `Form::new()`, which is not valid
/// multipart, so the closing delimiter is written by hand.
pub async fn send_empty_upload(client: &Client, relay_addr: &str) -> anyhow::Result<RelayResponse> {
    let resp = client
        .post(format!("http://{relay_addr}/upload"))
        .header("content-type", format!("multipart/form-data; boundary={EMPTY_BOUNDARY}"))
        .body(format!("--{EMPTY_BOUNDARY}--\r\n"))
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send empty upload to relay: {}", e))?;
    read_response(resp).await
}

async fn read_response(resp: reqwest::Response) -> anyhow::Result<RelayResponse> {
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = resp
        .bytes()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read relay response: {}", e))?;

    Ok(RelayResponse {
        status,
        content_type,
        body,
    })
}

/// Upload `files` to the relay
pub async fn send_upload(client: &Client, relay_addr: &str, files: &[UploadFile]) -> anyhow::Result<RelayResponse> {
    send_form(client, relay_addr, upload_form(files)).await
}

/// Send a GET request to the relay
pub async fn send_get(client: &Client, relay_addr: &str, path: &str) -> anyhow::Result<(u16, String)> {
    let url = format!("http://{relay_addr}{path}");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to GET {}: {}", url, e))?;

    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Ok((status, body))
}
