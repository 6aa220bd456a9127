//! Common test helpers

use std::path::Path;

use crate::types::{RelayResponse, UploadFile};

/// The four files the processing service expects for a placement plot
pub fn placement_files() -> Vec<UploadFile> {
    vec![
        UploadFile::new("adaptec1.nodes", b"UCLA nodes 1.0\nNumNodes : 2\no0 4 12\no1 8 12\n"),
        UploadFile::new("adaptec1.pl", b"UCLA pl 1.0\no0 0 0 : N\no1 4 0 : N\n"),
        UploadFile::new("adaptec1.scl", b"UCLA scl 1.0\nNumRows : 1\n"),
        UploadFile::new("adaptec1.nets", b"UCLA nets 1.0\nNumNets : 0\n"),
    ]
}

/// Count entries in the relay's upload dir; a missing dir counts as empty
pub fn staged_count(dir: &Path) -> anyhow::Result<usize> {
    match std::fs::read_dir(dir) {
        Ok(entries) => Ok(entries.count()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(anyhow::anyhow!("Failed to read {}: {}", dir.display(), e)),
    }
}

/// Assert the upload dir is empty, skipping when the runner doesn't know it
pub fn assert_no_staged_files(dir: Option<&Path>) -> anyhow::Result<()> {
    let Some(dir) = dir else {
        return Ok(());
    };
    let count = staged_count(dir)?;
    assert_true(
        count == 0,
        &format!("Expected no staged files in {}, found {}", dir.display(), count),
    )
}

/// Assert the relay answered with its JSON error payload and status 500
pub fn assert_forwarding_failure(resp: &RelayResponse) -> anyhow::Result<serde_json::Value> {
    assert_true(resp.status == 500, &format!("Expected 500, got {}", resp.status))?;
    let body = resp.json()?;
    assert_eq_str(
        body.get("message").and_then(|v| v.as_str()).unwrap_or_default(),
        "Error generating visualization. Files missing.",
        "message",
    )?;
    assert_true(
        body.get("error").and_then(|v| v.as_str()).is_some_and(|e| !e.is_empty()),
        &format!("Expected non-empty error detail, got: {}", body),
    )?;
    Ok(body)
}

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}
