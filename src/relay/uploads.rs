//! Request-scoped staging of uploaded files
//!
//! Every part received under the upload field is written to its own uniquely
//! named file in the upload directory. The files belong to an [`UploadBatch`]
//! which removes them in [`UploadBatch::cleanup`], or on drop if the batch is
//! abandoned on an early return or a cancelled future.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use super::error::RelayError;

const STAGED_PREFIX: &str = "upload-";

/// One uploaded file, staged on disk
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    original_name: String,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filename supplied by the client
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// All files staged for a single request
#[derive(Debug, Default)]
pub struct UploadBatch {
    files: Vec<StagedFile>,
}

impl UploadBatch {
    /// Drain `multipart`, staging every part named `field_name` into `dir`.
    ///
    /// Parts under other names, and parts without a filename, are skipped.
    /// On error the files staged so far are removed before returning.
    pub async fn receive(dir: &Path, field_name: &str, mut multipart: Multipart) -> Result<Self, RelayError> {
        let mut batch = UploadBatch::default();

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| RelayError::Upload(e.body_text()))?
        {
            if field.name() != Some(field_name) {
                tracing::debug!(field = ?field.name(), "Skipping unexpected multipart field");
                continue;
            }

            // Text fields sharing the name carry no filename and are not uploads
            let Some(original_name) = field.file_name().map(str::to_string) else {
                tracing::debug!(field = field_name, "Skipping non-file part");
                continue;
            };
            let (file, path) = create_staged(dir)?;
            let mut file = tokio::fs::File::from_std(file);

            let mut staged = StagedFile {
                path,
                original_name,
                size: 0,
            };
            let written = write_part(&mut field, &mut file, &mut staged.size).await;
            // Owned by the batch before `?` so a failed write is still cleaned up
            batch.files.push(staged);
            written.map_err(|e| e.with_dir(dir))?;

            if let Some(staged) = batch.files.last() {
                tracing::debug!(
                    path = %staged.path().display(),
                    name = %staged.original_name,
                    size = staged.size,
                    "Staged uploaded file"
                );
            }
        }

        Ok(batch)
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Delete every staged file, logging (never returning) failures.
    ///
    /// Returns the number of files that could not be removed.
    pub fn cleanup(mut self) -> usize {
        remove_all(&mut self.files)
    }
}

impl Drop for UploadBatch {
    fn drop(&mut self) {
        remove_all(&mut self.files);
    }
}

enum WriteError {
    Read(MultipartError),
    Write(std::io::Error),
}

impl WriteError {
    fn with_dir(self, dir: &Path) -> RelayError {
        match self {
            WriteError::Read(e) => RelayError::Upload(e.body_text()),
            WriteError::Write(source) => RelayError::Staging {
                dir: dir.to_path_buf(),
                source,
            },
        }
    }
}

async fn write_part(field: &mut Field<'_>, file: &mut tokio::fs::File, size: &mut u64) -> Result<(), WriteError> {
    while let Some(chunk) = field.chunk().await.map_err(WriteError::Read)? {
        file.write_all(&chunk).await.map_err(WriteError::Write)?;
        *size += chunk.len() as u64;
    }
    file.flush().await.map_err(WriteError::Write)
}

fn create_staged(dir: &Path) -> Result<(std::fs::File, TempPath), RelayError> {
    let named = tempfile::Builder::new()
        .prefix(STAGED_PREFIX)
        .tempfile_in(dir)
        .map_err(|source| RelayError::Staging {
            dir: dir.to_path_buf(),
            source,
        })?;
    Ok(named.into_parts())
}

fn remove_all(files: &mut Vec<StagedFile>) -> usize {
    let mut failed = 0;
    for staged in files.drain(..) {
        let path: PathBuf = staged.path.to_path_buf();
        if let Err(e) = staged.path.close() {
            failed += 1;
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete staged file");
        }
    }
    failed
}
