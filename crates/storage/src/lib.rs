use std::{
    ffi::OsStr,
    io,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use shared::domain::public_path_for;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub public_path: String,
    pub size_bytes: u64,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create upload directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write upload '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read upload '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persists `bytes` under `file_name`, replacing any previous file of that name.
    async fn store(&self, bytes: &[u8], file_name: &str) -> Result<StoredFile, StorageError>;
    async fn load(&self, file_name: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

/// Writes uploads as plain files below a single directory.
///
/// Names are used verbatim on write. Writes are not atomic: a crash mid-write
/// leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    upload_dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    async fn ensure_upload_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: self.upload_dir.clone(),
                source,
            })
    }
}

#[async_trait]
impl BlobStore for LocalFileStore {
    async fn store(&self, bytes: &[u8], file_name: &str) -> Result<StoredFile, StorageError> {
        self.ensure_upload_dir().await?;

        let path = self.upload_dir.join(file_name);
        fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), size_bytes = bytes.len(), "upload written");
        Ok(StoredFile {
            path,
            public_path: public_path_for(file_name),
            size_bytes: bytes.len() as u64,
        })
    }

    async fn load(&self, file_name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if !is_plain_file_name(file_name) {
            return Ok(None);
        }

        let path = self.upload_dir.join(file_name);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }
}

// Reads stay inside the upload directory: the name must be a single normal
// path component, exactly as `store` would have joined it.
fn is_plain_file_name(file_name: &str) -> bool {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => name == OsStr::new(file_name),
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
