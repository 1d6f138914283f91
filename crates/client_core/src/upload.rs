use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::protocol::FILE_FIELD;
use tracing::info;

use crate::controller::SelectedFile;

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Persists the file server-side and returns its public path.
    async fn upload(&self, file: &SelectedFile) -> Result<String>;
}

/// Talks to the `POST /upload` endpoint of the file store server.
pub struct UploadClient {
    http: Client,
    server_url: String,
}

impl UploadClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Uploader for UploadClient {
    async fn upload(&self, file: &SelectedFile) -> Result<String> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type())?;

        let public_path = self
            .http
            .post(format!("{}/upload", self.server_url))
            .multipart(Form::new().part(FILE_FIELD, part))
            .send()
            .await
            .with_context(|| format!("failed to reach file store at {}", self.server_url))?
            .error_for_status()?
            .text()
            .await?;

        info!(file_name = %file.name, %public_path, "upload: stored on server");
        Ok(public_path)
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
