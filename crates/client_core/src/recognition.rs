//! Client for the external image recognition service.
//!
//! The service is untrusted: every response is validated before it becomes a
//! [`MatchResult`], and every failure is folded into a [`RecognitionFailure`]
//! the workflow can present without crashing.

use async_trait::async_trait;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::protocol::{RecognitionResponse, FILE_FIELD};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::controller::SelectedFile;

/// Accepts payloads with or without `=` padding; the service is not consistent about it.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionFailure {
    #[error("recognition service unreachable: {0}")]
    Network(String),
    #[error("recognition service answered with HTTP {0}")]
    Status(u16),
    #[error("recognition service returned an unexpected payload: {0}")]
    Schema(String),
}

impl RecognitionFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            RecognitionFailure::Network(_) => {
                "Matching service unreachable; check the connection and try again."
            }
            RecognitionFailure::Status(_) => "Matching service rejected the image.",
            RecognitionFailure::Schema(_) => "Matching service sent a result that could not be read.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched_image: Vec<u8>,
    pub matched_image_b64: String,
    pub confidence: f64,
    pub match_percent: u8,
    pub person_label: String,
}

impl MatchResult {
    pub fn from_response(response: RecognitionResponse) -> Result<Self, RecognitionFailure> {
        let match_percent = match_percent(response.confidence)?;
        let matched_image = LENIENT_STANDARD
            .decode(response.image_base64.trim())
            .map_err(|e| RecognitionFailure::Schema(format!("invalid image_base64: {e}")))?;

        Ok(Self {
            matched_image,
            matched_image_b64: response.image_base64,
            confidence: response.confidence,
            match_percent,
            person_label: response.person,
        })
    }

    pub fn matched_image_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.matched_image_b64.trim())
    }
}

/// `round(confidence * 100)`; anything outside `[0, 1]` is a malformed response.
pub fn match_percent(confidence: f64) -> Result<u8, RecognitionFailure> {
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(RecognitionFailure::Schema(format!(
            "confidence {confidence} outside [0, 1]"
        )));
    }
    Ok((confidence * 100.0).round() as u8)
}

// Local encoding problem; nothing has been sent yet.
fn image_part(file: &SelectedFile, mime_type: &str) -> Result<Part, RecognitionFailure> {
    Part::bytes(file.bytes.to_vec())
        .file_name(file.name.clone())
        .mime_str(mime_type)
        .map_err(|e| RecognitionFailure::Schema(format!("invalid mime type '{mime_type}': {e}")))
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Issues exactly one request per call.
    async fn recognize(&self, file: &SelectedFile) -> Result<MatchResult, RecognitionFailure>;
}

pub struct RecognitionClient {
    http: Client,
    endpoint: Url,
}

impl RecognitionClient {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Recognizer for RecognitionClient {
    async fn recognize(&self, file: &SelectedFile) -> Result<MatchResult, RecognitionFailure> {
        let form = Form::new().part(FILE_FIELD, image_part(file, &file.mime_type())?);

        debug!(
            endpoint = %self.endpoint,
            file_name = %file.name,
            size_bytes = file.bytes.len(),
            "recognition: sending image"
        );
        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %self.endpoint, error = %e, "recognition: request failed");
                RecognitionFailure::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, %status, "recognition: non-success status");
            return Err(RecognitionFailure::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RecognitionFailure::Network(e.to_string()))?;
        let parsed: RecognitionResponse = serde_json::from_slice(&body)
            .map_err(|e| RecognitionFailure::Schema(e.to_string()))?;
        let result = MatchResult::from_response(parsed)?;

        info!(
            person = %result.person_label,
            match_percent = result.match_percent,
            "recognition: match received"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "tests/recognition_tests.rs"]
mod tests;
