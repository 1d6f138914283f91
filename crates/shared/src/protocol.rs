use serde::{Deserialize, Serialize};

/// Multipart field carrying the image, both for `POST /upload` and the recognition service.
pub const FILE_FIELD: &str = "file";

/// Response body of the external recognition service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    pub image_base64: String,
    pub confidence: f64,
    pub person: String,
}
