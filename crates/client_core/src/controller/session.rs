//! Session state owned by the upload controller.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::domain::RequestToken;

use crate::recognition::{MatchResult, RecognitionFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowPhase {
    #[default]
    Idle,
    Selected,
    Uploading,
    Matching,
    Matched,
    Failed,
}

impl WorkflowPhase {
    pub fn is_pending(self) -> bool {
        matches!(self, WorkflowPhase::Uploading | WorkflowPhase::Matching)
    }

    pub fn can_start_upload(self) -> bool {
        matches!(
            self,
            WorkflowPhase::Selected | WorkflowPhase::Matched | WorkflowPhase::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.name)
            .first_or_octet_stream()
            .to_string()
    }
}

/// Locally renderable image for the selected file. No network involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRef {
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl PreviewRef {
    pub fn from_file(file: &SelectedFile) -> Self {
        Self {
            mime_type: file.mime_type(),
            bytes: Arc::clone(&file.bytes),
        }
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// `result` is set only in `Matched`, `failure` only in `Failed`,
/// `current_request` only in `Uploading` and `Matching`, and `preview` in
/// every phase but `Idle`.
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    pub selected_file: Option<SelectedFile>,
    pub preview: Option<PreviewRef>,
    pub phase: WorkflowPhase,
    pub result: Option<MatchResult>,
    pub failure: Option<RecognitionFailure>,
    pub stored_path: Option<String>,
    /// Run whose responses are still accepted.
    pub current_request: Option<RequestToken>,
    pub last_issued: RequestToken,
}

impl UploadSession {
    pub fn match_percent(&self) -> Option<u8> {
        self.result.as_ref().map(|result| result.match_percent)
    }

    pub fn person_label(&self) -> Option<&str> {
        self.result
            .as_ref()
            .map(|result| result.person_label.as_str())
    }

    pub fn accepts(&self, token: RequestToken) -> bool {
        self.current_request == Some(token)
    }

    /// True for the pending run, and for the run that produced the current
    /// `Matched`/`Failed` outcome. Storage may finish after recognition.
    pub fn is_latest_run(&self, token: RequestToken) -> bool {
        self.accepts(token)
            || (matches!(self.phase, WorkflowPhase::Matched | WorkflowPhase::Failed)
                && self.last_issued == token)
    }
}
