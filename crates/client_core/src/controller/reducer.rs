//! Pure state transitions for the upload-and-match workflow.

use shared::domain::RequestToken;

use super::session::{PreviewRef, SelectedFile, UploadSession, WorkflowPhase};
use crate::recognition::{MatchResult, RecognitionFailure};

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    FileSelected(SelectedFile),
    UploadStarted,
    RecognitionDispatched(RequestToken),
    RecognitionSucceeded {
        token: RequestToken,
        result: MatchResult,
    },
    RecognitionFailed {
        token: RequestToken,
        failure: RecognitionFailure,
    },
    FileStored {
        token: RequestToken,
        public_path: String,
    },
}

/// Events that do not apply to the current phase, or that carry a token from
/// an abandoned run, leave the session untouched.
pub fn reduce(session: UploadSession, event: WorkflowEvent) -> UploadSession {
    match event {
        WorkflowEvent::FileSelected(file) => UploadSession {
            preview: Some(PreviewRef::from_file(&file)),
            selected_file: Some(file),
            phase: WorkflowPhase::Selected,
            result: None,
            failure: None,
            stored_path: None,
            current_request: None,
            last_issued: session.last_issued,
        },
        WorkflowEvent::UploadStarted => {
            if !session.phase.can_start_upload() {
                return session;
            }
            let Some(file) = session.selected_file.as_ref() else {
                return session;
            };
            let preview = PreviewRef::from_file(file);
            let token = session.last_issued.next();
            UploadSession {
                preview: Some(preview),
                phase: WorkflowPhase::Uploading,
                result: None,
                failure: None,
                stored_path: None,
                current_request: Some(token),
                last_issued: token,
                ..session
            }
        }
        WorkflowEvent::RecognitionDispatched(token) => {
            if session.phase != WorkflowPhase::Uploading || !session.accepts(token) {
                return session;
            }
            UploadSession {
                phase: WorkflowPhase::Matching,
                ..session
            }
        }
        WorkflowEvent::RecognitionSucceeded { token, result } => {
            if session.phase != WorkflowPhase::Matching || !session.accepts(token) {
                return session;
            }
            UploadSession {
                phase: WorkflowPhase::Matched,
                result: Some(result),
                failure: None,
                current_request: None,
                ..session
            }
        }
        WorkflowEvent::RecognitionFailed { token, failure } => {
            if session.phase != WorkflowPhase::Matching || !session.accepts(token) {
                return session;
            }
            UploadSession {
                phase: WorkflowPhase::Failed,
                result: None,
                failure: Some(failure),
                current_request: None,
                ..session
            }
        }
        WorkflowEvent::FileStored { token, public_path } => {
            if !session.is_latest_run(token) {
                return session;
            }
            UploadSession {
                stored_path: Some(public_path),
                ..session
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
