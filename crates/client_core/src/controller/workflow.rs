use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use shared::domain::RequestToken;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use super::{
    reducer::{reduce, WorkflowEvent},
    session::{SelectedFile, UploadSession},
};
use crate::{recognition::Recognizer, upload::Uploader};

/// Owns the [`UploadSession`] and sequences recognition (and, optionally,
/// server-side storage) for the selected file.
///
/// All session mutation goes through [`reduce`] while the session lock is held.
/// Runs are never cancelled; a response for an abandoned run is dropped by the
/// request token check.
pub struct UploadController {
    recognizer: Arc<dyn Recognizer>,
    uploader: Option<Arc<dyn Uploader>>,
    session: Mutex<UploadSession>,
    state_tx: watch::Sender<UploadSession>,
}

impl UploadController {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Arc<Self> {
        Self::new_with_uploader(recognizer, None)
    }

    pub fn new_with_uploader(
        recognizer: Arc<dyn Recognizer>,
        uploader: Option<Arc<dyn Uploader>>,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(UploadSession::default());
        Arc::new(Self {
            recognizer,
            uploader,
            session: Mutex::new(UploadSession::default()),
            state_tx,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadSession> {
        self.state_tx.subscribe()
    }

    pub async fn snapshot(&self) -> UploadSession {
        self.session.lock().await.clone()
    }

    pub async fn select_file(&self, file: SelectedFile) {
        info!(file_name = %file.name, size_bytes = file.bytes.len(), "workflow: file selected");
        let mut guard = self.session.lock().await;
        self.apply(&mut guard, WorkflowEvent::FileSelected(file));
    }

    pub async fn select_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("'{}' does not name a file", path.display()))?;
        self.select_file(SelectedFile::new(name, bytes)).await;
        Ok(())
    }

    /// Starts a run for the selected file. Returns `None` when there is nothing
    /// to run or a run is already pending.
    pub async fn start_upload(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let (token, file) = {
            let mut guard = self.session.lock().await;
            let previous = guard.last_issued;
            self.apply(&mut guard, WorkflowEvent::UploadStarted);
            if guard.last_issued == previous {
                debug!(phase = ?guard.phase, "workflow: start_upload ignored");
                return None;
            }

            let token = guard.last_issued;
            let file = guard.selected_file.clone()?;
            self.apply(&mut guard, WorkflowEvent::RecognitionDispatched(token));
            (token, file)
        };

        info!(token = token.0, file_name = %file.name, "workflow: run started");
        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            controller.run(token, file).await;
        }))
    }

    async fn run(&self, token: RequestToken, file: SelectedFile) {
        let recognition = async {
            let event = match self.recognizer.recognize(&file).await {
                Ok(result) => WorkflowEvent::RecognitionSucceeded { token, result },
                Err(failure) => {
                    warn!(token = token.0, %failure, "workflow: recognition failed");
                    WorkflowEvent::RecognitionFailed { token, failure }
                }
            };
            self.apply_if_current(token, event).await;
        };

        let storage = async {
            let Some(uploader) = &self.uploader else {
                return;
            };
            match uploader.upload(&file).await {
                Ok(public_path) => {
                    self.apply_if_current(token, WorkflowEvent::FileStored { token, public_path })
                        .await;
                }
                Err(err) => {
                    warn!(token = token.0, error = %format!("{err:#}"), "workflow: storing upload failed");
                }
            }
        };

        tokio::join!(recognition, storage);
    }

    async fn apply_if_current(&self, token: RequestToken, event: WorkflowEvent) {
        let mut guard = self.session.lock().await;
        if !guard.is_latest_run(token) {
            debug!(
                token = token.0,
                current = ?guard.current_request,
                phase = ?guard.phase,
                "workflow: discarding stale response"
            );
            return;
        }
        self.apply(&mut guard, event);
    }

    fn apply(&self, session: &mut UploadSession, event: WorkflowEvent) {
        let current = std::mem::take(session);
        *session = reduce(current, event);
        debug!(phase = ?session.phase, "workflow: state changed");
        self.state_tx.send_replace(session.clone());
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
