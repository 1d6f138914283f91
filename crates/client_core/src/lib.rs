//! Client side of the image match workflow: the recognition service client,
//! the file store client, and the controller that sequences them.

pub mod controller;
pub mod recognition;
pub mod upload;

pub use controller::{SelectedFile, UploadController, UploadSession, WorkflowPhase};
pub use recognition::{MatchResult, RecognitionClient, RecognitionFailure, Recognizer};
pub use upload::{UploadClient, Uploader};

#[cfg(test)]
pub(crate) mod test_support;
