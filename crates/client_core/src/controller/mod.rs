//! Controller layer: session state, reducer transitions, and the workflow driver.

pub mod reducer;
pub mod session;
pub mod workflow;

pub use reducer::{reduce, WorkflowEvent};
pub use session::{PreviewRef, SelectedFile, UploadSession, WorkflowPhase};
pub use workflow::UploadController;
