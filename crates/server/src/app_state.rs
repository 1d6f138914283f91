use std::sync::Arc;

use storage::BlobStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn BlobStore>,
}
