//! In-process stand-ins for the recognition service and file store used by tests.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
    Router,
};
use tokio::{net::TcpListener, sync::Mutex};
use url::Url;

#[derive(Debug, Clone)]
pub(crate) struct ReceivedImage {
    pub(crate) field: String,
    pub(crate) file_name: Option<String>,
    pub(crate) size_bytes: usize,
}

#[derive(Clone)]
struct MockService {
    status: StatusCode,
    body: String,
    received: Arc<Mutex<Vec<ReceivedImage>>>,
}

async fn handle_recognize(
    State(state): State<MockService>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_owned);
        let size_bytes = field.bytes().await.map(|b| b.len()).unwrap_or_default();
        state.received.lock().await.push(ReceivedImage {
            field: field_name,
            file_name,
            size_bytes,
        });
    }
    (state.status, state.body.clone())
}

/// Serves `POST /image/recognize` with a fixed status and body.
pub(crate) async fn spawn_recognition_service(
    status: StatusCode,
    body: impl Into<String>,
) -> anyhow::Result<(Url, Arc<Mutex<Vec<ReceivedImage>>>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = MockService {
        status,
        body: body.into(),
        received: Arc::clone(&received),
    };
    let app = Router::new()
        .route("/image/recognize", post(handle_recognize))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((
        Url::parse(&format!("http://{addr}/image/recognize"))?,
        received,
    ))
}

async fn handle_upload(mut multipart: Multipart) -> (StatusCode, String) {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            if let Some(file_name) = field.file_name().map(str::to_owned) {
                return (StatusCode::OK, format!("/uploads/{file_name}"));
            }
        }
    }
    (StatusCode::BAD_REQUEST, "No file uploaded".to_string())
}

/// Serves `POST /upload` the way the file store server answers it. Returns the base url.
pub(crate) async fn spawn_file_store() -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route("/upload", post(handle_upload));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/"))
}

/// Endpoint on a port nothing listens on.
pub(crate) async fn unreachable_endpoint() -> anyhow::Result<Url> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(Url::parse(&format!("http://{addr}/image/recognize"))?)
}

pub(crate) fn match_body(image_base64: &str, confidence: f64, person: &str) -> String {
    format!(
        r#"{{"image_base64":"{image_base64}","confidence":{confidence},"person":"{person}"}}"#
    )
}
