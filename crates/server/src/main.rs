use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    body::{Body, Bytes},
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::FILE_FIELD,
};
use storage::{BlobStore, LocalFileStore, StorageError};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

const NO_FILE_UPLOADED: &str = "No file uploaded";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let state = AppState {
        store: Arc::new(LocalFileStore::new(&settings.upload_dir)),
    };
    let app = build_router(Arc::new(state), settings.max_upload_bytes);

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, upload_dir = %settings.upload_dir.display(), "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/upload", post(upload_file))
        .route("/uploads/:file_name", get(download_file))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug)]
enum UploadError {
    MissingInput,
    Multipart(MultipartError),
    Storage(StorageError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::MissingInput => (StatusCode::BAD_REQUEST, NO_FILE_UPLOADED).into_response(),
            UploadError::Multipart(err) => (err.status(), err.body_text()).into_response(),
            UploadError::Storage(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(ErrorCode::StorageFailure, err.to_string())),
            )
                .into_response(),
        }
    }
}

/// Stores the `file` field and answers with its public path as `text/plain`.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, UploadError> {
    let Some((file_name, bytes)) = read_file_field(&mut multipart).await? else {
        info!("upload rejected: no file field");
        return Err(UploadError::MissingInput);
    };

    let stored = state
        .store
        .store(&bytes, &file_name)
        .await
        .map_err(|err| {
            error!(%file_name, %err, "failed to store upload");
            UploadError::Storage(err)
        })?;

    info!(
        %file_name,
        size_bytes = stored.size_bytes,
        public_path = %stored.public_path,
        "upload stored"
    );
    Ok(single_chunk_text(stored.public_path))
}

// Browsers send an empty file name when the file input was left blank.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<(String, Bytes)>, UploadError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        warn!(%err, "unreadable multipart body");
        UploadError::Multipart(err)
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(file_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
        else {
            return Ok(None);
        };

        let bytes = field.bytes().await.map_err(UploadError::Multipart)?;
        return Ok(Some((file_name, bytes)));
    }

    Ok(None)
}

fn single_chunk_text(text: String) -> Response {
    let chunk = futures::stream::once(async move { Ok::<_, Infallible>(Bytes::from(text)) });
    (
        [(header::CONTENT_TYPE, "text/plain")],
        Body::from_stream(chunk),
    )
        .into_response()
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let bytes = state
        .store
        .load(&file_name)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(ErrorCode::StorageFailure, e.to_string())),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiError::new(ErrorCode::NotFound, "upload not found")),
            )
        })?;

    let mime = mime_guess::from_path(&file_name).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
