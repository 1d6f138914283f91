use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    RecognitionClient, UploadClient, UploadController, UploadSession, Uploader, WorkflowPhase,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
struct Args {
    /// Recognition endpoint accepting a multipart `file` field.
    #[arg(long, env = "RECOGNITION_URL")]
    recognition_url: Url,
    /// File store server; when set the image is also persisted through `POST /upload`.
    #[arg(long, env = "UPLOAD_SERVER_URL")]
    server_url: Option<String>,
    /// Where to write the matched reference image.
    #[arg(long)]
    save_match: Option<PathBuf>,
    image: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let uploader = args
        .server_url
        .map(|server_url| Arc::new(UploadClient::new(server_url)) as Arc<dyn Uploader>);
    let controller = UploadController::new_with_uploader(
        Arc::new(RecognitionClient::new(args.recognition_url)),
        uploader,
    );

    let mut observer = controller.subscribe();
    let progress = tokio::spawn(async move {
        let mut last_phase = None;
        while observer.changed().await.is_ok() {
            let phase = observer.borrow_and_update().phase;
            if last_phase != Some(phase) {
                println!("{}", phase_label(phase));
                last_phase = Some(phase);
            }
            if matches!(phase, WorkflowPhase::Matched | WorkflowPhase::Failed) {
                break;
            }
        }
    });

    controller.select_path(&args.image).await?;
    let run = controller
        .start_upload()
        .await
        .context("no image selected")?;
    run.await.context("match run aborted")?;
    wait_for_progress(progress).await;

    let session = controller.snapshot().await;
    println!("{}", render_outcome(&session));

    if let (Some(path), Some(result)) = (args.save_match, session.result.as_ref()) {
        tokio::fs::write(&path, &result.matched_image)
            .await
            .with_context(|| format!("failed to write matched image to '{}'", path.display()))?;
        info!(path = %path.display(), "matched image saved");
    }

    Ok(())
}

/// The printer is cosmetic; if it died the outcome is still printed.
async fn wait_for_progress(progress: JoinHandle<()>) -> bool {
    match progress.await {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "progress printer stopped");
            false
        }
    }
}

fn phase_label(phase: WorkflowPhase) -> &'static str {
    match phase {
        WorkflowPhase::Idle => "IMAGE PREVIEW",
        WorkflowPhase::Selected => "Image selected",
        WorkflowPhase::Uploading => "Uploading...",
        WorkflowPhase::Matching => "Matching Algorithm...",
        WorkflowPhase::Matched => "Match found",
        WorkflowPhase::Failed => "Match failed",
    }
}

fn render_outcome(session: &UploadSession) -> String {
    let mut lines = Vec::new();
    match (&session.result, &session.failure) {
        (Some(result), _) => {
            let person = if result.person_label.is_empty() {
                "Unknown"
            } else {
                result.person_label.as_str()
            };
            lines.push(person.to_string());
            lines.push(format!("{}%", result.match_percent));
            lines.push("MATCH".to_string());
        }
        (None, Some(failure)) => lines.push(format!("no match: {}", failure.user_message())),
        (None, None) => lines.push("no match".to_string()),
    }
    if let Some(stored_path) = &session.stored_path {
        lines.push(format!("stored at {stored_path}"));
    }
    lines.join("\n")
}
