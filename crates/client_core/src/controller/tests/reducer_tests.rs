use super::*;

fn file(name: &str) -> SelectedFile {
    SelectedFile::new(name, name.as_bytes().to_vec())
}

fn whiskers() -> MatchResult {
    MatchResult {
        matched_image: vec![0, 0],
        matched_image_b64: "AAA".into(),
        confidence: 0.87,
        match_percent: 87,
        person_label: "Whiskers".into(),
    }
}

fn matching(name: &str) -> (UploadSession, RequestToken) {
    let session = reduce(UploadSession::default(), WorkflowEvent::FileSelected(file(name)));
    let session = reduce(session, WorkflowEvent::UploadStarted);
    let token = session.current_request.expect("token issued");
    let session = reduce(session, WorkflowEvent::RecognitionDispatched(token));
    (session, token)
}

#[test]
fn idle_session_has_nothing_to_show() {
    let session = UploadSession::default();
    assert_eq!(session.phase, WorkflowPhase::Idle);
    assert!(session.preview.is_none());
    assert!(session.result.is_none());
}

#[test]
fn selecting_a_file_derives_a_preview() {
    let session = reduce(
        UploadSession::default(),
        WorkflowEvent::FileSelected(file("cat.png")),
    );
    assert_eq!(session.phase, WorkflowPhase::Selected);
    let preview = session.preview.expect("preview");
    assert_eq!(preview.mime_type, "image/png");
    assert!(preview.to_data_uri().starts_with("data:image/png;base64,"));
    assert!(session.current_request.is_none());
}

#[test]
fn start_upload_without_file_is_a_no_op() {
    let session = reduce(UploadSession::default(), WorkflowEvent::UploadStarted);
    assert_eq!(session.phase, WorkflowPhase::Idle);
    assert_eq!(session.last_issued, RequestToken(0));
}

#[test]
fn start_upload_issues_token_and_dispatch_moves_to_matching() {
    let session = reduce(
        UploadSession::default(),
        WorkflowEvent::FileSelected(file("cat.png")),
    );
    let session = reduce(session, WorkflowEvent::UploadStarted);
    assert_eq!(session.phase, WorkflowPhase::Uploading);
    assert_eq!(session.current_request, Some(RequestToken(1)));
    assert!(session.preview.is_some());

    let session = reduce(session, WorkflowEvent::RecognitionDispatched(RequestToken(1)));
    assert_eq!(session.phase, WorkflowPhase::Matching);
    assert!(session.phase.is_pending());
}

#[test]
fn start_upload_while_matching_is_ignored() {
    let (session, token) = matching("cat.png");
    let session = reduce(session, WorkflowEvent::UploadStarted);
    assert_eq!(session.phase, WorkflowPhase::Matching);
    assert_eq!(session.current_request, Some(token));
    assert_eq!(session.last_issued, token);
}

#[test]
fn success_stores_result() {
    let (session, token) = matching("cat.png");
    let session = reduce(
        session,
        WorkflowEvent::RecognitionSucceeded {
            token,
            result: whiskers(),
        },
    );
    assert_eq!(session.phase, WorkflowPhase::Matched);
    assert_eq!(session.match_percent(), Some(87));
    assert_eq!(session.person_label(), Some("Whiskers"));
    assert!(session.failure.is_none());
    assert!(session.current_request.is_none());
}

#[test]
fn failure_clears_result_and_keeps_kind() {
    let (session, token) = matching("cat.png");
    let session = reduce(
        session,
        WorkflowEvent::RecognitionFailed {
            token,
            failure: RecognitionFailure::Status(500),
        },
    );
    assert_eq!(session.phase, WorkflowPhase::Failed);
    assert!(session.result.is_none());
    assert_eq!(session.failure, Some(RecognitionFailure::Status(500)));
    assert!(session.preview.is_some());
    assert!(session.current_request.is_none());
}

#[test]
fn rerun_after_match_clears_previous_result() {
    let (session, token) = matching("cat.png");
    let session = reduce(
        session,
        WorkflowEvent::RecognitionSucceeded {
            token,
            result: whiskers(),
        },
    );

    let session = reduce(session, WorkflowEvent::UploadStarted);
    assert_eq!(session.phase, WorkflowPhase::Uploading);
    assert!(session.result.is_none());
    assert_eq!(session.current_request, Some(token.next()));
}

#[test]
fn selecting_while_matching_discards_late_result() {
    let (session, stale_token) = matching("cat.png");
    let session = reduce(session, WorkflowEvent::FileSelected(file("dog.png")));
    assert_eq!(session.phase, WorkflowPhase::Selected);

    let session = reduce(
        session,
        WorkflowEvent::RecognitionSucceeded {
            token: stale_token,
            result: whiskers(),
        },
    );
    assert_eq!(session.phase, WorkflowPhase::Selected);
    assert!(session.result.is_none());
    assert_eq!(
        session.selected_file.as_ref().map(|f| f.name.as_str()),
        Some("dog.png")
    );
}

#[test]
fn response_from_previous_run_is_discarded() {
    let (session, first) = matching("cat.png");
    let session = reduce(session, WorkflowEvent::FileSelected(file("dog.png")));
    let session = reduce(session, WorkflowEvent::UploadStarted);
    let second = session.current_request.expect("second token");
    assert!(second > first);
    let session = reduce(session, WorkflowEvent::RecognitionDispatched(second));

    let session = reduce(
        session,
        WorkflowEvent::RecognitionFailed {
            token: first,
            failure: RecognitionFailure::Network("late".into()),
        },
    );
    assert_eq!(session.phase, WorkflowPhase::Matching);
    assert!(session.failure.is_none());
}

#[test]
fn stored_path_is_recorded_for_current_run_only() {
    let (session, token) = matching("cat.png");
    let session = reduce(
        session,
        WorkflowEvent::FileStored {
            token,
            public_path: "/uploads/cat.png".into(),
        },
    );
    assert_eq!(session.stored_path.as_deref(), Some("/uploads/cat.png"));

    let session = reduce(session, WorkflowEvent::FileSelected(file("dog.png")));
    let session = reduce(
        session,
        WorkflowEvent::FileStored {
            token,
            public_path: "/uploads/cat.png".into(),
        },
    );
    assert!(session.stored_path.is_none());
}

#[test]
fn stored_path_arriving_after_match_is_kept_for_latest_run_only() {
    let (session, token) = matching("cat.png");
    let session = reduce(
        session,
        WorkflowEvent::RecognitionSucceeded {
            token,
            result: whiskers(),
        },
    );
    assert!(session.current_request.is_none());

    let session = reduce(
        session,
        WorkflowEvent::FileStored {
            token,
            public_path: "/uploads/cat.png".into(),
        },
    );
    assert_eq!(session.phase, WorkflowPhase::Matched);
    assert_eq!(session.stored_path.as_deref(), Some("/uploads/cat.png"));

    let session = reduce(session, WorkflowEvent::UploadStarted);
    let session = reduce(session, WorkflowEvent::RecognitionDispatched(token.next()));
    let session = reduce(
        session,
        WorkflowEvent::RecognitionFailed {
            token: token.next(),
            failure: RecognitionFailure::Status(503),
        },
    );
    let session = reduce(
        session,
        WorkflowEvent::FileStored {
            token,
            public_path: "/uploads/old.png".into(),
        },
    );
    assert_eq!(session.phase, WorkflowPhase::Failed);
    assert!(session.stored_path.is_none());
}
