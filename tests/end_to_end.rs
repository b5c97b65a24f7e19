use caption_monitor_lib::captions::{active_caption_at, load_captions_or_empty};
use caption_monitor_lib::job::UploadStatus;
use caption_monitor_lib::{
    Caption, CaptionId, ClientError, FlowEvent, FlowSettings, JobError, JobStatus, PreviewManager, UploadFlow,
    UploadResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;

mod common;

use common::{accepted, processing, video_file, FakeBackend, Submit};

fn flow_for(backend: &Arc<FakeBackend>, previews: &PreviewManager) -> UploadFlow {
    UploadFlow::new(backend.clone(), previews.clone(), FlowSettings::default())
}

#[tokio::test(start_paused = true)]
async fn streaming_job_succeeds_and_releases_preview() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let finished: JobStatus = serde_json::from_str(
        r#"{"is_processing": false, "progress": 100, "video": "/v/1.mp4", "subtitles": "/s/1.json"}"#,
    )
    .unwrap();
    let backend = Arc::new(FakeBackend::new(
        accepted(),
        vec![
            Ok(processing(30, "transcribing", vec![Caption::new(1, 0.0, 2.0, "hello")])),
            Ok(finished),
        ],
    ));
    let flow = flow_for(&backend, &previews);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let observer = async move {
        let mut preview_uri = None;
        let mut track = None;
        let mut active_at_one = None;
        while let Some(event) = rx.recv().await {
            match event {
                FlowEvent::PreviewReady { uri } => preview_uri = Some(uri),
                FlowEvent::Monitoring { captions } => track = Some(captions),
                FlowEvent::Snapshot(status) if status.is_processing => {
                    if let Some(track) = &track {
                        active_at_one = track.with_captions(|c| active_caption_at(1.0, c).map(|c| c.id.clone()));
                    }
                }
                FlowEvent::Snapshot(_) => {}
            }
        }
        (preview_uri, active_at_one)
    };

    let (result, (preview_uri, active_at_one)) = tokio::join!(flow.run(&file, Some(tx)), observer);

    let result = result.unwrap();
    assert_eq!(result.video, "/v/1.mp4");
    assert_eq!(result.subtitles, "/s/1.json");
    assert_eq!(active_at_one, Some(CaptionId::Number(1)));

    let preview_uri = preview_uri.expect("preview announced");
    let preview_path = preview_uri.trim_start_matches("file://");
    assert!(!std::path::Path::new(preview_path).exists());
    assert_eq!(previews.live_handles(), 0);
    assert!(file.exists());
}

#[tokio::test(start_paused = true)]
async fn backend_failure_surfaces_reason_and_stops_polling() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let failed: JobStatus = serde_json::from_str(
        r#"{"is_processing": false, "progress": 0, "current_stage": "unsupported codec"}"#,
    )
    .unwrap();
    let backend = Arc::new(FakeBackend::new(accepted(), vec![Ok(failed)]));

    let result = flow_for(&backend, &previews).run(&file, None).await;

    assert_eq!(result, Err(JobError::JobFailed("unsupported codec".into())));
    assert_eq!(result.unwrap_err().to_string(), "unsupported codec");
    assert_eq!(previews.live_handles(), 0);
    assert_eq!(backend.status_calls(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn synchronous_backend_skips_polling() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let backend = Arc::new(FakeBackend::new(
        Submit::Respond(UploadResponse {
            status: UploadStatus::Success,
            message: Some("processed".into()),
            video: Some("/api/files/a/a.mp4".into()),
            subtitles: Some("/api/files/a/a_chunked.json".into()),
        }),
        vec![],
    ));

    let result = flow_for(&backend, &previews).run(&file, None).await.unwrap();
    assert_eq!(result.subtitles, "/api/files/a/a_chunked.json");
    assert_eq!(backend.status_calls(), 0);
    assert_eq!(previews.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn synchronous_success_without_locators_is_malformed() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let backend = Arc::new(FakeBackend::new(
        Submit::Respond(UploadResponse {
            status: UploadStatus::Success,
            message: None,
            video: None,
            subtitles: None,
        }),
        vec![],
    ));

    let result = flow_for(&backend, &previews).run(&file, None).await;
    assert_eq!(result, Err(JobError::MalformedTerminalStatus));
    assert_eq!(previews.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn hanging_upload_times_out() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let backend = Arc::new(FakeBackend::new(Submit::Hang, vec![]));

    let started = tokio::time::Instant::now();
    let result = flow_for(&backend, &previews).run(&file, None).await;

    assert_eq!(result, Err(JobError::UploadTimeout));
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(previews.live_handles(), 0);
    assert_eq!(backend.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn client_side_timeout_maps_to_upload_timeout() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let backend = Arc::new(FakeBackend::new(Submit::Fail(ClientError::Timeout), vec![]));

    let result = flow_for(&backend, &previews).run(&file, None).await;
    assert_eq!(result, Err(JobError::UploadTimeout));
}

#[tokio::test(start_paused = true)]
async fn upload_transport_error_is_reported() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let backend = Arc::new(FakeBackend::new(
        Submit::Fail(ClientError::Status {
            code: 400,
            body: "invalid file type".into(),
        }),
        vec![],
    ));

    let result = flow_for(&backend, &previews).run(&file, None).await;
    match result {
        Err(JobError::UploadTransport(message)) => assert!(message.contains("invalid file type")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(previews.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn unsupported_file_is_rejected_before_upload() {
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("notes.txt");
    std::fs::write(&file, b"text").unwrap();
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let backend = Arc::new(FakeBackend::new(accepted(), vec![]));

    let result = flow_for(&backend, &previews).run(&file, None).await;
    assert!(matches!(result, Err(JobError::UnsupportedFile(_))));
    assert!(!tmp.path().join("previews").exists());
    assert_eq!(backend.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn unresponsive_status_endpoint_ends_the_flow() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let down = || Err(ClientError::Transport("connection refused".into()));
    let backend = Arc::new(FakeBackend::new(
        accepted(),
        vec![Ok(processing(10, "queued", vec![])), down(), down(), down(), down(), down()],
    ));

    let result = flow_for(&backend, &previews).run(&file, None).await;
    assert_eq!(result, Err(JobError::PollExhausted));
    assert_eq!(result.unwrap_err().to_string(), "status endpoint unresponsive");
    assert_eq!(previews.live_handles(), 0);

    let calls = backend.status_calls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.status_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn hung_status_requests_end_the_flow() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));
    let backend = Arc::new(FakeBackend::new(accepted(), vec![Ok(processing(10, "queued", vec![]))]).stalling());

    let result = flow_for(&backend, &previews).run(&file, None).await;
    assert_eq!(result, Err(JobError::PollExhausted));
    assert_eq!(backend.status_calls(), 6);
    assert_eq!(previews.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn a_new_attempt_starts_from_a_clean_slate() {
    let tmp = tempdir().unwrap();
    let file = video_file(tmp.path());
    let previews = PreviewManager::new(tmp.path().join("previews"));

    let failing = Arc::new(FakeBackend::new(Submit::Fail(ClientError::Timeout), vec![]));
    assert!(flow_for(&failing, &previews).run(&file, None).await.is_err());

    let finished = JobStatus {
        is_processing: false,
        progress: 100,
        result_video_ref: Some("/v/2.mp4".into()),
        result_captions_ref: Some("/s/2.json".into()),
        ..Default::default()
    };
    let working = Arc::new(FakeBackend::new(accepted(), vec![Ok(finished)]));
    let result = flow_for(&working, &previews).run(&file, None).await.unwrap();
    assert_eq!(result.video, "/v/2.mp4");
    assert_eq!(previews.live_handles(), 0);
}

#[tokio::test]
async fn finished_captions_drive_the_synchronizer() {
    let backend = FakeBackend::new(accepted(), vec![]).with_captions(Ok(vec![
        Caption::new(0, 0.0, 2.0, "first"),
        Caption::new(1, 2.5, 4.0, "second"),
    ]));
    let track = load_captions_or_empty(&backend, "/s/1.json").await;
    assert_eq!(
        track.with_captions(|c| active_caption_at(3.0, c).map(|c| c.text.clone())),
        Some("second".to_string())
    );

    let broken = FakeBackend::new(accepted(), vec![]);
    let track = load_captions_or_empty(&broken, "/s/missing.json").await;
    assert!(track.is_empty());
}
