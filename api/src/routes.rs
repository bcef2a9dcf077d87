/// API route handlers for Tubeclip.
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use tubeclip_downloader::ffmpeg::Segment;
use tubeclip_downloader::filename::{attachment_name, MediaKind, FULL_AUDIO_SUFFIX};
use tubeclip_downloader::{ytdlp, MediaTools, Tool};
use tubeclip_shared::models::{AudioPathResponse, HealthStatus, VideoInfo};
use tubeclip_shared::temp_storage::{TempFile, TempStorage};

use crate::delivery;
use crate::error::{execution_failed, ApiError, ApiResult};
use crate::AppState;

// ====== REQUEST TYPES ======

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoQuery {
    pub video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoBody {
    pub video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentBody {
    pub video_id: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

// ====== VALIDATION ======

fn require_video_id(raw: Option<&str>) -> ApiResult<String> {
    let id = raw.map(str::trim).unwrap_or("");
    if id.is_empty() {
        return Err(ApiError::bad_request("Video ID is required"));
    }
    if !ytdlp::is_valid_video_id(id) {
        return Err(ApiError::bad_request("Video ID is invalid"));
    }
    Ok(id.to_string())
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))
}

async fn require_tools(tools: &MediaTools, required: &[Tool]) -> ApiResult<()> {
    if let Some(tool) = tools.first_missing(required).await {
        warn!("Rejecting request: {} is not available", tool);
        return Err(ApiError::internal(tool.missing_message()));
    }
    Ok(())
}

/// Look up the title and stream `file` under a name derived from it.
async fn deliver(
    tools: &MediaTools,
    video_id: &str,
    file: TempFile,
    kind: MediaKind,
    failure: &'static str,
) -> ApiResult<Response> {
    let title = tools
        .fetch_title(video_id)
        .await
        .map_err(execution_failed(failure))?;
    let name = attachment_name(&title, kind);

    delivery::attachment(file, &name, kind.content_type())
        .await
        .map_err(|e| {
            error!("{}: cannot open produced file: {}", failure, e);
            ApiError::internal(failure)
        })
}

// ====== VIDEO ROUTES ======

/// GET /api/info?videoId=...
pub async fn get_info(
    State(state): State<Arc<AppState>>,
    query: Result<Query<InfoQuery>, QueryRejection>,
) -> ApiResult<Json<VideoInfo>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let video_id = require_video_id(query.video_id.as_deref())?;
    require_tools(&state.tools, &[Tool::YtDlp]).await?;

    let info = state
        .tools
        .fetch_info(&video_id)
        .await
        .map_err(execution_failed("Failed to fetch video information"))?;

    Ok(Json(info))
}

/// POST /api/download-video
pub async fn download_video(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VideoBody>, JsonRejection>,
) -> ApiResult<Response> {
    const FAILURE: &str = "Failed to download video";

    let body = json_body(payload)?;
    let video_id = require_video_id(body.video_id.as_deref())?;
    require_tools(&state.tools, &[Tool::YtDlp]).await?;

    let job = TempStorage::new_job_id();
    let output = state.storage.temp_file(&job, MediaKind::Video.temp_suffix());

    state
        .tools
        .download_video(&video_id, output.path())
        .await
        .map_err(execution_failed(FAILURE))?;

    deliver(&state.tools, &video_id, output, MediaKind::Video, FAILURE).await
}

// ====== AUDIO ROUTES ======

/// POST /api/download-audio
pub async fn download_audio(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VideoBody>, JsonRejection>,
) -> ApiResult<Response> {
    const FAILURE: &str = "Failed to extract audio";

    let body = json_body(payload)?;
    let video_id = require_video_id(body.video_id.as_deref())?;
    require_tools(&state.tools, &[Tool::YtDlp, Tool::Ffmpeg]).await?;

    let job = TempStorage::new_job_id();
    let output = state.storage.temp_file(&job, MediaKind::Audio.temp_suffix());

    state
        .tools
        .extract_audio(&video_id, output.path())
        .await
        .map_err(execution_failed(FAILURE))?;

    deliver(&state.tools, &video_id, output, MediaKind::Audio, FAILURE).await
}

/// POST /api/download-audio-segment
pub async fn download_audio_segment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SegmentBody>, JsonRejection>,
) -> ApiResult<Response> {
    const FAILURE: &str = "Failed to extract audio segment";

    let body = json_body(payload)?;
    let video_id = require_video_id(body.video_id.as_deref())?;
    let (start, end) = match (body.start_time, body.end_time) {
        (Some(start), Some(end)) => (start, end),
        _ => return Err(ApiError::bad_request("Start time and end time are required")),
    };
    let segment = Segment::new(start, end).map_err(|e| ApiError::bad_request(e.to_string()))?;
    require_tools(&state.tools, &[Tool::YtDlp, Tool::Ffmpeg]).await?;

    let job = TempStorage::new_job_id();
    let full = state.storage.temp_file(&job, FULL_AUDIO_SUFFIX);
    let output = state.storage.temp_file(&job, MediaKind::Segment.temp_suffix());

    state
        .tools
        .extract_audio(&video_id, full.path())
        .await
        .map_err(execution_failed(FAILURE))?;
    state
        .tools
        .trim_audio(full.path(), output.path(), &segment)
        .await
        .map_err(execution_failed(FAILURE))?;
    full.remove().await;

    deliver(&state.tools, &video_id, output, MediaKind::Segment, FAILURE).await
}

/// POST /api/get-audio - Extract audio for in-browser preview. The file is
/// served from `/temp` and left for the sweep to reclaim.
pub async fn get_audio(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VideoBody>, JsonRejection>,
) -> ApiResult<Json<AudioPathResponse>> {
    let body = json_body(payload)?;
    let video_id = require_video_id(body.video_id.as_deref())?;
    require_tools(&state.tools, &[Tool::YtDlp, Tool::Ffmpeg]).await?;

    let job = TempStorage::new_job_id();
    let output = state.storage.temp_file(&job, MediaKind::Audio.temp_suffix());

    state
        .tools
        .extract_audio(&video_id, output.path())
        .await
        .map_err(execution_failed("Failed to extract audio"))?;

    let name = output.file_name();
    output.persist();
    info!("Preview audio ready: {}", name);

    Ok(Json(AudioPathResponse {
        audio_path: format!("/temp/{}", name),
    }))
}

// ====== HEALTH ======

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    let (yt_dlp, ffmpeg) = tokio::join!(
        state.tools.probe(Tool::YtDlp),
        state.tools.probe(Tool::Ffmpeg)
    );
    Json(HealthStatus::new(yt_dlp, ffmpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;
    use tubeclip_downloader::CommandRunner;
    use tubeclip_shared::config::Config;
    use tubeclip_shared::errors::ToolError;

    const INFO_JSON: &str = r#"{"id":"abc123","title":"My:Video?","duration":42,"uploader":"Someone","thumbnail":"https://img/x.jpg","view_count":7,"formats":[]}"#;

    /// Stand-in for yt-dlp and ffmpeg. Writes the files the real tools would.
    #[derive(Default)]
    struct StubRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        missing: Vec<&'static str>,
        fail_downloads: bool,
        fail_trim: bool,
        fail_title: bool,
    }

    impl StubRunner {
        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn failed(program: &str, stderr: &str) -> ToolError {
        ToolError::Failed {
            program: program.to_string(),
            status: "exit status: 1".to_string(),
            stderr: stderr.to_string(),
        }
    }

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
        args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1))
    }

    #[async_trait]
    impl CommandRunner for StubRunner {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            _timeout: Option<Duration>,
        ) -> Result<String, ToolError> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));

            if self.missing.iter().any(|m| *m == program) {
                return Err(ToolError::Spawn {
                    program: program.to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            if args.len() == 1 && args[0].ends_with("version") {
                return Ok("1.0\n".to_string());
            }

            match program {
                "yt-dlp" if args.iter().any(|a| a == "--dump-json") => Ok(INFO_JSON.to_string()),
                "yt-dlp" if args.iter().any(|a| a == "--print") => {
                    if self.fail_title {
                        return Err(failed(program, "ERROR: Unable to extract title"));
                    }
                    Ok("My:Video?\n".to_string())
                }
                "yt-dlp" => {
                    let out = arg_after(args, "-o").expect("output path");
                    std::fs::write(out, b"media-bytes").unwrap();
                    if self.fail_downloads {
                        return Err(failed(program, "ERROR: Video unavailable"));
                    }
                    Ok(String::new())
                }
                "ffmpeg" => {
                    std::fs::write(args.last().unwrap(), b"partial").unwrap();
                    if self.fail_trim {
                        return Err(failed(program, "Invalid data found when processing input"));
                    }
                    std::fs::write(args.last().unwrap(), b"segment-bytes").unwrap();
                    Ok(String::new())
                }
                other => panic!("unexpected program {}", other),
            }
        }
    }

    fn setup(stub: Arc<StubRunner>) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(TempStorage::new(dir.path()));
        let tools = MediaTools::new(stub, &Config::default());
        let app = build_router(Arc::new(AppState { storage, tools }), &dir.path().join("public"));
        (app, dir)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn leftover_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_info_returns_four_fields() {
        let stub = Arc::new(StubRunner::default());
        let (app, _dir) = setup(stub.clone());

        let response = app.oneshot(get("/api/info?videoId=abc123")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(obj["title"], "My:Video?");
        assert_eq!(obj["duration"], 42);
        assert_eq!(obj["uploader"], "Someone");
        assert_eq!(obj["thumbnail"], "https://img/x.jpg");

        let calls = stub.calls();
        assert_eq!(calls.last().unwrap().1.last().unwrap(), "https://www.youtube.com/watch?v=abc123");
    }

    #[tokio::test]
    async fn test_info_without_video_id_is_400() {
        let stub = Arc::new(StubRunner::default());
        let (app, _dir) = setup(stub.clone());

        let response = app.oneshot(get("/api/info")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Video ID is required");
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_video_id_never_runs_tools() {
        let stub = Arc::new(StubRunner::default());
        let (app, _dir) = setup(stub.clone());

        for uri in [
            "/api/download-video",
            "/api/download-audio",
            "/api/download-audio-segment",
            "/api/get-audio",
        ] {
            let response = app
                .clone()
                .oneshot(post_json(uri, serde_json::json!({ "videoId": "  " })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_video_id_rejected() {
        let stub = Arc::new(StubRunner::default());
        let (app, _dir) = setup(stub.clone());

        let response = app
            .oneshot(post_json("/api/download-video", serde_json::json!({ "videoId": "x\"; rm -rf /" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let stub = Arc::new(StubRunner::default());
        let (app, _dir) = setup(stub.clone());

        let request = Request::builder()
            .method("POST")
            .uri("/api/download-audio")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_segment_requires_valid_times() {
        let stub = Arc::new(StubRunner::default());
        let (app, _dir) = setup(stub.clone());

        let missing = app
            .clone()
            .oneshot(post_json(
                "/api/download-audio-segment",
                serde_json::json!({ "videoId": "abc123", "startTime": 5 }),
            ))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(missing).await["error"], "Start time and end time are required");

        let reversed = app
            .oneshot(post_json(
                "/api/download-audio-segment",
                serde_json::json!({ "videoId": "abc123", "startTime": 30, "endTime": 10 }),
            ))
            .await
            .unwrap();
        assert_eq!(reversed.status(), StatusCode::BAD_REQUEST);

        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_download_audio_streams_and_cleans_up() {
        let stub = Arc::new(StubRunner::default());
        let (app, dir) = setup(stub.clone());

        let response = app
            .oneshot(post_json("/api/download-audio", serde_json::json!({ "videoId": "abc123" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"My_Video_.mp3\""
        );
        assert_eq!(body_bytes(response).await, b"media-bytes");
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_download_video_names_mp4() {
        let stub = Arc::new(StubRunner::default());
        let (app, dir) = setup(stub.clone());

        let response = app
            .oneshot(post_json("/api/download-video", serde_json::json!({ "videoId": "abc123" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"My_Video_.mp4\""
        );
        body_bytes(response).await;
        assert_eq!(leftover_files(dir.path()), 0);
        // Video downloads do not need ffmpeg.
        assert!(stub.calls().iter().all(|(program, _)| program == "yt-dlp"));
    }

    #[tokio::test]
    async fn test_segment_trims_and_cleans_up() {
        let stub = Arc::new(StubRunner::default());
        let (app, dir) = setup(stub.clone());

        let response = app
            .oneshot(post_json(
                "/api/download-audio-segment",
                serde_json::json!({ "videoId": "abc123", "startTime": 12.5, "endTime": 42.5 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"My_Video__segment.mp3\""
        );
        assert_eq!(body_bytes(response).await, b"segment-bytes");
        assert_eq!(leftover_files(dir.path()), 0);

        let calls = stub.calls();
        let (_, trim) = calls.iter().find(|(program, args)| program == "ffmpeg" && args.len() > 1).unwrap();
        assert_eq!(arg_after(trim, "-ss").unwrap(), "12.5");
        assert_eq!(arg_after(trim, "-t").unwrap(), "30");
        assert!(arg_after(trim, "-i").unwrap().ends_with("_full.mp3"));
        assert!(trim.last().unwrap().ends_with("_segment.mp3"));
    }

    #[tokio::test]
    async fn test_failed_download_is_500_and_cleans_up() {
        let stub = Arc::new(StubRunner {
            fail_downloads: true,
            ..Default::default()
        });
        let (app, dir) = setup(stub.clone());

        let response = app
            .oneshot(post_json("/api/download-video", serde_json::json!({ "videoId": "abc123" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Failed to download video");
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_trim_is_500_and_cleans_up() {
        let stub = Arc::new(StubRunner {
            fail_trim: true,
            ..Default::default()
        });
        let (app, dir) = setup(stub.clone());

        let response = app
            .oneshot(post_json(
                "/api/download-audio-segment",
                serde_json::json!({ "videoId": "abc123", "startTime": 0, "endTime": 10 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Failed to extract audio segment");
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_title_lookup_cleans_up_produced_files() {
        let stub = Arc::new(StubRunner {
            fail_title: true,
            ..Default::default()
        });
        let (app, dir) = setup(stub.clone());

        for (uri, body) in [
            ("/api/download-video", serde_json::json!({ "videoId": "abc123" })),
            ("/api/download-audio", serde_json::json!({ "videoId": "abc123" })),
            (
                "/api/download-audio-segment",
                serde_json::json!({ "videoId": "abc123", "startTime": 1, "endTime": 2 }),
            ),
        ] {
            let response = app.clone().oneshot(post_json(uri, body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
            assert_eq!(leftover_files(dir.path()), 0, "{}", uri);
        }
        assert!(stub.calls().iter().any(|(_, args)| args.iter().any(|a| a == "--print")));
    }

    #[tokio::test]
    async fn test_client_disconnect_still_cleans_up() {
        let stub = Arc::new(StubRunner::default());
        let (app, dir) = setup(stub.clone());

        let response = app
            .oneshot(post_json("/api/download-audio", serde_json::json!({ "videoId": "abc123" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(leftover_files(dir.path()), 1);

        drop(response);
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_named_before_download() {
        let stub = Arc::new(StubRunner {
            missing: vec!["ffmpeg"],
            ..Default::default()
        });
        let (app, _dir) = setup(stub.clone());

        let response = app
            .oneshot(post_json("/api/download-audio", serde_json::json!({ "videoId": "abc123" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = body_json(response).await["error"].as_str().unwrap().to_string();
        assert!(message.starts_with("ffmpeg is not installed"));
        assert!(stub
            .calls()
            .iter()
            .all(|(_, args)| args.len() == 1 && args[0].ends_with("version")));
    }

    #[tokio::test]
    async fn test_get_audio_keeps_file_under_temp_mount() {
        let stub = Arc::new(StubRunner::default());
        let (app, dir) = setup(stub.clone());

        let response = app
            .clone()
            .oneshot(post_json("/api/get-audio", serde_json::json!({ "videoId": "abc123" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let audio_path = json["audioPath"].as_str().unwrap().to_string();
        assert!(audio_path.starts_with("/temp/"));
        assert!(audio_path.ends_with(".mp3"));
        assert_eq!(leftover_files(dir.path()), 1);

        let served = app.oneshot(get(&audio_path)).await.unwrap();
        assert_eq!(served.status(), StatusCode::OK);
        assert_eq!(body_bytes(served).await, b"media-bytes");
    }

    #[tokio::test]
    async fn test_health_reflects_probes() {
        let stub = Arc::new(StubRunner {
            missing: vec!["ffmpeg"],
            ..Default::default()
        });
        let (app, _dir) = setup(stub);

        let response = app.oneshot(get("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "status": "ok", "ytDlp": true, "ffmpeg": false })
        );
    }
}
