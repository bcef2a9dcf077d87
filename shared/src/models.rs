/// Wire models shared across the Tubeclip crates.
use serde::{Deserialize, Serialize};

/// Metadata returned by `GET /api/info`.
///
/// Always serializes all four fields; values yt-dlp did not report become
/// `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub duration: Option<serde_json::Number>,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
}

/// Result of probing the external tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(rename = "ytDlp")]
    pub yt_dlp: bool,
    pub ffmpeg: bool,
}

impl HealthStatus {
    pub fn new(yt_dlp: bool, ffmpeg: bool) -> Self {
        Self {
            status: "ok".to_string(),
            yt_dlp,
            ffmpeg,
        }
    }
}

/// Public location of a preview file under the `/temp` mount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioPathResponse {
    #[serde(rename = "audioPath")]
    pub audio_path: String,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Report produced by one pass of the temp directory sweep.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}
