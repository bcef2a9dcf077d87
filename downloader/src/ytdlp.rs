/// yt-dlp invocation builders.
///
/// Each builder returns the argument list for one yt-dlp call; output paths
/// are always absolute locations inside the temp directory.
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use tubeclip_shared::models::VideoInfo;

/// Prefix every video id is appended to.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Format selector for full video downloads: mp4 video + m4a audio merged,
/// falling back to the best single mp4, then anything.
pub const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

static VIDEO_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap());

/// Whether `id` looks like a video id (letters, digits, `_`, `-`).
pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID_RE.is_match(id)
}

pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL_PREFIX, video_id)
}

/// `--dump-json` metadata request.
pub fn info_args(url: &str) -> Vec<String> {
    vec!["--dump-json".into(), "--no-warnings".into(), url.into()]
}

/// Title-only request; prints the title without downloading anything.
pub fn title_args(url: &str) -> Vec<String> {
    vec![
        "--no-warnings".into(),
        "--skip-download".into(),
        "--print".into(),
        "%(title)s".into(),
        url.into(),
    ]
}

/// Best video and audio merged into an mp4 at `output`.
pub fn video_args(url: &str, output: &Path) -> Vec<String> {
    vec![
        "-f".into(),
        VIDEO_FORMAT.into(),
        "--merge-output-format".into(),
        "mp4".into(),
        "-o".into(),
        output.to_string_lossy().into_owned(),
        url.into(),
    ]
}

/// Best audio extracted and converted to mp3 at `output`.
pub fn audio_args(url: &str, output: &Path) -> Vec<String> {
    vec![
        "-x".into(),
        "--audio-format".into(),
        "mp3".into(),
        "--audio-quality".into(),
        "0".into(),
        "-o".into(),
        output.to_string_lossy().into_owned(),
        url.into(),
    ]
}

/// Parse the first JSON document printed by `--dump-json`.
pub fn parse_info(stdout: &str) -> Result<VideoInfo, serde_json::Error> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    serde_json::from_str(line)
}

/// First non-empty line of a `--print` call.
pub fn parse_title(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .to_string()
}
