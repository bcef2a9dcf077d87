//! Tubeclip Downloader
//!
//! Drives the external media tools: yt-dlp for fetching and ffmpeg for
//! trimming. Processes are spawned with argument lists, never through a shell.

pub mod ffmpeg;
pub mod filename;
pub mod probe;
pub mod runner;
pub mod tools;
pub mod ytdlp;

pub use probe::Tool;
pub use runner::{CommandRunner, ProcessRunner};
pub use tools::MediaTools;
