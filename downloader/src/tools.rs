/// High-level media operations over yt-dlp and ffmpeg.
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tubeclip_shared::config::Config;
use tubeclip_shared::errors::ToolError;
use tubeclip_shared::models::VideoInfo;

use crate::ffmpeg::{self, Segment};
use crate::probe::{self, Tool};
use crate::runner::CommandRunner;
use crate::ytdlp;

/// Entry point for every external-tool call the API makes.
#[derive(Clone)]
pub struct MediaTools {
    runner: Arc<dyn CommandRunner>,
    ytdlp_bin: String,
    ffmpeg_bin: String,
    command_timeout: Option<Duration>,
    probe_timeout: Duration,
}

impl MediaTools {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Self {
        Self {
            runner,
            ytdlp_bin: config.ytdlp_bin.clone(),
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            command_timeout: config.command_timeout,
            probe_timeout: config.probe_timeout,
        }
    }

    /// Executable configured for `tool`.
    pub fn program(&self, tool: Tool) -> &str {
        match tool {
            Tool::YtDlp => &self.ytdlp_bin,
            Tool::Ffmpeg => &self.ffmpeg_bin,
        }
    }

    pub async fn probe(&self, tool: Tool) -> bool {
        probe::probe(self.runner.as_ref(), self.program(tool), tool, self.probe_timeout).await
    }

    /// First tool in `required` that fails its probe, checked in order.
    pub async fn first_missing(&self, required: &[Tool]) -> Option<Tool> {
        for tool in required {
            if !self.probe(*tool).await {
                return Some(*tool);
            }
        }
        None
    }

    pub async fn fetch_info(&self, video_id: &str) -> Result<VideoInfo, ToolError> {
        let url = ytdlp::watch_url(video_id);
        let stdout = self.ytdlp(&ytdlp::info_args(&url)).await?;
        ytdlp::parse_info(&stdout).map_err(|e| ToolError::InvalidOutput {
            program: self.ytdlp_bin.clone(),
            message: e.to_string(),
        })
    }

    pub async fn fetch_title(&self, video_id: &str) -> Result<String, ToolError> {
        let url = ytdlp::watch_url(video_id);
        let stdout = self.ytdlp(&ytdlp::title_args(&url)).await?;
        Ok(ytdlp::parse_title(&stdout))
    }

    pub async fn download_video(&self, video_id: &str, output: &Path) -> Result<(), ToolError> {
        let url = ytdlp::watch_url(video_id);
        info!("Downloading video {}", video_id);
        self.ytdlp(&ytdlp::video_args(&url, output)).await?;
        Ok(())
    }

    pub async fn extract_audio(&self, video_id: &str, output: &Path) -> Result<(), ToolError> {
        let url = ytdlp::watch_url(video_id);
        info!("Extracting audio for {}", video_id);
        self.ytdlp(&ytdlp::audio_args(&url, output)).await?;
        Ok(())
    }

    pub async fn trim_audio(&self, input: &Path, output: &Path, segment: &Segment) -> Result<(), ToolError> {
        info!(
            "Trimming audio segment {}s..{}s ({}s)",
            segment.start(),
            segment.end(),
            segment.duration()
        );
        self.runner
            .run(&self.ffmpeg_bin, &ffmpeg::trim_args(input, output, segment), self.command_timeout)
            .await?;
        Ok(())
    }

    async fn ytdlp(&self, args: &[String]) -> Result<String, ToolError> {
        self.runner.run(&self.ytdlp_bin, args, self.command_timeout).await
    }
}
