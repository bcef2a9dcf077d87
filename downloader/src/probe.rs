/// Presence checks for the external tools.
use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::runner::CommandRunner;

/// External tools the service depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    YtDlp,
    Ffmpeg,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::YtDlp => "yt-dlp",
            Tool::Ffmpeg => "ffmpeg",
        }
    }

    /// Arguments of the tool's version-check invocation.
    pub fn version_args(&self) -> &'static [&'static str] {
        match self {
            Tool::YtDlp => &["--version"],
            Tool::Ffmpeg => &["-version"],
        }
    }

    pub fn install_hint(&self) -> &'static str {
        match self {
            Tool::YtDlp => "pip install yt-dlp",
            Tool::Ffmpeg => "brew install ffmpeg (macOS) or apt install ffmpeg (Debian/Ubuntu)",
        }
    }

    /// Client-facing message for a request that needs this tool.
    pub fn missing_message(&self) -> String {
        format!(
            "{} is not installed. Please install it first ({}).",
            self.name(),
            self.install_hint()
        )
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether `program` answers the version check for `tool` within `timeout`.
/// Any failure reads as "absent".
pub async fn probe(runner: &dyn CommandRunner, program: &str, tool: Tool, timeout: Duration) -> bool {
    let args: Vec<String> = tool.version_args().iter().map(|a| a.to_string()).collect();
    match runner.run(program, &args, Some(timeout)).await {
        Ok(_) => true,
        Err(e) => {
            debug!("Probe for {} failed: {}", tool, e);
            false
        }
    }
}
