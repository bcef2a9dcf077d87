/// External process execution.
///
/// Programs are spawned directly with an argument list, never through a
/// shell. Stdout is captured and returned; stderr is kept only for error
/// reporting.
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use tubeclip_shared::errors::ToolError;

/// Longest stderr tail kept in a [`ToolError::Failed`].
const STDERR_TAIL_CHARS: usize = 2000;

/// Runs an external program to completion and returns its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<String, ToolError>;
}

/// [`CommandRunner`] backed by `tokio::process`.
///
/// The child is killed if the returned future is dropped, so an abandoned
/// request does not leave a fetch running.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<String, ToolError> {
        debug!("Running {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let waited = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ToolError::Timeout {
                    program: program.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|source| ToolError::Io {
            program: program.to_string(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::Failed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: tail(stderr.trim(), STDERR_TAIL_CHARS),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
