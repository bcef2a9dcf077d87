/// Error types shared by the Tubeclip crates.
use thiserror::Error;

/// Errors raised while running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while waiting for {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("Unexpected output from {program}: {message}")]
    InvalidOutput { program: String, message: String },
}

impl ToolError {
    /// Whether the binary could not be started at all.
    pub fn is_spawn(&self) -> bool {
        matches!(self, ToolError::Spawn { .. })
    }
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    NotANumber { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}
