/// Runtime configuration read from the process environment.
///
/// Every value has a default; `.env` files are honoured when the binary calls
/// `dotenvy::dotenv()` before [`Config::from_env`].
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_TEMP_DIR: &str = "./temp";
pub const DEFAULT_STATIC_DIR: &str = "./public";
pub const DEFAULT_RETENTION_SECS: u64 = 30 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10 * 60;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30 * 60;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_YTDLP_BIN: &str = "yt-dlp";
pub const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub temp_dir: PathBuf,
    pub static_dir: PathBuf,
    pub retention: Duration,
    pub sweep_interval: Duration,
    /// `None` means fetch and transcode commands may run indefinitely.
    pub command_timeout: Option<Duration>,
    pub probe_timeout: Duration,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            command_timeout: Some(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS)),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            ytdlp_bin: DEFAULT_YTDLP_BIN.to_string(),
            ffmpeg_bin: DEFAULT_FFMPEG_BIN.to_string(),
        }
    }
}

impl Config {
    /// Read configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Empty values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::NotANumber { key: "PORT", value })?,
            None => defaults.port,
        };

        let retention = parse_secs(get("TEMP_RETENTION_SECS"), "TEMP_RETENTION_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.retention);

        let sweep_interval = match parse_secs(get("SWEEP_INTERVAL_SECS"), "SWEEP_INTERVAL_SECS")? {
            Some(0) => return Err(ConfigError::Zero { key: "SWEEP_INTERVAL_SECS" }),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.sweep_interval,
        };

        let command_timeout = match parse_secs(get("COMMAND_TIMEOUT_SECS"), "COMMAND_TIMEOUT_SECS")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.command_timeout,
        };

        let probe_timeout = match parse_secs(get("PROBE_TIMEOUT_SECS"), "PROBE_TIMEOUT_SECS")? {
            Some(0) => return Err(ConfigError::Zero { key: "PROBE_TIMEOUT_SECS" }),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.probe_timeout,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            temp_dir: get("TEMP_DIR").map(PathBuf::from).unwrap_or(defaults.temp_dir),
            static_dir: get("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            retention,
            sweep_interval,
            command_timeout,
            probe_timeout,
            ytdlp_bin: get("YTDLP_BIN").unwrap_or(defaults.ytdlp_bin),
            ffmpeg_bin: get("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
        })
    }

    /// Address string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        match self.host.parse::<std::net::IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}

fn parse_secs(value: Option<String>, key: &'static str) -> Result<Option<u64>, ConfigError> {
    value
        .map(|v| v.parse::<u64>().map_err(|_| ConfigError::NotANumber { key, value: v }))
        .transpose()
}
