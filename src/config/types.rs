// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub omr: OmrConfig,
    pub transcribe: TranscribeConfig,
    pub flash: FlashConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Debug mode: forces debug log level and logs tool stderr
    pub debug: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level written: error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Largest accepted request body in bytes
    pub max_body_size: u64,
    pub keep_alive: bool,
    /// Upper bound on a single connection, in seconds. Must cover the
    /// slowest conversion since the request waits on the tool.
    pub connection_timeout: u64,
}

/// Where uploads and generated files live
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Extensions accepted for score uploads, without the leading dot
    pub allowed_extensions: Vec<String>,
}

/// Optical music recognition tool settings
#[derive(Debug, Deserialize, Clone)]
pub struct OmrConfig {
    pub binary: String,
    /// Arguments passed to the binary. `{input}` and `{output_dir}` are
    /// replaced per request.
    pub args: Vec<String>,
    /// Write the canned MusicXML document instead of running the binary
    pub mock_mode: bool,
    /// Use the canned document when the binary cannot be found
    pub fallback_to_mock: bool,
    /// Candidate output extensions, highest priority first
    pub output_extensions: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// YouTube audio to MIDI settings
#[derive(Debug, Deserialize, Clone)]
pub struct TranscribeConfig {
    pub enabled: bool,
    pub yt_dlp_binary: String,
    pub basic_pitch_binary: String,
    pub audio_format: String,
    pub audio_quality: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Flash message cookie settings
#[derive(Debug, Deserialize, Clone)]
pub struct FlashConfig {
    pub secret_key: String,
    pub cookie_name: String,
}

impl FlashConfig {
    pub const DEFAULT_SECRET: &'static str = "dev-secret-change-me";

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == Self::DEFAULT_SECRET
    }
}
