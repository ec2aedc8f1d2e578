// Configuration module entry point
// Loads layered configuration and holds the shared application state

mod state;
mod types;

use std::collections::HashMap;
use std::net::SocketAddr;

pub use state::{AppState, StartupError};
pub use types::{
    Config, FlashConfig, HttpConfig, LoggingConfig, OmrConfig, ServerConfig, StorageConfig,
    TranscribeConfig,
};

/// Environment prefix for structured overrides, e.g. `SCOREBRIDGE_OMR__MOCK_MODE=true`
pub const ENV_PREFIX: &str = "SCOREBRIDGE";

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from the process environment.
    /// `SCOREBRIDGE_CONFIG` names the config file, "config.toml" otherwise.
    pub fn load() -> Result<Self, config::ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let path = env
            .get("SCOREBRIDGE_CONFIG")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path, &env)
    }

    /// Load configuration from specified file path (without extension) and
    /// an explicit environment map
    pub fn load_from(
        config_path: &str,
        env: &HashMap<String, String>,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.debug", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("http.server_name", "scorebridge")?
            .set_default("http.max_body_size", 16 * 1024 * 1024)? // 16MB
            .set_default("http.keep_alive", true)?
            .set_default("http.connection_timeout", 600)?
            .set_default("storage.upload_dir", "uploads")?
            .set_default("storage.output_dir", "output")?
            .set_default("storage.allowed_extensions", vec!["pdf"])?
            .set_default("omr.binary", "audiveris")?
            .set_default(
                "omr.args",
                vec!["-batch", "-export", "-output", "{output_dir}", "--", "{input}"],
            )?
            .set_default("omr.mock_mode", false)?
            .set_default("omr.fallback_to_mock", false)?
            .set_default("omr.output_extensions", vec![".mxl", ".musicxml", ".xml"])?
            .set_default("transcribe.enabled", true)?
            .set_default("transcribe.yt_dlp_binary", "yt-dlp")?
            .set_default("transcribe.basic_pitch_binary", "basic-pitch")?
            .set_default("transcribe.audio_format", "wav")?
            .set_default("transcribe.audio_quality", "192K")?
            .set_default("flash.secret_key", types::FlashConfig::DEFAULT_SECRET)?
            .set_default("flash.cookie_name", "scorebridge_flash")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("storage.allowed_extensions")
                    .with_list_parse_key("omr.output_extensions")
                    .source(Some(scoped_env(env))),
            )
            // Flat variables kept for deployments of the earlier apps
            .set_override_option("flash.secret_key", env.get("SECRET_KEY").cloned())?
            .set_override_option("server.port", env.get("PORT").cloned())?
            .set_override_option("server.debug", legacy_flag(env, &["DEBUG", "FLASK_DEBUG"]))?
            .set_override_option(
                "omr.mock_mode",
                legacy_flag(env, &["MOCK_MODE", "OMR_MOCK_MODE"]),
            )?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.flash.secret_key.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "flash.secret_key must not be empty".to_string(),
            ));
        }
        if self.server.workers == Some(0) {
            return Err(config::ConfigError::Message(
                "server.workers must be at least 1 when set".to_string(),
            ));
        }
        if self.http.connection_timeout == 0 {
            return Err(config::ConfigError::Message(
                "http.connection_timeout must be at least 1 second".to_string(),
            ));
        }
        if self.omr.output_extensions.is_empty() {
            return Err(config::ConfigError::Message(
                "omr.output_extensions must list at least one extension".to_string(),
            ));
        }
        if self.storage.allowed_extensions.is_empty() {
            return Err(config::ConfigError::Message(
                "storage.allowed_extensions must list at least one extension".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Log level after applying debug mode
    pub fn effective_log_level(&self) -> &str {
        if self.server.debug {
            "debug"
        } else {
            &self.logging.level
        }
    }
}

/// Only pass prefixed variables to the structured source; unrelated
/// variables with `__` in them would otherwise fail to parse.
fn scoped_env(env: &HashMap<String, String>) -> HashMap<String, String> {
    let prefix = format!("{ENV_PREFIX}_");
    env.iter()
        .filter(|(k, _)| k.starts_with(&prefix) && k.as_str() != "SCOREBRIDGE_CONFIG")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// First of `names` that is set, interpreted as a boolean flag
fn legacy_flag(env: &HashMap<String, String>, names: &[&str]) -> Option<bool> {
    names
        .iter()
        .find_map(|name| env.get(*name))
        .map(|value| parse_bool_flag(value))
}

/// `1`, `true`, `yes` and `on` (any case) are true; everything else is false
pub fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::load_from("does-not-exist", &HashMap::new()).unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert!(!cfg.server.debug);
        assert!(!cfg.omr.mock_mode);
        assert_eq!(cfg.omr.binary, "audiveris");
        assert_eq!(cfg.omr.output_extensions, vec![".mxl", ".musicxml", ".xml"]);
        assert_eq!(cfg.storage.allowed_extensions, vec!["pdf"]);
        assert!(cfg.flash.uses_default_secret());
        assert_eq!(cfg.effective_log_level(), "info");
    }

    #[test]
    fn test_legacy_variables() {
        let cfg = Config::load_from(
            "does-not-exist",
            &env(&[
                ("SECRET_KEY", "s3cret"),
                ("PORT", "8081"),
                ("FLASK_DEBUG", "1"),
                ("MOCK_MODE", "Yes"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.flash.secret_key, "s3cret");
        assert_eq!(cfg.server.port, 8081);
        assert!(cfg.server.debug);
        assert!(cfg.omr.mock_mode);
        assert_eq!(cfg.effective_log_level(), "debug");
    }

    #[test]
    fn test_prefixed_variables() {
        let cfg = Config::load_from(
            "does-not-exist",
            &env(&[
                ("SCOREBRIDGE_OMR__BINARY", "/opt/omr/bin/omr"),
                ("SCOREBRIDGE_STORAGE__OUTPUT_DIR", "/tmp/out"),
                ("SCOREBRIDGE_OMR__OUTPUT_EXTENSIONS", ".musicxml,.xml"),
                ("SCOREBRIDGE_TRANSCRIBE__ENABLED", "false"),
                ("UNRELATED__VALUE", "ignored"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.omr.binary, "/opt/omr/bin/omr");
        assert_eq!(cfg.storage.output_dir, std::path::PathBuf::from("/tmp/out"));
        assert_eq!(cfg.omr.output_extensions, vec![".musicxml", ".xml"]);
        assert!(!cfg.transcribe.enabled);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = Config::load_from("does-not-exist", &env(&[("SECRET_KEY", "  ")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let vars = env(&[("SCOREBRIDGE_SERVER__WORKERS", "0")]);
        assert!(Config::load_from("does-not-exist", &vars).is_err());

        let vars = env(&[("SCOREBRIDGE_SERVER__WORKERS", "2")]);
        let cfg = Config::load_from("does-not-exist", &vars).unwrap();
        assert_eq!(cfg.server.workers, Some(2));
    }

    #[test]
    fn test_zero_connection_timeout_rejected() {
        let vars = env(&[("SCOREBRIDGE_HTTP__CONNECTION_TIMEOUT", "0")]);
        assert!(Config::load_from("does-not-exist", &vars).is_err());
    }

    #[test]
    fn test_parse_bool_flag() {
        assert!(parse_bool_flag("TRUE"));
        assert!(parse_bool_flag(" on "));
        assert!(parse_bool_flag("1"));
        assert!(!parse_bool_flag("0"));
        assert!(!parse_bool_flag("false"));
        assert!(!parse_bool_flag(""));
    }
}
