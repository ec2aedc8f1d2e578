//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Leveled error, warning, info and debug logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::Level;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        Level::parse(config.effective_log_level()),
    )
}

fn write(level: Level, message: &str) {
    if let Some(w) = writer::get() {
        w.write(level, message);
    } else if level <= Level::Warn {
        eprintln!("{message}");
    } else {
        println!("{message}");
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write(Level::Info, "======================================");
    write(Level::Info, "scorebridge started");
    write(Level::Info, &format!("Listening on: http://{addr}"));
    write(
        Level::Info,
        &format!("Log level: {}", config.effective_log_level()),
    );
    if let Some(workers) = config.server.workers {
        write(Level::Info, &format!("Worker threads: {workers}"));
    }
    write(
        Level::Info,
        &format!("Uploads: {}", config.storage.upload_dir.display()),
    );
    write(
        Level::Info,
        &format!("Output: {}", config.storage.output_dir.display()),
    );
    if config.omr.mock_mode {
        write(Level::Info, "OMR: mock mode (canned MusicXML)");
    } else {
        write(Level::Info, &format!("OMR: {}", config.omr.binary));
    }
    if config.transcribe.enabled {
        write(
            Level::Info,
            &format!(
                "Transcription: {} + {}",
                config.transcribe.yt_dlp_binary, config.transcribe.basic_pitch_binary
            ),
        );
    }
    write(Level::Info, "======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write(Level::Debug, &format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write(
        Level::Error,
        &format!("[ERROR] Failed to serve connection: {err:?}"),
    );
}

pub fn log_error(message: &str) {
    write(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write(Level::Warn, &format!("[WARN] {message}"));
}

pub fn log_info(message: &str) {
    write(Level::Info, &format!("[INFO] {message}"));
}

pub fn log_debug(message: &str) {
    write(Level::Debug, &format!("[DEBUG] {message}"));
}

/// Log an external tool invocation before it runs
pub fn log_tool_start(program: &str, args: &[String]) {
    write(
        Level::Info,
        &format!("[Tool] Running: {program} {}", args.join(" ")),
    );
}

/// Log captured tool stderr; only shown at debug level
pub fn log_tool_stderr(program: &str, stderr: &str) {
    if stderr.trim().is_empty() {
        return;
    }
    for line in stderr.lines() {
        write(Level::Debug, &format!("[Tool] {program}: {line}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    if let Some(w) = writer::get() {
        w.write_access(&line);
    } else {
        println!("{line}");
    }
}

pub fn log_shutdown() {
    write(Level::Info, "[Shutdown] Stopped accepting connections");
}
