// Application state module
// Everything a request handler needs, built once at startup

use std::io;
use std::path::PathBuf;

use super::types::Config;
use crate::convert::{omr, AudioTranscriber, ScoreConverter, UploadStore};
use crate::handler::Pages;
use crate::http::FlashSigner;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("cannot create directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to load templates: {0}")]
    Template(#[from] minijinja::Error),
}

/// Application state
pub struct AppState {
    pub config: Config,
    pub uploads: UploadStore,
    pub converter: Box<dyn ScoreConverter>,
    pub transcriber: AudioTranscriber,
    pub flash: FlashSigner,
    pub pages: Pages,
}

impl AppState {
    /// Create the working directories and wire up the converters
    pub fn new(config: &Config) -> Result<Self, StartupError> {
        let storage = &config.storage;
        for dir in [&storage.upload_dir, &storage.output_dir] {
            std::fs::create_dir_all(dir).map_err(|source| StartupError::Directory {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            config: config.clone(),
            uploads: UploadStore::new(
                storage.upload_dir.clone(),
                storage.allowed_extensions.clone(),
            ),
            converter: omr::from_config(&config.omr, &storage.output_dir),
            transcriber: AudioTranscriber::new(&config.transcribe, storage.output_dir.clone()),
            flash: FlashSigner::new(&config.flash.secret_key, config.flash.cookie_name.clone()),
            pages: Pages::new()?,
        })
    }
}
