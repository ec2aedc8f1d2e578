//! Conversion core
//!
//! Validates inputs, runs the external tools and locates their output.
//! Nothing here knows about HTTP; handlers map [`ConvertError`] to flash
//! messages.

pub mod discovery;
pub mod error;
pub mod omr;
pub mod process;
pub mod transcribe;
pub mod upload;

use std::path::PathBuf;

pub use error::{ConvertError, ToolError, UploadError};
pub use omr::{ExternalOmr, MockOmr, ScoreConverter, MOCK_MUSICXML};
pub use transcribe::{validate_url, AudioTranscriber};
pub use upload::{secure_filename, StoredUpload, UploadStore};

use crate::logger;

/// A file produced in the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub path: PathBuf,
    /// Bare file name, as used in `/download/<file_name>`
    pub file_name: String,
    /// Written by mock mode rather than a real tool
    pub mocked: bool,
}

/// Convert a stored upload, removing it again if conversion fails
pub async fn convert_upload(
    uploads: &UploadStore,
    converter: &dyn ScoreConverter,
    upload: StoredUpload,
) -> Result<ConversionOutput, ConvertError> {
    logger::log_info(&format!(
        "Converting {} with {} converter",
        upload.stored_name(),
        converter.name()
    ));
    match converter.convert(&upload).await {
        Ok(output) => {
            logger::log_info(&format!(
                "Converted {} -> {}",
                upload.original_name(),
                output.file_name
            ));
            Ok(output)
        }
        Err(e) => {
            logger::log_error(&format!("Conversion of {} failed: {e}", upload.stored_name()));
            uploads.remove(&upload).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OmrConfig;

    #[tokio::test]
    async fn test_failed_conversion_removes_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), vec!["pdf".into()]);
        let upload = store.save(Some("score.pdf"), b"%PDF-1.7").await.unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());

        let converter = ExternalOmr::new(
            &OmrConfig {
                binary: "scorebridge-missing-omr".into(),
                args: vec!["{input}".into()],
                mock_mode: false,
                fallback_to_mock: false,
                output_extensions: vec![".mxl".into()],
                timeout_secs: None,
            },
            dir.path().join("out"),
        );
        let err = convert_upload(&store, &converter, upload).await.unwrap_err();
        assert!(matches!(err, ConvertError::Tool(ToolError::NotFound { .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_successful_conversion_keeps_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), vec!["pdf".into()]);
        let upload = store.save(Some("score.pdf"), b"%PDF-1.7").await.unwrap();
        let path = upload.path().to_path_buf();

        let out = convert_upload(&store, &MockOmr::new(dir.path().join("out")), upload)
            .await
            .unwrap();
        assert!(out.mocked);
        assert!(out.path.exists());
        assert!(path.exists());
    }
}
