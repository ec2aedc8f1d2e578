use std::io;

/// Problems with the submitted score file
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file part in request")]
    MissingFile,
    #[error("no file selected")]
    EmptyFilename,
    #[error("uploaded file is empty")]
    EmptyContent,
    #[error("file type not allowed: {0}")]
    DisallowedExtension(String),
    #[error("filename {0:?} has no usable characters")]
    UnsafeFilename(String),
    #[error("failed to store upload: {0}")]
    Io(#[from] io::Error),
}

/// Failures running an external program
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{program} not found")]
    NotFound { program: String },
    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("{program} did not finish within {secs}s")]
    TimedOut { program: String, secs: u64 },
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

/// Everything that can end a conversion request
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("no output matching {stem:?} was produced")]
    OutputMissing { stem: String },
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("audio transcription is disabled")]
    Disabled,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ConvertError {
    /// Text shown to the user in the flash message. Details stay in the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Upload(UploadError::MissingFile) => "No file part in the request.".to_string(),
            Self::Upload(UploadError::EmptyFilename) => "No file selected.".to_string(),
            Self::Upload(UploadError::EmptyContent) => "The uploaded file is empty.".to_string(),
            Self::Upload(UploadError::DisallowedExtension(_)) => {
                "Invalid file type. Please upload a PDF file.".to_string()
            }
            Self::Upload(UploadError::UnsafeFilename(_)) => "Invalid filename.".to_string(),
            Self::Upload(UploadError::Io(_)) | Self::Io(_) => {
                "Could not save the file on the server.".to_string()
            }
            Self::Tool(ToolError::NotFound { program }) => format!(
                "Conversion tool '{program}' is not installed on the server."
            ),
            Self::Tool(ToolError::Failed { program, .. } | ToolError::Io { program, .. }) => {
                format!("Conversion failed while running '{program}'.")
            }
            Self::Tool(ToolError::TimedOut { program, secs }) => {
                format!("'{program}' took longer than {secs} seconds and was stopped.")
            }
            Self::OutputMissing { .. } => {
                "Conversion finished but no output file was produced.".to_string()
            }
            Self::InvalidUrl(_) => "Please enter a valid YouTube URL.".to_string(),
            Self::Disabled => "Audio transcription is disabled on this server.".to_string(),
        }
    }
}
