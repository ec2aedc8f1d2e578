//! Score recognition: PDF in, MusicXML out

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::discovery::find_output;
use super::error::{ConvertError, ToolError};
use super::process::{run_tool, ToolInvocation};
use super::upload::StoredUpload;
use super::ConversionOutput;
use crate::config::OmrConfig;
use crate::logger;

/// Canned score written in mock mode: one part, one measure, a whole-note C4
pub const MOCK_MUSICXML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <work>
    <work-title>Mock Conversion</work-title>
  </work>
  <identification>
    <encoding>
      <software>scorebridge mock mode</software>
    </encoding>
  </identification>
  <part-list>
    <score-part id="P1">
      <part-name>Piano</part-name>
    </score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>1</divisions>
        <key>
          <fifths>0</fifths>
        </key>
        <time>
          <beats>4</beats>
          <beat-type>4</beat-type>
        </time>
        <clef>
          <sign>G</sign>
          <line>2</line>
        </clef>
      </attributes>
      <note>
        <pitch>
          <step>C</step>
          <octave>4</octave>
        </pitch>
        <duration>4</duration>
        <type>whole</type>
      </note>
    </measure>
  </part>
</score-partwise>
"#;

/// Turns a stored score upload into a MusicXML file in the output directory
#[async_trait]
pub trait ScoreConverter: Send + Sync {
    async fn convert(&self, upload: &StoredUpload) -> Result<ConversionOutput, ConvertError>;

    /// Short label for logs
    fn name(&self) -> &'static str;
}

/// Writes [`MOCK_MUSICXML`] regardless of the input
#[derive(Debug, Clone)]
pub struct MockOmr {
    output_dir: PathBuf,
}

impl MockOmr {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl ScoreConverter for MockOmr {
    async fn convert(&self, upload: &StoredUpload) -> Result<ConversionOutput, ConvertError> {
        fs::create_dir_all(&self.output_dir).await?;
        let file_name = format!("{}.musicxml", upload.stem());
        let path = self.output_dir.join(&file_name);
        fs::write(&path, MOCK_MUSICXML).await?;
        logger::log_info(&format!(
            "Mock conversion of {} wrote {}",
            upload.original_name(),
            path.display()
        ));
        Ok(ConversionOutput {
            path,
            file_name,
            mocked: true,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Runs an OMR command-line tool and picks up what it wrote
#[derive(Debug, Clone)]
pub struct ExternalOmr {
    binary: String,
    args: Vec<String>,
    output_dir: PathBuf,
    output_extensions: Vec<String>,
    timeout_secs: Option<u64>,
    fallback: Option<MockOmr>,
}

impl ExternalOmr {
    pub fn new(config: &OmrConfig, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            binary: config.binary.clone(),
            args: config.args.clone(),
            fallback: config
                .fallback_to_mock
                .then(|| MockOmr::new(output_dir.clone())),
            output_dir,
            output_extensions: config.output_extensions.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// Expand `{input}` and `{output_dir}` in the configured arguments
    fn invocation(&self, input: &Path) -> ToolInvocation {
        let input = input.to_string_lossy();
        let output_dir = self.output_dir.to_string_lossy();
        ToolInvocation::new(&self.binary)
            .args(self.args.iter().map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output_dir}", &output_dir)
            }))
            .timeout_secs(self.timeout_secs)
    }
}

#[async_trait]
impl ScoreConverter for ExternalOmr {
    async fn convert(&self, upload: &StoredUpload) -> Result<ConversionOutput, ConvertError> {
        fs::create_dir_all(&self.output_dir).await?;

        match run_tool(&self.invocation(upload.path())).await {
            Ok(_) => {}
            Err(ToolError::NotFound { program }) => match &self.fallback {
                Some(mock) => {
                    logger::log_warning(&format!(
                        "{program} not found, falling back to mock conversion"
                    ));
                    return mock.convert(upload).await;
                }
                None => return Err(ToolError::NotFound { program }.into()),
            },
            Err(e) => return Err(e.into()),
        }

        let path = find_output(&self.output_dir, upload.stem(), &self.output_extensions)
            .await?
            .ok_or_else(|| ConvertError::OutputMissing {
                stem: upload.stem().to_string(),
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(ConversionOutput {
            path,
            file_name,
            mocked: false,
        })
    }

    fn name(&self) -> &'static str {
        "external"
    }
}

/// Pick the converter for the configuration
pub fn from_config(config: &OmrConfig, output_dir: &Path) -> Box<dyn ScoreConverter> {
    if config.mock_mode {
        Box::new(MockOmr::new(output_dir))
    } else {
        Box::new(ExternalOmr::new(config, output_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::upload::UploadStore;

    fn omr_config(binary: &str, args: &[&str]) -> OmrConfig {
        OmrConfig {
            binary: binary.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            mock_mode: false,
            fallback_to_mock: false,
            output_extensions: vec![".mxl".into(), ".musicxml".into(), ".xml".into()],
            timeout_secs: Some(10),
        }
    }

    async fn stored(dir: &Path, name: &str, data: &[u8]) -> StoredUpload {
        UploadStore::new(dir.join("uploads"), vec!["pdf".into()])
            .save(Some(name), data)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_mock_output_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockOmr::new(dir.path().join("out"));

        let a = mock.convert(&stored(dir.path(), "a.pdf", b"first").await).await.unwrap();
        let b = mock.convert(&stored(dir.path(), "b.pdf", b"second").await).await.unwrap();

        assert!(a.mocked);
        assert!(a.file_name.ends_with("_a.musicxml"));
        assert_eq!(std::fs::read_to_string(&a.path).unwrap(), MOCK_MUSICXML);
        assert_eq!(std::fs::read(&a.path).unwrap(), std::fs::read(&b.path).unwrap());
    }

    #[test]
    fn test_argument_expansion() {
        let omr = ExternalOmr::new(
            &omr_config(
                "audiveris",
                &["-batch", "-export", "-output", "{output_dir}", "--", "{input}"],
            ),
            "/data/out",
        );
        let inv = omr.invocation(Path::new("/data/uploads/x_score.pdf"));
        assert_eq!(inv.program(), "audiveris");
        assert_eq!(
            inv.arguments(),
            ["-batch", "-export", "-output", "/data/out", "--", "/data/uploads/x_score.pdf"]
        );
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let upload = stored(dir.path(), "score.pdf", b"%PDF").await;
        let omr = ExternalOmr::new(
            &omr_config("scorebridge-missing-omr", &["{input}"]),
            dir.path().join("out"),
        );
        let err = omr.convert(&upload).await.unwrap_err();
        assert!(matches!(err, ConvertError::Tool(ToolError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_binary_falls_back_to_mock() {
        let dir = tempfile::tempdir().unwrap();
        let upload = stored(dir.path(), "score.pdf", b"%PDF").await;
        let mut config = omr_config("scorebridge-missing-omr", &["{input}"]);
        config.fallback_to_mock = true;
        let omr = ExternalOmr::new(&config, dir.path().join("out"));
        let out = omr.convert(&upload).await.unwrap();
        assert!(out.mocked);
        assert!(out.path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_external_tool_output_is_discovered() {
        let dir = tempfile::tempdir().unwrap();
        let upload = stored(dir.path(), "score.pdf", b"%PDF").await;
        // Stand-in tool: writes <output_dir>/<input stem>.mxl
        let omr = ExternalOmr::new(
            &omr_config(
                "sh",
                &[
                    "-c",
                    "f=$(basename \"$1\" .pdf); printf zip > \"$0/$f.mxl\"",
                    "{output_dir}",
                    "{input}",
                ],
            ),
            dir.path().join("out"),
        );
        let out = omr.convert(&upload).await.unwrap();
        assert!(!out.mocked);
        assert_eq!(out.file_name, format!("{}.mxl", upload.stem()));
        assert_eq!(std::fs::read(&out.path).unwrap(), b"zip");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let upload = stored(dir.path(), "score.pdf", b"%PDF").await;
        let omr = ExternalOmr::new(&omr_config("true", &[]), dir.path().join("out"));
        let err = omr.convert(&upload).await.unwrap_err();
        assert!(matches!(err, ConvertError::OutputMissing { .. }));
    }
}
