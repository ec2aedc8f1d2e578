//! YouTube audio to MIDI: `yt-dlp` fetches and extracts the audio, then
//! `basic-pitch` writes `<audio stem>_basic_pitch.mid` next to it.

use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

use super::discovery::{find_output, normalize_extension};
use super::error::ConvertError;
use super::process::{run_tool, ToolInvocation};
use super::ConversionOutput;
use crate::config::TranscribeConfig;
use crate::logger;

/// Suffix basic-pitch appends to the audio stem for its MIDI output
const BASIC_PITCH_SUFFIX: &str = "_basic_pitch";
const MIDI_EXTENSIONS: [&str; 2] = [".mid", ".midi"];

/// Accept only absolute http(s) URLs with a host
pub fn validate_url(raw: &str) -> Result<Url, ConvertError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConvertError::InvalidUrl("empty".to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| ConvertError::InvalidUrl(format!("{trimmed}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConvertError::InvalidUrl(trimmed.to_string()));
    }
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct AudioTranscriber {
    enabled: bool,
    yt_dlp: String,
    basic_pitch: String,
    audio_format: String,
    audio_quality: String,
    timeout_secs: Option<u64>,
    output_dir: PathBuf,
}

impl AudioTranscriber {
    pub fn new(config: &TranscribeConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: config.enabled,
            yt_dlp: config.yt_dlp_binary.clone(),
            basic_pitch: config.basic_pitch_binary.clone(),
            audio_format: config.audio_format.trim_start_matches('.').to_string(),
            audio_quality: config.audio_quality.clone(),
            timeout_secs: config.timeout_secs,
            output_dir: output_dir.into(),
        }
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    fn download_invocation(&self, job: &str, url: &Url) -> ToolInvocation {
        let template = self.output_dir.join(format!("{job}.%(ext)s"));
        ToolInvocation::new(&self.yt_dlp)
            .args(["-f", "bestaudio/best", "-x", "--audio-format"])
            .arg(&self.audio_format)
            .arg("--audio-quality")
            .arg(&self.audio_quality)
            .args(["--no-playlist", "-q", "-o"])
            .arg(template)
            .arg(url.as_str())
            .timeout_secs(self.timeout_secs)
    }

    fn pitch_invocation(&self, audio: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.basic_pitch)
            .arg(&self.output_dir)
            .arg(audio)
            .timeout_secs(self.timeout_secs)
    }

    /// Download, transcribe and return the MIDI file. Everything the job
    /// wrote besides the MIDI (`<job>.*`: partial downloads, the extracted
    /// audio) is removed whether or not transcription succeeds.
    pub async fn transcribe(&self, url: &Url) -> Result<ConversionOutput, ConvertError> {
        if !self.enabled {
            return Err(ConvertError::Disabled);
        }
        fs::create_dir_all(&self.output_dir).await?;

        let job = uuid::Uuid::new_v4().simple().to_string();
        logger::log_info(&format!("Transcription {job}: {url}"));

        let result = self.run_job(&job, url).await;
        self.remove_intermediates(&job).await;
        result
    }

    async fn run_job(&self, job: &str, url: &Url) -> Result<ConversionOutput, ConvertError> {
        run_tool(&self.download_invocation(job, url)).await?;
        let audio = find_output(
            &self.output_dir,
            &format!("{job}."),
            &[normalize_extension(&self.audio_format)],
        )
        .await?
        .ok_or_else(|| ConvertError::OutputMissing {
            stem: job.to_string(),
        })?;

        self.transcribe_audio(job, &audio).await
    }

    /// Delete `<job>.*` files left in the output directory
    async fn remove_intermediates(&self, job: &str) {
        let prefix = format!("{job}.");
        let mut entries = match fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                logger::log_warning(&format!(
                    "Failed to scan {}: {e}",
                    self.output_dir.display()
                ));
                return;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_intermediate = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix));
            if !is_intermediate {
                continue;
            }
            let path = entry.path();
            if let Err(e) = fs::remove_file(&path).await {
                logger::log_warning(&format!("Failed to remove {}: {e}", path.display()));
            }
        }
    }

    async fn transcribe_audio(
        &self,
        job: &str,
        audio: &Path,
    ) -> Result<ConversionOutput, ConvertError> {
        run_tool(&self.pitch_invocation(audio)).await?;

        let stem = format!("{job}{BASIC_PITCH_SUFFIX}");
        let extensions: Vec<String> = MIDI_EXTENSIONS.iter().map(|e| (*e).to_string()).collect();
        let path = find_output(&self.output_dir, &stem, &extensions)
            .await?
            .ok_or(ConvertError::OutputMissing { stem })?;
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
}
