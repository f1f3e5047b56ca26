//! Video-source extraction: download the audio track, transcribe, clean up.
//!
//! ## Why a temp directory per invocation?
//!
//! The audio artifact is the pipeline's only shared mutable resource. A
//! fresh `TempDir` gives every invocation a collision-resistant location and
//! guarantees removal on every exit path — early returns, transcription
//! errors, panics — because cleanup rides on `Drop`. `keep_audio` opts out
//! for debugging; the kept path is logged.
//!
//! The download itself shells out to `yt-dlp`, the de-facto standard
//! downloader; bundling stream-extraction logic in-process would chase a
//! moving target.

use crate::backend::Backends;
use crate::config::StudyGuideConfig;
use crate::error::StudyGenError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

const DOWNLOADER: &str = "yt-dlp";

/// Download the audio track of `url` and return the transcript.
///
/// Any failure along the way — downloader missing or failing, audio over the
/// configured size ceiling, transcription error — surfaces as
/// [`StudyGenError::TranscriptionFailed`].
pub async fn transcribe_video(
    url: &str,
    config: &StudyGuideConfig,
    backends: &Backends,
) -> Result<String, StudyGenError> {
    let transcriber = backends.transcriber.as_ref().ok_or_else(|| {
        StudyGenError::ProviderNotConfigured {
            backend: "transcription".into(),
            hint: "Set OPENAI_API_KEY (or StudyGuideConfig::openai_api_key) to enable the youtube source kind.".into(),
        }
    })?;

    let temp_dir = TempDir::new()
        .map_err(|e| StudyGenError::Internal(format!("failed to create temp dir: {e}")))?;
    let audio_path = temp_dir.path().join("audio.m4a");

    download_audio(url, &audio_path).await?;
    let size = check_audio_size(&audio_path, config.max_audio_bytes).await?;
    debug!("downloaded {size} bytes of audio");

    let transcript = transcriber.transcribe(&audio_path).await?;
    info!("transcribed {} chars", transcript.len());

    if config.keep_audio {
        let kept: PathBuf = temp_dir.keep();
        warn!("keep_audio set — audio retained at {}", kept.display());
    }
    // otherwise the TempDir drop removes the artifact here

    Ok(transcript)
}

/// Enforce the transcription backend's size ceiling before any upload.
async fn check_audio_size(path: &Path, max_bytes: u64) -> Result<u64, StudyGenError> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| StudyGenError::TranscriptionFailed {
            detail: format!("downloaded audio unreadable: {e}"),
        })?
        .len();
    if size > max_bytes {
        return Err(StudyGenError::TranscriptionFailed {
            detail: format!("audio is {size} bytes, over the {max_bytes} byte ceiling"),
        });
    }
    Ok(size)
}

/// Invoke the downloader for the best available audio-only stream.
async fn download_audio(url: &str, dest: &Path) -> Result<(), StudyGenError> {
    let output = Command::new(DOWNLOADER)
        .arg("--no-playlist")
        .arg("--quiet")
        .args(["-f", "bestaudio[ext=m4a]/bestaudio"])
        .arg("-o")
        .arg(dest)
        .arg(url)
        .output()
        .await
        .map_err(|e| StudyGenError::TranscriptionFailed {
            detail: format!("failed to run {DOWNLOADER}: {e}. Is it installed and on PATH?"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StudyGenError::TranscriptionFailed {
            detail: format!("{DOWNLOADER} exited with {}: {}", output.status, stderr.trim()),
        });
    }
    if !dest.exists() {
        return Err(StudyGenError::TranscriptionFailed {
            detail: format!("{DOWNLOADER} reported success but produced no file"),
        });
    }
    Ok(())
}
