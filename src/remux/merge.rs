//! Merge and convert operations, both failing soft.
//!
//! `merge` downloads a video and an audio stream to temp files, copies the
//! video stream and transcodes audio to AAC into one output; `convert`
//! re-encodes a single video into a target codec pair. On *any* failure —
//! download, spawn, non-zero exit, stderr output — the operation resolves
//! to the untouched source URL and removes everything it wrote. A degraded
//! but playable external link beats a broken post.

use std::sync::Arc;

use crate::config::Config;
use crate::error::ExtractError;
use crate::fetch::Fetcher;
use crate::remux::hooks::DeferredFile;
use crate::remux::{remove_quiet, run_encoder, source_extension, temp_base};

/// Cap for looped outputs so a 10-second loop over a long track cannot
/// produce an unbounded file.
const LOOP_OUTPUT_SIZE_CAP: &str = "20M";

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Loop the video until the audio ends (gif-like sources).
    pub loop_video: bool,
    /// Loop the audio until the video ends.
    pub loop_audio: bool,
}

/// Outcome of a merge/convert. Callers must branch — `External` is the
/// fallback (nothing produced locally), `Local` hands over a file whose
/// deletion the receiver now owns via the handle.
#[derive(Debug, Clone)]
pub enum RemuxResult {
    External {
        url: String,
    },
    Local {
        file: Arc<DeferredFile>,
        filesize: Option<u64>,
        video_source: String,
        audio_source: Option<String>,
    },
}

impl RemuxResult {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

/// Merge separately-hosted video and audio into one local file.
///
/// No audio → short-circuit to the video URL (no work, no temp files).
/// Never returns an error: every failure path logs and falls back to
/// `External { url: video_url }`.
pub async fn merge(cfg: &Config, fetcher: &Fetcher, video_url: &str, audio_url: &str, options: MergeOptions) -> RemuxResult {
    if video_url.is_empty() || audio_url.is_empty() {
        return RemuxResult::External {
            url: video_url.to_string(),
        };
    }

    let temp_dir = cfg.temp_dir();
    let base = temp_base(video_url);
    let video_path = temp_dir.join(format!("{base}_video"));
    let audio_path = temp_dir.join(format!("{base}_audio"));
    let out_path = temp_dir.join(format!("{base}_out.{}", source_extension(video_url)));

    let result = run_merge(cfg, fetcher, video_url, audio_url, &video_path, &audio_path, &out_path, options).await;

    // Inputs are intermediate on every path.
    remove_quiet(&video_path);
    remove_quiet(&audio_path);

    match result {
        Ok(()) => RemuxResult::Local {
            filesize: std::fs::metadata(&out_path).map(|m| m.len()).ok(),
            file: DeferredFile::new(out_path),
            video_source: video_url.to_string(),
            audio_source: Some(audio_url.to_string()),
        },
        Err(e) => {
            log::warn!("merge failed for {video_url} + {audio_url}, falling back to source: {e}");
            remove_quiet(&out_path);
            RemuxResult::External {
                url: video_url.to_string(),
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_merge(
    cfg: &Config,
    fetcher: &Fetcher,
    video_url: &str,
    audio_url: &str,
    video_path: &std::path::Path,
    audio_path: &std::path::Path,
    out_path: &std::path::Path,
    options: MergeOptions,
) -> Result<(), ExtractError> {
    fetcher.download_to_file(video_url, video_path).await?;
    fetcher.download_to_file(audio_url, audio_path).await?;

    let video_arg = video_path.display().to_string();
    let audio_arg = audio_path.display().to_string();
    let out_arg = out_path.display().to_string();

    let mut args: Vec<&str> = Vec::new();
    if options.loop_video {
        args.extend(["-stream_loop", "-1"]);
    }
    args.extend(["-i", &video_arg]);
    if options.loop_audio && !options.loop_video {
        args.extend(["-stream_loop", "-1"]);
    }
    args.extend(["-i", &audio_arg]);
    if options.loop_video || options.loop_audio {
        args.extend(["-shortest", "-fs", LOOP_OUTPUT_SIZE_CAP]);
    }
    args.extend(["-c:v", "copy", "-c:a", "aac", "-q:a", "0"]);
    args.push(&out_arg);

    run_encoder(cfg, &args, None).await
}

/// Re-encode a single video into a codec pair the delivery target can
/// play. Same fail-soft contract as [`merge`].
pub async fn convert(
    cfg: &Config,
    fetcher: &Fetcher,
    video_url: &str,
    target_extension: &str,
    target_video_codec: &str,
    target_audio_codec: &str,
) -> RemuxResult {
    if video_url.is_empty() {
        return RemuxResult::External { url: String::new() };
    }

    let temp_dir = cfg.temp_dir();
    let base = temp_base(video_url);
    let in_path = temp_dir.join(format!("{base}_in"));
    let out_path = temp_dir.join(format!("{base}_out.{target_extension}"));

    let result: Result<(), ExtractError> = async {
        fetcher.download_to_file(video_url, &in_path).await?;
        let in_arg = in_path.display().to_string();
        let out_arg = out_path.display().to_string();
        run_encoder(
            cfg,
            &[
                "-i",
                &in_arg,
                "-c:v",
                target_video_codec,
                "-c:a",
                target_audio_codec,
                &out_arg,
            ],
            None,
        )
        .await
    }
    .await;

    remove_quiet(&in_path);

    match result {
        Ok(()) => RemuxResult::Local {
            filesize: std::fs::metadata(&out_path).map(|m| m.len()).ok(),
            file: DeferredFile::new(out_path),
            video_source: video_url.to_string(),
            audio_source: None,
        },
        Err(e) => {
            log::warn!("convert failed for {video_url}, falling back to source: {e}");
            remove_quiet(&out_path);
            RemuxResult::External {
                url: video_url.to_string(),
            }
        }
    }
}
