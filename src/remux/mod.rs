//! Video/audio remux subsystem.
//!
//! Merges separately-hosted video and audio streams into one deliverable
//! file, converts codecs the delivery target cannot play, and assembles
//! Pixiv ugoira animations from frame zips — all through the external
//! encoder binary, all failing soft: any error degrades to the original
//! external URL (or to "no media" for ugoira), never to a rejection.
//!
//! Temp files are named `picker_<sha256(source ‖ unix-millis)>_<role>` in
//! the shared temp directory, so concurrent requests never collide, and
//! every exit path removes what it created.

pub mod hooks;
pub mod merge;
pub mod ugoira;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::ExtractError;

pub use merge::{convert, merge, MergeOptions, RemuxResult};

/// Collision-resistant temp-name stem for one remux operation.
pub(crate) fn temp_base(source: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let digest = Sha256::digest(format!("{source}_{millis}").as_bytes());
    format!("picker_{}", hex::encode(digest))
}

/// File extension of a source URL with any query stripped; `mp4` fallback.
pub(crate) fn source_extension(source: &str) -> String {
    let without_query = source.split('?').next().unwrap_or(source);
    match without_query.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(char::is_alphanumeric) => {
            ext.to_string()
        }
        _ => "mp4".to_string(),
    }
}

pub(crate) fn remove_quiet(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to remove temp file {}: {}", path.display(), e);
        }
    }
}

/// Run the configured encoder with an argument vector (never a shell
/// string). Non-zero exit *or any stderr output* is a failure — the
/// encoder runs at `-loglevel error`, so stderr only carries real errors.
pub(crate) async fn run_encoder(cfg: &Config, args: &[&str], cwd: Option<&Path>) -> Result<(), ExtractError> {
    let mut cmd = tokio::process::Command::new(&cfg.ffmpeg_bin);
    cmd.args(["-hide_banner", "-loglevel", "error", "-y"]);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd.output().await?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        return Err(ExtractError::subprocess(
            &cfg.ffmpeg_bin,
            format!("exit {:?}: {}", output.status.code(), stderr.trim()),
        ));
    }
    if !stderr.trim().is_empty() {
        return Err(ExtractError::subprocess(&cfg.ffmpeg_bin, stderr.trim().to_string()));
    }

    Ok(())
}
