//! yt-dlp integration: `--dump-json` subprocess wrapped into a typed schema.
//!
//! Extraction tools fail loud (unlike the encoder): a non-zero exit,
//! timeout, or unparseable stdout is a hard `Subprocess`/`Json` error for
//! the calling extractor to surface.

use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::{Config, SUBPROCESS_TIMEOUT_SECS};
use crate::error::ExtractError;

/// One format entry from yt-dlp's JSON dump. Sizes come through as floats
/// for some sites, so both size fields stay `f64` until [`YtDlpFormat::size`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtDlpFormat {
    #[serde(default)]
    pub url: String,
    pub ext: Option<String>,
    pub format_id: Option<String>,
    pub format_note: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
}

impl YtDlpFormat {
    pub fn has_video(&self) -> bool {
        matches!(&self.vcodec, Some(codec) if !codec.is_empty() && codec != "none")
    }

    pub fn has_audio(&self) -> bool {
        matches!(&self.acodec, Some(codec) if !codec.is_empty() && codec != "none")
    }

    /// Exact size if reported, approximate otherwise.
    pub fn size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx).map(|s| s as u64)
    }

    /// Codec family, e.g. `avc1.64001F` → `avc1`.
    pub fn codec_family(codec: &Option<String>) -> String {
        codec
            .as_deref()
            .unwrap_or("none")
            .split('.')
            .next()
            .unwrap_or("none")
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtDlpOutput {
    pub uploader: Option<String>,
    pub uploader_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub formats: Vec<YtDlpFormat>,
}

/// Run `yt-dlp <url> --dump-json` and parse the result. `cookies_file`
/// is forwarded when the platform needs a session (Instagram reels).
pub async fn dump_json(cfg: &Config, url: &str, cookies_file: Option<&str>) -> Result<YtDlpOutput, ExtractError> {
    let mut cmd = Command::new(&cfg.ytdlp_bin);
    cmd.arg(url).arg("--dump-json").arg("--no-warnings");

    if let Some(proxy) = &cfg.proxy {
        cmd.arg("--proxy").arg(proxy.socks_url());
    }
    if let Some(cookies) = cookies_file {
        if !cookies.is_empty() {
            cmd.arg("--cookies").arg(cookies);
        }
    }

    let output = timeout(
        std::time::Duration::from_secs(SUBPROCESS_TIMEOUT_SECS),
        cmd.output(),
    )
    .await
    .map_err(|_| ExtractError::subprocess(&cfg.ytdlp_bin, format!("timed out on {url}")))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::subprocess(
            &cfg.ytdlp_bin,
            format!("exit {:?} on {url}: {}", output.status.code(), stderr.trim()),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(serde_json::from_str(&stdout)?)
}
