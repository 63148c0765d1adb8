//! Service configuration, loaded once at startup and read-only afterwards.
//!
//! Sources, in increasing priority: `picker.toml` in the working directory,
//! then `PICKER_*` environment variables (`PICKER_TOKENS__KEMONO_COOKIE`
//! style for nested fields). Extractors receive the config by reference —
//! no module-level globals.

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

/// How long a produced local file survives without an explicit release
/// signal before the watchdog deletes it.
pub const DEFAULT_FILE_TTL_SECS: u64 = 300;

/// Timeout for external extraction tools (yt-dlp, scraper binaries).
pub const SUBPROCESS_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the thin HTTP surface listens on.
    pub port: u16,
    /// Override for the temp directory; system temp when unset.
    pub temp_dir: Option<PathBuf>,
    /// Viewer template with `__LINK__` / `__HEADERS__` / `__PROXY__`
    /// placeholders for image hosts that check referers. Empty disables.
    pub img_viewer_service: String,
    /// Seconds before an unreleased local file self-deletes.
    pub file_ttl_secs: u64,
    pub ffmpeg_bin: String,
    pub ytdlp_bin: String,
    /// Socks5 proxy applied to the shared HTTP client and yt-dlp.
    pub proxy: Option<ProxyConfig>,
    pub tokens: Tokens,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub hostname: String,
    pub port: u16,
}

impl ProxyConfig {
    pub fn socks_url(&self) -> String {
        format!("socks5://{}:{}", self.hostname, self.port)
    }
}

/// Per-platform credentials. All optional; an extractor that needs a
/// missing token simply sends the request without it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Tokens {
    /// Path to the external tweet-scraper executable.
    pub twitter_scraper_bin: String,
    /// Cookies file consumed by the tweet scraper.
    pub twitter_cookies_file: String,
    /// One-line browser cookie for Instagram post JSON requests.
    pub instagram_cookie: String,
    /// Netscape cookies file handed to yt-dlp for Instagram reels.
    pub instagram_cookies_file: String,
    pub tumblr_api_key: String,
    pub kemono_cookie: String,
    pub joyreactor_cookie: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            temp_dir: None,
            img_viewer_service: String::new(),
            file_ttl_secs: DEFAULT_FILE_TTL_SECS,
            ffmpeg_bin: "ffmpeg".to_string(),
            ytdlp_bin: "yt-dlp".to_string(),
            proxy: None,
            tokens: Tokens::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("picker.toml"))
            .merge(Env::prefixed("PICKER_").split("__"))
            .extract()
    }

    /// Effective temp directory for downloads and remux outputs.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn file_ttl(&self) -> Duration {
        Duration::from_secs(self.file_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.ffmpeg_bin, "ffmpeg");
        assert_eq!(cfg.file_ttl().as_secs(), 300);
        assert!(cfg.proxy.is_none());
        assert!(cfg.temp_dir().is_absolute());
    }

    #[test]
    fn test_proxy_socks_url() {
        let proxy = ProxyConfig {
            hostname: "127.0.0.1".into(),
            port: 9050,
        };
        assert_eq!(proxy.socks_url(), "socks5://127.0.0.1:9050");
    }
}
