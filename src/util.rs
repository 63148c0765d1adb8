//! Small shared helpers: size formatting, caption cleanup, viewer URLs.

use crate::config::Config;

const SIZE_UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

/// Format a byte count as e.g. `3.52 MB` (1024-based, two decimals).
pub fn human_readable_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0.00 B".to_string();
    }
    let power = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let power = power.min(SIZE_UNITS.len() - 1);
    format!("{:.2} {}", bytes as f64 / 1024f64.powi(power as i32), SIZE_UNITS[power])
}

/// Collapse whitespace runs into single spaces and trim the ends.
/// Platform-specific token stripping (e.g. trailing `t.co` short links)
/// happens in the extractor that knows about the token, before this.
pub fn clean_caption(caption: &str) -> String {
    let mut out = String::with_capacity(caption.len());
    let mut last_was_space = true;
    for c in caption.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Build a proxied viewer URL for image hosts that require a referer.
///
/// The configured template carries `__LINK__`, `__HEADERS__` (URL-encoded
/// JSON referer object) and `__PROXY__` placeholders. With no template
/// configured the original link is returned untouched.
pub fn form_viewer_url(cfg: &Config, link: &str, origin: &str, use_proxy: bool) -> String {
    if cfg.img_viewer_service.is_empty() {
        return link.to_string();
    }

    let headers = serde_json::json!({ "referer": origin }).to_string();

    cfg.img_viewer_service
        .replace("__LINK__", link)
        .replace("__HEADERS__", &urlencoding::encode(&headers))
        .replace("__PROXY__", if use_proxy { "1" } else { "0" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(0), "0.00 B");
        assert_eq!(human_readable_size(512), "512.00 B");
        assert_eq!(human_readable_size(1024), "1.00 kB");
        assert_eq!(human_readable_size(1_572_864), "1.50 MB");
        assert_eq!(human_readable_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_clean_caption_collapses_whitespace() {
        assert_eq!(clean_caption("  a\n\n b\t\tc  "), "a b c");
        assert_eq!(clean_caption(""), "");
        assert_eq!(clean_caption("plain"), "plain");
    }

    #[test]
    fn test_form_viewer_url_without_template_passes_through() {
        let cfg = Config::default();
        assert_eq!(
            form_viewer_url(&cfg, "https://i.example/img.png", "https://example", true),
            "https://i.example/img.png"
        );
    }

    #[test]
    fn test_form_viewer_url_fills_template() {
        let cfg = Config {
            img_viewer_service: "https://viewer/?link=__LINK__&headers=__HEADERS__&proxy=__PROXY__".into(),
            ..Config::default()
        };
        let formed = form_viewer_url(&cfg, "https://i.example/img.png", "https://example", false);
        assert!(formed.starts_with("https://viewer/?link=https://i.example/img.png&headers="));
        assert!(formed.ends_with("&proxy=0"));
        assert!(formed.contains("referer"));
    }
}
