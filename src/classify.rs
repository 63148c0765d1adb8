//! URL → platform classification. Pure, total, no I/O.
//!
//! Hostname matching against a fixed ordered table; the first rule that
//! matches wins. Malformed input never errors — `safe_parse_url` falls back
//! through progressively more permissive parses and ends at an inert
//! placeholder.

use lazy_regex::regex_is_match;
use url::Url;

/// Closed set of supported platforms. Dispatch is an exhaustive match, so
/// adding a variant forces every routing site to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Platform {
    Twitter,
    TwitterDirect,
    Instagram,
    Pixiv,
    PixivDirect,
    Reddit,
    Tumblr,
    Youtube,
    Tiktok,
    Coub,
    Osnova,
    Joyreactor,
    Kemono,
    Danbooru,
    Gelbooru,
    Konachan,
    Yandere,
    Eshuushuu,
    Sankaku,
    Zerochan,
    AnimePictures,
}

/// Classifier output: the normalized URL plus the matched platform, if any.
#[derive(Debug, Clone)]
pub struct Classified {
    pub platform: Option<Platform>,
    pub url: Url,
}

impl Classified {
    pub fn matched(&self) -> bool {
        self.platform.is_some()
    }
}

/// Used as the inert placeholder and as the base for relative-path parses.
const PLACEHOLDER_BASE: &str = "https://example.com";

/// Parse a possibly malformed URL without ever failing: absolute parse,
/// then with an `https://` prefix, then relative to a placeholder base,
/// finally the placeholder itself.
pub fn safe_parse_url(raw: &str) -> Url {
    if let Ok(url) = Url::parse(raw) {
        // "example.com:8080/x" parses as scheme "example.com" — only accept
        // absolute parses that produced a real host.
        if url.has_host() {
            return url;
        }
    }

    if let Ok(url) = Url::parse(&format!("https://{raw}")) {
        if url.has_host() {
            return url;
        }
    }

    let base = Url::parse(PLACEHOLDER_BASE).expect("placeholder base is valid");
    if let Ok(url) = base.join(raw) {
        return url;
    }

    base
}

pub fn classify(raw: &str) -> Classified {
    let url = safe_parse_url(raw);
    let platform = platform_for(&url);
    Classified { platform, url }
}

fn platform_for(url: &Url) -> Option<Platform> {
    let host = url.host_str().unwrap_or("");

    let platform = match host {
        "twitter.com" | "www.twitter.com" | "mobile.twitter.com" | "x.com" | "www.x.com" | "nitter.net"
        | "www.nitter.net" | "mobile.nitter.net" => Platform::Twitter,
        "pbs.twimg.com" | "video.twimg.com" => Platform::TwitterDirect,
        "instagram.com" | "www.instagram.com" => Platform::Instagram,
        "pixiv.net" | "www.pixiv.net" => Platform::Pixiv,
        "i.pximg.net" => Platform::PixivDirect,
        "reddit.com" | "www.reddit.com" | "old.reddit.com" | "redd.it" => Platform::Reddit,
        "youtube.com" | "www.youtube.com" | "m.youtube.com" | "youtu.be" => Platform::Youtube,
        "tiktok.com" | "www.tiktok.com" | "vm.tiktok.com" | "vt.tiktok.com" => Platform::Tiktok,
        "coub.com" | "www.coub.com" => Platform::Coub,
        "dtf.ru" | "vc.ru" | "tjournal.ru" | "the.tj" => Platform::Osnova,
        "kemono.su" | "www.kemono.su" | "kemono.party" | "www.kemono.party" => Platform::Kemono,
        "danbooru.donmai.us" => Platform::Danbooru,
        "gelbooru.com" | "www.gelbooru.com" => Platform::Gelbooru,
        "konachan.com" | "konachan.net" | "www.konachan.com" | "www.konachan.net" => Platform::Konachan,
        "yande.re" | "www.yande.re" => Platform::Yandere,
        "e-shuushuu.net" | "www.e-shuushuu.net" => Platform::Eshuushuu,
        "chan.sankakucomplex.com" => Platform::Sankaku,
        "zerochan.net" | "www.zerochan.net" => Platform::Zerochan,
        "anime-pictures.net" | "www.anime-pictures.net" => Platform::AnimePictures,
        _ => return platform_for_patterned(host),
    };

    Some(platform)
}

/// Hosts matched by pattern rather than the exact table: `*.tumblr.*`
/// blog subdomains and the joyreactor family (mirrors + `imgN.` direct
/// image hosts).
fn platform_for_patterned(host: &str) -> Option<Platform> {
    if regex_is_match!(r"(?i)\.tumblr\.(com|co\.\w+|org)$", host) || host == "tumblr.com" {
        return Some(Platform::Tumblr);
    }

    if regex_is_match!(r"(?i)(^|\.)(joy|safe|old|porn)?reactor\.(cc|com)$", host) {
        return Some(Platform::Joyreactor);
    }

    None
}
