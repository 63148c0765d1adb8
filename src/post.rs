//! Normalized post/media data model shared by every extractor.
//!
//! One `SocialPost` is produced per request and never persisted. A `Media`
//! item carries either an `externalUrl` the caller can redirect to, or a
//! local `filename` backed by a [`DeferredFile`] handle the caller must
//! release after serving — never both missing.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::remux::hooks::DeferredFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Photo,
    Gif,
    Video,
    Audio,
}

/// One deliverable media item of a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Remote link the caller can redirect to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    /// Full-quality source when `external_url` points at a downscaled one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Path of a locally produced file (remuxed video, assembled ugoira).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filetype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    /// Human-readable variant description (codec, resolution, size).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Auxiliary source links keyed by role (e.g. `videoSource`, `zip`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_sources: Option<BTreeMap<String, String>>,
    /// Release handle owning deletion of the local file. Not part of the
    /// wire format; the service registers it for deferred release.
    #[serde(skip)]
    pub file: Option<Arc<DeferredFile>>,
}

impl Media {
    /// Remote-only media item of the given kind. Returns `None` for an
    /// empty URL so callers can `filter_map` without emitting husks.
    pub fn external(kind: MediaKind, url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            external_url: Some(url),
            ..Self::default()
        })
    }
}

/// The uniform record every platform extractor produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialPost {
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "authorURL", default)]
    pub author_url: String,
    #[serde(rename = "postURL", default)]
    pub post_url: String,
    #[serde(default)]
    pub medias: Vec<Media>,
}

/// Pick the single best candidate by a quality proxy (bitrate, pixel area,
/// filesize). Ties keep the **last-seen** candidate — the reduction is a
/// stable "replace if not worse", so input order decides equal-quality
/// variants consistently across every extractor. Empty input yields `None`.
pub fn pick_best<T, K, F>(candidates: &[T], mut quality: F) -> Option<&T>
where
    K: PartialOrd,
    F: FnMut(&T) -> K,
{
    let mut best: Option<(&T, K)> = None;
    for candidate in candidates {
        let proxy = quality(candidate);
        match &best {
            Some((_, incumbent)) if proxy < *incumbent => {}
            _ => best = Some((candidate, proxy)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_best_maximizes() {
        let widths = [100u32, 800, 480];
        assert_eq!(pick_best(&widths, |w| *w), Some(&800));
    }

    #[test]
    fn test_pick_best_ties_keep_last() {
        let items = [("a", 10u64), ("b", 10), ("c", 5)];
        assert_eq!(pick_best(&items, |i| i.1), Some(&("b", 10)));
    }

    #[test]
    fn test_pick_best_empty_is_none() {
        let empty: [u32; 0] = [];
        assert_eq!(pick_best(&empty, |w| *w), None);
    }

    #[test]
    fn test_pick_best_unsorted_input() {
        let sizes = [5u64, 90, 3, 90, 12];
        // Second 90 wins over the first (last-seen tie rule).
        assert_eq!(pick_best(&sizes, |s| *s), Some(&sizes[3]));
    }

    #[test]
    fn test_media_external_skips_empty_url() {
        assert!(Media::external(MediaKind::Photo, "").is_none());
        let media = Media::external(MediaKind::Video, "https://a/b.mp4").unwrap();
        assert_eq!(media.external_url.as_deref(), Some("https://a/b.mp4"));
    }

    #[test]
    fn test_social_post_wire_names() {
        let post = SocialPost {
            caption: "hi".into(),
            author: "someone".into(),
            author_url: "https://example.com/u".into(),
            post_url: "https://example.com/p/1".into(),
            medias: vec![Media::external(MediaKind::Photo, "https://img/1.png").unwrap()],
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["authorURL"], "https://example.com/u");
        assert_eq!(json["postURL"], "https://example.com/p/1");
        assert_eq!(json["medias"][0]["type"], "photo");
        assert_eq!(json["medias"][0]["externalUrl"], "https://img/1.png");
        // Local-file fields stay off the wire when absent.
        assert!(json["medias"][0].get("filename").is_none());
    }
}
