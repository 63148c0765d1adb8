//! Direct twimg.com media links. No upstream calls — pure URL rewriting.

use url::Url;

use crate::error::ExtractResult;
use crate::extractors::Ctx;
use crate::post::{Media, MediaKind, SocialPost};

pub async fn resolve(_ctx: &Ctx, url: &Url) -> ExtractResult {
    if url.host_str() == Some("video.twimg.com") {
        let mut plain = url.clone();
        plain.set_query(None);

        return Ok(Some(SocialPost {
            post_url: plain.to_string(),
            medias: vec![Media {
                kind: MediaKind::Video,
                external_url: Some(plain.to_string()),
                original: Some(plain.to_string()),
                ..Media::default()
            }],
            ..SocialPost::default()
        }));
    }

    // pbs.twimg.com: `/media/<id>?format=jpg&name=large` or `/media/<id>.jpg:orig`
    let format = url
        .query_pairs()
        .find(|(key, _)| key == "format")
        .map(|(_, value)| value.to_string())
        .unwrap_or_else(|| "jpg".to_string());

    let media_path = lazy_regex::regex_replace!(r":\w+$", url.path(), "");
    let media_path = lazy_regex::regex_replace!(r"\.\w+$", &media_path, "");

    let plain = format!("https://pbs.twimg.com{media_path}.{format}");
    let original = format!("{plain}:orig");

    Ok(Some(SocialPost {
        post_url: plain.clone(),
        medias: vec![Media {
            kind: MediaKind::Photo,
            external_url: Some(plain),
            original: Some(original),
            ..Media::default()
        }],
        ..SocialPost::default()
    }))
}
