//! Pixiv artworks: the `#meta-preload-data` JSON island embedded in the
//! artwork page, with the ugoira pipeline for animated posts.
//!
//! Image posts yield one photo Media per page, routed through the viewer
//! template because i.pximg.net checks referers. Ugoira posts fetch the
//! frame-delay metadata and the source zip, then hand both to the
//! assembler; a failed assembly just drops that media.

use std::collections::HashMap;

use select::document::Document;
use select::predicate::Attr;
use serde::Deserialize;
use url::Url;

use crate::error::{ExtractError, ExtractResult};
use crate::extractors::Ctx;
use crate::fetch::header_map;
use crate::post::{Media, MediaKind, SocialPost};
use crate::remux::ugoira::{self, UgoiraMeta};
use crate::util::form_viewer_url;

const PIXIV_REFERER: &str = "https://www.pixiv.net/";

#[derive(Debug, Deserialize)]
struct PreloadData {
    #[serde(default)]
    illust: HashMap<String, Illust>,
}

#[derive(Debug, Default, Deserialize)]
struct Illust {
    title: Option<String>,
    #[serde(rename = "illustTitle")]
    illust_title: Option<String>,
    description: Option<String>,
    #[serde(rename = "illustComment")]
    illust_comment: Option<String>,
    #[serde(rename = "userName", default)]
    user_name: String,
    #[serde(rename = "userId", default)]
    user_id: String,
    #[serde(rename = "pageCount", default)]
    page_count: u32,
    #[serde(default)]
    urls: IllustUrls,
    tags: Option<TagsWrapper>,
}

#[derive(Debug, Default, Deserialize)]
struct IllustUrls {
    original: Option<String>,
    regular: Option<String>,
    small: Option<String>,
    thumb: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsWrapper {
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    tag: Option<String>,
    romaji: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UgoiraMetaEnvelope {
    body: UgoiraMeta,
}

fn illust_id_from(url: &Url) -> Option<String> {
    if let Some((_, id)) = lazy_regex::regex_captures!(r"^/(?:\w{2}/)?artworks/(\d+)", url.path()) {
        return Some(id.to_string());
    }
    // Legacy member_illust.php?illust_id=N links.
    url.query_pairs()
        .find(|(key, _)| key == "illust_id")
        .map(|(_, value)| value.to_string())
}

impl Illust {
    fn caption(&self) -> String {
        [
            &self.title,
            &self.illust_title,
            &self.description,
            &self.illust_comment,
        ]
        .into_iter()
        .find_map(|field| field.clone().filter(|s| !s.is_empty()))
        .unwrap_or_default()
    }

    fn is_ugoira(&self) -> bool {
        let urls_hint = [&self.urls.original, &self.urls.regular, &self.urls.small, &self.urls.thumb]
            .into_iter()
            .flatten()
            .any(|u| u.to_lowercase().contains("ugoira"));
        let tags_hint = self.tags.as_ref().is_some_and(|wrapper| {
            wrapper.tags.iter().any(|tag| {
                tag.romaji.as_deref().is_some_and(|r| r.to_lowercase().contains("ugoira"))
                    || tag.tag.as_deref().is_some_and(|t| t.to_lowercase().contains("ugoira"))
            })
        });
        urls_hint || tags_hint
    }
}

/// Last-ditch extraction of the image date path and filetype from the raw
/// preload JSON, for posts that hide `urls.original`.
fn dirty_image_parts(raw_preload: &str, illust_id: &str) -> Option<(String, String)> {
    let pattern = format!(
        r#""[^"]+(?P<date>img/(?:\d+/){{6}}{}_p)[^"]+\.(?P<filetype>\w+)""#,
        regex::escape(illust_id)
    );
    let rx = regex::Regex::new(&pattern).ok()?;
    let caps = rx.captures(raw_preload)?;
    Some((caps["date"].to_string(), caps["filetype"].to_string()))
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    resolve_with_index(ctx, url, None).await
}

/// `certain_image_index` restricts multi-page posts to one page — used by
/// the direct-image extractor.
pub async fn resolve_with_index(ctx: &Ctx, url: &Url, certain_image_index: Option<u32>) -> ExtractResult {
    let Some(illust_id) = illust_id_from(url) else {
        return Ok(None);
    };

    let post_url = format!("https://www.pixiv.net/en/artworks/{illust_id}");
    let pixiv_headers = header_map(&[("referer", PIXIV_REFERER)]);

    let page = ctx.fetcher.get_text(&post_url, pixiv_headers.clone()).await?;

    // Scoped: the parsed DOM must not live across the awaits below.
    let raw_preload = {
        let document = Document::from(page.as_str());
        document
            .find(Attr("id", "meta-preload-data"))
            .next()
            .and_then(|node| node.attr("content").map(str::to_string))
    }
    .ok_or_else(|| ExtractError::shape(format!("no meta-preload-data in {post_url}")))?;

    let preload: PreloadData = serde_json::from_str(&raw_preload)?;
    let illust = preload
        .illust
        .get(&illust_id)
        .ok_or_else(|| ExtractError::shape(format!("no illust {illust_id} in preload data")))?;

    let mut post = SocialPost {
        caption: illust.caption(),
        author: illust.user_name.clone(),
        author_url: format!("https://www.pixiv.net/en/users/{}", illust.user_id),
        post_url: post_url.clone(),
        medias: Vec::new(),
    };

    if illust.is_ugoira() {
        let meta_url = format!("https://www.pixiv.net/ajax/illust/{illust_id}/ugoira_meta");
        let envelope: UgoiraMetaEnvelope = ctx.fetcher.get_json(&meta_url, pixiv_headers.clone()).await?;
        let zip_bytes = ctx
            .fetcher
            .get_bytes(&envelope.body.original_src, pixiv_headers)
            .await?;

        match ugoira::build(&ctx.cfg, &envelope.body, &zip_bytes).await {
            Some(media) => post.medias.push(media),
            // Assembly failed soft; the post simply has no media to offer.
            None => return Ok(None),
        }
        return Ok(Some(post));
    }

    let (dirty_original, dirty_master) = match dirty_image_parts(&raw_preload, &illust_id) {
        Some((date, filetype)) => (
            format!("https://i.pximg.net/img-original/{date}0.{filetype}"),
            format!("https://i.pximg.net/img-master/{date}0_master1200.{filetype}"),
        ),
        None => (String::new(), String::new()),
    };

    let original_filename = illust
        .urls
        .original
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or(dirty_original);
    if original_filename.is_empty() {
        return Err(ExtractError::shape(format!("no original image url in {post_url}")));
    }

    let original_basename = lazy_regex::regex_replace!(r"\d+\.\w+$", &original_filename, "").to_string();
    let original_filetype = lazy_regex::regex_captures!(r"\.(\w+)$", &original_filename)
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_else(|| "png".to_string());
    let master_filename = illust
        .urls
        .regular
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or(dirty_master);

    for page_index in 0..illust.page_count.max(1) {
        if certain_image_index.is_some_and(|only| only != page_index) {
            continue;
        }

        let original_page = format!("{original_basename}{page_index}.{original_filetype}");
        // Posts without a "regular" rendition fall back to the original.
        let master_page = if master_filename.is_empty() {
            original_page.clone()
        } else {
            lazy_regex::regex_replace!(
                r"\d+(_master\d+\.\w+)$",
                &master_filename,
                |_, suffix| format!("{page_index}{suffix}")
            )
            .to_string()
        };

        post.medias.push(Media {
            kind: MediaKind::Photo,
            external_url: Some(form_viewer_url(&ctx.cfg, &master_page, PIXIV_REFERER, true)),
            original: Some(form_viewer_url(&ctx.cfg, &original_page, PIXIV_REFERER, true)),
            filetype: Some(original_filetype.clone()),
            ..Media::default()
        });
    }

    Ok(Some(post))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illust_id_from_url_shapes() {
        let cases = [
            ("https://www.pixiv.net/en/artworks/123456", Some("123456")),
            ("https://www.pixiv.net/artworks/123456", Some("123456")),
            (
                "https://www.pixiv.net/member_illust.php?mode=medium&illust_id=9876",
                Some("9876"),
            ),
            ("https://www.pixiv.net/en/users/11", None),
        ];
        for (input, expected) in cases {
            let url = Url::parse(input).unwrap();
            assert_eq!(illust_id_from(&url).as_deref(), expected, "input: {input}");
        }
    }

    #[test]
    fn test_caption_priority() {
        let illust = Illust {
            title: Some(String::new()),
            illust_title: Some("fallback title".into()),
            ..Illust::default()
        };
        assert_eq!(illust.caption(), "fallback title");
    }

    #[test]
    fn test_ugoira_detection() {
        let by_url = Illust {
            urls: IllustUrls {
                original: Some("https://i.pximg.net/img-zip-ugoira/a.zip".into()),
                ..IllustUrls::default()
            },
            ..Illust::default()
        };
        assert!(by_url.is_ugoira());

        let by_tag: Illust = serde_json::from_str(
            r#"{"tags": {"tags": [{"tag": "うごイラ", "romaji": "ugoira"}]}}"#,
        )
        .unwrap();
        assert!(by_tag.is_ugoira());

        assert!(!Illust::default().is_ugoira());
    }

    #[test]
    fn test_dirty_image_parts() {
        let raw = r#"{"x": "https://i.pximg.net/c/250x250/img-master/img/2023/01/02/03/04/05/123456_p0_square1200.jpg"}"#;
        let (date, filetype) = dirty_image_parts(raw, "123456").unwrap();
        assert_eq!(date, "img/2023/01/02/03/04/05/123456_p");
        assert_eq!(filetype, "jpg");
        assert!(dirty_image_parts(raw, "999").is_none());
    }

    #[test]
    fn test_master_page_substitution() {
        let master = "https://i.pximg.net/img-master/img/2023/01/02/03/04/05/123_p0_master1200.jpg";
        let replaced = lazy_regex::regex_replace!(
            r"\d+(_master\d+\.\w+)$",
            master,
            |_, suffix| format!("{}{suffix}", 2)
        );
        assert!(replaced.ends_with("123_p2_master1200.jpg"));
    }
}
