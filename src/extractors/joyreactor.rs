//! Joyreactor posts and direct image hosts.
//!
//! `imgN.` hosts are direct media — one viewer-proxied photo/gif. Post
//! pages get scraped: each `.image` wrapper is either a video holder (mp4
//! sources), a gif holder (original gif anchor), or a plain image with an
//! optional full-size anchor.

use select::document::Document;
use select::node::Node;
use select::predicate::{Class, Name, Or, Predicate};
use url::Url;

use crate::error::{ExtractError, ExtractResult};
use crate::extractors::Ctx;
use crate::fetch::header_map;
use crate::post::{Media, MediaKind, SocialPost};
use crate::util::form_viewer_url;

/// Telegram-friendly container; webm sources are skipped in favor of mp4.
const MATCHING_VIDEO_TYPE: &str = "mp4";

/// Add a protocol to scheme-less links trimmed out of the layout.
fn prepare_url(link: Option<&str>) -> String {
    let Some(link) = link else {
        return String::new();
    };
    if link.is_empty() {
        return String::new();
    }
    if link.starts_with("//") {
        return format!("https:{link}");
    }
    link.to_string()
}

fn origin_of(link: &str) -> String {
    crate::classify::safe_parse_url(link).origin().ascii_serialization()
}

fn video_holder_media(ctx: &Ctx, wrapper: &Node<'_>, holder: &Node<'_>, is_gif_holder: bool) -> Option<Media> {
    let video_elem = wrapper.find(Name("video")).next()?;

    let mut media = Media {
        kind: if video_elem.attr("muted").is_some() || is_gif_holder {
            MediaKind::Gif
        } else {
            MediaKind::Video
        },
        ..Media::default()
    };

    let source = video_elem
        .find(Name("source"))
        .filter(|s| {
            s.attr("type")
                .is_some_and(|mime| mime.to_lowercase().ends_with(MATCHING_VIDEO_TYPE))
        })
        .filter_map(|s| s.attr("src"))
        .last();

    let available = prepare_url(source);
    if !available.is_empty() {
        media.filetype = Some(MATCHING_VIDEO_TYPE.to_string());
        media.external_url = Some(form_viewer_url(&ctx.cfg, &available, &origin_of(&available), false));
        media.original = media.external_url.clone();
    }

    if is_gif_holder {
        let original_gif = prepare_url(
            holder
                .find(Class("video_gif_source"))
                .next()
                .and_then(|a| a.attr("href")),
        );
        if !original_gif.is_empty() {
            media.original = Some(form_viewer_url(&ctx.cfg, &original_gif, &origin_of(&original_gif), false));
        }
        if media.external_url.is_none() && media.original.is_some() {
            media.external_url = media.original.clone();
        }
    }

    media.external_url.is_some().then_some(media)
}

fn plain_image_media(ctx: &Ctx, wrapper: &Node<'_>) -> Option<Media> {
    let default_image = prepare_url(wrapper.find(Name("img")).next().and_then(|img| img.attr("src")));
    if default_image.is_empty() {
        return None;
    }

    let mut media = Media {
        kind: MediaKind::Photo,
        external_url: Some(form_viewer_url(&ctx.cfg, &default_image, &origin_of(&default_image), false)),
        ..Media::default()
    };

    let full = prepare_url(wrapper.find(Name("a")).next().and_then(|a| a.attr("href")));
    let extension_source = if full.is_empty() { &default_image } else { &full };
    media.filetype = lazy_regex::regex_captures!(r"\.(\w+)$", extension_source).map(|(_, ext)| ext.to_string());

    if !full.is_empty() {
        media.original = Some(form_viewer_url(&ctx.cfg, &full, &origin_of(&full), false));
    }

    Some(media)
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    let host = url.host_str().unwrap_or("");

    // Direct image hosts: nothing to scrape.
    if lazy_regex::regex_is_match!(r"^img\d+\.", host) {
        let kind = if url.path().ends_with(".gif") {
            MediaKind::Gif
        } else {
            MediaKind::Photo
        };
        let origin = url.origin().ascii_serialization();
        return Ok(Some(SocialPost {
            post_url: url.to_string(),
            medias: Media::external(kind, form_viewer_url(&ctx.cfg, url.as_str(), &origin, false))
                .into_iter()
                .collect(),
            ..SocialPost::default()
        }));
    }

    let Some((_, post_id)) = lazy_regex::regex_captures!(r"^/post/(\d+)", url.path()) else {
        return Ok(None);
    };

    let post_url = format!("https://joyreactor.cc/post/{post_id}");
    let page = ctx
        .fetcher
        .get_text(
            &post_url,
            header_map(&[
                ("referer", "https://joyreactor.cc/"),
                ("cookie", &ctx.cfg.tokens.joyreactor_cookie),
            ]),
        )
        .await?;

    let document = Document::from(page.as_str());

    let content = document
        .find(Class("post_content"))
        .next()
        .ok_or_else(|| ExtractError::shape(format!("no post_content in {post_url}")))?;

    let wrappers: Vec<Node<'_>> = content.find(Class("image")).collect();
    if wrappers.is_empty() {
        return Ok(None);
    }

    let author_anchor = document
        .find(Class("uhead_nick").descendant(Name("a")))
        .next();
    let author = author_anchor.map(|a| a.text()).unwrap_or_default();
    let author_url = author_anchor
        .and_then(|a| a.attr("href"))
        .and_then(|href| url.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_default();

    let post_title = document
        .find(Class("post_content").descendant(Name("h3")))
        .next()
        .map(|h| h.text());
    let first_tag = document
        .find(Class("post_description"))
        .next()
        .map(|d| d.text())
        .and_then(|text| text.split(':').next().map(|tag| tag.trim().to_string()));

    let medias: Vec<Media> = wrappers
        .iter()
        .filter_map(|wrapper| {
            let holder = wrapper
                .find(Or(Class("video_holder"), Class("video_gif_holder")))
                .next();
            match holder {
                Some(holder_node) => {
                    let is_gif_holder = holder_node
                        .attr("class")
                        .is_some_and(|classes| classes.contains("video_gif_holder"));
                    video_holder_media(ctx, wrapper, &holder_node, is_gif_holder)
                }
                None => plain_image_media(ctx, wrapper),
            }
        })
        .collect();

    Ok(Some(SocialPost {
        author,
        author_url,
        caption: post_title.or(first_tag).unwrap_or_default(),
        post_url,
        medias,
    }))
}
