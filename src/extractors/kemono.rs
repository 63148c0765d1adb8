//! Kemono post pages: thumbnails with full-size anchors, scraped from DOM.

use select::document::Document;
use select::predicate::{Class, Name, Predicate};
use url::Url;

use crate::error::ExtractResult;
use crate::extractors::Ctx;
use crate::fetch::header_map;
use crate::post::{Media, MediaKind, SocialPost};

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    if url.path() == "/" || url.path().is_empty() {
        return Ok(None);
    }

    let post_url = format!("https://kemono.su{}", url.path());
    let page = ctx
        .fetcher
        .get_text(
            &post_url,
            header_map(&[
                ("referer", "https://kemono.su/"),
                ("cookie", &ctx.cfg.tokens.kemono_cookie),
            ]),
        )
        .await?;

    let document = Document::from(page.as_str());
    let mut post = SocialPost {
        post_url: url.to_string(),
        ..SocialPost::default()
    };

    for anchor in document.find(Class("post__thumbnail").descendant(Class("fileThumb"))) {
        let mut media = Media {
            kind: MediaKind::Photo,
            ..Media::default()
        };

        if let Some(full) = anchor.attr("href").and_then(|href| url.join(href).ok()) {
            media.original = Some(full.to_string());
        }
        if let Some(thumb) = anchor
            .find(Name("img"))
            .next()
            .and_then(|img| img.attr("src"))
            .and_then(|src| url.join(src).ok())
        {
            media.external_url = Some(thumb.to_string());
        }

        // A thumbnail without any link is a husk; skip it.
        if media.external_url.is_some() || media.original.is_some() {
            if media.external_url.is_none() {
                media.external_url = media.original.clone();
            }
            post.medias.push(media);
        }
    }

    if let Some(username) = document.find(Class("post__user-name")).next() {
        post.author = username.text().trim().to_string();
        if let Some(href) = username.attr("href").and_then(|href| url.join(href).ok()) {
            post.author_url = href.to_string();
        }
    }

    if let Some(title) = document.find(Class("post__title")).next() {
        post.caption = title.text().trim().to_string();
    }

    Ok(Some(post))
}
