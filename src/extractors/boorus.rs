//! The booru family — one representative scraping contract shared by eight
//! image boards. Each site exposes a single full-resolution link somewhere
//! in its post page; the per-site part is only *where* (an anchor id, an
//! OpenGraph meta, an itemprop attribute). Everything else — fetch, parse,
//! single-photo post — is the same shape.

use select::document::Document;
use select::predicate::{Attr, Class, Name, Predicate};
use url::Url;

use crate::error::{ExtractError, ExtractResult};
use crate::extractors::Ctx;
use crate::fetch::header_map;
use crate::post::{Media, MediaKind, SocialPost};

/// Fetch the post page and wrap the extracted full-resolution link into a
/// single-photo post. `pick` is the per-site part.
async fn scrape_single_photo(
    ctx: &Ctx,
    url: &Url,
    site: &'static str,
    pick: impl FnOnce(&Document, &Url) -> Option<ScrapedPhoto>,
) -> ExtractResult {
    let page = ctx.fetcher.get_text(url.as_str(), header_map(&[])).await?;
    let document = Document::from(page.as_str());

    let Some(scraped) = pick(&document, url) else {
        return Err(ExtractError::shape(format!("no {site} source in {url}")));
    };

    let Some(media) = Media::external(MediaKind::Photo, scraped.source) else {
        return Err(ExtractError::shape(format!("empty {site} source in {url}")));
    };

    Ok(Some(SocialPost {
        author: scraped.author.unwrap_or_default(),
        author_url: scraped.author_url.unwrap_or_default(),
        post_url: url.to_string(),
        medias: vec![media],
        ..SocialPost::default()
    }))
}

struct ScrapedPhoto {
    source: String,
    author: Option<String>,
    author_url: Option<String>,
}

impl ScrapedPhoto {
    fn bare(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            author: None,
            author_url: None,
        }
    }
}

/// `og:image` (or `twitter:image`) meta content — the pattern Gelbooru and
/// Zerochan share.
fn og_image(document: &Document) -> Option<String> {
    for property in ["og:image", "twitter:image"] {
        let found = document
            .find(Name("meta"))
            .filter(|node| {
                node.attr("property") == Some(property) || node.attr("name") == Some(property)
            })
            .find_map(|node| node.attr("content").map(str::to_string));
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Resolve a possibly relative/protocol-less link against the page origin.
fn absolutize(link: &str, page: &Url) -> Option<String> {
    page.join(link).map(|joined| joined.to_string()).ok()
}

pub async fn danbooru(ctx: &Ctx, url: &Url) -> ExtractResult {
    if !lazy_regex::regex_is_match!(r"^/posts/\d+", url.path()) {
        return Ok(None);
    }

    scrape_single_photo(ctx, url, "danbooru", |document, page| {
        let source = document
            .find(Attr("id", "post-info-size").descendant(Name("a")))
            .find_map(|a| a.attr("href").map(str::to_string))?;

        let uploader = document
            .find(Attr("id", "post-info-uploader").descendant(Name("a")))
            .next();

        Some(ScrapedPhoto {
            source: absolutize(&source, page)?,
            author: uploader.and_then(|a| a.attr("data-user-name").map(str::to_string)),
            author_url: uploader.and_then(|a| a.attr("href").and_then(|href| absolutize(href, page))),
        })
    })
    .await
}

pub async fn gelbooru(ctx: &Ctx, url: &Url) -> ExtractResult {
    scrape_single_photo(ctx, url, "gelbooru", |document, _| {
        og_image(document).map(ScrapedPhoto::bare)
    })
    .await
}

pub async fn konachan(ctx: &Ctx, url: &Url) -> ExtractResult {
    scrape_single_photo(ctx, url, "konachan", |document, page| {
        let href = document
            .find(Attr("id", "highres"))
            .find_map(|a| a.attr("href").map(str::to_string))?;
        Some(ScrapedPhoto::bare(absolutize(&href, page)?))
    })
    .await
}

pub async fn yandere(ctx: &Ctx, url: &Url) -> ExtractResult {
    scrape_single_photo(ctx, url, "yandere", |document, page| {
        let href = document
            .find(Attr("id", "highres"))
            .find_map(|a| a.attr("href").map(str::to_string))?;
        Some(ScrapedPhoto::bare(absolutize(&href, page)?))
    })
    .await
}

pub async fn eshuushuu(ctx: &Ctx, url: &Url) -> ExtractResult {
    scrape_single_photo(ctx, url, "eshuushuu", |document, _| {
        let href = document
            .find(Class("thumb_image"))
            .find_map(|a| a.attr("href").map(str::to_string))?;
        let path = href.replace("//", "/");
        Some(ScrapedPhoto::bare(format!(
            "https://e-shuushuu.net/{}",
            path.trim_start_matches('/')
        )))
    })
    .await
}

pub async fn sankaku(ctx: &Ctx, url: &Url) -> ExtractResult {
    scrape_single_photo(ctx, url, "sankaku", |document, _| {
        let href = document
            .find(Attr("id", "highres"))
            .find_map(|a| a.attr("href").map(str::to_string))?;
        let href = href.replace("&amp;", "&");
        Some(ScrapedPhoto::bare(if href.starts_with("//") {
            format!("https:{href}")
        } else {
            href
        }))
    })
    .await
}

pub async fn zerochan(ctx: &Ctx, url: &Url) -> ExtractResult {
    scrape_single_photo(ctx, url, "zerochan", |document, _| {
        og_image(document).map(ScrapedPhoto::bare)
    })
    .await
}

pub async fn anime_pictures(ctx: &Ctx, url: &Url) -> ExtractResult {
    scrape_single_photo(ctx, url, "anime-pictures", |document, page| {
        let href = document
            .find(Name("a").and(Attr("itemprop", "contentURL")))
            .find_map(|a| a.attr("href").map(str::to_string))?;
        Some(ScrapedPhoto::bare(absolutize(&href, page)?))
    })
    .await
}
