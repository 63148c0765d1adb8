//! Osnova-engine sites (dtf.ru, vc.ru, tjournal.ru) — the aggregator
//! platform. An entry is a list of typed blocks: media blocks map to the
//! leonardo CDN, tweet/instagram blocks delegate to the matching extractor
//! with a synthesized URL. Sub-blocks resolve concurrently but join in
//! block order, and a failed sub-block contributes zero media instead of
//! failing the post.

use futures_util::future::join_all;
use serde::Deserialize;
use url::Url;

use crate::error::{ExtractError, ExtractResult};
use crate::extractors::{instagram, twitter, Ctx};
use crate::fetch::header_map;
use crate::post::{Media, MediaKind, SocialPost};

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    result: Option<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<String>,
    url: Option<String>,
    author: Author,
    #[serde(default)]
    blocks: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: String,
    #[serde(default)]
    id: u64,
}

/// Typed view of one entry block. Unknown block types fall into `Other`;
/// a block that fails to parse is skipped by the caller (per-block
/// tolerance, the whole entry never dies on one bad block).
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Block {
    #[serde(rename = "tweet")]
    Tweet { data: TweetBlockData },
    #[serde(rename = "instagram")]
    Instagram { data: InstagramBlockData },
    #[serde(rename = "media")]
    Media { data: MediaBlockData },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TweetBlockData {
    tweet: TweetBlockInner,
}

#[derive(Debug, Deserialize)]
struct TweetBlockInner {
    data: TweetBlockDataInner,
}

#[derive(Debug, Deserialize)]
struct TweetBlockDataInner {
    tweet_data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id_str: String,
    user: TweetUser,
}

#[derive(Debug, Deserialize)]
struct TweetUser {
    screen_name: String,
}

#[derive(Debug, Deserialize)]
struct InstagramBlockData {
    instagram: InstagramBlockInner,
}

#[derive(Debug, Deserialize)]
struct InstagramBlockInner {
    data: InstagramBoxData,
}

#[derive(Debug, Deserialize)]
struct InstagramBoxData {
    box_data: InstagramBox,
}

#[derive(Debug, Deserialize)]
struct InstagramBox {
    url: String,
}

#[derive(Debug, Deserialize)]
struct MediaBlockData {
    #[serde(default)]
    items: Vec<MediaBlockItem>,
}

#[derive(Debug, Deserialize)]
struct MediaBlockItem {
    image: Option<MediaBlockImage>,
}

#[derive(Debug, Deserialize)]
struct MediaBlockImage {
    data: MediaImageData,
}

#[derive(Debug, Deserialize)]
struct MediaImageData {
    uuid: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// A sub-block waiting on another platform's extractor.
#[derive(Debug, Clone, PartialEq)]
enum ExternalBlock {
    Tweet { link: String },
    Instagram { link: String },
}

/// Leonardo CDN link rules: gifs deliver as mp4 video, webp previews
/// re-encode to jpeg.
fn leonardo_media(image: &MediaImageData) -> Media {
    let is_image = image.kind != "gif";
    let is_webp = image.kind == "webp";
    let base = format!("https://leonardo.osnova.io/{}", image.uuid);

    let rendered = if is_image {
        format!("{base}/-/preview/1000/{}", if is_webp { "-/format/jpeg/" } else { "" })
    } else {
        format!("{base}/-/format/mp4/")
    };

    Media {
        kind: if is_image { MediaKind::Photo } else { MediaKind::Video },
        external_url: Some(rendered),
        original: Some(base),
        ..Media::default()
    }
}

/// Walk the blocks in order, collecting inline media and the queue of
/// external sub-blocks. Unparseable blocks are logged and skipped.
fn scan_blocks(raw_blocks: &[serde_json::Value], post_url: &str) -> (Vec<Media>, Vec<ExternalBlock>) {
    let mut inline = Vec::new();
    let mut external = Vec::new();

    for raw_block in raw_blocks {
        let block: Block = match serde_json::from_value(raw_block.clone()) {
            Ok(block) => block,
            Err(e) => {
                log::warn!("skipping malformed block in {post_url}: {e}");
                continue;
            }
        };

        match block {
            Block::Tweet { data } => {
                let tweet = data.tweet.data.tweet_data;
                external.push(ExternalBlock::Tweet {
                    link: format!(
                        "https://twitter.com/{}/status/{}",
                        tweet.user.screen_name, tweet.id_str
                    ),
                });
            }
            Block::Instagram { data } => {
                external.push(ExternalBlock::Instagram {
                    link: data.instagram.data.box_data.url,
                });
            }
            Block::Media { data } => {
                for item in &data.items {
                    if let Some(image) = &item.image {
                        inline.push(leonardo_media(&image.data));
                    }
                }
            }
            Block::Other => {}
        }
    }

    (inline, external)
}

/// Flatten delegated sub-block results in their original block order. A
/// failed or empty delegation contributes zero media — partial-result
/// tolerance is the policy for aggregator composition.
fn collect_block_medias(results: Vec<(String, ExtractResult)>) -> Vec<Media> {
    results
        .into_iter()
        .flat_map(|(link, result)| match result {
            Ok(Some(sub_post)) => sub_post.medias,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("failed to load block data ({link}) inside post: {e}");
                Vec::new()
            }
        })
        .collect()
}

async fn load_external_block(ctx: &Ctx, block: &ExternalBlock) -> (String, ExtractResult) {
    match block {
        ExternalBlock::Tweet { link } => {
            let url = crate::classify::safe_parse_url(link);
            (link.clone(), twitter::resolve(ctx, &url).await)
        }
        ExternalBlock::Instagram { link } => {
            let url = crate::classify::safe_parse_url(link);
            (link.clone(), instagram::resolve(ctx, &url).await)
        }
    }
}

fn post_id_from(url: &Url) -> Option<String> {
    let path = url.path();
    let captures = if path.starts_with("/u") {
        lazy_regex::regex_captures!(r"^/u/\d+[\w-]*/(\d+)", path)
    } else {
        lazy_regex::regex_captures!(r"^(?:(?:/s)?/[\w-]+)?/(\d+)", path)
    };
    captures.map(|(_, id)| id.to_string())
}

/// Site hostname with mirrors folded to the canonical API host.
fn api_hostname(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let base = lazy_regex::regex_replace!(r"^.*\.(\w+\.\w+)$", host, |_, apex: &str| apex.to_string());
    base.replace("the.tj", "tjournal.ru")
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    let Some(post_id) = post_id_from(url) else {
        return Ok(None);
    };

    let site = api_hostname(url);
    let api_url = format!("https://api.{site}/v2.31/content?id={post_id}");

    let envelope: ApiEnvelope = ctx.fetcher.get_json(&api_url, header_map(&[])).await?;
    let entry = envelope
        .result
        .ok_or_else(|| ExtractError::shape(format!("no result in osnova api response for {api_url}")))?;

    let post_url = entry.url.clone().unwrap_or_else(|| url.to_string());
    let mut post = SocialPost {
        caption: entry.title.clone().unwrap_or_default(),
        author: entry.author.name.clone(),
        author_url: format!("https://{site}/u/{}", entry.author.id),
        post_url: post_url.clone(),
        medias: Vec::new(),
    };

    let (inline, external) = scan_blocks(&entry.blocks, &post_url);
    post.medias = inline;

    if !external.is_empty() {
        // Concurrent delegation; join_all preserves input order, so the
        // final media list is deterministic regardless of arrival time.
        let results = join_all(external.iter().map(|block| load_external_block(ctx, block))).await;
        post.medias.extend(collect_block_medias(results));
    }

    // Every block resolved and none produced anything — treat like a
    // structurally empty post rather than succeeding with nothing.
    if post.medias.is_empty() {
        return Err(ExtractError::shape(format!("no media in any block of {post_url}")));
    }

    Ok(Some(post))
}
