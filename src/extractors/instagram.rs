//! Instagram posts and reels.
//!
//! `/p/<code>` posts come from the web JSON endpoint (browser cookie from
//! config): single video / single image pick the widest variant, carousels
//! map item-by-item. `/reel/<code>` goes through yt-dlp, and the best
//! video-only and audio-only formats are merged locally.

use serde::Deserialize;
use url::Url;

use crate::error::{ExtractError, ExtractResult};
use crate::extractors::Ctx;
use crate::fetch::header_map;
use crate::post::{pick_best, Media, MediaKind, SocialPost};
use crate::remux::{merge, source_extension, MergeOptions, RemuxResult};
use crate::ytdlp::{self, YtDlpFormat};

#[derive(Debug, Deserialize)]
struct PageWithPost {
    #[serde(default)]
    items: Vec<PostItem>,
}

#[derive(Debug, Default, Deserialize)]
struct PostItem {
    caption: Option<Caption>,
    user: Option<User>,
    video_versions: Option<Vec<Variant>>,
    image_versions2: Option<ImageVersions>,
    carousel_media: Option<Vec<CarouselItem>>,
}

#[derive(Debug, Deserialize)]
struct Caption {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct Variant {
    #[serde(default)]
    url: String,
    #[serde(default)]
    width: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ImageVersions {
    #[serde(default)]
    candidates: Vec<Variant>,
}

#[derive(Debug, Default, Deserialize)]
struct CarouselItem {
    video_versions: Option<Vec<Variant>>,
    image_versions2: Option<ImageVersions>,
}

fn widest(variants: &[Variant]) -> Option<String> {
    pick_best(variants, |v| v.width).map(|best| best.url.clone())
}

fn carousel_media(item: &CarouselItem) -> Option<Media> {
    if let Some(videos) = &item.video_versions {
        return Media::external(MediaKind::Video, widest(videos)?);
    }
    let candidates = &item.image_versions2.as_ref()?.candidates;
    Media::external(MediaKind::Photo, widest(candidates)?)
}

async fn resolve_post(ctx: &Ctx, url: &Url) -> ExtractResult {
    let endpoint = format!(
        "https://{}{}?__a=1&__d=dis",
        url.host_str().unwrap_or("www.instagram.com"),
        url.path()
    );

    let page: PageWithPost = ctx
        .fetcher
        .get_json(
            &endpoint,
            header_map(&[
                ("referer", "https://www.instagram.com/"),
                ("cookie", &ctx.cfg.tokens.instagram_cookie),
            ]),
        )
        .await?;

    let item = page
        .items
        .into_iter()
        .next()
        .ok_or_else(|| ExtractError::shape(format!("no post item in {endpoint}")))?;

    let username = item.user.map(|u| u.username).unwrap_or_default();
    let mut post = SocialPost {
        caption: item.caption.map(|c| c.text).unwrap_or_default(),
        post_url: format!("https://instagram.com{}", url.path()),
        author: username.clone(),
        author_url: format!("https://instagram.com/{username}"),
        medias: Vec::new(),
    };

    if let Some(carousel) = &item.carousel_media {
        post.medias = carousel.iter().filter_map(carousel_media).collect();
    } else if let Some(videos) = &item.video_versions {
        post.medias.extend(widest(videos).and_then(|url| Media::external(MediaKind::Video, url)));
    } else if let Some(images) = &item.image_versions2 {
        post.medias
            .extend(widest(&images.candidates).and_then(|url| Media::external(MediaKind::Photo, url)));
    }

    Ok(Some(post))
}

async fn resolve_reel(ctx: &Ctx, url: &Url) -> ExtractResult {
    let cookies_file = ctx.cfg.tokens.instagram_cookies_file.as_str();
    let output = ytdlp::dump_json(&ctx.cfg, url.as_str(), Some(cookies_file)).await?;

    let username = output.uploader.clone().unwrap_or_default();
    let mut post = SocialPost {
        caption: output.description.clone().unwrap_or_default(),
        post_url: output.webpage_url.clone().unwrap_or_else(|| url.to_string()),
        author: username,
        author_url: format!(
            "https://instagram.com/{}",
            output.uploader_url.clone().unwrap_or_default()
        ),
        medias: Vec::new(),
    };

    let video_only: Vec<&YtDlpFormat> = output
        .formats
        .iter()
        .filter(|f| f.has_video() && !f.has_audio())
        .collect();
    let audio_only: Vec<&YtDlpFormat> = output
        .formats
        .iter()
        .filter(|f| f.has_audio() && !f.has_video())
        .collect();

    let best_video = pick_best(&video_only, |f| f.size().unwrap_or(0))
        .map(|f| f.url.clone())
        .unwrap_or_default();
    let best_audio = pick_best(&audio_only, |f| f.size().unwrap_or(0))
        .map(|f| f.url.clone())
        .unwrap_or_default();

    match merge(&ctx.cfg, &ctx.fetcher, &best_video, &best_audio, MergeOptions::default()).await {
        RemuxResult::Local {
            file,
            filesize,
            video_source,
            audio_source,
        } => {
            let mut other_sources = std::collections::BTreeMap::new();
            other_sources.insert("videoSource".to_string(), video_source.clone());
            if let Some(audio_source) = audio_source {
                other_sources.insert("audioSource".to_string(), audio_source);
            }
            post.medias.push(Media {
                kind: MediaKind::Video,
                other_sources: Some(other_sources),
                filename: Some(file.path().display().to_string()),
                filetype: Some(source_extension(&video_source)),
                filesize,
                file: Some(file),
                ..Media::default()
            });
        }
        RemuxResult::External { url } => {
            if let Some(media) = Media::external(MediaKind::Video, url) {
                post.medias.push(media);
            }
        }
    }

    Ok(Some(post))
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    if lazy_regex::regex_is_match!(r"^/p/[\w-]+/?$", url.path()) {
        return resolve_post(ctx, url).await;
    }
    if lazy_regex::regex_is_match!(r"^/reels?/[\w-]+/?$", url.path()) {
        return resolve_reel(ctx, url).await;
    }
    Ok(None)
}
