//! Coub loops: page-embedded JSON island, best-quality video and audio
//! variants merged locally with the video looped until the audio ends.

use std::collections::HashMap;

use select::document::Document;
use select::predicate::Attr;
use serde::Deserialize;
use url::Url;

use crate::error::{ExtractError, ExtractResult};
use crate::extractors::Ctx;
use crate::fetch::header_map;
use crate::post::{pick_best, Media, MediaKind, SocialPost};
use crate::remux::{merge, source_extension, MergeOptions, RemuxResult};

#[derive(Debug, Deserialize)]
struct CoubPost {
    #[serde(default)]
    title: String,
    channel: CoubChannel,
    file_versions: Option<FileVersions>,
}

#[derive(Debug, Deserialize)]
struct CoubChannel {
    #[serde(default)]
    title: String,
    #[serde(default)]
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct FileVersions {
    html5: Option<Html5Versions>,
    mobile: Option<MobileVersions>,
    share: Option<ShareVersion>,
}

#[derive(Debug, Deserialize)]
struct Html5Versions {
    #[serde(default)]
    video: HashMap<String, QualityOption>,
    #[serde(default)]
    audio: HashMap<String, QualityOption>,
}

#[derive(Debug, Deserialize)]
struct MobileVersions {
    #[serde(default)]
    video: String,
    #[serde(default)]
    audio: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ShareVersion {
    #[serde(rename = "default")]
    default_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QualityOption {
    #[serde(default)]
    url: String,
    #[serde(default)]
    size: u64,
}

fn best_of(options: &HashMap<String, QualityOption>) -> String {
    let candidates: Vec<&QualityOption> = options.values().collect();
    pick_best(&candidates, |option| option.size)
        .map(|option| option.url.clone())
        .unwrap_or_default()
}

/// Sources to merge, preferring the html5 quality ladder, then the mobile
/// pair, then the baked share file.
fn merge_sources(versions: &FileVersions) -> (String, String) {
    if let Some(html5) = &versions.html5 {
        return (best_of(&html5.video), best_of(&html5.audio));
    }
    if let Some(mobile) = &versions.mobile {
        return (
            mobile.video.clone(),
            mobile.audio.last().cloned().unwrap_or_default(),
        );
    }
    let share = versions
        .share
        .as_ref()
        .and_then(|s| s.default_url.clone())
        .unwrap_or_default();
    (share, String::new())
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    let Some((_, video_id)) = lazy_regex::regex_captures!(r"^/view/(\w+)", url.path()) else {
        return Ok(None);
    };

    let post_url = format!("https://coub.com/view/{video_id}");
    let page = ctx
        .fetcher
        .get_text(&post_url, header_map(&[("referer", "https://coub.com/")]))
        .await?;

    // Scoped: the parsed DOM must not live across the merge await below.
    let island = {
        let document = Document::from(page.as_str());
        document
            .find(Attr("id", "coubPageCoubJson"))
            .next()
            .map(|node| node.text())
    }
    .ok_or_else(|| ExtractError::shape(format!("no coubPageCoubJson island in {post_url}")))?;

    let coub: CoubPost = serde_json::from_str(island.trim())?;
    let versions = coub
        .file_versions
        .ok_or_else(|| ExtractError::shape(format!("coub {post_url} has no file_versions")))?;

    let mut post = SocialPost {
        caption: coub.title,
        author: coub.channel.title,
        author_url: format!("https://coub.com/{}", coub.channel.permalink),
        post_url,
        medias: Vec::new(),
    };

    let (video_url, audio_url) = merge_sources(&versions);

    // Coub loops the clip until its track ends; merge with a looped video
    // stream, falling back to the raw video on any remux failure.
    match merge(
        &ctx.cfg,
        &ctx.fetcher,
        &video_url,
        &audio_url,
        MergeOptions {
            loop_video: true,
            loop_audio: false,
        },
    )
    .await
    {
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
