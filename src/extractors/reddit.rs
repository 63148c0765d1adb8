//! Reddit posts via the public `.json` API.
//!
//! Videos are the interesting case: Reddit hosts audio separately, only
//! discoverable through the HLS master playlist. The chain — master
//! playlist → audio sub-playlist → audio segment URL → merge — fails soft
//! at every link back to the bare fallback video. Galleries and preview
//! variants map straight to external media. Crossposts resolve their
//! parent (depth-capped).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use lazy_regex::{regex_captures, regex_replace};
use serde::Deserialize;
use url::Url;

use crate::error::{ExtractError, ExtractResult};
use crate::extractors::Ctx;
use crate::fetch::header_map;
use crate::post::{Media, MediaKind, SocialPost};
use crate::remux::{merge, source_extension, MergeOptions, RemuxResult};
use crate::util::form_viewer_url;

const MAX_CROSSPOST_HOPS: u8 = 4;

#[derive(Debug, Deserialize)]
struct Listing {
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Option<PostData>,
}

#[derive(Debug, Default, Deserialize)]
struct PostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    url: Option<String>,
    url_overridden_by_dest: Option<String>,
    #[serde(default)]
    is_video: bool,
    #[serde(default)]
    is_gallery: bool,
    crosspost_parent: Option<String>,
    secure_media: Option<SecureMedia>,
    gallery_data: Option<GalleryData>,
    #[serde(default)]
    media_metadata: HashMap<String, MediaMetadata>,
    preview: Option<Preview>,
}

#[derive(Debug, Deserialize)]
struct SecureMedia {
    reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Default, Deserialize)]
struct RedditVideo {
    fallback_url: Option<String>,
    hls_url: Option<String>,
    #[serde(default)]
    is_gif: bool,
}

#[derive(Debug, Deserialize)]
struct GalleryData {
    #[serde(default)]
    items: Vec<GalleryItem>,
}

#[derive(Debug, Deserialize)]
struct GalleryItem {
    media_id: String,
}

#[derive(Debug, Deserialize)]
struct MediaMetadata {
    s: Option<MetadataSource>,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataSource {
    u: Option<String>,
    gif: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Preview {
    #[serde(default)]
    images: Vec<PreviewImage>,
}

#[derive(Debug, Default, Deserialize)]
struct PreviewImage {
    source: Option<PreviewSource>,
    variants: Option<PreviewVariants>,
}

#[derive(Debug, Deserialize)]
struct PreviewSource {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct PreviewVariants {
    gif: Option<VariantEntry>,
    mp4: Option<VariantEntry>,
}

#[derive(Debug, Deserialize)]
struct VariantEntry {
    source: Option<PreviewSource>,
}

/// `URI="..."` of the last `TYPE=AUDIO` line of an HLS master playlist.
fn audio_playlist_uri(master_playlist: &str) -> Option<String> {
    let line = master_playlist
        .lines()
        .filter(|line| line.to_uppercase().contains("TYPE=AUDIO"))
        .next_back()?;
    regex_captures!(r#"URI="([^"]+)""#, line).map(|(_, uri)| uri.to_string())
}

/// Last non-comment entry of a media playlist — the actual segment name.
fn last_media_entry(playlist: &str) -> Option<String> {
    playlist
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .next_back()
        .map(str::to_string)
}

/// Replace the final path segment of `base` with `name`.
fn sibling_url(base: &str, name: &str) -> String {
    regex_replace!(r"/[^/]+$", base, |_| format!("/{name}")).to_string()
}

/// Walk the HLS chain to find the separately-hosted audio URL. Any failure
/// or absence resolves to `None` (caller falls back to bare video).
async fn discover_audio_url(ctx: &Ctx, hls_url: &str) -> Option<String> {
    let headers = header_map(&[("referer", "https://www.reddit.com/")]);

    let master = ctx.fetcher.get_text(hls_url, headers.clone()).await.ok()?;
    let audio_playlist_location = audio_playlist_uri(&master)?;

    let audio_playlist = ctx
        .fetcher
        .get_text(&sibling_url(hls_url, &audio_playlist_location), headers)
        .await
        .ok()?;
    let segment = last_media_entry(&audio_playlist)?;

    Some(sibling_url(hls_url, &segment))
}

async fn video_media(ctx: &Ctx, reddit_video: &RedditVideo) -> Result<Option<Media>, ExtractError> {
    let Some(video) = reddit_video.fallback_url.clone().filter(|v| !v.is_empty()) else {
        return Err(ExtractError::shape("reddit post is_video but has no fallback_url"));
    };
    let is_gif = reddit_video.is_gif;

    let remuxed = match &reddit_video.hls_url {
        Some(hls_url) if !is_gif => match discover_audio_url(ctx, hls_url).await {
            Some(audio) => merge(&ctx.cfg, &ctx.fetcher, &video, &audio, MergeOptions::default()).await,
            None => RemuxResult::External { url: video.clone() },
        },
        _ => RemuxResult::External { url: video.clone() },
    };

    Ok(match remuxed {
        RemuxResult::Local {
            file,
            filesize,
            video_source,
            audio_source,
        } => {
            let mut other_sources = std::collections::BTreeMap::new();
            other_sources.insert("videoSource".to_string(), video_source.clone());
            if let Some(audio_source) = &audio_source {
                other_sources.insert("audioSource".to_string(), audio_source.clone());
            }
            Some(Media {
                // A "gif" that actually carries audio is a video.
                kind: if is_gif && audio_source.is_none() {
                    MediaKind::Gif
                } else {
                    MediaKind::Video
                },
                other_sources: Some(other_sources),
                filename: Some(file.path().display().to_string()),
                filetype: Some(source_extension(&video_source)),
                filesize,
                file: Some(file),
                ..Media::default()
            })
        }
        RemuxResult::External { url } => Media::external(
            if is_gif { MediaKind::Gif } else { MediaKind::Video },
            url,
        ),
    })
}

fn gallery_medias(post: &PostData) -> Vec<Media> {
    let Some(gallery) = &post.gallery_data else {
        return Vec::new();
    };

    gallery
        .items
        .iter()
        .filter_map(|item| {
            let source = post.media_metadata.get(&item.media_id)?.s.as_ref()?;

            if let Some(gif) = &source.gif {
                return Media::external(MediaKind::Gif, gif.clone());
            }

            let preview = crate::classify::safe_parse_url(source.u.as_deref()?);
            let host = preview.host_str()?.replacen("preview.", "i.", 1);
            Media::external(MediaKind::Photo, format!("https://{host}{}", preview.path()))
        })
        .collect()
}

fn preview_medias(post: &PostData) -> Vec<Media> {
    let Some(preview) = &post.preview else {
        return Vec::new();
    };

    preview
        .images
        .iter()
        .filter_map(|image| {
            let variants = image.variants.as_ref()?;
            let is_gif = variants
                .gif
                .as_ref()
                .and_then(|v| v.source.as_ref())
                .is_some_and(|s| !s.url.is_empty());
            let video_url = variants
                .mp4
                .as_ref()
                .and_then(|v| v.source.as_ref())
                .map(|s| s.url.replace("&amp;", "&"))?;

            let mut media = Media::external(
                if is_gif { MediaKind::Gif } else { MediaKind::Video },
                video_url,
            )?;
            media.filetype = Some("mp4".to_string());
            Some(media)
        })
        .collect()
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    resolve_with_depth(ctx, url.clone(), 0).await
}

/// Boxed because crossposts recurse into the same extractor.
fn resolve_with_depth<'a>(
    ctx: &'a Ctx,
    url: Url,
    depth: u8,
) -> Pin<Box<dyn Future<Output = ExtractResult> + Send + 'a>> {
    Box::pin(async move {
        // Shortlinks carry only the post id.
        let path = if url.host_str() == Some("redd.it") {
            format!("/comments{}", url.path())
        } else {
            url.path().to_string()
        };

        let Some((_, given_pathname)) =
            regex_captures!(r"^((?:/r/[\w.-]+)?/comments/[\w.-]+)/?", &path)
        else {
            return Ok(None);
        };

        let post_url = format!("https://www.reddit.com{given_pathname}");
        let headers = header_map(&[("referer", "https://www.reddit.com/")]);

        let listings: Vec<Listing> = ctx.fetcher.get_json(&format!("{post_url}.json"), headers).await?;
        let post = listings
            .into_iter()
            .next()
            .and_then(|listing| listing.data)
            .and_then(|data| data.children.into_iter().next())
            .and_then(|child| child.data)
            .ok_or_else(|| ExtractError::shape(format!("no post in {post_url}.json")))?;

        if let Some(crosspost_parent) = &post.crosspost_parent {
            // "t3_<id>" fullname → parent post.
            let Some(parent_id) = crosspost_parent.split('_').nth(1) else {
                return Ok(None);
            };
            if depth >= MAX_CROSSPOST_HOPS {
                return Err(ExtractError::shape(format!(
                    "crosspost chain deeper than {MAX_CROSSPOST_HOPS} at {post_url}"
                )));
            }
            let parent_url =
                crate::classify::safe_parse_url(&format!("https://www.reddit.com/comments/{parent_id}"));
            return resolve_with_depth(ctx, parent_url, depth + 1).await;
        }

        let image_url = post
            .url
            .clone()
            .or_else(|| post.url_overridden_by_dest.clone())
            .unwrap_or_default();
        let is_imgur = crate::classify::safe_parse_url(&image_url)
            .host_str()
            .is_some_and(|host| host.ends_with("imgur.com"));
        let is_gif = image_url.to_lowercase().ends_with(".gif");

        let mut social_post = SocialPost {
            caption: post.title.clone(),
            author: post.author.clone(),
            author_url: format!("https://www.reddit.com/u/{}", post.author),
            post_url,
            medias: Vec::new(),
        };

        if post.is_video {
            let reddit_video = post
                .secure_media
                .as_ref()
                .and_then(|m| m.reddit_video.as_ref())
                .ok_or_else(|| {
                    ExtractError::shape(format!("{} is video but has no secure_media", social_post.post_url))
                })?;
            social_post.medias.extend(video_media(ctx, reddit_video).await?);
            return Ok(Some(social_post));
        }

        if post.is_gallery {
            social_post.medias = gallery_medias(&post);
            return Ok(Some(social_post));
        }

        let preview = preview_medias(&post);
        if !preview.is_empty() {
            social_post.medias = preview;
            return Ok(Some(social_post));
        }

        if lazy_regex::regex_is_match!(r"(?i)\.(jpe?g|png|gif)$", &image_url) {
            let external = if is_imgur {
                let source = post
                    .preview
                    .as_ref()
                    .and_then(|p| p.images.first())
                    .and_then(|image| image.source.as_ref())
                    .map(|s| s.url.replace("&amp;", "&"))
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| image_url.clone());
                form_viewer_url(&ctx.cfg, &source, "https://www.reddit.com", true)
            } else {
                image_url.clone()
            };
            social_post.medias.extend(Media::external(
                if is_gif { MediaKind::Gif } else { MediaKind::Photo },
                external,
            ));
        }

        Ok(Some(social_post))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_audio_playlist_uri() {
        let master = "#EXTM3U\n\
            #EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"audio\",URI=\"HLS_AUDIO_64.m3u8\"\n\
            #EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"audio\",URI=\"HLS_AUDIO_128.m3u8\"\n\
            #EXT-X-STREAM-INF:BANDWIDTH=1000000\n\
            HLS_540.m3u8";
        assert_eq!(audio_playlist_uri(master).as_deref(), Some("HLS_AUDIO_128.m3u8"));
        assert_eq!(audio_playlist_uri("#EXTM3U\nHLS_540.m3u8"), None);
    }

    #[test]
    fn test_last_media_entry() {
        let playlist = "#EXTM3U\n#EXT-X-VERSION:3\n#EXTINF:2.0,\nAUDIO_1.aac\n#EXTINF:1.4,\nAUDIO_2.aac\n#EXT-X-ENDLIST";
        assert_eq!(last_media_entry(playlist).as_deref(), Some("AUDIO_2.aac"));
        assert_eq!(last_media_entry("#EXTM3U\n#EXT-X-ENDLIST"), None);
    }

    #[test]
    fn test_sibling_url() {
        assert_eq!(
            sibling_url("https://v.redd.it/abc/HLSPlaylist.m3u8", "HLS_AUDIO_128.m3u8"),
            "https://v.redd.it/abc/HLS_AUDIO_128.m3u8"
        );
    }

    #[test]
    fn test_post_path_shapes() {
        fn rx(path: &str) -> Option<(&str, &str)> {
            regex_captures!(r"^((?:/r/[\w.-]+)?/comments/[\w.-]+)/?", path)
        }
        assert_eq!(
            rx("/r/pics/comments/abc123/some_title/").unwrap().1,
            "/r/pics/comments/abc123"
        );
        assert_eq!(rx("/comments/abc123").unwrap().1, "/comments/abc123");
        assert!(rx("/r/pics/hot").is_none());
    }

    #[test]
    fn test_gallery_medias_rewrites_preview_host() {
        let json = r#"{
            "title": "t", "author": "a",
            "is_gallery": true,
            "gallery_data": {"items": [{"media_id": "m1"}, {"media_id": "m2"}, {"media_id": "missing"}]},
            "media_metadata": {
                "m1": {"s": {"u": "https://preview.redd.it/one.jpg?width=640"}},
                "m2": {"s": {"gif": "https://i.redd.it/two.gif"}}
            }
        }"#;
        let post: PostData = serde_json::from_str(json).unwrap();
        let medias = gallery_medias(&post);
        assert_eq!(medias.len(), 2);
        assert_eq!(medias[0].kind, MediaKind::Photo);
        assert_eq!(medias[0].external_url.as_deref(), Some("https://i.redd.it/one.jpg"));
        assert_eq!(medias[1].kind, MediaKind::Gif);
        assert_eq!(medias[1].external_url.as_deref(), Some("https://i.redd.it/two.gif"));
    }

    #[test]
    fn test_preview_medias_gif_vs_video() {
        let json = r#"{
            "title": "t", "author": "a",
            "preview": {"images": [{
                "source": {"url": "https://preview.redd.it/x.jpg"},
                "variants": {
                    "gif": {"source": {"url": "https://preview.redd.it/x.gif"}},
                    "mp4": {"source": {"url": "https://preview.redd.it/x.mp4?a=1&amp;b=2"}}
                }
            }]}
        }"#;
        let post: PostData = serde_json::from_str(json).unwrap();
        let medias = preview_medias(&post);
        assert_eq!(medias.len(), 1);
        assert_eq!(medias[0].kind, MediaKind::Gif);
        assert_eq!(
            medias[0].external_url.as_deref(),
            Some("https://preview.redd.it/x.mp4?a=1&b=2")
        );
    }
}
