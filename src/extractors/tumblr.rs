//! Tumblr posts via the v2 API (NPF content blocks).
//!
//! Handles both `<blog>.tumblr.com/post/<id>` subdomain URLs and
//! `tumblr.com/<blog>/<id>` main-domain URLs. Image blocks contribute the
//! widest media variant; text blocks join into the caption. A 404 from the
//! API means a deleted/hidden post — soft "not applicable".

use lazy_regex::{regex_captures, regex_replace};
use serde::Deserialize;
use url::Url;

use crate::error::{ExtractError, ExtractResult};
use crate::extractors::Ctx;
use crate::fetch::header_map;
use crate::post::{pick_best, Media, MediaKind, SocialPost};

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    response: Option<TumblrPost>,
}

#[derive(Debug, Default, Deserialize)]
struct TumblrPost {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    trail: Vec<TrailItem>,
}

#[derive(Debug, Default, Deserialize)]
struct TrailItem {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "image")]
    Image {
        #[serde(default)]
        media: Vec<ImageVariant>,
    },
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ImageVariant {
    url: String,
    #[serde(default)]
    width: u32,
}

fn blog_and_post_id(url: &Url) -> Option<(String, String)> {
    let host = url.host_str()?;
    let path = url.path();

    // Subdomain form: <blog>.tumblr.com/post/<id>
    if let Some((_, post_id)) = regex_captures!(r"^/posts?/(\d+)", path) {
        let blog_id = regex_replace!(r"(?i)\.tumblr\.(com|co\.\w+|org)$", host, "");
        if blog_id != host {
            return Some((blog_id.to_string(), post_id.to_string()));
        }
    }

    // Main-domain form: tumblr.com/<blog>/<id>
    let (_, blog_id, post_id) = regex_captures!(r"^/([^/]+)/(\d+)", path)?;
    Some((blog_id.to_string(), post_id.to_string()))
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    let Some((blog_id, post_id)) = blog_and_post_id(url) else {
        return Ok(None);
    };

    let mut api_url = format!("https://api.tumblr.com/v2/blog/{blog_id}/posts/{post_id}?npf=true");
    if !ctx.cfg.tokens.tumblr_api_key.is_empty() {
        api_url.push_str("&api_key=");
        api_url.push_str(&ctx.cfg.tokens.tumblr_api_key);
    }

    let response = ctx.fetcher.get(&api_url, header_map(&[])).await?;
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(ExtractError::UpstreamStatus {
            status,
            url: api_url,
        });
    }

    let envelope: ApiEnvelope = serde_json::from_str(&response.text().await?)?;
    let tumblr_post = envelope
        .response
        .ok_or_else(|| ExtractError::shape(format!("no response body in tumblr post {post_id}")))?;

    // Reblogs keep their media in the first trail item.
    let content = if tumblr_post.content.is_empty() {
        tumblr_post.trail.into_iter().next().map(|t| t.content).unwrap_or_default()
    } else {
        tumblr_post.content
    };

    if content.is_empty() {
        return Err(ExtractError::shape(format!("no content in tumblr post {post_id}")));
    }

    let medias: Vec<Media> = content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Image { media } => pick_best(media, |variant| variant.width),
            _ => None,
        })
        .filter_map(|best| {
            let kind = if best.url.to_lowercase().ends_with(".gif") {
                MediaKind::Gif
            } else {
                MediaKind::Photo
            };
            Media::external(kind, best.url.clone())
        })
        .collect();

    if medias.is_empty() {
        return Err(ExtractError::shape(format!("no medias in tumblr post {post_id}")));
    }

    let caption = content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(Some(SocialPost {
        caption: caption.trim().to_string(),
        author: blog_id.clone(),
        author_url: format!("https://{blog_id}.tumblr.com"),
        post_url: format!("https://{blog_id}.tumblr.com/post/{post_id}"),
        medias,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blog_and_post_id_subdomain() {
        let url = Url::parse("https://someblog.tumblr.com/post/123456").unwrap();
        assert_eq!(
            blog_and_post_id(&url),
            Some(("someblog".to_string(), "123456".to_string()))
        );
    }

    #[test]
    fn test_blog_and_post_id_main_domain() {
        let url = Url::parse("https://www.tumblr.com/someblog/123456").unwrap();
        assert_eq!(
            blog_and_post_id(&url),
            Some(("someblog".to_string(), "123456".to_string()))
        );
    }

    #[test]
    fn test_blog_and_post_id_rejects_non_posts() {
        let url = Url::parse("https://someblog.tumblr.com/archive").unwrap();
        assert_eq!(blog_and_post_id(&url), None);
    }

    #[test]
    fn test_content_blocks_pick_widest_image() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "image", "media": [
                    {"url": "https://img/small.png", "width": 250},
                    {"url": "https://img/big.png", "width": 1280}
                ]},
                {"type": "video", "url": "ignored"}
            ],
            "trail": []
        }"#;
        let parsed: TumblrPost = serde_json::from_str(json).unwrap();
        let images: Vec<&ImageVariant> = parsed
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Image { media } => pick_best(media, |v| v.width),
                _ => None,
            })
            .collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://img/big.png");
    }
}
