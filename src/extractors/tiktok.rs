//! TikTok via yt-dlp, with an h265→h264 conversion fallback.
//!
//! TikTok serves combined video+audio formats in h264 and h265. h264
//! formats are directly playable and listed as-is; when only h265 exists,
//! the best one is listed and a duplicate of it is converted locally so the
//! caller still gets something playable. Photo-card posts (no format
//! reports a size) carry no media.

use url::Url;

use crate::error::ExtractResult;
use crate::extractors::Ctx;
use crate::extractors::youtube::post_skeleton;
use crate::post::{Media, MediaKind};
use crate::remux::{convert, RemuxResult};
use crate::util::human_readable_size;
use crate::ytdlp::{self, YtDlpFormat};

fn is_post_path(url: &Url) -> bool {
    let host = url.host_str().unwrap_or("");
    let shortened = host != "tiktok.com" && host != "www.tiktok.com";
    let parts: Vec<&str> = url.path().split('/').filter(|p| !p.is_empty()).collect();

    if shortened {
        parts.len() == 1
    } else {
        parts.len() >= 3 && parts[1] == "video"
    }
}

/// Displayed width: reported width, else the `<res>_<width>` format-id
/// convention, else 720.
fn display_width(format: &YtDlpFormat) -> String {
    if let Some(width) = format.width {
        return width.to_string();
    }
    if let Some(id) = &format.format_id {
        if let Some((_, width)) = lazy_regex::regex_captures!(r"^[^_]+_(\d+)", id) {
            return width.to_string();
        }
    }
    "720".to_string()
}

fn format_description(format: &YtDlpFormat, vcodec: &str, acodec: &str, ext: &str, size: Option<u64>, converted: bool) -> String {
    let mut description = format!(
        "{}p / {} + {} ({}) – video + audio",
        display_width(format),
        vcodec,
        acodec,
        ext
    );
    if let Some(size) = size {
        description.push_str(&format!(" / {}", human_readable_size(size)));
    }
    if format
        .format_note
        .as_deref()
        .is_some_and(|note| note.to_lowercase().contains("watermark"))
    {
        description.push_str(" / Watermarked");
    }
    if converted {
        description.push_str(" / Converted");
    }
    description
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    if !is_post_path(url) {
        log::info!("bad tiktok video link: {url}");
        return Ok(None);
    }

    let output = ytdlp::dump_json(&ctx.cfg, url.as_str(), None).await?;
    let mut post = post_skeleton(&output, url.as_str());

    // Photo-card posts report no sized formats at all.
    if !output.formats.iter().any(|f| f.filesize.is_some()) {
        return Ok(Some(post));
    }

    let combined: Vec<&YtDlpFormat> = output
        .formats
        .iter()
        .filter(|f| f.has_video() && f.has_audio() && !f.url.ends_with(".mp3"))
        .collect();

    // The same rendition shows up once per CDN; keep one per size.
    let mut unique_by_size: Vec<&YtDlpFormat> = Vec::new();
    for format in &combined {
        if !unique_by_size.iter().any(|seen| seen.size() == format.size()) {
            unique_by_size.push(format);
        }
    }

    let vcodec_of = |f: &YtDlpFormat| YtDlpFormat::codec_family(&f.vcodec);

    let h264: Vec<&YtDlpFormat> = unique_by_size
        .iter()
        .copied()
        .filter(|f| vcodec_of(f) == "h264")
        .collect();
    let h265: Vec<&YtDlpFormat> = unique_by_size
        .iter()
        .copied()
        .filter(|f| vcodec_of(f) == "h265")
        .collect();
    let best_h265 = h265
        .iter()
        .copied()
        .max_by_key(|f| f.size().unwrap_or(0));

    let mut listed: Vec<&YtDlpFormat> = h264.clone();
    if let Some(best) = best_h265 {
        listed.push(best);
    }

    for format in &listed {
        if let Some(mut media) = Media::external(MediaKind::Video, format.url.clone()) {
            media.filesize = format.size();
            media.filetype = format.ext.clone();
            media.description = Some(format_description(
                format,
                &vcodec_of(format),
                &YtDlpFormat::codec_family(&format.acodec),
                format.ext.as_deref().unwrap_or(""),
                format.size(),
                false,
            ));
            post.medias.push(media);
        }
    }

    // Playable h264 exists — done.
    if !h264.is_empty() {
        return Ok(Some(post));
    }

    // Only h265: convert a CDN duplicate of the best one to h264/aac.
    let to_convert = combined
        .iter()
        .copied()
        .filter(|f| {
            vcodec_of(f) == "h265"
                && best_h265.is_some_and(|best| f.size() == best.size() && f.format_id != best.format_id)
        })
        .next_back();

    let Some(to_convert) = to_convert else {
        if post.medias.is_empty() {
            return Ok(None);
        }
        return Ok(Some(post));
    };

    match convert(&ctx.cfg, &ctx.fetcher, &to_convert.url, "mp4", "h264", "aac").await {
        RemuxResult::Local {
            file,
            filesize,
            video_source,
            ..
        } => {
            post.medias.push(Media {
                kind: MediaKind::Video,
                other_sources: Some(std::collections::BTreeMap::from([(
                    "videoSource".to_string(),
                    video_source,
                )])),
                filename: Some(file.path().display().to_string()),
                filetype: to_convert.ext.clone(),
                filesize,
                description: Some(format_description(to_convert, "h264", "aac", "mp4", filesize, true)),
                file: Some(file),
                ..Media::default()
            });
        }
        // Conversion failed soft; the h265 listing stands on its own.
        RemuxResult::External { .. } => {}
    }

    Ok(Some(post))
}
