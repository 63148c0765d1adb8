//! YouTube via yt-dlp: every reported format becomes a Media entry so the
//! caller can offer the full quality ladder.

use url::Url;

use crate::error::ExtractResult;
use crate::extractors::Ctx;
use crate::post::{Media, MediaKind, SocialPost};
use crate::util::human_readable_size;
use crate::ytdlp::{self, YtDlpFormat, YtDlpOutput};

fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str().unwrap_or("");
    let segments: Vec<&str> = url.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect()).unwrap_or_default();

    if host.ends_with("youtu.be") {
        return segments.first().map(|s| s.to_string());
    }
    if host.ends_with("youtube.com") {
        if segments.first() == Some(&"shorts") {
            return segments.get(1).map(|s| s.to_string());
        }
        if segments.first() == Some(&"watch") {
            return url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.to_string());
        }
    }
    None
}

fn format_description(format: &YtDlpFormat, role: &str, codecs: String) -> String {
    let note = format.format_note.as_deref().unwrap_or("");
    let ext = format.ext.as_deref().unwrap_or("");
    let size = format
        .size()
        .map(|s| format!(" / {}", human_readable_size(s)))
        .unwrap_or_default();
    format!("{note} / {codecs} ({ext}) – {role}{size}")
}

/// Map one yt-dlp format entry to a Media item; `None` for formats with
/// neither stream (storyboards and such).
fn media_for_format(format: &YtDlpFormat) -> Option<Media> {
    let (kind, role, codecs) = match (format.has_video(), format.has_audio()) {
        (false, true) => (
            MediaKind::Audio,
            "audio",
            YtDlpFormat::codec_family(&format.acodec),
        ),
        (true, false) => (
            MediaKind::Video,
            "video",
            YtDlpFormat::codec_family(&format.vcodec),
        ),
        (true, true) => (
            MediaKind::Video,
            "video + audio",
            format!(
                "{} + {}",
                YtDlpFormat::codec_family(&format.vcodec),
                YtDlpFormat::codec_family(&format.acodec)
            ),
        ),
        (false, false) => return None,
    };

    let mut media = Media::external(kind, format.url.clone())?;
    media.filesize = format.size();
    media.filetype = format.ext.clone();
    media.description = Some(format_description(format, role, codecs));
    Some(media)
}

pub(crate) fn post_skeleton(output: &YtDlpOutput, fallback_post_url: &str) -> SocialPost {
    let title = output.title.clone().unwrap_or_default();
    let description = output.description.clone().unwrap_or_default();
    // Short descriptions piggyback on the caption; long ones are noise.
    let caption = if !description.is_empty() && description.len() < 50 {
        format!("{title}\n\n{description}")
    } else {
        title
    };

    SocialPost {
        caption,
        author: output.uploader.clone().unwrap_or_default(),
        author_url: output.uploader_url.clone().unwrap_or_default(),
        post_url: output
            .webpage_url
            .clone()
            .unwrap_or_else(|| fallback_post_url.to_string()),
        medias: Vec::new(),
    }
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    let Some(id) = video_id(url) else {
        log::info!("bad youtube video link: {url}");
        return Ok(None);
    };

    let watch_url = format!("https://www.youtube.com/watch?v={id}");
    let output = ytdlp::dump_json(&ctx.cfg, &watch_url, None).await?;

    let mut post = post_skeleton(&output, &watch_url);

    let mut formats = output.formats;
    formats.sort_by_key(|f| f.height.unwrap_or(0));
    post.medias = formats.iter().filter_map(media_for_format).collect();

    Ok(Some(post))
}
