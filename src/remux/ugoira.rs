//! Ugoira assembly: a zip of frame images plus per-frame delays becomes a
//! single video via the encoder's concat demuxer.
//!
//! Specialized case of the remux lifecycle: unpack every frame to a temp
//! file, write a concat script listing each frame with its display
//! duration, run the encoder, and remove the frames and the script no
//! matter what happened. Any failure resolves to `None` — the parent post
//! just has one fewer media item.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

use crate::config::Config;
use crate::error::ExtractError;
use crate::post::{Media, MediaKind};
use crate::remux::hooks::DeferredFile;
use crate::remux::{remove_quiet, run_encoder, temp_base};

const OUTPUT_EXTENSION: &str = "mp4";

/// Fallback display duration when a zip entry has no delay metadata.
const DEFAULT_FRAME_DELAY_MS: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct UgoiraFrame {
    pub file: String,
    /// Display duration in milliseconds.
    pub delay: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UgoiraMeta {
    pub frames: Vec<UgoiraFrame>,
    /// URL of the source zip; doubles as the media's external reference.
    pub original_src: String,
}

/// Concat-demuxer script: one `file`/`duration` pair per frame, durations
/// in seconds with millisecond precision.
fn concat_script(frames: &[(String, u64)]) -> String {
    frames
        .iter()
        .map(|(name, delay_ms)| format!("file '{}'\nduration {:.3}", name, *delay_ms as f64 / 1000.0))
        .collect::<Vec<_>>()
        .join("\n")
}

fn sanitize_entry_name(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric() || *c == '.').collect()
}

/// Build the ugoira video. Returns the gif-typed Media on success, `None`
/// on any failure (logged).
pub async fn build(cfg: &Config, meta: &UgoiraMeta, zip_bytes: &[u8]) -> Option<Media> {
    match build_inner(cfg, meta, zip_bytes).await {
        Ok(media) => Some(media),
        Err(e) => {
            log::warn!("ugoira assembly failed for {}: {e}", meta.original_src);
            None
        }
    }
}

async fn build_inner(cfg: &Config, meta: &UgoiraMeta, zip_bytes: &[u8]) -> Result<Media, ExtractError> {
    let delays: HashMap<&str, u64> = meta.frames.iter().map(|f| (f.file.as_str(), f.delay)).collect();

    let temp_dir = cfg.temp_dir();
    let base = temp_base(&meta.original_src);
    let output_filename = format!("{base}_output.{OUTPUT_EXTENSION}");
    let output_path = temp_dir.join(&output_filename);
    let list_filename = format!("{base}_list.txt");
    let list_path = temp_dir.join(&list_filename);

    // (temp filename, delay ms) in zip order.
    let mut stored: Vec<(String, u64)> = Vec::new();

    let unpack_result: Result<(), ExtractError> = (|| {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes))
            .map_err(|e| ExtractError::shape(format!("bad ugoira zip: {e}")))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ExtractError::shape(format!("bad ugoira zip entry {index}: {e}")))?;
            if entry.is_dir() {
                continue;
            }

            let entry_name = entry.name().to_string();
            let delay = delays.get(entry_name.as_str()).copied().unwrap_or(DEFAULT_FRAME_DELAY_MS);

            let mut frame_bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut frame_bytes)?;

            let temp_filename = format!("{base}_{}", sanitize_entry_name(&entry_name));
            std::fs::write(temp_dir.join(&temp_filename), &frame_bytes)?;
            stored.push((temp_filename, delay));
        }
        Ok(())
    })();

    let encode_result: Result<(), ExtractError> = match unpack_result {
        Ok(()) if stored.is_empty() => Err(ExtractError::shape("ugoira zip contained no frames")),
        Ok(()) => async {
            std::fs::write(&list_path, concat_script(&stored))?;
            // Relative names + cwd keep the concat demuxer in safe mode.
            run_encoder(
                cfg,
                &[
                    "-f",
                    "concat",
                    "-i",
                    &list_filename,
                    "-movflags",
                    "faststart",
                    "-pix_fmt",
                    "yuv420p",
                    "-vf",
                    "scale=trunc(iw/2)*2:trunc(ih/2)*2",
                    &output_filename,
                ],
                Some(&temp_dir),
            )
            .await
        }
        .await,
        Err(e) => Err(e),
    };

    // Frames and script are intermediate on every path.
    for (temp_filename, _) in &stored {
        remove_quiet(&temp_dir.join(temp_filename));
    }
    remove_quiet(&list_path);

    if let Err(e) = encode_result {
        remove_quiet(&output_path);
        return Err(e);
    }

    Ok(Media {
        kind: MediaKind::Gif,
        external_url: Some(meta.original_src.clone()),
        original: Some(meta.original_src.clone()),
        other_sources: Some(std::collections::BTreeMap::from([(
            "zip".to_string(),
            meta.original_src.clone(),
        )])),
        filetype: Some(OUTPUT_EXTENSION.to_string()),
        filename: Some(output_path.display().to_string()),
        filesize: std::fs::metadata(&output_path).map(|m| m.len()).ok(),
        file: Some(DeferredFile::new(output_path)),
        ..Media::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_concat_script_lists_frames_in_order() {
        let frames = vec![
            ("picker_x_000000.jpg".to_string(), 70),
            ("picker_x_000001.jpg".to_string(), 100),
            ("picker_x_000002.jpg".to_string(), 1500),
        ];
        let script = concat_script(&frames);
        assert_eq!(
            script,
            "file 'picker_x_000000.jpg'\nduration 0.070\n\
             file 'picker_x_000001.jpg'\nduration 0.100\n\
             file 'picker_x_000002.jpg'\nduration 1.500"
        );
        assert_eq!(script.matches("file '").count(), 3);
    }

    #[test]
    fn test_sanitize_entry_name() {
        assert_eq!(sanitize_entry_name("000000.jpg"), "000000.jpg");
        assert_eq!(sanitize_entry_name("evil name/..0.jpg"), "evilname..0.jpg");
    }

    #[test]
    fn test_meta_parses_pixiv_shape() {
        let json = r#"{
            "frames": [{"file": "000000.jpg", "delay": 70}],
            "originalSrc": "https://i.pximg.net/img-zip-ugoira/a.zip"
        }"#;
        let meta: UgoiraMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.frames.len(), 1);
        assert_eq!(meta.frames[0].delay, 70);
    }
}
