//! Ugoira assembler contract: frames unpack, the concat script drives the
//! encoder, and every intermediate artifact is removed whether or not the
//! encode succeeds.

mod common;

use std::io::Write;

use common::{config_with, fake_encoder_fail, fake_encoder_ok, picker_files};
use social_picker::remux::ugoira::{self, UgoiraMeta};
use social_picker::MediaKind;

const ZIP_URL: &str = "https://i.pximg.net/img-zip-ugoira/img/2023/01/02/03/04/05/123_ugoira1920x1080.zip";

fn frames_zip(names: &[&str]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for name in names {
        writer
            .start_file(name.to_string(), zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"not really a jpeg").unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn meta(files: &[(&str, u64)]) -> UgoiraMeta {
    serde_json::from_value(serde_json::json!({
        "frames": files
            .iter()
            .map(|(file, delay)| serde_json::json!({"file": file, "delay": delay}))
            .collect::<Vec<_>>(),
        "originalSrc": ZIP_URL,
    }))
    .unwrap()
}

#[tokio::test]
async fn test_ugoira_success_leaves_only_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_with(dir.path(), &fake_encoder_ok(dir.path()));

    let zip_bytes = frames_zip(&["000000.jpg", "000001.jpg", "000002.jpg"]);
    let built = ugoira::build(&cfg, &meta(&[("000000.jpg", 70), ("000001.jpg", 100), ("000002.jpg", 1500)]), &zip_bytes)
        .await
        .expect("assembly with a succeeding encoder must yield a media");

    assert_eq!(built.kind, MediaKind::Gif);
    assert_eq!(built.filetype.as_deref(), Some("mp4"));
    assert_eq!(built.external_url.as_deref(), Some(ZIP_URL));
    assert_eq!(
        built.other_sources.as_ref().and_then(|s| s.get("zip")).map(String::as_str),
        Some(ZIP_URL)
    );

    // 3 frames + 1 list removed; only the encoder output remains.
    let leftovers = picker_files(dir.path());
    assert_eq!(leftovers.len(), 1);
    assert!(leftovers[0].ends_with("_output.mp4"));

    let file = built.file.expect("local media must carry its release handle");
    assert_eq!(built.filename.as_deref(), file.path().to_str());
    file.release();
    file.release();
    assert!(picker_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_ugoira_encoder_failure_yields_none_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_with(dir.path(), &fake_encoder_fail(dir.path()));

    let zip_bytes = frames_zip(&["000000.jpg", "000001.jpg"]);
    let built = ugoira::build(&cfg, &meta(&[("000000.jpg", 70), ("000001.jpg", 100)]), &zip_bytes).await;

    assert!(built.is_none(), "a failed assembly degrades to no media");
    assert!(
        picker_files(dir.path()).is_empty(),
        "frames, list and partial output must all be removed"
    );
}

#[tokio::test]
async fn test_ugoira_garbage_zip_yields_none() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_with(dir.path(), &fake_encoder_ok(dir.path()));

    let built = ugoira::build(&cfg, &meta(&[("000000.jpg", 70)]), b"this is not a zip").await;

    assert!(built.is_none());
    assert!(picker_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_ugoira_empty_zip_yields_none() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_with(dir.path(), &fake_encoder_ok(dir.path()));

    let built = ugoira::build(&cfg, &meta(&[]), &frames_zip(&[])).await;

    assert!(built.is_none());
    assert!(picker_files(dir.path()).is_empty());
}
