//! Merge/convert contract tests against fake encoder binaries and mocked
//! upstreams: the short-circuit, the fail-soft fallback, and the cleanup
//! invariant (no residual `picker_*` files on any path).

mod common;

use common::{config_with, fake_encoder_fail, fake_encoder_noisy, fake_encoder_ok, picker_files};
use social_picker::fetch::Fetcher;
use social_picker::{merge, convert, MergeOptions, RemuxResult};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_media_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/video.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 64]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio.m4a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![2u8; 32]))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_merge_without_audio_short_circuits() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_with(dir.path(), &fake_encoder_fail(dir.path()));
    let fetcher = Fetcher::new(&cfg).unwrap();

    let result = merge(&cfg, &fetcher, "https://cdn.example/video.mp4", "", MergeOptions::default()).await;

    match result {
        RemuxResult::External { url } => assert_eq!(url, "https://cdn.example/video.mp4"),
        RemuxResult::Local { .. } => panic!("no-audio merge must not produce a local file"),
    }
    // No fetches, no temp files.
    assert!(picker_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_merge_success_produces_released_file() {
    let server = mock_media_server().await;
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_with(dir.path(), &fake_encoder_ok(dir.path()));
    let fetcher = Fetcher::new(&cfg).unwrap();

    let video_url = format!("{}/video.mp4", server.uri());
    let audio_url = format!("{}/audio.m4a", server.uri());

    let result = merge(&cfg, &fetcher, &video_url, &audio_url, MergeOptions::default()).await;

    let RemuxResult::Local {
        file,
        filesize,
        video_source,
        audio_source,
    } = result
    else {
        panic!("merge with a succeeding encoder must produce a local file");
    };

    assert_eq!(video_source, video_url);
    assert_eq!(audio_source.as_deref(), Some(audio_url.as_str()));
    assert_eq!(filesize, Some("merged".len() as u64));
    assert!(file.path().exists());

    // Both downloaded inputs are gone; only the output remains.
    let leftovers = picker_files(dir.path());
    assert_eq!(leftovers.len(), 1);
    assert!(leftovers[0].ends_with("_out.mp4"));

    // The handle deletes exactly its file, and double release is a no-op.
    file.release();
    assert!(!file.path().exists());
    file.release();
    assert!(picker_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_merge_encoder_failure_falls_back_and_cleans_up() {
    let server = mock_media_server().await;
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_with(dir.path(), &fake_encoder_fail(dir.path()));
    let fetcher = Fetcher::new(&cfg).unwrap();

    let video_url = format!("{}/video.mp4", server.uri());
    let audio_url = format!("{}/audio.m4a", server.uri());

    let result = merge(&cfg, &fetcher, &video_url, &audio_url, MergeOptions::default()).await;

    match result {
        RemuxResult::External { url } => assert_eq!(url, video_url),
        RemuxResult::Local { .. } => panic!("failed encoder must fall back to the source url"),
    }
    assert!(picker_files(dir.path()).is_empty(), "no residual temp files allowed");
}

#[tokio::test]
async fn test_merge_encoder_stderr_output_is_fatal() {
    let server = mock_media_server().await;
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_with(dir.path(), &fake_encoder_noisy(dir.path()));
    let fetcher = Fetcher::new(&cfg).unwrap();

    let video_url = format!("{}/video.mp4", server.uri());
    let audio_url = format!("{}/audio.m4a", server.uri());

    let result = merge(&cfg, &fetcher, &video_url, &audio_url, MergeOptions::default()).await;

    assert!(
        matches!(result, RemuxResult::External { url } if url == video_url),
        "stderr output must count as a failure"
    );
    assert!(picker_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_merge_download_failure_aborts_whole_operation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/video.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 64]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio.m4a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config_with(dir.path(), &fake_encoder_ok(dir.path()));
    let fetcher = Fetcher::new(&cfg).unwrap();

    let video_url = format!("{}/video.mp4", server.uri());
    let audio_url = format!("{}/audio.m4a", server.uri());

    let result = merge(&cfg, &fetcher, &video_url, &audio_url, MergeOptions::default()).await;

    assert!(matches!(result, RemuxResult::External { url } if url == video_url));
    assert!(picker_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_convert_success_and_fallback() {
    let server = mock_media_server().await;
    let dir = tempfile::tempdir().unwrap();
    let video_url = format!("{}/video.mp4", server.uri());

    // Success: local file with the target extension, input cleaned up.
    let cfg = config_with(dir.path(), &fake_encoder_ok(dir.path()));
    let fetcher = Fetcher::new(&cfg).unwrap();
    let result = convert(&cfg, &fetcher, &video_url, "mp4", "h264", "aac").await;
    let RemuxResult::Local { file, audio_source, .. } = result else {
        panic!("convert with a succeeding encoder must produce a local file");
    };
    assert!(audio_source.is_none());
    assert!(file.path().to_string_lossy().ends_with("_out.mp4"));
    file.release();
    assert!(picker_files(dir.path()).is_empty());

    // Failure: fall back to the source, nothing left behind.
    let cfg = config_with(dir.path(), &fake_encoder_fail(dir.path()));
    let fetcher = Fetcher::new(&cfg).unwrap();
    let result = convert(&cfg, &fetcher, &video_url, "mp4", "h264", "aac").await;
    assert!(matches!(result, RemuxResult::External { url } if url == video_url));
    assert!(picker_files(dir.path()).is_empty());
}
