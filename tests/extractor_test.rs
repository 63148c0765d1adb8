//! End-to-end extractor flow against a mocked upstream: the booru
//! contract fetches the post page it was given, picks the full-resolution
//! link, and produces a single-photo post.

use std::sync::Arc;

use social_picker::extractors::{boorus, Ctx};
use social_picker::fetch::Fetcher;
use social_picker::{classify, Config, MediaKind, Platform};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ctx() -> Ctx {
    let cfg = Arc::new(Config::default());
    let fetcher = Fetcher::new(&cfg).unwrap();
    Ctx::new(cfg, fetcher)
}

const DANBOORU_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <section id="post-information">
    <ul>
      <li id="post-info-uploader">
        <a href="/users/42" data-user-name="uploader1">uploader1</a>
      </li>
      <li id="post-info-size">
        <a href="/data/original/deadbeef.jpg">2.31 MB</a> (1280x1920)
      </li>
    </ul>
  </section>
</body></html>"#;

#[tokio::test]
async fn test_danbooru_page_resolves_to_single_photo() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/123456"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DANBOORU_PAGE))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/posts/123456", server.uri())).unwrap();
    let post = boorus::danbooru(&ctx(), &url)
        .await
        .unwrap()
        .expect("post-shaped path must resolve");

    assert_eq!(post.author, "uploader1");
    assert!(post.author_url.ends_with("/users/42"));
    assert_eq!(post.medias.len(), 1);
    assert_eq!(post.medias[0].kind, MediaKind::Photo);
    assert_eq!(
        post.medias[0].external_url.as_deref(),
        Some(format!("{}/data/original/deadbeef.jpg", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_danbooru_missing_anchor_is_shape_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/123456"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>nothing here</body></html>"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/posts/123456", server.uri())).unwrap();
    let result = boorus::danbooru(&ctx(), &url).await;
    assert!(result.is_err(), "missing structure must fail loud, not silently");
}

#[tokio::test]
async fn test_danbooru_upstream_error_status_fails_loud() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/123456"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/posts/123456", server.uri())).unwrap();
    let result = boorus::danbooru(&ctx(), &url).await;
    assert!(result.is_err());
}

#[test]
fn test_classifier_feeds_the_booru_contract() {
    let classified = classify("https://danbooru.donmai.us/posts/123456?q=tag");
    assert_eq!(classified.platform, Some(Platform::Danbooru));
    assert_eq!(classified.url.path(), "/posts/123456");
}
