//! Tweet resolution through the external scraper binary.
//!
//! The configured executable is invoked as
//! `<scraper> getTweet <cookies-file> <status-id>` and prints a SocialPost
//! JSON document on stdout. Missing medias/author in the output mean the
//! tweet has nothing to deliver — soft "not applicable".

use lazy_regex::{regex_captures, regex_replace_all};
use tokio::process::Command;
use tokio::time::timeout;
use url::Url;

use crate::config::SUBPROCESS_TIMEOUT_SECS;
use crate::error::{ExtractError, ExtractResult};
use crate::extractors::Ctx;
use crate::post::SocialPost;
use crate::util::clean_caption;

/// Strip the trailing `t.co` short-link token Twitter appends to captions,
/// then collapse whitespace.
pub(crate) fn clean_tweet_caption(caption: &str) -> String {
    let stripped = regex_replace_all!(r"(?i)\s?(?:https?://)?t\.co/\w+$", caption, "");
    clean_caption(&stripped)
}

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    let Some((_, status_id)) = regex_captures!(r"^(?:/\w+)?/status(?:es)?/(\d+)", url.path()) else {
        return Ok(None);
    };

    let scraper = &ctx.cfg.tokens.twitter_scraper_bin;
    if scraper.is_empty() {
        return Err(ExtractError::subprocess(
            "twitter-scraper",
            "no scraper binary configured",
        ));
    }

    let output = timeout(
        std::time::Duration::from_secs(SUBPROCESS_TIMEOUT_SECS),
        Command::new(scraper)
            .arg("getTweet")
            .arg(&ctx.cfg.tokens.twitter_cookies_file)
            .arg(status_id)
            .output(),
    )
    .await
    .map_err(|_| ExtractError::subprocess(scraper, format!("timed out on status {status_id}")))??;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() || !stderr.trim().is_empty() {
        return Err(ExtractError::subprocess(
            scraper,
            format!(
                "exit {:?} on status {status_id}: {}",
                output.status.code(),
                stderr.trim()
            ),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut post: SocialPost = serde_json::from_str(&stdout)?;

    if post.medias.is_empty() || post.author.is_empty() || post.author_url.is_empty() {
        return Ok(None);
    }

    post.caption = clean_tweet_caption(&post.caption);
    Ok(Some(post))
}
