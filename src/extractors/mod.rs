//! Per-platform extractors.
//!
//! Every extractor follows the same contract:
//! `resolve(ctx, url) -> Result<Option<SocialPost>, ExtractError>` —
//! `Ok(None)` when the URL does not match the platform's post shape (soft
//! "not applicable"), `Err` when a required fetch fails or the upstream
//! response is missing expected structure. Extractors are stateless; the
//! injected [`Ctx`] carries the read-only config and the shared fetcher.
//!
//! Aggregator platforms (Osnova) delegate embedded blocks to the Twitter
//! and Instagram extractors; a failed sub-block contributes zero media
//! instead of failing the parent.

pub mod boorus;
pub mod coub;
pub mod instagram;
pub mod joyreactor;
pub mod kemono;
pub mod osnova;
pub mod pixiv;
pub mod pixiv_direct;
pub mod reddit;
pub mod tiktok;
pub mod tumblr;
pub mod twitter;
pub mod twitter_direct;
pub mod youtube;

use std::sync::Arc;

use crate::config::Config;
use crate::fetch::Fetcher;

/// Injected dependencies shared by all extractors: configuration loaded
/// once at startup and the long-lived HTTP client.
#[derive(Clone)]
pub struct Ctx {
    pub cfg: Arc<Config>,
    pub fetcher: Fetcher,
}

impl Ctx {
    pub fn new(cfg: Arc<Config>, fetcher: Fetcher) -> Self {
        Self { cfg, fetcher }
    }
}
