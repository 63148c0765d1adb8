//! Top-level dispatcher: classify, route to the platform extractor,
//! register deferred files for release.

use std::sync::Arc;

use url::Url;

use crate::classify::{classify, Platform};
use crate::config::Config;
use crate::error::{ExtractError, ExtractResult};
use crate::extractors::{self, Ctx};
use crate::fetch::Fetcher;
use crate::post::SocialPost;
use crate::remux::hooks::FileHooks;

/// The resolver service: owns the read-only config, the shared HTTP
/// client, and the deferred-file registry. One instance per process.
pub struct Picker {
    ctx: Ctx,
    hooks: Arc<FileHooks>,
}

impl Picker {
    pub fn new(cfg: Config) -> Result<Self, ExtractError> {
        let cfg = Arc::new(cfg);
        let fetcher = Fetcher::new(&cfg)?;
        Ok(Self {
            ctx: Ctx::new(cfg, fetcher),
            hooks: FileHooks::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.ctx.cfg
    }

    /// Resolve a raw post URL into a normalized post. `Ok(None)` covers
    /// both "unknown platform" and "known platform, wrong path shape".
    pub async fn resolve(&self, raw_url: &str) -> ExtractResult {
        let classified = classify(raw_url);
        let Some(platform) = classified.platform else {
            log::info!("no platform for {raw_url}");
            return Ok(None);
        };

        log::info!("resolving {} post {}", platform, classified.url);
        let post = self.dispatch(platform, &classified.url).await?;

        if let Some(post) = &post {
            self.register_deferred_files(post);
        }
        Ok(post)
    }

    /// Explicit release signal for a previously delivered local file.
    pub fn release(&self, filename: &str) -> bool {
        self.hooks.release(filename)
    }

    /// Exhaustive routing over the closed platform set — adding a variant
    /// without wiring an extractor is a compile error.
    async fn dispatch(&self, platform: Platform, url: &Url) -> ExtractResult {
        let ctx = &self.ctx;
        match platform {
            Platform::Twitter => extractors::twitter::resolve(ctx, url).await,
            Platform::TwitterDirect => extractors::twitter_direct::resolve(ctx, url).await,
            Platform::Instagram => extractors::instagram::resolve(ctx, url).await,
            Platform::Pixiv => extractors::pixiv::resolve(ctx, url).await,
            Platform::PixivDirect => extractors::pixiv_direct::resolve(ctx, url).await,
            Platform::Reddit => extractors::reddit::resolve(ctx, url).await,
            Platform::Tumblr => extractors::tumblr::resolve(ctx, url).await,
            Platform::Youtube => extractors::youtube::resolve(ctx, url).await,
            Platform::Tiktok => extractors::tiktok::resolve(ctx, url).await,
            Platform::Coub => extractors::coub::resolve(ctx, url).await,
            Platform::Osnova => extractors::osnova::resolve(ctx, url).await,
            Platform::Joyreactor => extractors::joyreactor::resolve(ctx, url).await,
            Platform::Kemono => extractors::kemono::resolve(ctx, url).await,
            Platform::Danbooru => extractors::boorus::danbooru(ctx, url).await,
            Platform::Gelbooru => extractors::boorus::gelbooru(ctx, url).await,
            Platform::Konachan => extractors::boorus::konachan(ctx, url).await,
            Platform::Yandere => extractors::boorus::yandere(ctx, url).await,
            Platform::Eshuushuu => extractors::boorus::eshuushuu(ctx, url).await,
            Platform::Sankaku => extractors::boorus::sankaku(ctx, url).await,
            Platform::Zerochan => extractors::boorus::zerochan(ctx, url).await,
            Platform::AnimePictures => extractors::boorus::anime_pictures(ctx, url).await,
        }
    }

    /// Every locally produced media gets tracked: the caller may claim it
    /// with a release signal, the watchdog cleans up if nobody does.
    fn register_deferred_files(&self, post: &SocialPost) {
        for media in &post.medias {
            if let Some(file) = &media.file {
                self.hooks.register(Arc::clone(file), self.ctx.cfg.file_ttl());
            }
        }
    }
}
