//! social-picker — resolves one social-media post URL per request into a
//! normalized record of its author, caption and deliverable media.
//!
//! # Module structure
//!
//! - `classify`: hostname → platform, permissive URL parsing
//! - `extractors`: one module per platform, all sharing the same contract
//! - `post`: the normalized `SocialPost`/`Media` model + variant selector
//! - `remux`: video+audio merge, codec convert, ugoira assembly, deferred
//!   temp-file lifecycle
//! - `dispatch`: the `Picker` service tying it all together
//! - `server`: thin axum surface (`?url=`, `?video-done=`)

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod post;
pub mod remux;
pub mod server;
pub mod util;
pub mod ytdlp;

pub use classify::{classify, Platform};
pub use config::Config;
pub use dispatch::Picker;
pub use error::{ExtractError, ExtractResult};
pub use post::{pick_best, Media, MediaKind, SocialPost};
pub use remux::{convert, merge, MergeOptions, RemuxResult};
