use thiserror::Error;

/// Centralized error taxonomy for post extraction.
///
/// "URL does not belong to this platform" is deliberately *not* an error —
/// extractors signal it with `Ok(None)`. Everything here is a hard failure
/// that should surface to the dispatcher with enough context to diagnose
/// without reproducing the request.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Upstream answered with a non-success HTTP status.
    #[error("upstream returned {status} for {url}")]
    UpstreamStatus { status: reqwest::StatusCode, url: String },

    /// Upstream answered 200 but the expected field/structure is missing
    /// (API changed, post deleted or private).
    #[error("unexpected upstream shape: {0}")]
    UpstreamShape(String),

    /// An external extraction tool exited non-zero or wrote to stderr.
    /// Encoder (remux/convert) failures never reach this type — they
    /// degrade to a fallback result inside the remux module.
    #[error("{tool} failed: {detail}")]
    Subprocess { tool: String, detail: String },

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local IO failure (temp files, subprocess spawn).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream body that should have been JSON was not.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    /// Shorthand for a missing-field failure with context.
    pub fn shape(context: impl Into<String>) -> Self {
        Self::UpstreamShape(context.into())
    }

    pub fn subprocess(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Subprocess {
            tool: tool.into(),
            detail: detail.into(),
        }
    }
}

/// Extractor outcome: `Ok(None)` means "not applicable" (URL shape does not
/// match the platform), `Err` is a hard failure.
pub type ExtractResult = Result<Option<crate::post::SocialPost>, ExtractError>;
