//! Shared HTTP fetch capability with header/cookie/proxy injection.
//!
//! One long-lived `reqwest::Client` built from the loaded config; every
//! extractor call can add its own headers (referer, cookie) on top of the
//! browser-like defaults. Bodies are streamed to disk for remux inputs —
//! never buffered whole in memory.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::ExtractError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Default headers sent with every upstream request.
pub fn default_headers() -> HeaderMap {
    header_map(&[
        (
            "accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("accept-language", "en-US,en;q=0.9"),
    ])
}

/// Build a `HeaderMap` from string pairs, skipping anything that is not a
/// valid header (bad cookie bytes should not break the whole request).
pub fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
    headers
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(cfg: &Config) -> Result<Self, ExtractError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(15));

        if let Some(proxy) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.socks_url())?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Raw GET with extra headers layered over the defaults. Status is not
    /// checked — callers that treat specific statuses specially (e.g.
    /// Tumblr 404 → not applicable) inspect the response themselves.
    pub async fn get(&self, url: &str, extra: HeaderMap) -> Result<reqwest::Response, ExtractError> {
        let mut headers = default_headers();
        headers.extend(extra);
        Ok(self.client.get(url).headers(headers).send().await?)
    }

    /// GET expecting a successful status; returns the body as text.
    pub async fn get_text(&self, url: &str, extra: HeaderMap) -> Result<String, ExtractError> {
        let response = self.get(url, extra).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    /// GET expecting a successful status; deserializes the JSON body into
    /// the platform's typed schema. Shape mismatches surface as `Json`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, extra: HeaderMap) -> Result<T, ExtractError> {
        let text = self.get_text(url, extra).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// GET expecting a successful status; returns the raw body bytes.
    pub async fn get_bytes(&self, url: &str, extra: HeaderMap) -> Result<Vec<u8>, ExtractError> {
        let response = self.get(url, extra).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Stream a response body into `dest`. The partial file is removed on
    /// any failure so no path leaks a temp file.
    pub async fn download_to_file(&self, url: &str, dest: &Path) -> Result<(), ExtractError> {
        let response = self.get(url, HeaderMap::new()).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status,
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();

        let write_result: Result<(), ExtractError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if write_result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        write_result
    }
}
