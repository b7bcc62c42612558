//! Outbound HTTP access to upstream media hosts.
//!
//! The proxy and the mosaic loader only see the [`Upstream`] trait, so tests
//! can substitute an in-memory implementation and count outbound calls.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, RANGE};
use http::StatusCode;
use url::Url;

use super::range::ByteRange;
use crate::error::UpstreamError;

/// User agent sent upstream. Media CDNs block obvious bots, so this mirrors
/// the in-app browser of the mobile client.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 18_1 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/22B83 [FBAN/FBIOS;FBAV/450.0.0.38.108;\
    FBBV/564431005;FBDV/iPhone17,1;FBMD/iPhone;FBSN/iOS;FBSV/18.1;FBSS/3;FBID/phone;FBLC/en_GB;\
    FBOP/5;FBRV/567052743]";

/// Fallback content type when upstream does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Streamed upstream body.
pub type ByteStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

/// Metadata learned from an upstream `HEAD` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamHead {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

/// HTTP client capability used to reach upstream media hosts.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Issue a `HEAD` request.
    async fn head(&self, url: &Url) -> Result<UpstreamHead, UpstreamError>;

    /// Issue a `GET` request, optionally restricted to `range`, and return the
    /// body as a stream.
    ///
    /// A ranged request must yield exactly the bytes of `range`; an upstream
    /// that answers with anything but `206 Partial Content` is an error.
    async fn get(&self, url: &Url, range: Option<ByteRange>) -> Result<ByteStream, UpstreamError>;

    /// Fetch a whole resource into memory.
    async fn fetch(&self, url: &Url) -> Result<Bytes, UpstreamError> {
        let chunks: Vec<Bytes> = self.get(url, None).await?.try_collect().await?;
        Ok(chunks.concat().into())
    }
}

// =============================================================================
// reqwest implementation
// =============================================================================

/// [`Upstream`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Build a client with the default user agent and timeouts.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Build a client with a custom user agent.
    pub fn with_user_agent(user_agent: &str) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| UpstreamError::Connection(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn check_status(response: &reqwest::Response, url: &Url) -> Result<(), UpstreamError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(UpstreamError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn head(&self, url: &Url) -> Result<UpstreamHead, UpstreamError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| UpstreamError::Connection(e.to_string()))?;

        check_status(&response, url)?;

        // reqwest's content_length() reports the (empty) HEAD body, so read
        // the header directly.
        let headers = response.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(UpstreamHead {
            content_length,
            content_type,
        })
    }

    async fn get(&self, url: &Url, range: Option<ByteRange>) -> Result<ByteStream, UpstreamError> {
        let mut request = self.client.get(url.clone());
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::Connection(e.to_string()))?;

        check_status(&response, url)?;

        // A 200 here carries the whole resource, not the requested slice.
        if range.is_some() && response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(UpstreamError::RangeNotHonored {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(|e| UpstreamError::Body(e.to_string()))
            .boxed())
    }
}
