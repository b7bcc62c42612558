//! Media proxy service.
//!
//! Turns a local `/media_download` URL into a streamed upstream response:
//!
//! 1. decode the token (400 on failure)
//! 2. check the host against the whitelist (400, no outbound call)
//! 3. `HEAD` upstream for size and content type
//! 4. `GET` upstream, with the client's `Range` if present, and hand back the
//!    body stream untouched

use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use super::range::{parse_range, ByteRange};
use super::token::{decode, Whitelist};
use super::upstream::{ByteStream, Upstream, DEFAULT_CONTENT_TYPE};
use crate::error::{ProxyError, UpstreamError};

/// A proxied response ready to be sent to the client.
pub struct ProxiedMedia {
    /// Resolved range when the client asked for one (status 206), else `None` (200)
    pub range: Option<ByteRange>,

    /// Total size of the upstream resource
    pub total_length: u64,

    /// Upstream content type
    pub content_type: String,

    /// Upstream body, streamed as it arrives
    pub body: ByteStream,
}

impl ProxiedMedia {
    /// Number of bytes this response will carry.
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.total_length, |r| r.len())
    }
}

impl std::fmt::Debug for ProxiedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxiedMedia")
            .field("range", &self.range)
            .field("total_length", &self.total_length)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Streams whitelisted upstream resources.
pub struct MediaProxy<U: Upstream> {
    upstream: Arc<U>,
    whitelist: Whitelist,
}

impl<U: Upstream> MediaProxy<U> {
    /// Create a proxy over `upstream` restricted to `whitelist`.
    pub fn new(upstream: Arc<U>, whitelist: Whitelist) -> Self {
        Self {
            upstream,
            whitelist,
        }
    }

    /// The upstream client.
    pub fn upstream(&self) -> &Arc<U> {
        &self.upstream
    }

    /// The host whitelist.
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Decode `local` and check the result against the whitelist.
    ///
    /// Never touches the network.
    pub fn resolve(&self, local: &Url) -> Result<Url, ProxyError> {
        let token = decode(local)?;

        if !self.whitelist.is_whitelisted(&token.host) {
            return Err(ProxyError::HostNotWhitelisted { host: token.host });
        }

        Ok(token.upstream_url()?)
    }

    /// Resolve `local` and open the upstream stream.
    ///
    /// `range_header` is the raw value of the client's `Range` header.
    pub async fn open(
        &self,
        local: &Url,
        range_header: Option<&str>,
    ) -> Result<ProxiedMedia, ProxyError> {
        let upstream_url = self.resolve(local)?;

        // Reject malformed ranges before any outbound request.
        let range_spec = range_header.map(parse_range).transpose()?;

        let head = self.upstream.head(&upstream_url).await?;
        let total_length = head
            .content_length
            .ok_or_else(|| UpstreamError::MissingContentLength(upstream_url.to_string()))?;
        let content_type = head
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let range = range_spec
            .map(|spec| spec.resolve(total_length))
            .transpose()?;

        debug!(
            url = %upstream_url,
            total_length,
            range = ?range,
            "Opening upstream media stream"
        );

        let body = self.upstream.get(&upstream_url, range).await.map_err(|e| {
            warn!(url = %upstream_url, error = %e, "Upstream GET failed");
            e
        })?;

        Ok(ProxiedMedia {
            range,
            total_length,
            content_type,
            body,
        })
    }
}
