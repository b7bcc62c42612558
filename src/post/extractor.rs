//! Client side of the external post extractor.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::record::PostRecord;
use crate::error::ExtractError;

/// Something that can turn a post URL into a [`PostRecord`].
#[async_trait]
pub trait PostExtractor: Send + Sync {
    async fn extract(&self, post_url: &Url) -> Result<PostRecord, ExtractError>;
}

/// Calls an extractor service at `GET {endpoint}?url=<post url>`.
#[derive(Clone)]
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpExtractor {
    /// Create an extractor client for `endpoint`.
    pub fn new(endpoint: Url) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ExtractError::Request(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The full request URL for `post_url`.
    pub fn request_url(&self, post_url: &Url) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("url", post_url.as_str());
        url
    }
}

#[async_trait]
impl PostExtractor for HttpExtractor {
    async fn extract(&self, post_url: &Url) -> Result<PostRecord, ExtractError> {
        let response = self
            .client
            .get(self.request_url(post_url))
            .send()
            .await
            .map_err(|e| ExtractError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Request(format!(
                "extractor returned HTTP {} for {}",
                status.as_u16(),
                post_url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ExtractError::Request(e.to_string()))?;

        PostRecord::from_json(&body)
    }
}
