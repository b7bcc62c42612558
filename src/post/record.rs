//! Normalized post record handed over by the extractor.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ExtractError;

/// Kind of a media attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Thumbnail,
    Video,
}

impl MediaKind {
    /// Photos and video thumbnails both feed the mosaic.
    pub fn is_image(self) -> bool {
        matches!(self, MediaKind::Photo | MediaKind::Thumbnail)
    }
}

/// One media attachment of a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,

    #[serde(rename = "type")]
    pub kind: MediaKind,

    #[serde(default)]
    pub alt: Option<String>,
}

/// A post as returned by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub media: Vec<MediaItem>,

    #[serde(default)]
    pub author_name: Option<String>,

    #[serde(default)]
    pub user_name: Option<String>,

    #[serde(default, rename = "profileImageURL")]
    pub profile_image_url: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    /// Engagement counters, passed through untouched
    #[serde(default)]
    pub status: serde_json::Value,
}

impl PostRecord {
    /// Parse and validate an extractor response body.
    pub fn from_json(data: &[u8]) -> Result<Self, ExtractError> {
        let record: PostRecord =
            serde_json::from_slice(data).map_err(|e| ExtractError::InvalidRecord(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Every media URL must be an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ExtractError> {
        for (index, item) in self.media.iter().enumerate() {
            let url = Url::parse(&item.url).map_err(|e| {
                ExtractError::InvalidRecord(format!("media[{}] url {:?}: {}", index, item.url, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                return Err(ExtractError::InvalidRecord(format!(
                    "media[{}] url {:?} is not an absolute http(s) URL",
                    index, item.url
                )));
            }
        }
        Ok(())
    }

    /// Photos and thumbnails, in post order.
    pub fn images(&self) -> impl Iterator<Item = &MediaItem> {
        self.media.iter().filter(|m| m.kind.is_image())
    }

    /// Photos only.
    pub fn photos(&self) -> impl Iterator<Item = &MediaItem> {
        self.media.iter().filter(|m| m.kind == MediaKind::Photo)
    }

    /// Videos, in post order.
    pub fn videos(&self) -> impl Iterator<Item = &MediaItem> {
        self.media.iter().filter(|m| m.kind == MediaKind::Video)
    }

    /// The description, or the first photo's alt text when it is blank.
    pub fn summary(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.photos().next().and_then(|p| p.alt.as_deref()))
    }
}
