//! Fetching and decoding mosaic source images.

use futures::future::try_join_all;
use image::DynamicImage;
use tracing::debug;
use url::Url;

use crate::error::{MosaicError, UpstreamError};
use crate::proxy::Upstream;

/// Decode an image from memory, guessing the format from its magic bytes.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, MosaicError> {
    image::load_from_memory(data).map_err(|e| MosaicError::DecodeError {
        message: e.to_string(),
    })
}

/// Fetch and decode every URL concurrently, preserving input order.
///
/// The first failure aborts the whole load.
pub async fn load_images<U: Upstream + ?Sized>(
    upstream: &U,
    urls: &[String],
) -> Result<Vec<DynamicImage>, MosaicError> {
    let fetches = urls.iter().map(|raw| async move {
        let url = Url::parse(raw).map_err(|e| MosaicError::Fetch {
            url: raw.clone(),
            source: UpstreamError::Connection(e.to_string()),
        })?;

        let data = upstream
            .fetch(&url)
            .await
            .map_err(|source| MosaicError::Fetch {
                url: raw.clone(),
                source,
            })?;

        debug!(url = %raw, bytes = data.len(), "Fetched mosaic source image");
        decode_image(&data)
    });

    try_join_all(fetches).await
}
