//! Post records and the extractor boundary.
//!
//! Scraping lives outside this crate. An extractor service returns a JSON
//! record per post, which is validated into a [`PostRecord`] before anything
//! else sees it.

mod extractor;
mod record;

pub use extractor::{HttpExtractor, PostExtractor};
pub use record::{MediaItem, MediaKind, PostRecord};
