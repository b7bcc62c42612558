//! Tokenized media proxy.
//!
//! # Architecture
//!
//! ```text
//! GET /media_download?...&___host=..&___pathname=..&___t=..&0.mp4
//!                 │
//!                 ▼
//! ┌─────────────────────────────────────────┐
//! │               MediaProxy                │
//! │  token::decode → Whitelist → Range      │
//! └────────────────────┬────────────────────┘
//!                      │ HEAD + GET (Range)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │        Upstream (reqwest client)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The whitelist check runs before any outbound request so the service
//! cannot be used as an open proxy.

mod range;
mod service;
pub mod token;
mod upstream;

pub use range::{parse_range, ByteRange, RangeSpec};
pub use service::{MediaProxy, ProxiedMedia};
pub use token::{
    decode, encode, generate_nonce, media_download_url, DecodedToken, Whitelist,
    DEFAULT_WHITELIST, MEDIA_DOWNLOAD_PATH,
};
pub use upstream::{
    ByteStream, HttpUpstream, Upstream, UpstreamHead, DEFAULT_CONTENT_TYPE, DEFAULT_USER_AGENT,
};
