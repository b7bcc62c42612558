use thiserror::Error;

/// Errors raised by the persistent media URL cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing file exists but could not be read or parsed (fatal at startup)
    #[error("Failed to load cache from {path}: {message}")]
    Load { path: String, message: String },

    /// Writing the backing file failed; the in-memory map stays authoritative
    #[error("Failed to persist cache to {path}: {message}")]
    Persist { path: String, message: String },
}

/// Errors decoding a local media token back into an upstream URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The local URL itself could not be parsed
    #[error("Invalid local URL: {0}")]
    InvalidUrl(String),

    /// The reserved host parameter is absent or empty
    #[error("Token is missing the host parameter")]
    MissingHost,

    /// The reserved pathname parameter is absent or empty
    #[error("Token is missing the pathname parameter")]
    MissingPathname,

    /// Host, pathname and params do not form a well-formed absolute URL
    #[error("Token does not describe a valid upstream URL: {0}")]
    Malformed(String),
}

/// Errors talking to an upstream media host
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// HEAD response did not carry a usable Content-Length
    #[error("Upstream response for {0} has no Content-Length")]
    MissingContentLength(String),

    /// Error while reading the upstream body
    #[error("Body stream error: {0}")]
    Body(String),

    /// A ranged GET was answered with something other than 206 Partial Content
    #[error("Upstream ignored the Range request for {url} (HTTP {status})")]
    RangeNotHonored { status: u16, url: String },
}

/// Errors produced by the media proxy before response headers are sent
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// Token could not be decoded (HTTP 400)
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Decoded host is not in the whitelist (HTTP 400)
    #[error("Host not whitelisted: {host}")]
    HostNotWhitelisted { host: String },

    /// Range header is syntactically invalid (HTTP 400)
    #[error("Invalid Range header: {0}")]
    InvalidRange(String),

    /// Range header cannot be satisfied for this resource (HTTP 416)
    #[error("Range not satisfiable: {range} (resource size {size})")]
    RangeNotSatisfiable { range: String, size: u64 },

    /// Upstream fetch failed (HTTP 502)
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Errors building or rendering an image mosaic
#[derive(Debug, Clone, Error)]
pub enum MosaicError {
    /// A mosaic needs at least one image
    #[error("Mosaic requires at least one image")]
    NoImages,

    /// Output width must be positive
    #[error("Mosaic width must be greater than 0")]
    ZeroWidth,

    /// An image has a zero dimension and cannot contribute an aspect ratio
    #[error("Image {index} has invalid dimensions {width}x{height}")]
    InvalidImage { index: usize, width: u32, height: u32 },

    /// Layout search bounds are unusable
    #[error("Invalid layout options: {0}")]
    InvalidOptions(String),

    /// Every candidate layout is larger than the canvas limit
    #[error("Mosaic would be {width}x{height} pixels, over the size limit")]
    TooLarge { width: u32, height: u64 },

    /// Source image could not be fetched
    #[error("Failed to fetch image {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: UpstreamError,
    },

    /// Source image bytes could not be decoded
    #[error("Failed to decode image: {message}")]
    DecodeError { message: String },

    /// Output PNG could not be encoded
    #[error("Failed to encode mosaic: {message}")]
    EncodeError { message: String },
}

/// Errors from the external post extractor
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The extractor could not be reached or answered with an error
    #[error("Extractor request failed: {0}")]
    Request(String),

    /// The extractor returned a record that fails validation
    #[error("Invalid post record: {0}")]
    InvalidRecord(String),
}
