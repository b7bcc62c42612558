//! Local media tokens.
//!
//! An upstream URL such as
//!
//! ```text
//! https://scontent.cdninstagram.com/v/t50/clip.mp4?efg=abc&oh=00
//! ```
//!
//! is carried through this service's own `/media_download` endpoint as
//!
//! ```text
//! /media_download?efg=abc&oh=00&___host=scontent.cdninstagram.com&___pathname=%2Fv%2Ft50%2Fclip.mp4&___t=1735689600000042&0.mp4
//! ```
//!
//! The trailing `0.mp4` key only exists so that clients sniffing the URL see a
//! media extension. It is dropped on decode, together with the nonce.

use rand::Rng;
use regex::Regex;
use url::{form_urlencoded, Url};

use crate::error::TokenError;

/// Reserved parameter carrying the upstream host (with port, if any).
pub const HOST_PARAM: &str = "___host";

/// Reserved parameter carrying the upstream path.
pub const PATHNAME_PARAM: &str = "___pathname";

/// Reserved nonce parameter that keeps every generated URL unique.
pub const NONCE_PARAM: &str = "___t";

/// Path of the media proxy endpoint.
pub const MEDIA_DOWNLOAD_PATH: &str = "/media_download";

/// Host patterns allowed by default: Instagram/Threads media CDNs.
pub const DEFAULT_WHITELIST: &[&str] = &[
    r"([a-zA-Z0-9-]+)\.cdninstagram\.com",
    r"instagram\.([a-zA-Z0-9-]+)\.fna\.fbcdn\.net",
];

/// Host, path and remaining parameters recovered from a local token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    /// Upstream host, possibly with `:port`
    pub host: String,

    /// Upstream path, always starting with `/`
    pub pathname: String,

    /// Original upstream query parameters, in order
    pub params: Vec<(String, String)>,
}

impl DecodedToken {
    /// Rebuild the upstream URL as `https://{host}{pathname}?{params}`.
    ///
    /// The `?` is omitted when no parameters remain.
    pub fn upstream_url(&self) -> Result<Url, TokenError> {
        let mut raw = format!("https://{}{}", self.host, self.pathname);
        if !self.params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.params.iter())
                .finish();
            raw.push('?');
            raw.push_str(&query);
        }

        let url = Url::parse(&raw).map_err(|e| TokenError::Malformed(e.to_string()))?;

        // Reject anything that smuggles a different authority through the
        // host or pathname fields (userinfo, extra path segments, ...).
        if authority(&url).as_deref() != Some(self.host.as_str()) {
            return Err(TokenError::Malformed(format!(
                "host {:?} does not round-trip",
                self.host
            )));
        }

        Ok(url)
    }
}

/// `host[:port]` of a URL, the way the token carries it.
fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Encode `upstream` into a local query string.
///
/// The original parameters come first, followed by the reserved host,
/// pathname and nonce parameters. The result does not start with `?`.
pub fn encode(upstream: &Url, nonce: &str) -> String {
    let host = authority(upstream).unwrap_or_default();

    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(upstream.query_pairs())
        .append_pair(HOST_PARAM, &host)
        .append_pair(PATHNAME_PARAM, upstream.path())
        .append_pair(NONCE_PARAM, nonce)
        .finish()
}

/// Decode a local media URL back into its upstream components.
pub fn decode(local: &Url) -> Result<DecodedToken, TokenError> {
    let mut host = None;
    let mut pathname = None;
    let mut params = Vec::new();

    for (key, value) in local.query_pairs() {
        match key.as_ref() {
            HOST_PARAM => host = Some(value.into_owned()),
            PATHNAME_PARAM => pathname = Some(value.into_owned()),
            NONCE_PARAM => {}
            _ if is_filename_marker(&key, &value) => {}
            _ => params.push((key.into_owned(), value.into_owned())),
        }
    }

    let host = host
        .filter(|h| !h.is_empty())
        .ok_or(TokenError::MissingHost)?;
    let pathname = pathname
        .filter(|p| !p.is_empty())
        .ok_or(TokenError::MissingPathname)?;

    if !pathname.starts_with('/') {
        return Err(TokenError::Malformed(format!(
            "pathname {:?} is not absolute",
            pathname
        )));
    }

    let token = DecodedToken {
        host,
        pathname,
        params,
    };

    // Validate that the pieces form a well-formed absolute URL.
    token.upstream_url()?;

    Ok(token)
}

/// Decode a raw local URL string.
pub fn decode_str(local: &str) -> Result<DecodedToken, TokenError> {
    let url = Url::parse(local).map_err(|e| TokenError::InvalidUrl(e.to_string()))?;
    decode(&url)
}

/// The value-less `<digits>.<ext>` key appended to make URLs look like files.
fn is_filename_marker(key: &str, value: &str) -> bool {
    if !value.is_empty() {
        return false;
    }
    match key.split_once('.') {
        Some((index, ext)) => {
            !index.is_empty()
                && index.bytes().all(|b| b.is_ascii_digit())
                && !ext.is_empty()
                && ext.bytes().all(|b| b.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Generate a nonce of the form `{epoch_ms}{000-999}`.
pub fn generate_nonce() -> String {
    let random: u32 = rand::thread_rng().gen_range(0..1000);
    format!("{}{:03}", chrono::Utc::now().timestamp_millis(), random)
}

/// Build the fully qualified local URL for an upstream media URL.
///
/// `extension` becomes the trailing filename marker (`&0.{extension}`).
pub fn media_download_url(base_url: &str, upstream: &Url, nonce: &str, extension: &str) -> String {
    format!(
        "{}{}?{}&0.{}",
        base_url.trim_end_matches('/'),
        MEDIA_DOWNLOAD_PATH,
        encode(upstream, nonce),
        extension
    )
}

// =============================================================================
// Whitelist
// =============================================================================

/// Anchored, case-sensitive host allow-list.
///
/// All patterns are combined into a single `^(?:p1|p2|...)$` expression so a
/// host is accepted only if it matches one pattern in full.
#[derive(Debug, Clone)]
pub struct Whitelist {
    regex: Option<Regex>,
}

impl Whitelist {
    /// Compile the given patterns.
    ///
    /// An empty pattern list produces a whitelist that rejects everything.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = patterns
            .into_iter()
            .map(|p| format!("(?:{})", p.as_ref()))
            .collect();

        let regex = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("^(?:{})$", alternatives.join("|")))?)
        };

        Ok(Self { regex })
    }

    /// Whether `host` fully matches one of the configured patterns.
    pub fn is_whitelisted(&self, host: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(host))
    }
}

impl Default for Whitelist {
    fn default() -> Self {
        Self::new(DEFAULT_WHITELIST).expect("default whitelist patterns are valid")
    }
}
