//! `Range: bytes=...` parsing and resolution against a known resource size.

use std::fmt;

use crate::error::ProxyError;

/// A byte range as written by the client, before the resource size is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=start-` or `bytes=start-end`
    FromStart { start: u64, end: Option<u64> },

    /// `bytes=-len` (the last `len` bytes)
    Suffix { len: u64 },
}

/// An inclusive, satisfiable byte range within a resource of size `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range (never zero).
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the upstream `Range` request header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}/{}", self.start, self.end, self.total)
    }
}

/// Parse a `Range` header value.
///
/// Only single `bytes` ranges are supported; anything else is rejected as
/// [`ProxyError::InvalidRange`].
pub fn parse_range(header: &str) -> Result<RangeSpec, ProxyError> {
    let invalid = || ProxyError::InvalidRange(header.to_string());

    let spec = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(invalid)?
        .trim();

    if spec.contains(',') {
        return Err(invalid());
    }

    let (start, end) = spec.split_once('-').ok_or_else(invalid)?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let len = end.parse::<u64>().map_err(|_| invalid())?;
        if len == 0 {
            return Err(invalid());
        }
        return Ok(RangeSpec::Suffix { len });
    }

    let start = start.parse::<u64>().map_err(|_| invalid())?;
    let end = if end.is_empty() {
        None
    } else {
        Some(end.parse::<u64>().map_err(|_| invalid())?)
    };

    if matches!(end, Some(end) if end < start) {
        return Err(invalid());
    }

    Ok(RangeSpec::FromStart { start, end })
}

impl RangeSpec {
    /// Resolve against a resource of `total` bytes.
    ///
    /// A missing end defaults to `total - 1`; an end past the resource is
    /// clamped. A start at or past `total` is unsatisfiable.
    pub fn resolve(self, total: u64) -> Result<ByteRange, ProxyError> {
        let unsatisfiable = || ProxyError::RangeNotSatisfiable {
            range: self.to_string(),
            size: total,
        };

        if total == 0 {
            return Err(unsatisfiable());
        }

        let last = total - 1;
        match self {
            RangeSpec::FromStart { start, end } => {
                if start > last {
                    return Err(unsatisfiable());
                }
                let end = end.map_or(last, |e| e.min(last));
                Ok(ByteRange { start, end, total })
            }
            RangeSpec::Suffix { len } => Ok(ByteRange {
                start: total.saturating_sub(len),
                end: last,
                total,
            }),
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSpec::FromStart {
                start,
                end: Some(end),
            } => write!(f, "bytes={}-{}", start, end),
            RangeSpec::FromStart { start, end: None } => write!(f, "bytes={}-", start),
            RangeSpec::Suffix { len } => write!(f, "bytes=-{}", len),
        }
    }
}
