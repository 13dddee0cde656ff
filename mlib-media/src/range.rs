//! HTTP `Range` header parsing
//!
//! Only single `bytes` ranges are served. Accepted forms:
//! `bytes=<start>-<end>`, `bytes=<start>-` and `bytes=-<suffix_len>`.

use thiserror::Error;

/// Range as written by the client, before the file size is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// `start-end` or open-ended `start-`
    Bounded { start: u64, end: Option<u64> },
    /// Last `length` bytes
    Suffix { length: u64 },
}

/// Inclusive byte range inside a file of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("malformed range header: {0}")]
    Malformed(String),

    #[error("range start {start} is beyond file size {file_size}")]
    Unsatisfiable { start: u64, file_size: u64 },
}

impl RangeRequest {
    /// Parse a `Range` header value
    pub fn parse(header: &str) -> Result<Self, RangeError> {
        let (unit, spec) = header
            .trim()
            .split_once('=')
            .ok_or_else(|| RangeError::Malformed(header.to_string()))?;

        if !unit.trim().eq_ignore_ascii_case("bytes") {
            return Err(RangeError::Malformed(format!("unsupported unit '{}'", unit)));
        }
        if spec.contains(',') {
            return Err(RangeError::Malformed("multiple ranges".to_string()));
        }

        let (start, end) = spec
            .trim()
            .split_once('-')
            .ok_or_else(|| RangeError::Malformed(header.to_string()))?;

        if start.is_empty() {
            let length = parse_position(end)?;
            if length == 0 {
                return Err(RangeError::Malformed("empty suffix range".to_string()));
            }
            return Ok(RangeRequest::Suffix { length });
        }

        let start = parse_position(start)?;
        let end = if end.is_empty() {
            None
        } else {
            Some(parse_position(end)?)
        };

        if let Some(end) = end {
            if end < start {
                return Err(RangeError::Malformed(format!(
                    "range end {} before start {}",
                    end, start
                )));
            }
        }

        Ok(RangeRequest::Bounded { start, end })
    }

    /// Resolve against the file size
    ///
    /// `end` defaults to (and is clamped at) the last byte; `start` must
    /// lie inside the file.
    pub fn resolve(self, file_size: u64) -> Result<ByteRange, RangeError> {
        if file_size == 0 {
            let start = match self {
                RangeRequest::Bounded { start, .. } => start,
                RangeRequest::Suffix { .. } => 0,
            };
            return Err(RangeError::Unsatisfiable { start, file_size });
        }

        let last = file_size - 1;
        match self {
            RangeRequest::Bounded { start, .. } if start >= file_size => {
                Err(RangeError::Unsatisfiable { start, file_size })
            }
            RangeRequest::Bounded { start, end } => Ok(ByteRange {
                start,
                end: end.map_or(last, |end| end.min(last)),
            }),
            RangeRequest::Suffix { length } => Ok(ByteRange {
                start: file_size.saturating_sub(length),
                end: last,
            }),
        }
    }
}

impl ByteRange {
    /// Number of bytes in the range
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Never empty: `start <= end` always holds
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

fn parse_position(s: &str) -> Result<u64, RangeError> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::Malformed(format!("invalid position '{}'", s)));
    }
    s.parse()
        .map_err(|_| RangeError::Malformed(format!("position out of range '{}'", s)))
}
