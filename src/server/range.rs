// server/range.rs
//! Single-range `Range: bytes=` parsing for stored files

/// An inclusive byte range within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end:   u64,
}

impl ByteRange {
    pub const fn len(&self) -> u64 { self.end - self.start + 1 }

    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RangeRequest {
    /// No usable Range header; serve the whole file
    Full,
    Partial(ByteRange),
    /// Answer with 416
    NotSatisfiable,
}

/// # Parses a Range header against a file size
///
/// Supports `bytes=start-end`, `bytes=start-`, and `bytes=-suffix`. Multiple ranges, other units,
/// and malformed values fall back to the full file.
pub fn parse_range(header: Option<&str>, size: u64) -> RangeRequest {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeRequest::Full;
    };

    if spec.contains(',') {
        return RangeRequest::Full;
    }

    let Some((start, end)) = spec.split_once('-') else {
        return RangeRequest::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return match end.parse::<u64>() {
            | Ok(0) => RangeRequest::NotSatisfiable,
            | Ok(_) if size == 0 => RangeRequest::NotSatisfiable,
            | Ok(suffix) => RangeRequest::Partial(ByteRange {
                start: size.saturating_sub(suffix),
                end:   size - 1,
            }),
            | Err(_) => RangeRequest::Full,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return RangeRequest::Full;
    };

    if start >= size {
        return RangeRequest::NotSatisfiable;
    }

    let end = if end.is_empty() {
        size - 1
    } else {
        match end.parse::<u64>() {
            | Ok(e) => e.min(size - 1),
            | Err(_) => return RangeRequest::Full,
        }
    };

    if start > end {
        return RangeRequest::NotSatisfiable;
    }

    RangeRequest::Partial(ByteRange { start, end })
}
