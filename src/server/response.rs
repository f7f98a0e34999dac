use dashmap::DashMap;
use may_minihttp::Response as RawResponse;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::context::{status_reason, Response};

/// Upper bound on distinct header lines kept for the process lifetime.
const MAX_INTERNED_HEADERS: usize = 4096;

/// Headers whose values come from a small fixed set and repeat across
/// responses. Only these are interned.
const REPEATING_HEADERS: &[&str] = &[
    "allow",
    "cache-control",
    "content-encoding",
    "content-language",
    "content-type",
    "retry-after",
    "vary",
    "www-authenticate",
    "x-content-type-options",
];

/// may_minihttp only accepts `&'static str` header lines.
///
/// Lines for repeating headers are leaked once and reused. Anything else
/// (and anything arriving once the cache is full) is leaked for the one
/// response that carries it, so a header is never lost.
struct HeaderLines {
    lines: DashMap<String, &'static str>,
    capacity: usize,
}

impl HeaderLines {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: DashMap::new(),
            capacity,
        }
    }

    fn line(&self, name: &str, value: &str) -> Option<&'static str> {
        if name.contains(['\r', '\n', ':']) || value.contains(['\r', '\n']) {
            warn!(header = %name, "Dropping header with illegal characters");
            return None;
        }
        let line = format!("{name}: {value}");
        if let Some(interned) = self.lines.get(&line) {
            return Some(*interned);
        }
        let repeating = REPEATING_HEADERS
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name));
        if !repeating || self.lines.len() >= self.capacity {
            return Some(Box::leak(line.into_boxed_str()));
        }
        let leaked: &'static str = Box::leak(line.clone().into_boxed_str());
        Some(*self.lines.entry(line).or_insert(leaked))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lines.len()
    }
}

static HEADER_LINES: Lazy<HeaderLines> =
    Lazy::new(|| HeaderLines::with_capacity(MAX_INTERNED_HEADERS));

fn header_line(name: &str, value: &str) -> Option<&'static str> {
    HEADER_LINES.line(name, value)
}

/// Copy a context response onto the wire.
pub fn write_response(res: &mut RawResponse, response: Response) {
    res.status_code(usize::from(response.status), status_reason(response.status));
    for (name, value) in &response.headers {
        if let Some(line) = header_line(name, value) {
            res.header(line);
        }
    }
    res.body_vec(response.body);
}

/// Plain-text error written when no context could be built.
pub fn write_plain_error(res: &mut RawResponse, status: u16, message: &str) {
    res.status_code(usize::from(status), status_reason(status));
    res.header("Content-Type: text/plain");
    res.body_vec(message.as_bytes().to_vec());
}
