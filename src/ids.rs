//! Per-request correlation ids.
//!
//! Every [`Context`](crate::Context) carries one. Log lines emitted while a
//! request is handled tag it as `request_id`, so one request can be traced
//! across middlewares.

use std::fmt;

use ulid::Ulid;

/// Request header a caller (or a proxy in front of us) uses to pass its own id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ULID-backed: ids minted by one process sort by arrival time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RequestId(Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Adopt the caller's id when `header` holds a ULID, else mint one.
    #[must_use]
    pub fn from_header(header: Option<&str>) -> Self {
        header
            .and_then(|value| Ulid::from_string(value.trim()).ok())
            .map_or_else(Self::new, Self)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_id_is_adopted() {
        let id = RequestId::new();
        let text = id.to_string();
        assert_eq!(RequestId::from_header(Some(&text)), id);
        assert_eq!(RequestId::from_header(Some(&format!(" {text} "))), id);
    }

    #[test]
    fn test_unusable_header_mints_fresh_id() {
        let a = RequestId::from_header(Some("not-a-ulid"));
        let b = RequestId::from_header(None);
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 26);
    }
}
