use std::borrow::Cow;
use std::net::SocketAddr;

use http::Method;
use smallvec::SmallVec;

/// Most requests carry ≤16 headers; more spill to the heap.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Request headers with lowercase names, in arrival order.
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

/// The inbound half of a request, as handed over by the listener.
///
/// Built either by the HTTP adapter or directly in tests:
///
/// ```rust,ignore
/// let req = Request::new(Method::POST, "/login?next=/home")
///     .with_header("Content-Type", "application/x-www-form-urlencoded")
///     .with_body("user=ana&pass=secret");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: String,
    headers: HeaderVec,
    body: Vec<u8>,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    /// A request with no headers and an empty body.
    ///
    /// `uri` is the request target: a path optionally followed by `?query`.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderVec::new(),
            body: Vec::new(),
            remote_addr: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path and query string as received.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The request path without its query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or("/")
    }

    /// Raw query string, empty when there is none.
    #[must_use]
    pub fn query_string(&self) -> &str {
        self.uri.split_once('?').map_or("", |(_, q)| q)
    }

    /// First value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

/// First value for `key` in an `application/x-www-form-urlencoded` string.
pub(crate) fn form_lookup<'a>(encoded: &'a [u8], key: &str) -> Option<Cow<'a, str>> {
    url::form_urlencoded::parse(encoded)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}
