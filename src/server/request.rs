use std::io::Read;

use http::Method;
use may_minihttp::Request as RawRequest;
use tracing::{debug, warn};

use crate::context::Request;

/// Largest request body read into memory.
pub const MAX_BODY_BYTES: u64 = 8 * 1024 * 1024;

/// Why a raw request could not be turned into a [`Request`].
#[derive(Debug)]
pub enum ReadError {
    /// The method token is not a valid HTTP method
    InvalidMethod(String),
    /// The body exceeds [`MAX_BODY_BYTES`]
    BodyTooLarge,
    /// Reading the body from the socket failed
    Io(std::io::Error),
}

/// Copy method, target, headers and body out of a may_minihttp request.
pub fn read_request(req: RawRequest) -> Result<Request, ReadError> {
    let method = Method::from_bytes(req.method().as_bytes())
        .map_err(|_| ReadError::InvalidMethod(req.method().to_string()))?;

    let mut request = Request::new(method, req.path());
    for h in req.headers() {
        request = request.with_header(h.name, String::from_utf8_lossy(h.value));
    }
    debug!(
        method = %request.method(),
        uri = %request.uri(),
        header_count = request.headers().len(),
        "HTTP request parsed"
    );

    let mut body = Vec::new();
    req.body()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut body)
        .map_err(ReadError::Io)?;
    if u64::try_from(body.len()).unwrap_or(u64::MAX) > MAX_BODY_BYTES {
        warn!(uri = %request.uri(), limit = MAX_BODY_BYTES, "Request body too large");
        return Err(ReadError::BodyTooLarge);
    }

    Ok(request.with_body(body))
}
