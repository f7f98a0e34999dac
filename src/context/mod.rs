//! # Request Context
//!
//! One [`Context`] is created per request and owns everything the chain needs:
//! the inbound [`Request`], the path parameters bound by the router, an extras
//! map handlers use to pass values downstream, the resolved handler chain with
//! its cursor, and the [`Response`] being produced.
//!
//! ## Chain engine
//!
//! The cursor starts before the first handler. [`Context::next`] advances it
//! and runs handlers until the chain is exhausted, so a middleware calling
//! `next()` drains everything after it before its own call returns:
//!
//! ```text
//! logger --> auth --> handler
//!    <--------<---------+      (post-next code runs in reverse order)
//! ```
//!
//! [`Context::abort`] moves the cursor to the end. Handlers already on the
//! way out still finish; nothing after the cursor runs.
//!
//! ## Writing responses
//!
//! The first response-producing call (`string`, `json`, `data`, `html`,
//! `fail`) wins. Every later one is ignored, so a recovery or logging
//! middleware never clobbers what an inner handler already sent.

mod request;
mod response;

use std::any::Any;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use http::Method;
use minijinja::Environment;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::handler::SharedHandler;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::ParamVec;

pub use request::{HeaderVec, Request, MAX_INLINE_HEADERS};
pub use response::{status_reason, Response};

type Extras = HashMap<String, Box<dyn Any + Send + Sync>>;

/// Per-request state threaded through every handler of a chain.
pub struct Context {
    request: Request,
    request_id: RequestId,
    params: ParamVec,
    extras: Extras,
    handlers: Vec<SharedHandler>,
    index: isize,
    responded: bool,
    response: Response,
    templates: Option<Arc<Environment<'static>>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("uri", &self.request.uri())
            .field("request_id", &self.request_id)
            .field("params", &self.params)
            .field("chain_len", &self.handlers.len())
            .field("index", &self.index)
            .field("responded", &self.responded)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// A fresh context with an empty chain.
    ///
    /// The request id is taken from a valid `X-Request-Id` header, or
    /// generated.
    #[must_use]
    pub fn new(request: Request) -> Self {
        let request_id = RequestId::from_header(request.header(REQUEST_ID_HEADER));
        Self {
            request,
            request_id,
            params: ParamVec::new(),
            extras: HashMap::new(),
            handlers: Vec::new(),
            index: -1,
            responded: false,
            response: Response::default(),
            templates: None,
        }
    }

    // ---- chain engine ---------------------------------------------------

    /// Run the rest of the chain.
    pub fn next(&mut self) {
        self.index += 1;
        while let Some(handler) = self.current() {
            handler.handle(self);
            self.index += 1;
        }
    }

    /// Stop the chain after the handler currently running.
    pub fn abort(&mut self) {
        self.index = self.chain_len();
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.index >= self.chain_len()
    }

    fn current(&self) -> Option<SharedHandler> {
        usize::try_from(self.index)
            .ok()
            .and_then(|i| self.handlers.get(i))
            .map(Arc::clone)
    }

    fn chain_len(&self) -> isize {
        isize::try_from(self.handlers.len()).unwrap_or(isize::MAX)
    }

    pub(crate) fn push_handler(&mut self, handler: SharedHandler) {
        self.handlers.push(handler);
    }

    pub(crate) fn extend_handlers<I>(&mut self, handlers: I)
    where
        I: IntoIterator<Item = SharedHandler>,
    {
        self.handlers.extend(handlers);
    }

    pub(crate) fn set_params(&mut self, params: ParamVec) {
        self.params = params;
    }

    pub(crate) fn set_templates(&mut self, templates: Arc<Environment<'static>>) {
        self.templates = Some(templates);
    }

    // ---- request --------------------------------------------------------

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.path()
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        self.request.uri()
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Path parameter bound by the matched route.
    ///
    /// If a pattern binds the same name twice, the last binding wins.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    /// First query-string value for `key`, percent-decoded.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<String> {
        request::form_lookup(self.request.query_string().as_bytes(), key).map(|v| v.into_owned())
    }

    /// Form value for `key`.
    ///
    /// A urlencoded request body is searched first, then the query string.
    #[must_use]
    pub fn form_value(&self, key: &str) -> Option<String> {
        let is_form = self.header("content-type").is_some_and(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        });
        if is_form {
            if let Some(v) = request::form_lookup(self.request.body(), key) {
                return Some(v.into_owned());
            }
        }
        self.query(key)
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.request.body()
    }

    /// Decode the request body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoding error when the body is not valid JSON for `T`.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.request.body())
    }

    /// Best guess at the client address.
    ///
    /// Uses the first `X-Forwarded-For` entry, then `X-Real-IP`, then the
    /// peer address of the connection.
    #[must_use]
    pub fn client_ip(&self) -> Option<IpAddr> {
        let forwarded = self
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());
        forwarded
            .or_else(|| self.header("x-real-ip").and_then(|v| v.trim().parse().ok()))
            .or_else(|| self.request.remote_addr().map(|a| a.ip()))
    }

    // ---- extras ---------------------------------------------------------

    /// Store a request-scoped value for downstream handlers.
    pub fn set_extra<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.extras.insert(key.into(), Box::new(value));
    }

    /// Value stored under `key`, if present and of type `T`.
    #[must_use]
    pub fn extra<T: Any>(&self, key: &str) -> Option<&T> {
        self.extras.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    #[must_use]
    pub fn has_extra(&self, key: &str) -> bool {
        self.extras.contains_key(key)
    }

    // ---- response -------------------------------------------------------

    /// Whether a response has been written.
    #[must_use]
    pub fn is_responded(&self) -> bool {
        self.responded
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.response.status
    }

    /// Set the status without writing a body.
    pub fn status(&mut self, code: u16) {
        if self.responded {
            debug!(status = code, "Status ignored, response already written");
            return;
        }
        self.response.status = code;
    }

    /// Set a response header. Ignored once the response is written.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if self.responded {
            debug!(header = %name, "Header ignored, response already written");
            return;
        }
        self.response.set_header(name, value);
    }

    /// Write a `text/plain` response.
    pub fn string(&mut self, code: u16, text: impl Into<String>) {
        self.write(code, "text/plain", text.into().into_bytes());
    }

    /// Write an `application/json` response.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: u16, value: &T) {
        if self.responded {
            return;
        }
        match serde_json::to_vec(value) {
            Ok(body) => self.write(code, "application/json", body),
            Err(e) => {
                error!(
                    request_id = %self.request_id,
                    error = %e,
                    "Failed to serialize JSON response"
                );
                self.internal_error();
            }
        }
    }

    /// Write raw bytes with a caller-supplied content type.
    pub fn data(&mut self, code: u16, content_type: &str, data: impl Into<Vec<u8>>) {
        self.write(code, content_type, data.into());
    }

    /// Render template `name` and write it as `text/html`.
    pub fn html<S: Serialize>(&mut self, code: u16, name: &str, ctx: S) {
        if self.responded {
            return;
        }
        let rendered = match &self.templates {
            Some(env) => env
                .get_template(name)
                .and_then(|tmpl| tmpl.render(ctx))
                .map_err(|e| e.to_string()),
            None => Err("no templates loaded".to_string()),
        };
        match rendered {
            Ok(body) => self.write(code, "text/html", body.into_bytes()),
            Err(e) => {
                error!(
                    request_id = %self.request_id,
                    template = %name,
                    error = %e,
                    "Failed to render template"
                );
                self.internal_error();
            }
        }
    }

    /// Abort the chain and write `message` as a plain-text response.
    pub fn fail(&mut self, code: u16, message: impl Into<String>) {
        self.abort();
        self.string(code, message);
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }

    fn write(&mut self, code: u16, content_type: &str, body: Vec<u8>) {
        if self.responded {
            debug!(
                request_id = %self.request_id,
                status = code,
                "Response already written, ignoring"
            );
            return;
        }
        self.response.set_header("Content-Type", content_type);
        self.response.status = code;
        self.response.body = body;
        self.responded = true;
    }

    fn internal_error(&mut self) {
        self.write(500, "text/plain", b"Internal Server Error".to_vec());
    }
}
