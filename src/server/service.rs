use std::io;

use may_minihttp::{HttpService, Request as RawRequest, Response as RawResponse};
use tracing::warn;

use super::app::App;
use super::request::{read_request, ReadError};
use super::response::{write_plain_error, write_response};
use crate::context::Context;

/// may_minihttp service running every request through an [`App`].
///
/// may_minihttp clones the service once per connection; cloning only bumps
/// the reference counts inside the app.
#[derive(Clone)]
pub struct AppService {
    app: App,
}

impl AppService {
    #[must_use]
    pub fn new(app: App) -> Self {
        Self { app }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: RawRequest, res: &mut RawResponse) -> io::Result<()> {
        let request = match read_request(req) {
            Ok(request) => request,
            Err(ReadError::InvalidMethod(method)) => {
                warn!(method = %method, "Rejected request with invalid method");
                write_plain_error(res, 400, "Bad Request");
                return Ok(());
            }
            Err(ReadError::BodyTooLarge) => {
                write_plain_error(res, 413, "Payload Too Large");
                return Ok(());
            }
            Err(ReadError::Io(e)) => return Err(e),
        };

        let mut ctx = Context::new(request);
        self.app.dispatch(&mut ctx);
        write_response(res, ctx.into_response());
        Ok(())
    }
}
