use std::time::Instant;

use tracing::info;

use crate::context::Context;
use crate::handler::Handler;

/// Logs one line per request once the rest of the chain has finished.
#[derive(Debug, Default, Clone, Copy)]
pub struct Logger;

impl Handler for Logger {
    fn handle(&self, ctx: &mut Context) {
        let start = Instant::now();
        ctx.next();
        let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        info!(
            request_id = %ctx.request_id(),
            status = ctx.status_code(),
            method = %ctx.method(),
            uri = %ctx.uri(),
            latency_us,
            "Request completed"
        );
    }
}
