use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::context::Context;
use crate::handler::Handler;

/// Turns a panic anywhere later in the chain into a 500 response.
///
/// The response is only written if the panicking handler had not written
/// one already. Either way the chain stops.
#[derive(Debug, Default, Clone, Copy)]
pub struct Recovery;

impl Handler for Recovery {
    fn handle(&self, ctx: &mut Context) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| ctx.next()));
        if let Err(payload) = outcome {
            error!(
                request_id = %ctx.request_id(),
                method = %ctx.method(),
                uri = %ctx.uri(),
                panic = %panic_message(payload.as_ref()),
                "Handler panicked, responding 500"
            );
            ctx.fail(500, "Internal Server Error");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Request;
    use http::Method;
    use std::sync::Arc;

    #[test]
    fn test_panic_becomes_500() {
        let mut ctx = Context::new(Request::new(Method::GET, "/boom"));
        ctx.push_handler(Arc::new(Recovery));
        ctx.push_handler(Arc::new(|_: &mut Context| {
            panic!("boom");
        }));
        ctx.next();
        assert_eq!(ctx.status_code(), 500);
        assert_eq!(ctx.response().text(), "Internal Server Error");
        assert!(ctx.is_aborted());
    }

    #[test]
    fn test_response_written_before_panic_is_kept() {
        let mut ctx = Context::new(Request::new(Method::GET, "/"));
        ctx.push_handler(Arc::new(Recovery));
        ctx.push_handler(Arc::new(|c: &mut Context| {
            c.string(202, "accepted");
            panic!("after write");
        }));
        ctx.next();
        assert_eq!(ctx.status_code(), 202);
        assert_eq!(ctx.response().text(), "accepted");
    }

    #[test]
    fn test_no_panic_passes_through() {
        let mut ctx = Context::new(Request::new(Method::GET, "/"));
        ctx.push_handler(Arc::new(Recovery));
        ctx.push_handler(Arc::new(|c: &mut Context| c.string(200, "fine")));
        ctx.next();
        assert_eq!(ctx.response().text(), "fine");
    }

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
