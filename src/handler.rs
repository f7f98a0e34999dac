//! The single unit of work in a request chain.
//!
//! Middlewares and route handlers are the same thing: something invocable
//! with a [`Context`] that returns nothing and acts only through the context.
//! A middleware calls [`Context::next`] to run the rest of the chain and
//! may do work before and after that call; a handler that writes a response
//! and returns simply ends the chain.
//!
//! ```rust,ignore
//! use thimble::{Context, Handler};
//!
//! // A closure...
//! let hello = |ctx: &mut Context| ctx.string(200, "hello");
//!
//! // ...or a type with state.
//! struct Counter(std::sync::atomic::AtomicUsize);
//!
//! impl Handler for Counter {
//!     fn handle(&self, ctx: &mut Context) {
//!         let n = self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         ctx.json(200, &serde_json::json!({ "count": n + 1 }));
//!     }
//! }
//! ```

use std::sync::Arc;

use http::Method;

use crate::context::Context;

/// Anything that can take part in a request chain.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut Context);
}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync,
{
    fn handle(&self, ctx: &mut Context) {
        self(ctx);
    }
}

/// Handlers are shared between the route table and every request chain.
pub type SharedHandler = Arc<dyn Handler>;

/// A handler that knows where it is mounted.
///
/// Register with [`Group::bind`](crate::server::Group::bind).
pub trait Endpoint: Handler {
    fn method(&self) -> Method;
    fn pattern(&self) -> &str;
}
