//! # Thimble
//!
//! **Thimble** is a small, coroutine-powered HTTP framework: a prefix-trie
//! router, nested middleware groups, and a per-request [`Context`] that walks
//! an onion-style handler chain.
//!
//! ## Overview
//!
//! Routes are registered against patterns such as `/users/:id` or
//! `/static/*filepath`. Groups attach middlewares to a path prefix; every
//! request runs the middlewares of each group whose prefix it starts with,
//! outermost first, before the matched route handler.
//!
//! ## Architecture
//!
//! - **[`router`]** - Pattern parsing, per-method route tries and the group
//!   prefix trie
//! - **[`context`]** - Request data, the handler chain and the write-once
//!   response
//! - **[`handler`]** - The [`Handler`] and [`Endpoint`] traits
//! - **[`middleware`]** - Recovery, access logging, JWT auth and rate limiting
//! - **[`server`]** - Registration ([`Server`], [`Group`]) and serving on
//!   `may_minihttp`
//! - **[`static_files`]** - Directory serving behind a `*filepath` route
//! - **[`logging`]** / **[`runtime_config`]** - Environment-driven tracing and
//!   coroutine setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as AppService
//!     participant Groups as GroupTrie
//!     participant Router
//!     participant Ctx as Context
//!
//!     Client->>Service: HTTP request
//!     Service->>Ctx: Context::new(request)
//!     Service->>Groups: search(path)
//!     Groups-->>Ctx: middlewares, outermost first
//!     Service->>Router: handle(ctx)
//!     Router->>Ctx: params + route handler (or 404)
//!     Ctx->>Ctx: next() until the chain ends or aborts
//!     Ctx-->>Service: Response
//!     Service-->>Client: HTTP response
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use thimble::{Context, Server};
//!
//! let mut server = Server::with_defaults();
//! server
//!     .get("/hello/:name", |ctx: &mut Context| {
//!         let name = ctx.param("name").unwrap_or("world").to_string();
//!         ctx.string(200, format!("hello {name}"));
//!     })
//!     .expect("route registers");
//!
//! let handle = server.run("127.0.0.1:8080").expect("server starts");
//! handle.join().ok();
//! ```
//!
//! ## Runtime Considerations
//!
//! Thimble runs on the `may` coroutine runtime, not tokio:
//!
//! - Each connection is served on a coroutine with a fixed stack
//! - Stack size and worker count come from `THIMBLE_STACK_SIZE` and
//!   `THIMBLE_WORKERS`
//! - Handlers should avoid deep recursion and large stack buffers

pub mod context;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod static_files;

pub use context::{Context, Request, Response};
pub use error::{PatternError, RegistrationError, RouteConflictError, TemplateError};
pub use handler::{Endpoint, Handler, SharedHandler};
pub use ids::RequestId;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use runtime_config::RuntimeConfig;
pub use server::{App, Group, Server, ServerHandle};
pub use static_files::StaticFiles;
