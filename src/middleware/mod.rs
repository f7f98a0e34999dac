//! Built-in middlewares.
//!
//! Each one is an ordinary [`Handler`](crate::Handler) and is installed with
//! `use_middleware` on the server or a group:
//!
//! ```rust,ignore
//! let mut server = Server::new();
//! server.use_middleware(Recovery).use_middleware(Logger);
//! server
//!     .group("/api")?
//!     .use_middleware(RateLimit::new(20).burst(40))
//!     .use_middleware(JwtAuth::<Claims>::new(b"secret", "Authorization"));
//! ```
//!
//! Put [`Recovery`] first so it can catch panics from everything after it.

mod jwt;
mod logger;
mod rate_limit;
mod recovery;

pub use jwt::{create_token, JwtAuth, RegisteredClaims, JWT_EXTRA_KEY};
pub use logger::Logger;
pub use rate_limit::RateLimit;
pub use recovery::Recovery;
