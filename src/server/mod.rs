//! # Server Module
//!
//! Registration and serving.
//!
//! - [`Server`] and [`Group`] are the registration API: routes, groups,
//!   middlewares, static directories and templates.
//! - [`Server::build`] freezes them into an [`App`], whose
//!   [`dispatch`](App::dispatch) runs one request's chain.
//! - [`AppService`] adapts an `App` to may_minihttp, and [`HttpServer`] starts
//!   the listener and returns a [`ServerHandle`].
//!
//! Each connection is served on its own `may` coroutine; requests never share
//! a [`Context`](crate::Context).

mod app;
mod builder;
pub mod http_server;
pub mod request;
pub mod response;
mod service;

pub use app::App;
pub use builder::{Group, Server};
pub use http_server::{HttpServer, ServerHandle};
pub use service::AppService;
