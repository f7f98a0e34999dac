//! # Router Module
//!
//! Path matching and route resolution.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Parsing route patterns such as `/users/:id/files/*path`
//! - Storing one segment trie per HTTP method
//! - Matching incoming requests and extracting path parameters
//! - Resolving which group middlewares apply to a path
//!
//! ## Architecture
//!
//! Registration and matching are separate phases:
//!
//! 1. **Registration**: patterns are parsed into segments and inserted into the
//!    [`RouteTrie`] of their method. Malformed patterns and patterns that land
//!    on an already-owned node are rejected with an error, so a bad route table
//!    never reaches the serving phase.
//!
//! 2. **Matching**: a request path is split into segments and looked up
//!    breadth-first. Literal segments beat `:params`, and the deepest matching
//!    `*catch_all` wins when nothing matches exactly. See [`trie`] for the
//!    precise rules.
//!
//! Middleware groups live in a separate byte-keyed [`GroupTrie`], walked along
//! the raw request path to build the ordered middleware chain.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use http::Method;
//! use thimble::router::Router;
//! use thimble::Context;
//!
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/users/:id", Arc::new(|ctx: &mut Context| {
//!     let id = ctx.param("id").unwrap_or_default().to_string();
//!     ctx.string(200, id);
//! }))?;
//!
//! let m = router.get_route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! ```

mod core;
pub mod group;
pub mod pattern;
pub mod trie;
#[cfg(test)]
mod tests;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use group::GroupTrie;
pub use pattern::{canonical_path, decode_path, split_path, Pattern, Segment};
pub use trie::{Route, RouteHit, RouteTrie};
