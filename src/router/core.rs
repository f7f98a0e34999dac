use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::pattern::{decode_path, Pattern, PathSegments};
use super::trie::RouteTrie;
use crate::context::Context;
use crate::error::{RegistrationError, RouteConflictError};
use crate::handler::SharedHandler;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter bindings for one request.
///
/// Names are shared with the route table (`Arc<str>`); values are
/// per-request data cut from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of resolving a request to a registered route
#[derive(Clone)]
pub struct RouteMatch {
    /// Handler registered for the route
    pub handler: SharedHandler,
    /// Pattern text as registered (e.g. `/users/:id`)
    pub pattern: Arc<str>,
    /// Bindings for the pattern's `:param` and `*catch_all` segments
    pub path_params: ParamVec,
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("pattern", &self.pattern)
            .field("path_params", &self.path_params)
            .finish_non_exhaustive()
    }
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// If the same name is bound twice (`/org/:id/user/:id`), the last
    /// binding wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One route trie per HTTP method.
///
/// Built single-threaded during registration, then only read. The router is
/// handed to the serving side inside an [`App`](crate::server::App) and is
/// never mutated again.
#[derive(Default)]
pub struct Router {
    trees: HashMap<Method, RouteTrie<SharedHandler>>,
    total: usize,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::Pattern`] if the pattern is malformed
    /// - [`RegistrationError::Conflict`] if another pattern already resolves
    ///   to the same node; the earlier route stays registered
    pub fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: SharedHandler,
    ) -> Result<(), RegistrationError> {
        let parsed = Pattern::parse(pattern)?;
        let tree = self.trees.entry(method.clone()).or_default();

        if let Err(existing) = tree.insert(&parsed, handler) {
            warn!(
                method = %method,
                pattern = %pattern,
                existing = %existing,
                "Route conflict, registration rejected"
            );
            return Err(RouteConflictError {
                method,
                existing: existing.to_string(),
                attempted: pattern.to_string(),
            }
            .into());
        }

        self.total += 1;
        debug!(method = %method, pattern = %pattern, "Route registered");
        Ok(())
    }

    /// Resolve `method` and `path` to a route.
    ///
    /// `path` is the raw request path. Segments are percent-decoded before
    /// matching, so bound parameters hold decoded text.
    ///
    /// Returns `None` both when nothing matches and when no route was ever
    /// registered for `method`.
    #[must_use]
    pub fn get_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let tree = self.trees.get(method)?;
        let decoded = decode_path(path);
        let segments: PathSegments<'_> = decoded.iter().map(|s| &**s).collect();
        let hit = tree.search(&segments)?;
        Some(RouteMatch {
            handler: Arc::clone(&hit.route.value),
            pattern: Arc::clone(&hit.route.pattern),
            path_params: hit.params,
        })
    }

    /// Resolve the route for `ctx` and run its chain.
    ///
    /// The context's chain must already hold the group middlewares for the
    /// path. The matched handler (or a 404 handler) is appended and the chain
    /// is started with [`Context::next`].
    pub fn handle(&self, ctx: &mut Context) {
        match self.get_route(ctx.method(), ctx.path()) {
            Some(found) => {
                debug!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    route_pattern = %found.pattern,
                    path_params = ?found.path_params,
                    "Route matched"
                );
                ctx.set_params(found.path_params);
                ctx.push_handler(found.handler);
            }
            None => {
                debug!(method = %ctx.method(), path = %ctx.path(), "No route matched");
                ctx.push_handler(Arc::new(not_found));
            }
        }
        ctx.next();
    }

    /// Number of routes registered across all methods.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.total
    }

    /// Every registered `(method, pattern)` pair, sorted for stable output.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, Arc<str>)> {
        let mut out: Vec<(Method, Arc<str>)> = self
            .trees
            .iter()
            .flat_map(|(method, tree)| {
                tree.routes()
                    .into_iter()
                    .map(move |route| (method.clone(), Arc::clone(&route.pattern)))
            })
            .collect();
        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        out
    }
}

fn not_found(ctx: &mut Context) {
    let message = format!("404 NOT FOUND: {}", ctx.path());
    ctx.fail(404, message);
}
