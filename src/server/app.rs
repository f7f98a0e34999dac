use std::sync::Arc;

use minijinja::Environment;

use crate::context::{Context, Request, Response};
use crate::handler::SharedHandler;
use crate::router::{canonical_path, GroupTrie, Router};

/// A frozen application: route table, group table and templates.
///
/// Cloning is cheap and every clone shares the same read-only tables, so one
/// `App` can serve any number of concurrent requests without locking.
#[derive(Clone)]
pub struct App {
    router: Arc<Router>,
    groups: Arc<GroupTrie<SharedHandler>>,
    templates: Arc<Environment<'static>>,
}

impl App {
    pub(crate) fn new(
        router: Router,
        groups: GroupTrie<SharedHandler>,
        templates: Environment<'static>,
    ) -> Self {
        Self {
            router: Arc::new(router),
            groups: Arc::new(groups),
            templates: Arc::new(templates),
        }
    }

    /// Run the full chain for `ctx`: group middlewares for its path, then
    /// the matched route handler or the 404 handler.
    ///
    /// Groups are looked up on the canonical path (empty segments dropped,
    /// escapes decoded), the same segments the router matches on. A decoded
    /// `%2F` can make more groups apply, never fewer.
    pub fn dispatch(&self, ctx: &mut Context) {
        ctx.extend_handlers(self.groups.search(&canonical_path(ctx.path())));
        ctx.set_templates(Arc::clone(&self.templates));
        self.router.handle(ctx);
    }

    /// Dispatch a request in a fresh context and return what it produced.
    #[must_use]
    pub fn handle(&self, request: Request) -> Response {
        let mut ctx = Context::new(request);
        self.dispatch(&mut ctx);
        ctx.into_response()
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }
}
