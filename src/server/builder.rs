use std::fs;
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::Method;
use minijinja::Environment;
use tracing::{debug, info};

use super::app::App;
use super::http_server::{HttpServer, ServerHandle};
use super::service::AppService;
use crate::error::{RegistrationError, TemplateError};
use crate::handler::{Endpoint, Handler, SharedHandler};
use crate::middleware::{Logger, Recovery};
use crate::router::{GroupTrie, Router};
use crate::runtime_config::RuntimeConfig;
use crate::static_files::{StaticFiles, FILEPATH_PARAM};

/// Registration phase of an application.
///
/// Routes, groups, middlewares and templates are added here, single-threaded.
/// [`build`](Server::build) then freezes everything into an [`App`] that is
/// only ever read while serving.
///
/// ```rust,ignore
/// let mut server = Server::with_defaults();
/// server.get("/ping", |ctx: &mut Context| ctx.string(200, "pong"))?;
///
/// let mut api = server.group("/api")?;
/// api.use_middleware(JwtAuth::<Claims>::new(secret, "token"));
/// api.get("/users/:id", show_user)?;
///
/// let handle = server.run("0.0.0.0:8080")?;
/// handle.join().ok();
/// ```
pub struct Server {
    router: Router,
    groups: GroupTrie<SharedHandler>,
    templates: Environment<'static>,
    config: RuntimeConfig,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// A server with no middlewares.
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            groups: GroupTrie::new(),
            templates: Environment::new(),
            config: RuntimeConfig::from_env(),
        }
    }

    /// A server with [`Recovery`] then [`Logger`] installed globally.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut server = Self::new();
        server.use_middleware(Recovery).use_middleware(Logger);
        server
    }

    /// Override the runtime configuration read from the environment.
    #[must_use]
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Handle on the root group, whose middlewares apply to every request.
    pub fn root(&mut self) -> Group<'_> {
        Group {
            server: self,
            prefix: String::new(),
        }
    }

    /// Add a middleware that runs for every request.
    pub fn use_middleware<H: Handler + 'static>(&mut self, middleware: H) -> &mut Self {
        self.root().use_middleware(middleware);
        self
    }

    /// Declare a top-level group.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::InvalidPrefix`] for `""` or `"/"`.
    pub fn group(&mut self, prefix: &str) -> Result<Group<'_>, RegistrationError> {
        let full = join_prefix("", prefix)?;
        Ok(Group::declare(self, full))
    }

    /// Register a route on the root group.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn route<H: Handler + 'static>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.root().route(method, pattern, handler)?;
        Ok(self)
    }

    /// Register a GET route on the root group.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn get<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::GET, pattern, handler)
    }

    /// Register a POST route on the root group.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn post<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::POST, pattern, handler)
    }

    /// Register a PUT route on the root group.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn put<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::PUT, pattern, handler)
    }

    /// Register a DELETE route on the root group.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn delete<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Register a PATCH route on the root group.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn patch<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Register an endpoint on the root group.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn bind<E: Endpoint + 'static>(
        &mut self,
        endpoint: E,
    ) -> Result<&mut Self, RegistrationError> {
        self.root().bind(endpoint)?;
        Ok(self)
    }

    /// Serve files from `root` under `relative` on the root group.
    ///
    /// # Errors
    ///
    /// See [`Group::static_dir`].
    pub fn static_dir(
        &mut self,
        relative: &str,
        root: impl Into<PathBuf>,
    ) -> Result<&mut Self, RegistrationError> {
        self.root().static_dir(relative, root)?;
        Ok(self)
    }

    /// Load every `*.html` file in `dir` as a template named after the file.
    ///
    /// Returns the number of templates loaded. Subdirectories are ignored.
    ///
    /// # Errors
    ///
    /// Fails if the directory or a file can't be read, or a template doesn't
    /// parse.
    pub fn load_templates(&mut self, dir: impl AsRef<Path>) -> Result<usize, TemplateError> {
        let dir = dir.as_ref();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| TemplateError::Io { path, source }
        };

        let mut loaded = 0;
        for entry in fs::read_dir(dir).map_err(io_err(dir))? {
            let path = entry.map_err(io_err(dir))?.path();
            let is_html = path.extension().and_then(|e| e.to_str()) == Some("html");
            if !is_html || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let source = fs::read_to_string(&path).map_err(io_err(&path))?;
            self.templates.add_template_owned(name.clone(), source)?;
            debug!(template = %name, "Template loaded");
            loaded += 1;
        }
        info!(dir = %dir.display(), count = loaded, "Templates loaded");
        Ok(loaded)
    }

    /// The template environment, for registering filters and functions.
    pub fn templates_mut(&mut self) -> &mut Environment<'static> {
        &mut self.templates
    }

    /// Number of routes registered so far.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.router.route_count()
    }

    /// Freeze the route and group tables.
    #[must_use]
    pub fn build(self) -> App {
        info!(
            routes_count = self.router.route_count(),
            "Available router total: {}",
            self.router.route_count()
        );
        App::new(self.router, self.groups, self.templates)
    }

    /// Build the app, configure the coroutine runtime and start listening.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub fn run<A: ToSocketAddrs>(self, addr: A) -> std::io::Result<ServerHandle> {
        let config = self.config;
        let app = self.build();
        config.apply();
        let handle = HttpServer(AppService::new(app)).start(addr)?;
        info!(addr = %handle.addr(), "HTTP server listening");
        Ok(handle)
    }
}

/// A prefix under which routes and middlewares are registered.
///
/// Groups nest: `server.group("/v1")?.group("/admin")?` covers `/v1/admin`.
/// Middlewares added to a group run after those of its parents.
pub struct Group<'a> {
    server: &'a mut Server,
    prefix: String,
}

impl<'a> Group<'a> {
    fn declare(server: &'a mut Server, prefix: String) -> Self {
        server.groups.insert(&prefix, Vec::new());
        debug!(prefix = %prefix, "Group declared");
        Self { server, prefix }
    }

    /// Full prefix of this group, `""` for the root group.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Add a middleware to this group.
    pub fn use_middleware<H: Handler + 'static>(&mut self, middleware: H) -> &mut Self {
        let handler: SharedHandler = Arc::new(middleware);
        self.server.groups.append(&self.prefix, [handler]);
        self
    }

    /// Declare a group nested in this one.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::InvalidPrefix`] for `""` or `"/"`.
    pub fn group(&mut self, prefix: &str) -> Result<Group<'_>, RegistrationError> {
        let full = join_prefix(&self.prefix, prefix)?;
        Ok(Group::declare(self.server, full))
    }

    /// Register `handler` for `method` at this group's prefix plus `pattern`.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn route<H: Handler + 'static>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.add(method, pattern, Arc::new(handler))?;
        Ok(self)
    }

    fn add(
        &mut self,
        method: Method,
        pattern: &str,
        handler: SharedHandler,
    ) -> Result<(), RegistrationError> {
        let full = format!("{}{}", self.prefix, with_leading_slash(pattern));
        self.server.router.add_route(method, &full, handler)
    }

    /// Register a GET route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn get<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::GET, pattern, handler)
    }

    /// Register a POST route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn post<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::POST, pattern, handler)
    }

    /// Register a PUT route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn put<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::PUT, pattern, handler)
    }

    /// Register a DELETE route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn delete<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Register a PATCH route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn patch<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Register an OPTIONS route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn options<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::OPTIONS, pattern, handler)
    }

    /// Register a HEAD route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn head<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError> {
        self.route(Method::HEAD, pattern, handler)
    }

    /// Register an endpoint at its own method and pattern, relative to this
    /// group.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn bind<E: Endpoint + 'static>(
        &mut self,
        endpoint: E,
    ) -> Result<&mut Self, RegistrationError> {
        let method = endpoint.method();
        let pattern = endpoint.pattern().to_string();
        self.route(method, &pattern, endpoint)
    }

    /// Serve files from `root` at `GET <prefix><relative>/*filepath`.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn static_dir(
        &mut self,
        relative: &str,
        root: impl Into<PathBuf>,
    ) -> Result<&mut Self, RegistrationError> {
        let relative = relative.trim_matches('/');
        let pattern = if relative.is_empty() {
            format!("/*{FILEPATH_PARAM}")
        } else {
            format!("/{relative}/*{FILEPATH_PARAM}")
        };
        self.route(Method::GET, &pattern, StaticFiles::new(root))
    }
}

fn with_leading_slash(s: &str) -> String {
    if s.starts_with('/') {
        s.to_string()
    } else {
        format!("/{s}")
    }
}

/// Join a parent prefix and a child prefix, validating the child.
fn join_prefix(parent: &str, prefix: &str) -> Result<String, RegistrationError> {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(RegistrationError::InvalidPrefix {
            prefix: prefix.to_string(),
        });
    }
    Ok(format!("{parent}{}", with_leading_slash(trimmed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_prefix() {
        assert_eq!(join_prefix("", "api").unwrap(), "/api");
        assert_eq!(join_prefix("", "/api/").unwrap(), "/api");
        assert_eq!(join_prefix("/m1", "m2").unwrap(), "/m1/m2");
    }

    #[test]
    fn test_join_prefix_rejects_root() {
        for bad in ["", "/", "//"] {
            assert_eq!(
                join_prefix("/api", bad).unwrap_err(),
                RegistrationError::InvalidPrefix {
                    prefix: bad.to_string()
                }
            );
        }
    }

    #[test]
    fn test_load_templates_reads_html_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.html"), "A {{ x }}").unwrap();
        fs::write(dir.path().join("b.html"), "B").unwrap();
        fs::write(dir.path().join("notes.txt"), "{{ broken").unwrap();
        fs::create_dir(dir.path().join("nested.html")).unwrap();

        let mut server = Server::new();
        assert_eq!(server.load_templates(dir.path()).unwrap(), 2);
        let rendered = server
            .templates_mut()
            .get_template("a.html")
            .unwrap()
            .render(minijinja::context! { x => 1 })
            .unwrap();
        assert_eq!(rendered, "A 1");
    }

    #[test]
    fn test_load_templates_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.html"), "{% if %}").unwrap();
        let mut server = Server::new();
        assert!(matches!(
            server.load_templates(dir.path()),
            Err(TemplateError::Syntax(_))
        ));
        assert!(matches!(
            server.load_templates(dir.path().join("missing")),
            Err(TemplateError::Io { .. })
        ));
    }

    #[test]
    fn test_groups_register_prefixed_routes() {
        let mut server = Server::new();
        {
            let mut v1 = server.group("v1").unwrap();
            v1.get("users", |ctx: &mut crate::Context| ctx.string(200, "u"))
                .unwrap();
            let mut admin = v1.group("/admin/").unwrap();
            assert_eq!(admin.prefix(), "/v1/admin");
            admin
                .post("/stats", |ctx: &mut crate::Context| ctx.string(200, "s"))
                .unwrap();
            admin.static_dir("files", "tests/staticdata").unwrap();
        }
        let listed: Vec<String> = server
            .build()
            .router()
            .routes()
            .into_iter()
            .map(|(m, p)| format!("{m} {p}"))
            .collect();
        assert_eq!(
            listed,
            vec![
                "GET /v1/admin/files/*filepath",
                "POST /v1/admin/stats",
                "GET /v1/users",
            ]
        );
    }

    #[test]
    fn test_with_leading_slash() {
        assert_eq!(with_leading_slash("users"), "/users");
        assert_eq!(with_leading_slash("/users"), "/users");
        assert_eq!(with_leading_slash(""), "/");
    }
}
