use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thimble::middleware::{create_token, JwtAuth, RateLimit, RegisteredClaims, JWT_EXTRA_KEY};
use thimble::{init_logging, Context, Endpoint, Handler, LogConfig, RuntimeConfig, Server};
use tracing::info;

#[derive(Parser)]
#[command(name = "thimble-demo")]
#[command(about = "Thimble demo server", long_about = None)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0:9999", env = "THIMBLE_ADDR")]
    addr: String,

    /// Directory served under /static
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Directory of *.html templates
    #[arg(long)]
    templates: Option<PathBuf>,

    /// HS256 secret for /login tokens and the /api group
    #[arg(long, default_value = "123456", env = "THIMBLE_JWT_SECRET")]
    secret: String,

    /// Requests per second allowed per client on /api
    #[arg(long, default_value_t = 20)]
    rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Payload {
    name: String,
    #[serde(flatten)]
    claims: RegisteredClaims,
}

/// POST /hello1, counting how often it was hit.
struct Hello {
    hits: AtomicUsize,
}

impl Handler for Hello {
    fn handle(&self, ctx: &mut Context) {
        if let Some(num) = ctx.form_value("num") {
            info!(num = %num, "hello1 called");
        }
        let cnt = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
        ctx.json(200, &json!({ "msg": "hello1", "cnt": cnt }));
    }
}

impl Endpoint for Hello {
    fn method(&self) -> Method {
        Method::POST
    }

    fn pattern(&self) -> &str {
        "/hello1"
    }
}

fn outer(ctx: &mut Context) {
    info!(path = %ctx.path(), "m1 before");
    ctx.next();
    info!(status = ctx.status_code(), "m1 after");
}

fn inner(ctx: &mut Context) {
    info!(path = %ctx.path(), "m2 before");
    ctx.next();
    info!(status = ctx.status_code(), "m2 after");
}

fn build(cli: &Cli) -> anyhow::Result<Server> {
    let mut server = Server::with_defaults();

    {
        let mut m1 = server.group("m1")?;
        m1.use_middleware(outer);
        let mut m2 = m1.group("m2")?;
        m2.use_middleware(inner);
        m2.bind(Hello {
            hits: AtomicUsize::new(0),
        })?;
        m2.get("/hello2", |ctx: &mut Context| {
            if let Some(num) = ctx.query("num") {
                info!(num = %num, "hello2 called");
            }
            ctx.json(200, &json!({ "msg": "hello2" }));
        })?;
    }

    let secret = cli.secret.clone().into_bytes();
    let login_secret = secret.clone();
    server.get("/login", move |ctx: &mut Context| {
        let payload = Payload {
            name: ctx.form_value("name").unwrap_or_else(|| "admin".to_string()),
            claims: RegisteredClaims::expiring_in(Duration::from_secs(20)),
        };
        match create_token(&login_secret, &payload) {
            Ok(token) => ctx.string(200, token),
            Err(e) => ctx.fail(500, e.to_string()),
        }
    })?;

    {
        let mut api = server.group("api")?;
        api.use_middleware(RateLimit::new(cli.rate))
            .use_middleware(JwtAuth::<Payload>::new(&secret, "token"));
        api.get("/users", |ctx: &mut Context| {
            match ctx.extra::<Payload>(JWT_EXTRA_KEY).cloned() {
                Some(payload) => ctx.json(200, &payload),
                None => ctx.fail(401, "token missing"),
            }
        })?;
        api.get("/users/:id", |ctx: &mut Context| {
            let id = ctx.param("id").unwrap_or_default().to_string();
            ctx.json(200, &json!({ "id": id }));
        })?;
    }

    if let Some(dir) = &cli.static_dir {
        server.static_dir("static", dir.clone())?;
    }

    if let Some(dir) = &cli.templates {
        let loaded = server
            .load_templates(dir)
            .with_context(|| format!("loading templates from {}", dir.display()))?;
        info!(count = loaded, "Templates loaded");
        server.get("/page/:name", |ctx: &mut Context| {
            let name = format!("{}.html", ctx.param("name").unwrap_or("index"));
            let path = ctx.path().to_string();
            ctx.html(200, &name, json!({ "path": path }));
        })?;
    }

    Ok(server)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_env())?;

    let server = build(&cli)?.with_runtime_config(RuntimeConfig::from_env());
    let handle = server
        .run(cli.addr.as_str())
        .with_context(|| format!("binding {}", cli.addr))?;
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("server coroutine panicked"))?;
    Ok(())
}
