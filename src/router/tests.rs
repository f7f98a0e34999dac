use std::sync::Arc;

use http::Method;

use super::Router;
use crate::context::{Context, Request};
use crate::error::{PatternErrorKind, RegistrationError};
use crate::handler::SharedHandler;

fn reply(text: &'static str) -> SharedHandler {
    Arc::new(move |ctx: &mut Context| ctx.string(200, text))
}

fn dispatch(router: &Router, method: Method, uri: &str) -> Context {
    let mut ctx = Context::new(Request::new(method, uri));
    router.handle(&mut ctx);
    ctx
}

#[test]
fn test_get_route_binds_params() {
    let mut router = Router::new();
    router
        .add_route(Method::GET, "/users/:id", reply("user"))
        .unwrap();
    let m = router.get_route(&Method::GET, "/users/42").unwrap();
    assert_eq!(m.get_path_param("id"), Some("42"));
    assert_eq!(&*m.pattern, "/users/:id");
}

#[test]
fn test_root_route() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/", reply("root")).unwrap();
    let ctx = dispatch(&router, Method::GET, "/");
    assert_eq!(ctx.response().text(), "root");
    assert!(router.get_route(&Method::GET, "/x").is_none());
}

#[test]
fn test_methods_have_separate_tables() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/items", reply("list")).unwrap();
    router
        .add_route(Method::POST, "/items", reply("create"))
        .unwrap();
    assert_eq!(router.route_count(), 2);

    assert_eq!(
        dispatch(&router, Method::POST, "/items").response().text(),
        "create"
    );
    assert!(router.get_route(&Method::DELETE, "/items").is_none());
}

#[test]
fn test_duplicate_pattern_rejected_and_first_kept() {
    let mut router = Router::new();
    router
        .add_route(Method::GET, "/users/:id", reply("first"))
        .unwrap();
    let err = router
        .add_route(Method::GET, "/users/:uid", reply("second"))
        .unwrap_err();
    match err {
        RegistrationError::Conflict(c) => {
            assert_eq!(c.method, Method::GET);
            assert_eq!(c.existing, "/users/:id");
            assert_eq!(c.attempted, "/users/:uid");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(router.route_count(), 1);

    let ctx = dispatch(&router, Method::GET, "/users/9");
    assert_eq!(ctx.response().text(), "first");
    assert_eq!(ctx.param("id"), Some("9"));
}

#[test]
fn test_same_pattern_other_method_is_not_a_conflict() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/a", reply("get")).unwrap();
    assert!(router.add_route(Method::PUT, "/a", reply("put")).is_ok());
}

#[test]
fn test_malformed_pattern_rejected_at_registration() {
    let mut router = Router::new();
    let err = router
        .add_route(Method::GET, "/a/:/ b", reply("never"))
        .unwrap_err();
    match err {
        RegistrationError::Pattern(p) => assert_eq!(
            p.kind,
            PatternErrorKind::EmptyWildcardName {
                segment: ":".into()
            }
        ),
        other => panic!("expected pattern error, got {other:?}"),
    }
    assert_eq!(router.route_count(), 0);
}

#[test]
fn test_unmatched_request_is_404() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/known", reply("ok")).unwrap();

    let ctx = dispatch(&router, Method::GET, "/unknown?x=1");
    assert_eq!(ctx.status_code(), 404);
    assert_eq!(ctx.response().text(), "404 NOT FOUND: /unknown");
    assert!(ctx.is_aborted());

    // No trie at all for this method.
    let ctx = dispatch(&router, Method::PATCH, "/known");
    assert_eq!(ctx.status_code(), 404);
}

#[test]
fn test_handle_runs_existing_chain_first() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/x", reply("handler")).unwrap();

    let mut ctx = Context::new(Request::new(Method::GET, "/x"));
    ctx.push_handler(Arc::new(|c: &mut Context| {
        c.set_header("X-Before", "1");
        c.next();
    }));
    router.handle(&mut ctx);
    assert_eq!(ctx.response().header("x-before"), Some("1"));
    assert_eq!(ctx.response().text(), "handler");
}

#[test]
fn test_routes_listing_is_sorted() {
    let mut router = Router::new();
    router.add_route(Method::POST, "/b", reply("")).unwrap();
    router.add_route(Method::GET, "/b", reply("")).unwrap();
    router.add_route(Method::GET, "/a/:id", reply("")).unwrap();
    let listed: Vec<String> = router
        .routes()
        .into_iter()
        .map(|(m, p)| format!("{m} {p}"))
        .collect();
    assert_eq!(listed, vec!["GET /a/:id", "GET /b", "POST /b"]);
}
