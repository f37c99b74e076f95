//! In-process dispatch scenarios.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use daedalus_core::Handler;
use daedalus_middleware::{stages, Middleware};
use daedalus_server::{App, AppError};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};

fn request(method: Method, uri: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

async fn body_text(response: Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn echo_params() -> Handler {
    Handler::sync(|ctx| {
        let captured: Vec<String> = ctx
            .params()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        ctx.text(captured.join("&"));
    })
}

/// Records `name` before and after the rest of the chain runs.
fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Middleware {
    let log = Arc::clone(log);
    Middleware::around(name, move |ctx, next| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(format!("{name}:before"));
            next.call(ctx).await;
            log.lock().unwrap().push(format!("{name}:after"));
        })
    })
}

#[tokio::test]
async fn param_and_wildcard_siblings() {
    let mut app = App::new();
    app.get("/users/:id", echo_params()).unwrap();
    app.get("/users/*rest", echo_params()).unwrap();

    let response = app.dispatch(request(Method::GET, "/users/42"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "id=42");

    let response = app
        .dispatch(request(Method::GET, "/users/42/orders"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "rest=42/orders");
}

#[tokio::test]
async fn method_not_allowed_and_options() {
    let mut app = App::new();
    app.post("/items", echo_params()).unwrap();

    let response = app.dispatch(request(Method::GET, "/items"), None).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "POST");
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");

    let response = app.dispatch(request(Method::OPTIONS, "/items"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["allow"], "POST");
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn allow_lists_methods_in_canonical_order() {
    let mut app = App::new();
    let purge = Method::from_bytes(b"PURGE").unwrap();
    app.route(purge, "/cache", echo_params()).unwrap();
    app.delete("/cache", echo_params()).unwrap();
    app.get("/cache", echo_params()).unwrap();

    let response = app.dispatch(request(Method::PUT, "/cache"), None).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "GET, DELETE, PURGE");
}

#[tokio::test]
async fn global_options() {
    let mut app = App::new();
    app.get("/a", echo_params()).unwrap();
    app.post("/b", echo_params()).unwrap();

    let response = app.dispatch(request(Method::OPTIONS, "*"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["allow"], "GET, POST");

    let response = app.dispatch(request(Method::GET, "*"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn global_options_ignores_base_path() {
    let mut app = App::new();
    app.router_options_mut().set_base_path("/api");
    app.get("/users", echo_params()).unwrap();
    app.delete("/users/:id", echo_params()).unwrap();

    let response = app.dispatch(request(Method::OPTIONS, "*"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["allow"], "GET, DELETE");

    let response = app.dispatch(request(Method::GET, "/api/users"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn disabled_policies_fall_through_to_not_found() {
    let mut app = App::new();
    {
        let options = app.router_options_mut();
        options.redirect_trailing_slash = false;
        options.redirect_fixed_path = false;
        options.handle_method_not_allowed = false;
        options.handle_options = false;
    }
    app.get("/a/b", echo_params()).unwrap();

    for (method, uri) in [
        (Method::GET, "/a/b/"),
        (Method::GET, "/A/B"),
        (Method::POST, "/a/b"),
        (Method::OPTIONS, "/a/b"),
    ] {
        let response = app.dispatch(request(method, uri), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn fixed_path_redirect() {
    let mut app = App::new();
    app.get("/docs/intro", echo_params()).unwrap();

    let response = app
        .dispatch(request(Method::GET, "/DOCS//./intro"), None)
        .await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()["location"], "/docs/intro");
}

#[tokio::test]
async fn middleware_order_global_then_route() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.use_middleware(recorder("outer", &log)).unwrap();
    app.use_middleware(recorder("inner", &log)).unwrap();

    let handler_log = Arc::clone(&log);
    app.route_with(
        Method::GET,
        "/ordered",
        Handler::sync(move |_ctx| handler_log.lock().unwrap().push("handler".to_string())),
        &[recorder("route", &log)],
    )
    .unwrap();

    let response = app.dispatch(request(Method::GET, "/ordered"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "outer:before",
            "inner:before",
            "route:before",
            "handler",
            "route:after",
            "inner:after",
            "outer:after",
        ]
    );
}

#[tokio::test]
async fn middleware_added_late_only_wraps_later_routes() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.get("/early", echo_params()).unwrap();
    app.use_middleware(recorder("late", &log)).unwrap();
    app.get("/later", echo_params()).unwrap();

    let _ = app.dispatch(request(Method::GET, "/early"), None).await;
    assert!(log.lock().unwrap().is_empty());

    let _ = app.dispatch(request(Method::GET, "/later"), None).await;
    assert_eq!(*log.lock().unwrap(), vec!["late:before", "late:after"]);
}

#[tokio::test]
async fn automatic_responses_skip_middleware() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.use_middleware(recorder("global", &log)).unwrap();
    app.post("/items", echo_params()).unwrap();

    let _ = app.dispatch(request(Method::GET, "/items"), None).await;
    let _ = app.dispatch(request(Method::POST, "/items/"), None).await;
    let _ = app.dispatch(request(Method::GET, "/missing"), None).await;
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stock_stages_together() {
    let mut app = App::new();
    app.use_middleware(stages::recover()).unwrap();
    app.use_middleware(stages::request_id(stages::RequestIdConfig::default()))
        .unwrap();
    app.use_middleware(stages::access_log()).unwrap();
    app.get("/boom", Handler::sync(|_ctx| panic!("handler exploded")))
        .unwrap();

    let response = app.dispatch(request(Method::GET, "/boom"), None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");

    // the pool stays usable after a panicking handler
    let response = app.dispatch(request(Method::GET, "/missing"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_after_dispatch_fails() {
    let mut app = App::new();
    app.get("/", echo_params()).unwrap();
    let _ = app.dispatch(request(Method::GET, "/"), None).await;

    assert!(matches!(app.get("/late", echo_params()), Err(AppError::Route(_))));
    assert!(matches!(
        app.use_middleware(stages::access_log()),
        Err(AppError::Frozen { .. })
    ));
}

#[tokio::test]
async fn independent_apps_do_not_share_state() {
    let mut first = App::new();
    first.get("/only-first", echo_params()).unwrap();
    let second = App::new();

    let response = first.dispatch(request(Method::GET, "/only-first"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = second
        .dispatch(request(Method::GET, "/only-first"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(first.context_pool().created(), 1);
    assert_eq!(second.context_pool().created(), 1);
}
