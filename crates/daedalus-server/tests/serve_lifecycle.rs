//! Serving over TCP and stopping.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use daedalus_core::Handler;
use daedalus_server::{App, AppError};
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

async fn send(addr: std::net::SocketAddr, request: Request<Full<Bytes>>) -> (StatusCode, String) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(connection);

    let response = sender.send_request(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn echo_body() -> Handler {
    Handler::sync(|ctx| {
        let body = ctx.body().clone();
        ctx.write(&body);
    })
}

#[tokio::test]
async fn serves_until_stopped() {
    let mut app = App::new();
    app.get("/ping", Handler::sync(|ctx| ctx.text("pong"))).unwrap();
    app.post("/echo", echo_body()).unwrap();
    app.serve_options_mut().max_body_bytes = 8;
    let app = Arc::new(app);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(Arc::clone(&app).serve(listener));

    let ping = Request::get(format!("http://{addr}/ping"))
        .body(Full::new(Bytes::new()))
        .unwrap();
    assert_eq!(send(addr, ping).await, (StatusCode::OK, "pong".to_string()));

    let echo = Request::post(format!("http://{addr}/echo"))
        .body(Full::new(Bytes::from_static(b"short")))
        .unwrap();
    assert_eq!(send(addr, echo).await, (StatusCode::OK, "short".to_string()));

    let oversize = Request::post(format!("http://{addr}/echo"))
        .body(Full::new(Bytes::from_static(b"far too long for the limit")))
        .unwrap();
    let (status, body) = send(addr, oversize).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body.contains("PAYLOAD_TOO_LARGE"));

    app.stop();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop")
        .expect("server task should not panic")
        .expect("serve should succeed");

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn stop_before_serve_returns_immediately() {
    let app = Arc::new(App::new());
    app.stop();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), app.serve(listener))
        .await
        .expect("serve should return")
        .unwrap();
}

#[tokio::test]
async fn start_reports_bind_failure() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let mut app = App::new();
    app.set_log_config(daedalus_telemetry::LogConfig::disabled());
    app.serve_options_mut().bind_addr = addr.to_string();

    match Arc::new(app).start().await {
        Err(AppError::Bind { addr: reported, .. }) => assert_eq!(reported, addr.to_string()),
        other => panic!("expected a bind error, got {other:?}"),
    }
}
