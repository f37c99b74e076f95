//! # Daedalus Test
//!
//! In-process testing for Daedalus applications. Requests go through
//! [`App::dispatch`](daedalus_server::App::dispatch) with the full middleware
//! chain and routing policy, without binding a port.
//!
//! ## Example
//!
//! ```
//! use daedalus_core::Handler;
//! use daedalus_test::TestApp;
//! use http::StatusCode;
//!
//! # tokio_test::block_on(async {
//! let mut app = TestApp::new();
//! app.post("/items", Handler::sync(|ctx| {
//!     ctx.set_status(StatusCode::CREATED);
//!     ctx.text("created");
//! }))
//! .unwrap();
//!
//! let client = app.client();
//! client.post("/items").json(&serde_json::json!({"name": "a"})).send().await
//!     .assert_status(StatusCode::CREATED)
//!     .assert_body_eq("created");
//!
//! client.get("/items").send().await
//!     .assert_status(StatusCode::METHOD_NOT_ALLOWED)
//!     .assert_header("allow", "POST")
//!     .assert_error_code("METHOD_NOT_ALLOWED");
//! # });
//! ```

mod app;
mod client;
mod error;
mod logs;
mod request;
mod response;

pub use app::TestApp;
pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use logs::{CapturedEvent, LogCapture};
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
