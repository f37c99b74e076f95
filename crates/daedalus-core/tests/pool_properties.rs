//! A recycled context never shows state from the request before it.

use bytes::Bytes;
use daedalus_core::{ContextPool, ProxyOptions};
use http::{Method, Request, StatusCode};
use proptest::prelude::*;

proptest! {
    #[test]
    fn reacquired_context_is_pristine(
        path in "/[a-z]{1,8}(/[a-z0-9]{1,8}){0,3}",
        body in prop::collection::vec(any::<u8>(), 0..256),
        captures in prop::collection::vec(("[a-z]{1,6}", "[a-z0-9]{1,6}"), 0..6),
        status in 200u16..600,
    ) {
        let pool = ContextPool::with_max_idle(1);
        {
            let mut ctx = pool.acquire();
            let request = Request::builder()
                .method(Method::PATCH)
                .uri(path.as_str())
                .header("x-request", "1")
                .body(Bytes::from(body))
                .unwrap();
            ctx.begin(request, Some("127.0.0.1:9000".parse().unwrap()), &ProxyOptions::default());
            for (name, value) in &captures {
                ctx.routing_parts().2.push(name.as_str(), value.as_str());
            }
            ctx.set_status(StatusCode::from_u16(status).unwrap());
            ctx.write(b"stale response");
            ctx.insert_header(http::header::ETAG, http::HeaderValue::from_static("\"v1\""));
        }

        let ctx = pool.acquire();
        prop_assert_eq!(pool.created(), 1);
        prop_assert_eq!(ctx.method(), Method::GET);
        prop_assert_eq!(ctx.path(), "/");
        prop_assert!(ctx.params().is_empty());
        prop_assert!(ctx.headers().is_empty());
        prop_assert!(ctx.body().is_empty());
        prop_assert!(ctx.remote_addr().is_none());
        prop_assert_eq!(ctx.status(), StatusCode::OK);
        prop_assert!(ctx.response_headers().is_empty());
        prop_assert!(ctx.response_body().is_empty());
    }
}
