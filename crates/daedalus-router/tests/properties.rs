//! Property tests for the per-method trees.

use daedalus_router::{MatchOptions, Params, Resolution, RouteError, Router};
use http::Method;
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,8}"
}

fn literal_pattern() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..5).prop_map(|segments| format!("/{}", segments.join("/")))
}

proptest! {
    #[test]
    fn literal_routes_match_themselves(patterns in prop::collection::btree_set(literal_pattern(), 1..20)) {
        let mut router = Router::new();
        for pattern in &patterns {
            router.insert(&Method::GET, pattern, pattern.clone()).unwrap();
        }
        for pattern in &patterns {
            let mut params = Params::new();
            let endpoint = router.find(&Method::GET, pattern, &mut params).unwrap();
            prop_assert_eq!(endpoint.value(), pattern);
            prop_assert!(params.is_empty());
        }
    }

    #[test]
    fn param_captures_segment_text(prefix in literal_pattern(), value in "[^/]{1,16}") {
        let mut router = Router::new();
        router.insert(&Method::GET, &format!("{prefix}/:value/end"), ()).unwrap();

        let mut params = Params::new();
        let path = format!("{prefix}/{value}/end");
        prop_assert!(router.find(&Method::GET, &path, &mut params).is_some());
        prop_assert_eq!(params.get("value"), Some(value.as_str()));
    }

    #[test]
    fn wildcard_captures_remainder(prefix in literal_pattern(), rest in prop::collection::vec(segment(), 0..6)) {
        let mut router = Router::new();
        router.insert(&Method::GET, &format!("{prefix}/*rest"), ()).unwrap();

        let remainder = rest.join("/");
        let mut params = Params::new();
        let path = format!("{prefix}/{remainder}");
        prop_assert!(router.find(&Method::GET, &path, &mut params).is_some());
        prop_assert_eq!(params.get("rest"), Some(remainder.as_str()));
    }

    #[test]
    fn duplicate_registration_fails(pattern in literal_pattern()) {
        let mut router = Router::new();
        router.insert(&Method::POST, &pattern, 1).unwrap();
        let second = router.insert(&Method::POST, &pattern, 2);
        prop_assert!(matches!(second, Err(RouteError::Duplicate { .. })), "expected Duplicate error");
        prop_assert_eq!(router.routes().len(), 1);
    }

    #[test]
    fn trailing_slash_redirect_is_symmetric(pattern in literal_pattern()) {
        let mut router = Router::new();
        router.insert(&Method::GET, &pattern, ()).unwrap();

        let mut params = Params::new();
        let with_slash = format!("{pattern}/");
        let resolution = router.resolve(&Method::GET, &with_slash, &MatchOptions::default(), &mut params);
        prop_assert!(matches!(resolution, Resolution::RedirectTrailingSlash(ref p) if p == &pattern), "expected trailing-slash redirect");

        let options = MatchOptions { redirect_trailing_slash: false, redirect_fixed_path: false, ..MatchOptions::default() };
        let resolution = router.resolve(&Method::GET, &with_slash, &options, &mut params);
        prop_assert!(matches!(resolution, Resolution::NotFound), "expected not found");
    }

    #[test]
    fn resolution_is_stable(path in "/[a-zA-Z0-9/._-]{0,24}") {
        let mut router = Router::new();
        for pattern in ["/a/:x", "/a/b", "/A/*rest", "/docs/", "/v1/items"] {
            router.insert(&Method::GET, pattern, pattern).unwrap();
        }
        router.insert(&Method::POST, "/forms/:id", "/forms/:id").unwrap();

        let describe = |router: &Router<&'static str>| {
            let mut params = Params::new();
            let outcome = format!("{:?}", router.resolve(&Method::GET, &path, &MatchOptions::default(), &mut params));
            (outcome, params)
        };
        prop_assert_eq!(describe(&router), describe(&router));
    }
}
