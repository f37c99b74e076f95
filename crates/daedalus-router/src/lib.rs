//! Per-method radix tree router for Daedalus.
//!
//! Each HTTP method owns one compressed prefix tree. Static text is stored
//! on compressed edges, named parameters (`:id`) capture one segment and a
//! trailing wildcard (`*rest`) captures the remainder of the path.
//!
//! # Features
//!
//! - **Radix Tree Matching**: lookup cost grows with the path, not the route count
//! - **Path Correction**: trailing-slash and cleaned/case-corrected redirects
//! - **Allow Computation**: `405` and automatic `OPTIONS` answers
//! - **Custom Methods**: extension verbs get their own tree
//! - **Introspection**: every registered pattern, grouped per method
//!
//! # Example
//!
//! ```rust
//! use daedalus_router::{MatchOptions, Params, Resolution, Router};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert(&Method::GET, "/users/:id", "getUser").unwrap();
//! router.insert(&Method::GET, "/files/*path", "serveFile").unwrap();
//!
//! let mut params = Params::new();
//! match router.resolve(&Method::GET, "/users/42", &MatchOptions::default(), &mut params) {
//!     Resolution::Matched(endpoint) => assert_eq!(*endpoint.value(), "getUser"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! assert_eq!(params.get("id"), Some("42"));
//! ```
//!
//! # Architecture
//!
//! Routes `/users`, `/users/:id`, `/user_groups` and `/files/*path` under one
//! method produce:
//!
//! ```text
//!                  (root)
//!                    │
//!                   "/"
//!              ┌─────┴──────┐
//!           "user"       "files/"
//!         ┌───┴────┐        │
//!        "s"    "_groups" "*path"
//!     [leaf]     [leaf]   [leaf]
//!        │
//!       "/"
//!        │
//!      ":id"
//!     [leaf]
//! ```

mod error;
mod methods;
mod node;
mod params;
mod path;
mod pattern;
mod router;
mod table;

pub use error::RouteError;
pub use methods::{fixed_slot, MethodRegistry, FIRST_CUSTOM_SLOT, FIXED_SLOTS};
pub use node::Endpoint;
pub use params::Params;
pub use path::{clean_path, toggle_trailing_slash};
pub use router::{MatchOptions, Resolution, Router};
pub use table::RouteTable;
