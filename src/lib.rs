// Filesystem-convention routing for async HTTP services
//
// A directory tree defines the URL space: each file under the routes root
// becomes one route, its path (minus extension and `index` segments) is
// the URL pattern, and its registered module supplies per-method handlers,
// a precedence weight, and directory-scoped middleware. The built router
// is itself a middleware: it dispatches matching requests and hands
// everything else to its outer continuation.

pub mod config;
pub mod discover;
pub mod error;
pub mod http;
pub mod manifest;
pub mod middleware;
pub mod pattern;
pub mod router;
pub mod scope;

// Re-export commonly used types
pub use config::RouterConfig;
pub use discover::{derive_uri_path, scan_route_files};
pub use error::Error;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use manifest::{ModuleLoader, RouteManifest, RouteModule};
pub use middleware::{middleware_fn, Middleware, MiddlewareChain, Next};
pub use pattern::PathPattern;
pub use router::{RouteRecord, Router};
pub use scope::{ScopeIndex, ScopePhase};
