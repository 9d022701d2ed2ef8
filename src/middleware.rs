// Middleware chain primitive: continuation-passing request handlers

use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::trace;

/// The continuation handed to a middleware. Calling it passes control to
/// the next handler in the chain; not calling it short-circuits everything
/// downstream.
pub type Next = Box<
    dyn FnOnce(HttpRequest) -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
        + Send,
>;

/// A request handler in continuation-passing style. Route method handlers,
/// scoped middleware, and the router itself all share this shape, so any
/// of them can slot into an outer chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error>;
}

/// Build a [`Middleware`] from an async closure.
///
/// ```
/// use trellis::{middleware_fn, HttpResponse};
///
/// let handler = middleware_fn(|_req, _next| async {
///     Ok(HttpResponse::ok().with_body(b"hello".to_vec()))
/// });
/// # let _ = handler;
/// ```
pub fn middleware_fn<F, Fut>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(FnMiddleware { f })
}

struct FnMiddleware<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        (self.f)(req, next).await
    }
}

/// An ordered sequence of middleware composed into one callable.
///
/// Each element receives a continuation that advances to the next element;
/// the final continuation is whatever terminal the caller supplies. A
/// middleware that returns without invoking its continuation stops the
/// chain there, and the terminal never runs.
#[derive(Clone)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            middlewares: Arc::new(middlewares),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Run the chain, ending in `terminal` if every element continues.
    pub async fn run(&self, req: HttpRequest, terminal: Next) -> Result<HttpResponse, Error> {
        self.execute_from(0, req, terminal).await
    }

    fn execute_from(
        &self,
        index: usize,
        req: HttpRequest,
        terminal: Next,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>> {
        if index >= self.middlewares.len() {
            trace!("middleware chain complete, invoking terminal");
            return terminal(req);
        }
        let middleware = self.middlewares[index].clone();
        let chain = self.clone();
        trace!(middleware_index = index, "executing middleware");
        Box::pin(async move {
            middleware
                .handle(
                    req,
                    Box::new(move |req| chain.execute_from(index + 1, req, terminal)),
                )
                .await
        })
    }
}

// A composed chain is itself a middleware, so directory scopes compose
// into a single registrable handler.
#[async_trait]
impl Middleware for MiddlewareChain {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        self.run(req, next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn terminal_ok(body: &'static [u8]) -> Next {
        Box::new(move |_req| Box::pin(async move { Ok(HttpResponse::ok().with_body(body.to_vec())) }))
    }

    #[tokio::test]
    async fn test_empty_chain_invokes_terminal() {
        let chain = MiddlewareChain::new(Vec::new());
        let req = HttpRequest::new("GET".to_string(), "/".to_string());
        let resp = chain.run(req, terminal_ok(b"end")).await.unwrap();
        assert_eq!(resp.body, b"end");
    }

    #[tokio::test]
    async fn test_chain_runs_in_declared_order() {
        // Each middleware stamps a header before continuing.
        let first = middleware_fn(|mut req: HttpRequest, next: Next| async move {
            req.headers.insert("trace".to_string(), "a".to_string());
            next(req).await
        });
        let second = middleware_fn(|mut req: HttpRequest, next: Next| async move {
            let t = req.headers.get("trace").cloned().unwrap_or_default();
            req.headers.insert("trace".to_string(), t + "b");
            next(req).await
        });

        let chain = MiddlewareChain::new(vec![first, second]);
        let req = HttpRequest::new("GET".to_string(), "/".to_string());
        let resp = chain
            .run(
                req,
                Box::new(|req| {
                    Box::pin(async move {
                        let trace = req.headers.get("trace").cloned().unwrap_or_default();
                        Ok(HttpResponse::ok().with_body(trace.into_bytes()))
                    })
                }),
            )
            .await
            .unwrap();
        assert_eq!(resp.body, b"ab");
    }

    #[tokio::test]
    async fn test_short_circuit_skips_terminal() {
        let terminal_hits = Arc::new(AtomicUsize::new(0));
        let hits = terminal_hits.clone();

        let gate = middleware_fn(|_req, _next| async {
            Ok(HttpResponse::new(403).with_body(b"denied".to_vec()))
        });
        let chain = MiddlewareChain::new(vec![gate]);
        let req = HttpRequest::new("GET".to_string(), "/".to_string());
        let resp = chain
            .run(
                req,
                Box::new(move |_req| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Box::pin(async { Ok(HttpResponse::ok()) })
                }),
            )
            .await
            .unwrap();
        assert_eq!(resp.status, 403);
        assert_eq!(terminal_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_propagates_unmodified() {
        let failing = middleware_fn(|_req, _next| async {
            Err::<HttpResponse, _>(Error::Handler("boom".to_string()))
        });
        let chain = MiddlewareChain::new(vec![failing]);
        let req = HttpRequest::new("GET".to_string(), "/".to_string());
        let err = chain.run(req, terminal_ok(b"")).await.unwrap_err();
        assert!(matches!(err, Error::Handler(msg) if msg == "boom"));
    }
}
