//! Middleware from an async function.

use std::future::Future;
use std::sync::Arc;

use crate::handler::BoxHandler;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::IntoResponse;

/// Builds a [`Middleware`] from an async function of the request and the
/// next handler.
///
/// ```rust
/// use plait::{middleware, BoxHandler, Request};
///
/// let stamp = middleware::from_fn(|req: Request, next: BoxHandler| async move {
///     let mut res = next.call(req).await;
///     res.headers_mut().insert("x-served-by", "plait".parse().unwrap());
///     res
/// });
/// ```
///
/// `f` is shared by every handler this middleware wraps and by every
/// request through them. It runs once per request.
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, BoxHandler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn(Arc::new(f))
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F> Clone for FromFn<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, BoxHandler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let f = Arc::clone(&self.0);
        BoxHandler::new(move |req: Request| {
            let fut = (*f)(req, next.clone());
            async move { fut.await.into_response() }
        })
    }
}
