//! Middleware layer and the chain composer.
//!
//! A middleware turns one handler into another: it receives the handler it
//! wraps (`next`) and returns a new handler that runs its own logic around,
//! or instead of, a call to `next`. Cross-cutting concerns such as tracing,
//! authentication or rate limiting live in middlewares so the terminal
//! handler never knows about them.
//!
//! # Ordering
//!
//! [`chain`](fn@chain) takes the terminal handler and middlewares `[m1, m2, .., mn]`
//! and returns `m1(m2(..mn(handler)..))`:
//!
//! ```text
//! request  ──▶ m1 ──▶ m2 ──▶ … ──▶ mn ──▶ handler
//! response ◀── m1 ◀── m2 ◀── … ◀── mn ◀──┘
//! ```
//!
//! The first middleware listed is the outermost layer. It sees the request
//! first and the response last.
//!
//! # Short-circuiting
//!
//! A middleware is free not to call `next`, e.g. to reject an
//! unauthenticated request. Nothing inside it runs in that case.
//!
//! ```rust
//! use plait::{chain, middleware, BoxHandler, Request, Response};
//! use plait::http::StatusCode;
//!
//! async fn hello(_req: Request) -> &'static str { "hello" }
//!
//! let auth = middleware::from_fn(|req: Request, next: BoxHandler| async move {
//!     if req.header("authorization").is_none() {
//!         return Response::status(StatusCode::UNAUTHORIZED);
//!     }
//!     next.call(req).await
//! });
//!
//! let app = chain(hello, [auth]);
//! ```

mod from_fn;

use std::fmt;
use std::sync::Arc;

use crate::handler::{BoxHandler, Handler};

pub use from_fn::{FromFn, from_fn};

/// Transforms a handler into a handler that wraps it.
///
/// Implemented for every `Fn(BoxHandler) -> BoxHandler`, for [`FromFn`] and
/// for [`BoxMiddleware`]. Implement it on your own type when the middleware
/// carries configuration or shared state:
///
/// ```rust
/// use plait::{BoxHandler, Middleware, Request};
///
/// struct Tag(&'static str);
///
/// impl Middleware for Tag {
///     fn wrap(&self, next: BoxHandler) -> BoxHandler {
///         let tag = self.0;
///         BoxHandler::new(move |req: Request| {
///             let next = next.clone();
///             async move {
///                 let mut res = next.call(req).await;
///                 res.prepend_body(tag.as_bytes());
///                 res
///             }
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Returns a handler that wraps `next`.
    fn wrap(&self, next: BoxHandler) -> BoxHandler;

    /// Erases `self` so middlewares of different types fit one collection.
    fn boxed(self) -> BoxMiddleware
    where
        Self: Sized,
    {
        BoxMiddleware::new(self)
    }
}

impl<F> Middleware for F
where
    F: Fn(BoxHandler) -> BoxHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        self(next)
    }
}

/// A type-erased, cloneable [`Middleware`].
#[derive(Clone)]
pub struct BoxMiddleware(Arc<dyn Middleware>);

impl BoxMiddleware {
    pub fn new(middleware: impl Middleware) -> Self {
        Self(Arc::new(middleware))
    }
}

impl Middleware for BoxMiddleware {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        self.0.wrap(next)
    }

    fn boxed(self) -> BoxMiddleware {
        self
    }
}

impl fmt::Debug for BoxMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxMiddleware").finish_non_exhaustive()
    }
}

/// Wraps `handler` in `middlewares`, first one outermost.
///
/// With no middlewares the result is `handler` itself. The middlewares are
/// applied once, here. The returned handler does not reapply them per
/// request and keeps no reference to the sequence.
///
/// For middlewares of different types, box them ([`Middleware::boxed`]) or
/// use the [`chain!`](crate::chain!) macro.
///
/// ```rust
/// use plait::{chain, BoxHandler, Request};
///
/// fn tag(marker: &'static str) -> impl Fn(BoxHandler) -> BoxHandler + Send + Sync {
///     move |next: BoxHandler| {
///         BoxHandler::new(move |req: Request| {
///             let next = next.clone();
///             async move {
///                 let mut res = next.call(req).await;
///                 res.prepend_body(marker.as_bytes());
///                 res
///             }
///         })
///     }
/// }
///
/// # async fn run() {
/// let app = chain(|_req: Request| async { "H" }, [tag("1"), tag("2")]);
/// let res = app.call(Request::default()).await;
/// assert_eq!(res.body(), b"12H");
/// # }
/// ```
pub fn chain<H, I>(handler: H, middlewares: I) -> BoxHandler
where
    H: Handler,
    I: IntoIterator,
    I::Item: Middleware,
    I::IntoIter: DoubleEndedIterator,
{
    // Innermost first: the last middleware wraps the handler directly.
    middlewares
        .into_iter()
        .rev()
        .fold(BoxHandler::new(handler), |next, m| m.wrap(next))
}

/// Variadic [`chain`](fn@chain) for middlewares of different concrete types.
///
/// `chain!(h, m1, m2)` is `m1.wrap(m2.wrap(BoxHandler::new(h)))`.
/// `chain!(h)` is `BoxHandler::new(h)`.
///
/// ```rust
/// use plait::{chain, middleware, BoxHandler, Request};
///
/// let log = middleware::from_fn(|req: Request, next: BoxHandler| next.call(req));
/// let passthrough = |next: BoxHandler| next;
///
/// let app = chain!(|_req: Request| async { "ok" }, log, passthrough);
/// ```
#[macro_export]
macro_rules! chain {
    ($handler:expr $(,)?) => {
        $crate::BoxHandler::new($handler)
    };
    ($handler:expr, $outer:expr $(, $inner:expr)* $(,)?) => {
        $crate::Middleware::wrap(&$outer, $crate::chain!($handler $(, $inner)*))
    };
}
