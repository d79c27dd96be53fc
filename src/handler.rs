//! Handler trait and type erasure.
//!
//! # How handlers become one value
//!
//! Every layer of a composed chain is a handler of a *different* concrete
//! type: the terminal `async fn`, then one closure per middleware wrapped
//! around it. A middleware cannot name the type of the handler it wraps, so
//! every layer is erased behind [`BoxHandler`], a shared trait object.
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ BoxHandler::new(hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← heap-allocated wrapper
//!        ↓  held as BoxHandler(Arc<dyn ErasedHandler>)
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })  ← BoxFuture
//! ```
//!
//! Cloning a `BoxHandler` is one atomic increment. Each layer of a chain
//! costs one virtual call per request.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` lets tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// signature of the public `Handler` trait. External crates cannot usefully
/// interact with this trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

// ── BoxHandler ────────────────────────────────────────────────────────────────

/// A type-erased handler shared across concurrent requests.
///
/// This is what [`chain`](fn@crate::chain) returns and what every
/// [`Middleware`](crate::Middleware) receives as `next`. It is itself a
/// [`Handler`], so a composed chain can be composed again or handed to
/// [`Server::serve`](crate::Server::serve).
#[derive(Clone)]
pub struct BoxHandler(Arc<dyn ErasedHandler + Send + Sync + 'static>);

impl BoxHandler {
    /// Erases `handler`. Boxing a `BoxHandler` returns it unchanged.
    pub fn new(handler: impl Handler) -> Self {
        handler.into_boxed_handler()
    }

    /// Invokes the handler.
    ///
    /// The returned future owns everything it needs, so it can be spawned
    /// or awaited after `self` is dropped.
    pub fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }

    /// Whether both values share the same underlying handler.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for BoxHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxHandler").finish_non_exhaustive()
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid request handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` or closure with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and for [`BoxHandler`]. The trait is **sealed** (via the private `Sealed`
/// supertrait): custom request processing is written as a function or as a
/// [`Middleware`](crate::Middleware), never as a new `Handler` impl.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxHandler;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Handler` on their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxHandler {
        BoxHandler(Arc::new(FnHandler(self)))
    }
}

impl private::Sealed for BoxHandler {}

impl Handler for BoxHandler {
    fn into_boxed_handler(self) -> BoxHandler {
        self
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
