//! # plait
//!
//! Compose async request handlers with ordered middleware chains.
//!
//! ## The contract
//!
//! One operation: [`chain`](fn@chain) takes a terminal [`Handler`] and an ordered list
//! of [`Middleware`]s and returns a single handler with the first middleware
//! outermost. Nothing else happens at composition time: no I/O, no logging,
//! no validation, no global registry.
//!
//! What plait intentionally does not do:
//!
//! - **Routing**: serve one handler per path with whatever router you like
//! - **Built-in middlewares**: logging, auth, CORS and rate limiting are yours
//! - **Recovery**: a panic inside a layer propagates untouched
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use plait::{chain, middleware, BoxHandler, Request, Response, Server};
//! use plait::http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), plait::Error> {
//!     let require_token = middleware::from_fn(|req: Request, next: BoxHandler| async move {
//!         match req.header("authorization") {
//!             Some(_) => next.call(req).await,
//!             None => Response::status(StatusCode::UNAUTHORIZED),
//!         }
//!     });
//!
//!     let app = chain(hello, [require_token]);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn hello(req: Request) -> Response {
//!     Response::text(format!("hello from {}", req.path()))
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod server;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, BoxHandler, Handler};
pub use middleware::{BoxMiddleware, Middleware, chain};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use server::Server;

pub use http;
