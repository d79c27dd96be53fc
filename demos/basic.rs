//! Minimal plait example: one greeting handler behind four caller-written
//! middlewares.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/hello                            # 401
//!   curl -i -H 'authorization: Bearer demo' http://localhost:3000/hello
//!   for i in $(seq 12); do curl -s -o /dev/null -w '%{http_code}\n' \
//!       -H 'authorization: Bearer demo' http://localhost:3000/; done  # 429s

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use plait::http::StatusCode;
use plait::{BoxHandler, Middleware, Request, Response, Server, chain, middleware};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), plait::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = std::env::var("PLAIT_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());

    // Outermost first: every request is logged, then tagged, then
    // rate limited, then authenticated.
    let app = chain!(
        hello,
        middleware::from_fn(log_request),
        middleware::from_fn(request_id),
        RateLimit::new(10, Duration::from_secs(10)),
        middleware::from_fn(require_bearer)
    );

    Server::bind(&addr)?.serve(app).await
}

// GET anything → greeting that echoes the id the request-id layer attached.
async fn hello(req: Request) -> Response {
    let id = req.extensions().get::<RequestId>().map_or(0, |id| id.0);
    Response::text(format!("hello, request #{id}\n"))
}

// ── Logging ───────────────────────────────────────────────────────────────────

async fn log_request(req: Request, next: BoxHandler) -> Response {
    let method = req.method().clone();
    let path = req.path().to_owned();
    let started = Instant::now();

    let res = next.call(req).await;

    info!(
        %method,
        path = %path,
        status = res.status_code().as_u16(),
        latency_us = started.elapsed().as_micros() as u64,
        "request"
    );
    res
}

// ── Request id ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
struct RequestId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

async fn request_id(mut req: Request, next: BoxHandler) -> Response {
    let id = RequestId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    req.extensions_mut().insert(id);

    let mut res = next.call(req).await;
    if let Ok(value) = id.0.to_string().parse() {
        res.headers_mut().insert("x-request-id", value);
    }
    res
}

// ── Authentication (short-circuits) ───────────────────────────────────────────

async fn require_bearer(req: Request, next: BoxHandler) -> Response {
    match req.header("authorization") {
        Some(v) if v.starts_with("Bearer ") => next.call(req).await,
        _ => Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header("www-authenticate", "Bearer")
            .no_body(),
    }
}

// ── Rate limiting (stateful struct middleware) ────────────────────────────────

/// Fixed-window limiter shared by every request through the chain.
///
/// The window is keyed on nothing but time; a real limiter would key on the
/// peer address the server puts in the request extensions.
struct RateLimit {
    state: Arc<Window>,
}

struct Window {
    limit: u64,
    period: Duration,
    epoch: Instant,
    current: AtomicU64,
    count: AtomicU64,
}

impl RateLimit {
    fn new(limit: u64, period: Duration) -> Self {
        Self {
            state: Arc::new(Window {
                limit,
                period,
                epoch: Instant::now(),
                current: AtomicU64::new(0),
                count: AtomicU64::new(0),
            }),
        }
    }
}

impl Window {
    fn admit(&self) -> bool {
        let window = (self.epoch.elapsed().as_millis() / self.period.as_millis().max(1)) as u64;
        if self.current.swap(window, Ordering::AcqRel) != window {
            self.count.store(0, Ordering::Release);
        }
        self.count.fetch_add(1, Ordering::AcqRel) < self.limit
    }
}

impl Middleware for RateLimit {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let state = Arc::clone(&self.state);
        BoxHandler::new(move |req: Request| {
            let admitted = state.admit();
            let peer = req.extensions().get::<SocketAddr>().copied();
            let next = next.clone();
            async move {
                if !admitted {
                    info!(?peer, "rate limited");
                    return Response::status(StatusCode::TOO_MANY_REQUESTS);
                }
                next.call(req).await
            }
        })
    }
}
