use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use plait::http::StatusCode;
use plait::{BoxHandler, Middleware, Request, Response, chain, middleware};

/// Shared output the layers write into, in call order.
#[derive(Clone, Default)]
struct Transcript(Arc<Mutex<String>>);

impl Transcript {
    fn write(&self, s: &str) {
        self.0.lock().unwrap().push_str(s);
    }

    fn contents(&self) -> String {
        self.0.lock().unwrap().clone()
    }
}

/// Terminal handler that writes `marker` and answers with everything
/// written so far.
fn terminal(
    out: Transcript,
    marker: &'static str,
) -> impl Fn(Request) -> std::future::Ready<Response> + Send + Sync + 'static {
    move |_req: Request| {
        out.write(marker);
        std::future::ready(Response::text(out.contents()))
    }
}

/// Middleware that writes `marker` and then calls the next handler.
fn write_then_next(out: Transcript, marker: &'static str) -> impl Middleware + Clone {
    middleware::from_fn(move |req: Request, next: BoxHandler| {
        out.write(marker);
        next.call(req)
    })
}

fn body(res: &Response) -> &str {
    std::str::from_utf8(res.body()).unwrap()
}

#[tokio::test]
async fn no_middleware_behaves_like_the_handler() {
    let out = Transcript::default();
    let app = chain(terminal(out.clone(), "Handler"), Vec::<plait::BoxMiddleware>::new());

    let res = app.call(Request::default()).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body(&res), "Handler");
}

#[tokio::test]
async fn no_middleware_returns_the_same_box_handler() {
    let handler = BoxHandler::new(|_req: Request| async { "Handler" });
    let app = chain(handler.clone(), Vec::<plait::BoxMiddleware>::new());
    assert!(app.ptr_eq(&handler));
}

#[tokio::test]
async fn single_middleware_runs_before_the_handler() {
    let out = Transcript::default();
    let app = chain(
        terminal(out.clone(), "Handler"),
        [write_then_next(out.clone(), "Middleware --> ")],
    );

    let res = app.call(Request::default()).await;

    assert_eq!(body(&res), "Middleware --> Handler");
}

#[tokio::test]
async fn first_middleware_is_outermost() {
    let out = Transcript::default();
    let app = chain(
        terminal(out.clone(), "Handler"),
        [
            write_then_next(out.clone(), "First Middleware -->"),
            write_then_next(out.clone(), "Second Middleware -->"),
        ],
    );

    let res = app.call(Request::default()).await;

    assert_eq!(body(&res), "First Middleware -->Second Middleware -->Handler");
}

#[tokio::test]
async fn order_holds_for_many_layers() {
    let out = Transcript::default();
    let markers = ["a", "b", "c", "d", "e", "f"];
    let layers: Vec<_> = markers.into_iter().map(|m| write_then_next(out.clone(), m)).collect();
    let app = chain(terminal(out.clone(), "H"), layers);

    app.call(Request::default()).await;

    assert_eq!(out.contents(), "abcdefH");
}

#[tokio::test]
async fn chain_matches_manual_nesting() {
    let m1 = |next: BoxHandler| {
        BoxHandler::new(move |req: Request| {
            let next = next.clone();
            async move {
                let mut res = next.call(req).await;
                res.prepend_body(b"m1 ");
                res
            }
        })
    };
    let m2 = |next: BoxHandler| {
        BoxHandler::new(move |req: Request| {
            let next = next.clone();
            async move {
                let mut res = next.call(req).await;
                res.prepend_body(b"m2 ");
                res
            }
        })
    };
    let h = |_req: Request| async { "H" };

    let composed = chain(h, [m1.boxed(), m2.boxed()]);
    let nested = chain(chain(h, [m2]), [m1]);
    let manual = m1(m2(BoxHandler::new(h)));

    let composed = composed.call(Request::default()).await;
    let nested = nested.call(Request::default()).await;
    let manual = manual.call(Request::default()).await;

    assert_eq!(body(&composed), "m1 m2 H");
    assert_eq!(body(&nested), body(&composed));
    assert_eq!(body(&manual), body(&composed));
}

#[tokio::test]
async fn outer_layer_sees_the_response_last() {
    let out = Transcript::default();
    let around = |name: &'static str| {
        let out = out.clone();
        middleware::from_fn(move |req: Request, next: BoxHandler| {
            let out = out.clone();
            async move {
                out.write(&format!("{name}>"));
                let res = next.call(req).await;
                out.write(&format!("<{name}"));
                res
            }
        })
    };
    let app = chain(terminal(out.clone(), "H"), [around("1"), around("2")]);

    app.call(Request::default()).await;

    assert_eq!(out.contents(), "1>2>H<2<1");
}

#[tokio::test]
async fn short_circuit_skips_everything_inside() {
    let out = Transcript::default();
    let reject = {
        let out = out.clone();
        middleware::from_fn(move |_req: Request, _next: BoxHandler| {
            out.write("rejected");
            std::future::ready(Response::status(StatusCode::UNAUTHORIZED))
        })
    };
    let app = chain!(
        terminal(out.clone(), "Handler"),
        reject,
        write_then_next(out.clone(), "second")
    );

    let res = app.call(Request::default()).await;

    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert!(res.body().is_empty());
    assert_eq!(out.contents(), "rejected");
}

#[derive(Clone, Debug, PartialEq)]
struct First(&'static str);

#[derive(Clone, Debug, PartialEq)]
struct Second(&'static str);

#[tokio::test]
async fn context_values_reach_the_terminal_handler() {
    let attach_first = middleware::from_fn(|mut req: Request, next: BoxHandler| {
        req.extensions_mut().insert(First("M1 >> "));
        next.call(req)
    });
    let attach_second = middleware::from_fn(|mut req: Request, next: BoxHandler| {
        req.extensions_mut().insert(Second("M2 >> "));
        next.call(req)
    });
    let handler = |req: Request| async move {
        let first = req.extensions().get::<First>().map_or("", |v| v.0);
        let second = req.extensions().get::<Second>().map_or("", |v| v.0);
        format!("{first}{second}Handler")
    };

    let app = chain!(handler, attach_first, attach_second);
    let res = app.call(Request::default()).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body(&res), "M1 >> M2 >> Handler");
}

#[tokio::test]
async fn inner_layer_overrides_outer_context_of_the_same_type() {
    let set = |value: &'static str| {
        middleware::from_fn(move |mut req: Request, next: BoxHandler| {
            req.extensions_mut().insert(First(value));
            next.call(req)
        })
    };
    let handler = |req: Request| async move {
        req.extensions().get::<First>().map_or("none", |v| v.0)
    };

    let res = chain(handler, [set("outer"), set("inner")]).call(Request::default()).await;

    assert_eq!(body(&res), "inner");
}

#[tokio::test]
async fn error_responses_pass_through_unchanged() {
    let passthrough = middleware::from_fn(|req: Request, next: BoxHandler| next.call(req));
    let failing = |_req: Request| async {
        Err::<&'static str, _>((StatusCode::SERVICE_UNAVAILABLE, "database unreachable"))
    };

    let res = chain(failing, [passthrough.clone(), passthrough]).call(Request::default()).await;

    assert_eq!(res.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body(&res), "database unreachable");
}

#[tokio::test]
async fn panics_propagate_through_the_chain() {
    let passthrough = middleware::from_fn(|req: Request, next: BoxHandler| next.call(req));
    async fn boom(_req: Request) -> Response {
        panic!("terminal handler failed")
    }
    let app = chain(boom, [passthrough]);

    let joined = tokio::spawn(async move { app.call(Request::default()).await }).await;

    let err = joined.unwrap_err();
    assert!(err.is_panic());
    let payload = err.into_panic();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"terminal handler failed"));
}

#[test]
fn composition_never_invokes_any_layer() {
    let wrapped = Arc::new(AtomicUsize::new(0));
    let invoked = Arc::new(AtomicUsize::new(0));
    let counting = {
        let wrapped = Arc::clone(&wrapped);
        let invoked = Arc::clone(&invoked);
        move |next: BoxHandler| {
            wrapped.fetch_add(1, Ordering::SeqCst);
            let invoked = Arc::clone(&invoked);
            BoxHandler::new(move |req: Request| {
                invoked.fetch_add(1, Ordering::SeqCst);
                next.call(req)
            })
        }
    };

    let _app = chain(|_req: Request| async { "H" }, [counting]);

    assert_eq!(wrapped.load(Ordering::SeqCst), 1);
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn composed_handler_is_reusable() {
    let calls = Arc::new(AtomicUsize::new(0));
    let count = {
        let calls = Arc::clone(&calls);
        middleware::from_fn(move |req: Request, next: BoxHandler| {
            calls.fetch_add(1, Ordering::SeqCst);
            next.call(req)
        })
    };
    let app = chain(|req: Request| async move { req.path().to_owned() }, [count]);

    for path in ["/a", "/b", "/c"] {
        let req = Request::new(plait::http::Method::GET, plait::http::Uri::from_static(path));
        let res = app.call(req).await;
        assert_eq!(body(&res), path);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_share_one_chain() {
    let seen = Arc::new(AtomicUsize::new(0));
    let count = {
        let seen = Arc::clone(&seen);
        middleware::from_fn(move |req: Request, next: BoxHandler| {
            seen.fetch_add(1, Ordering::Relaxed);
            next.call(req)
        })
    };
    let app = chain(
        |_req: Request| async {
            tokio::task::yield_now().await;
            "ok"
        },
        [count],
    );

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..64 {
        let app = app.clone();
        tasks.spawn(async move { app.call(Request::default()).await });
    }
    while let Some(res) = tasks.join_next().await {
        assert_eq!(res.unwrap().body(), b"ok");
    }

    assert_eq!(seen.load(Ordering::Relaxed), 64);
}

#[tokio::test]
async fn struct_middleware_and_closures_mix_in_one_chain() {
    struct Header(&'static str, &'static str);

    impl Middleware for Header {
        fn wrap(&self, next: BoxHandler) -> BoxHandler {
            let (name, value) = (self.0, self.1);
            BoxHandler::new(move |req: Request| {
                let next = next.clone();
                async move {
                    let mut res = next.call(req).await;
                    res.headers_mut().insert(name, value.parse().unwrap());
                    res
                }
            })
        }
    }

    let identity = |next: BoxHandler| next;
    let layers = vec![
        Header("x-outer", "1").boxed(),
        identity.boxed(),
        middleware::from_fn(|req: Request, next: BoxHandler| next.call(req)).boxed(),
        Header("x-inner", "2").boxed(),
    ];

    let res = chain(|_req: Request| async { "ok" }, layers).call(Request::default()).await;

    assert_eq!(res.header("x-outer"), Some("1"));
    assert_eq!(res.header("x-inner"), Some("2"));
    assert_eq!(body(&res), "ok");
}

#[tokio::test]
async fn macro_and_function_agree() {
    let out_fn = Transcript::default();
    let out_macro = Transcript::default();

    let by_fn = chain(
        terminal(out_fn.clone(), "H"),
        [write_then_next(out_fn.clone(), "1"), write_then_next(out_fn.clone(), "2")],
    );
    let by_macro = chain!(
        terminal(out_macro.clone(), "H"),
        write_then_next(out_macro.clone(), "1"),
        write_then_next(out_macro.clone(), "2")
    );

    by_fn.call(Request::default()).await;
    by_macro.call(Request::default()).await;

    assert_eq!(out_fn.contents(), "12H");
    assert_eq!(out_macro.contents(), out_fn.contents());
}

#[tokio::test]
async fn macro_with_only_a_handler_is_the_handler() {
    let res = chain!(|_req: Request| async { "Handler" }).call(Request::default()).await;
    assert_eq!(body(&res), "Handler");
}

#[tokio::test]
async fn macro_accepts_a_trailing_comma() {
    let out = Transcript::default();
    let app = chain!(
        terminal(out.clone(), "H"),
        write_then_next(out.clone(), "1"),
        write_then_next(out.clone(), "2"),
    );
    let bare = chain!(|_req: Request| async { "Handler" },);

    app.call(Request::default()).await;
    let res = bare.call(Request::default()).await;

    assert_eq!(out.contents(), "12H");
    assert_eq!(body(&res), "Handler");
}
