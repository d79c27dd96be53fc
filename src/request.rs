//! Incoming request type.
//!
//! Besides the HTTP parts, every request carries an [`Extensions`] map, the
//! per-request context middlewares use to hand typed values to the layers
//! inside them.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Extensions, HeaderMap, Method, Uri};

/// An incoming request, with its body fully buffered.
#[derive(Debug, Default)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    extensions: Extensions,
}

impl Request {
    /// Builds a request by hand, e.g. to invoke a chain in-process.
    ///
    /// ```rust
    /// use plait::Request;
    /// use plait::http::{Method, Uri};
    ///
    /// let req = Request::new(Method::POST, Uri::from_static("/users"))
    ///     .with_header("content-type", "application/json")
    ///     .with_body(r#"{"name":"alice"}"#);
    /// assert_eq!(req.path(), "/users");
    /// ```
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri, ..Self::default() }
    }

    /// Appends a header.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `value` is not a valid header token. Meant for
    /// static, hand-written headers.
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Typed per-request context.
    pub fn extensions(&self) -> &Extensions { &self.extensions }

    /// Mutable typed per-request context. Insert values here in a middleware
    /// and read them back in any layer it wraps.
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            extensions: parts.extensions,
        }
    }
}
