//! Unified error type.

use thiserror::Error;

/// The error type returned by plait's fallible operations.
///
/// Composing a chain never fails, and application-level failures (401, 429,
/// 500, etc.) are expressed as [`Response`](crate::Response) values. This
/// type surfaces infrastructure failures only: parsing a bind address,
/// binding to a port or accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address: {0}")]
    Addr(#[from] std::net::AddrParseError),
}
