//! Transport layer for h2check
//!
//! This module provides the byte-stream transports HTTP/2 connections run on
//! and the HTTP/2 protocol machinery itself.
//!
//! # Architecture
//!
//! The transport uses a session operations abstraction pattern that allows
//! seamless switching between plain TCP and TLS connections:
//!
//! - `SessionOps` trait defines operations (poll, read, write, flush, close)
//! - `HttpSession` wraps a `SessionOps` implementation and applies an optional
//!   read timeout
//! - All HTTP/2 code is transparent to the underlying transport
//!
//! # Examples
//!
//! ```no_run
//! use h2check::http::h2::{Connection, HeaderCompressionContext, HeaderField, HeadersFrame};
//! use h2check::http::session::FdSessionOps;
//!
//! let transport = FdSessionOps::connect("127.0.0.1:8080", None).unwrap();
//! let mut conn = Connection::connect(transport).unwrap();
//!
//! let mut context = HeaderCompressionContext::new();
//! let fragment = context.compress(&[
//!     HeaderField::new(":method", "GET"),
//!     HeaderField::new(":scheme", "http"),
//!     HeaderField::new(":path", "/"),
//!     HeaderField::new(":authority", "127.0.0.1:8080"),
//! ]);
//!
//! let frame = HeadersFrame::new(fragment).end_headers().end_stream().build();
//! conn.send(&frame).unwrap();
//!
//! let event = conn.next_event().unwrap();
//! println!("{:?}", event);
//! ```

pub mod h2;
pub mod session;
pub mod tls;

pub use session::{FdSessionOps, HttpSession, PollEvents, SessionOps};

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] tls::TlsError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Whether this error means the peer went away
    ///
    /// EOF, resets and broken pipes are reported as a closed connection
    /// rather than a failure.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::ConnectionClosed => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
