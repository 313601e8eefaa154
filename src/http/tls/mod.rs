//! TLS support for HTTP/2 connections
//!
//! Targets served over `https` negotiate HTTP/2 through ALPN. This module
//! provides the client side of that handshake on top of OpenSSL.
//!
//! # Architecture
//!
//! The TLS implementation uses the session operations abstraction pattern:
//!
//! 1. `TlsConfig` defines TLS settings (versions, ALPN, SNI, verification)
//! 2. `TlsSessionOps` implements the `SessionOps` trait for encrypted I/O
//! 3. The HTTP/2 connection code remains unchanged - it transparently uses
//!    TLS operations
//!
//! # Examples
//!
//! ```no_run
//! use h2check::http::tls::{TlsConfig, TlsVersion};
//! use h2check::http::h2::Connection;
//! use std::net::TcpStream;
//!
//! let tls_config = TlsConfig::client()
//!     .version_range(TlsVersion::Tls12, TlsVersion::Tls13)
//!     .servername("example.com")
//!     .build()
//!     .unwrap();
//!
//! let tcp_stream = TcpStream::connect("example.com:443").unwrap();
//! let tls_session = tls_config.connect(tcp_stream).unwrap();
//! let conn = Connection::connect(tls_session).unwrap();
//! ```

pub mod config;
pub mod session;

pub use config::{ClientConfigBuilder, TlsConfig, TlsError, TlsVersion, ALPN_H2};
pub use session::TlsSessionOps;

/// Result type for TLS operations
pub type Result<T> = std::result::Result<T, TlsError>;
