//! TLS configuration
//!
//! This module provides the client-side TLS configuration used to reach
//! `https` targets. HTTP/2 over TLS is negotiated with ALPN, so the builder
//! offers `h2` unless told otherwise.

use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslVerifyMode, SslVersion};

/// ALPN protocol identifier for HTTP/2 over TLS
pub const ALPN_H2: &str = "h2";

/// TLS version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// TLS 1.2 (the minimum HTTP/2 allows)
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    fn to_openssl_version(self) -> SslVersion {
        match self {
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }
}

/// TLS errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("ALPN negotiation failed: expected h2, got {0:?}")]
    AlpnFailed(Option<Vec<u8>>),
}

/// TLS configuration (immutable after building)
#[derive(Clone)]
pub struct TlsConfig {
    pub(crate) ctx: SslContext,
    pub(crate) servername: Option<String>,
    pub(crate) require_h2: bool,
}

impl TlsConfig {
    /// Create a new client configuration builder
    pub fn client() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Connect to a server with TLS
    pub fn connect(&self, stream: std::net::TcpStream) -> Result<super::TlsSessionOps, TlsError> {
        super::session::TlsSessionOps::connect(stream, self.clone())
    }

    /// SNI name sent during the handshake
    pub fn servername(&self) -> Option<&str> {
        self.servername.as_deref()
    }
}

/// Client configuration builder
pub struct ClientConfigBuilder {
    min_version: Option<TlsVersion>,
    max_version: Option<TlsVersion>,
    alpn: Vec<String>,
    servername: Option<String>,
    verify_peer: bool,
    require_h2: bool,
}

impl ClientConfigBuilder {
    fn new() -> Self {
        ClientConfigBuilder {
            min_version: Some(TlsVersion::Tls12),
            max_version: None,
            alpn: vec![ALPN_H2.to_string()],
            servername: None,
            // Targets under test usually present self-signed certificates
            verify_peer: false,
            require_h2: true,
        }
    }

    /// Set TLS version range
    pub fn version_range(mut self, min: TlsVersion, max: TlsVersion) -> Self {
        self.min_version = Some(min);
        self.max_version = Some(max);
        self
    }

    /// Replace the offered ALPN protocols
    pub fn alpn(mut self, protocols: &[&str]) -> Self {
        self.alpn = protocols.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Fail the handshake unless the server selects `h2`
    pub fn require_h2(mut self, require: bool) -> Self {
        self.require_h2 = require;
        self
    }

    /// Set SNI servername
    pub fn servername(mut self, name: impl Into<String>) -> Self {
        self.servername = Some(name.into());
        self
    }

    /// Enable/disable peer certificate verification
    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    /// Build the TLS configuration
    pub fn build(self) -> Result<TlsConfig, TlsError> {
        let mut ctx_builder = SslContextBuilder::new(SslMethod::tls_client())?;

        ctx_builder.set_min_proto_version(self.min_version.map(|v| v.to_openssl_version()))?;
        ctx_builder.set_max_proto_version(self.max_version.map(|v| v.to_openssl_version()))?;

        if !self.alpn.is_empty() {
            ctx_builder.set_alpn_protos(&encode_alpn(&self.alpn)?)?;
        } else if self.require_h2 {
            return Err(TlsError::InvalidConfig(
                "h2 is required but no ALPN protocol is offered".to_string(),
            ));
        }

        ctx_builder.set_verify(if self.verify_peer {
            SslVerifyMode::PEER
        } else {
            SslVerifyMode::NONE
        });

        Ok(TlsConfig {
            ctx: ctx_builder.build(),
            servername: self.servername,
            require_h2: self.require_h2,
        })
    }
}

/// Encode ALPN protocols in wire format (length-prefixed)
fn encode_alpn(protocols: &[String]) -> Result<Vec<u8>, TlsError> {
    let mut alpn_bytes = Vec::new();
    for proto in protocols {
        let len = u8::try_from(proto.len())
            .map_err(|_| TlsError::InvalidConfig(format!("ALPN protocol too long: {}", proto)))?;
        if len == 0 {
            return Err(TlsError::InvalidConfig("empty ALPN protocol".to_string()));
        }
        alpn_bytes.push(len);
        alpn_bytes.extend_from_slice(proto.as_bytes());
    }
    Ok(alpn_bytes)
}
