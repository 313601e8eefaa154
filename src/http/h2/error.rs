//! HTTP/2 error types
//!
//! This module defines error types for HTTP/2 operations, mapping to
//! the error codes defined in RFC 7540 Section 7.

use std::fmt;

/// HTTP/2 errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport error from the session layer
    #[error("HTTP error: {0}")]
    Http(#[from] crate::http::Error),

    /// Inbound bytes could not be decoded as a frame
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The preface/SETTINGS exchange did not complete
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Flow control error (RFC 7540 Section 7 - Error code 0x3)
    #[error("Flow control error: {0}")]
    FlowControl(String),

    /// Timeout waiting for the peer
    #[error("Timeout")]
    Timeout,

    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,
}

/// HTTP/2 error codes as defined in RFC 7540 Section 7
///
/// Codes outside the registered range are representable so that whatever a
/// peer puts on the wire can be carried and displayed unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    /// Graceful shutdown
    pub const NO_ERROR: ErrorCode = ErrorCode(0x0);
    /// Protocol error detected
    pub const PROTOCOL_ERROR: ErrorCode = ErrorCode(0x1);
    /// Implementation fault
    pub const INTERNAL_ERROR: ErrorCode = ErrorCode(0x2);
    /// Flow-control limits exceeded
    pub const FLOW_CONTROL_ERROR: ErrorCode = ErrorCode(0x3);
    /// Settings not acknowledged
    pub const SETTINGS_TIMEOUT: ErrorCode = ErrorCode(0x4);
    /// Frame received for closed stream
    pub const STREAM_CLOSED: ErrorCode = ErrorCode(0x5);
    /// Frame size incorrect
    pub const FRAME_SIZE_ERROR: ErrorCode = ErrorCode(0x6);
    /// Stream not processed
    pub const REFUSED_STREAM: ErrorCode = ErrorCode(0x7);
    /// Stream cancelled
    pub const CANCEL: ErrorCode = ErrorCode(0x8);
    /// Compression state not updated
    pub const COMPRESSION_ERROR: ErrorCode = ErrorCode(0x9);
    /// TCP connection error for CONNECT method
    pub const CONNECT_ERROR: ErrorCode = ErrorCode(0xa);
    /// Processing capacity exceeded
    pub const ENHANCE_YOUR_CALM: ErrorCode = ErrorCode(0xb);
    /// Negotiated TLS parameters not acceptable
    pub const INADEQUATE_SECURITY: ErrorCode = ErrorCode(0xc);
    /// Use HTTP/1.1 for the request
    pub const HTTP_1_1_REQUIRED: ErrorCode = ErrorCode(0xd);

    /// Convert error code to u32
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Create error code from u32
    pub fn from_u32(code: u32) -> Self {
        ErrorCode(code)
    }

    /// Whether the code is one of the registered RFC 7540 codes
    pub fn is_known(&self) -> bool {
        self.name().is_some()
    }

    /// Get error name
    pub fn name(&self) -> Option<&'static str> {
        let name = match self.0 {
            0x0 => "NO_ERROR",
            0x1 => "PROTOCOL_ERROR",
            0x2 => "INTERNAL_ERROR",
            0x3 => "FLOW_CONTROL_ERROR",
            0x4 => "SETTINGS_TIMEOUT",
            0x5 => "STREAM_CLOSED",
            0x6 => "FRAME_SIZE_ERROR",
            0x7 => "REFUSED_STREAM",
            0x8 => "CANCEL",
            0x9 => "COMPRESSION_ERROR",
            0xa => "CONNECT_ERROR",
            0xb => "ENHANCE_YOUR_CALM",
            0xc => "INADEQUATE_SECURITY",
            0xd => "HTTP_1_1_REQUIRED",
            _ => return None,
        };
        Some(name)
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        ErrorCode(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:x})", name, self.0),
            None => write!(f, "UNKNOWN (0x{:x})", self.0),
        }
    }
}

/// Whether an error affects the whole connection or a single stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Connection,
    Stream(u32),
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorScope::Connection => write!(f, "connection"),
            ErrorScope::Stream(id) => write!(f, "stream {}", id),
        }
    }
}

/// Reason a byte sequence could not be decoded as a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Fewer bytes are buffered than the frame header promises
    Truncated {
        /// Total bytes (header included) the frame needs
        needed: usize,
    },
    /// Payload length is wrong for the frame type
    FrameSize(String),
    /// Payload contents are inconsistent (padding overflow and the like)
    Protocol(String),
}

/// Frame decoding error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn truncated(needed: usize) -> Self {
        DecodeError {
            kind: DecodeErrorKind::Truncated { needed },
        }
    }

    pub fn frame_size(msg: impl Into<String>) -> Self {
        DecodeError {
            kind: DecodeErrorKind::FrameSize(msg.into()),
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        DecodeError {
            kind: DecodeErrorKind::Protocol(msg.into()),
        }
    }

    /// Truncation only means more bytes are needed
    pub fn is_truncated(&self) -> bool {
        matches!(self.kind, DecodeErrorKind::Truncated { .. })
    }

    /// RFC 7540 error code a receiver would report for this failure
    pub fn error_code(&self) -> ErrorCode {
        match self.kind {
            DecodeErrorKind::FrameSize(_) => ErrorCode::FRAME_SIZE_ERROR,
            DecodeErrorKind::Truncated { .. } | DecodeErrorKind::Protocol(_) => {
                ErrorCode::PROTOCOL_ERROR
            }
        }
    }
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::Truncated { needed } => write!(f, "truncated frame, need {} bytes", needed),
            DecodeErrorKind::FrameSize(msg) => write!(f, "frame size error: {}", msg),
            DecodeErrorKind::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

/// Result type for HTTP/2 operations
pub type Result<T> = std::result::Result<T, Error>;
