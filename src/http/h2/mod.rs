//! HTTP/2 framing, header compression and a client connection for
//! conformance testing
//!
//! Nothing here tries to be a well-behaved HTTP/2 client. Frames are built
//! field by field, every field can be overridden (lengths, flags, reserved
//! bits, padding) and the encoder never refuses a frame, so a test can put
//! exactly the bytes it wants on the wire and observe how a server reacts.
//!
//! # Architecture
//!
//! - [`frames`]: frame model and one builder per frame type
//! - [`codec`]: bit-exact RFC 7540 §4.1 encoding and decoding
//! - [`compression`]: deterministic HPACK encoder with an inspectable
//!   dynamic table
//! - [`connection`]: handshake, read loop and the event stream
//! - [`stream`], [`flow_control`], [`settings`]: per-connection bookkeeping
//!
//! # Example
//!
//! ```no_run
//! use h2check::http::h2::{Connection, Event, GoawayFrame, ErrorCode, PingFrame};
//! use h2check::http::FdSessionOps;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = FdSessionOps::connect("127.0.0.1:8080", Some(Duration::from_secs(2)))?;
//! let mut conn = Connection::connect(transport)?;
//!
//! conn.send(&PingFrame::new().data(*b"h2check!").build())?;
//! let event = conn.wait_for(|e| e.frame().is_some_and(|f| f.is_ack()))?;
//! println!("{:?}", event);
//!
//! conn.send(&GoawayFrame::new(ErrorCode::NO_ERROR).debug_data("bye").build())?;
//! while let Ok(event) = conn.next_event() {
//!     if let Event::Close { after_error } = event {
//!         println!("closed (after_error: {})", after_error);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod compression;
pub mod connection;
pub mod error;
pub mod flow_control;
pub mod frames;
pub mod settings;
pub mod stream;

pub use codec::{FrameCodec, FrameHeader, FRAME_HEADER_SIZE};
pub use compression::{DynamicTable, HeaderCompressionContext, HeaderField, HeaderList};
pub use connection::{
    Connection, ConnectionBuilder, ConnectionState, ErrorOrigin, Event, ProtocolError,
};
pub use error::{DecodeError, DecodeErrorKind, Error, ErrorCode, ErrorScope, Result};
pub use frames::{
    split_header_block, header_block_frames, ContinuationFrame, DataFrame, Frame, FrameFlags,
    FrameType, GoawayFrame, HeadersFrame, Padding, Payload, PingFrame, PrioritySpec,
    PriorityFrame, PushPromiseFrame, RawFrame, RstStreamFrame, SettingsFrame,
    WindowUpdateFrame,
};
pub use settings::{Setting, Settings, SettingsParameter};
pub use stream::{StreamId, StreamState};

/// HTTP/2 connection preface that must be sent by clients
///
/// From RFC 7540 Section 3.5:
/// "PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n"
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Maximum stream ID value (2^31 - 1)
pub const MAX_STREAM_ID: u32 = 0x7FFFFFFF;

/// Stream ID 0 (connection-level)
pub const CONNECTION_STREAM_ID: u32 = 0;
