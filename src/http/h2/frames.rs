//! HTTP/2 frame types and builders
//!
//! This module defines the frame types specified in RFC 7540 Section 6.
//!
//! A [`Frame`] is an immutable value: a stream id, the raw flag octet, an
//! optional declared-length override and a payload keyed by frame type.
//! Frames are put together with one builder per frame type. Builders apply
//! no validation at all, so zero stream ids on stream frames, undefined flag
//! bits and lengths that disagree with the payload are all representable.

use super::codec::FrameCodec;
use super::error::ErrorCode;
use super::settings::{Setting, Settings, SettingsParameter};
use bytes::Bytes;
use std::fmt;

/// HTTP/2 frame types (RFC 7540 Section 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// DATA frame (0x0) - Conveys arbitrary, variable-length sequences of octets
    Data = 0x0,
    /// HEADERS frame (0x1) - Opens a stream and carries header block fragment
    Headers = 0x1,
    /// PRIORITY frame (0x2) - Specifies sender-advised priority of a stream
    Priority = 0x2,
    /// RST_STREAM frame (0x3) - Allows immediate termination of a stream
    RstStream = 0x3,
    /// SETTINGS frame (0x4) - Conveys configuration parameters
    Settings = 0x4,
    /// PUSH_PROMISE frame (0x5) - Used to notify peer of intent to initiate stream
    PushPromise = 0x5,
    /// PING frame (0x6) - Mechanism for measuring round-trip time
    Ping = 0x6,
    /// GOAWAY frame (0x7) - Initiates shutdown of connection
    Goaway = 0x7,
    /// WINDOW_UPDATE frame (0x8) - Implements flow control
    WindowUpdate = 0x8,
    /// CONTINUATION frame (0x9) - Continues sequence of header block fragments
    Continuation = 0x9,
}

impl FrameType {
    /// Convert frame type to u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create frame type from u8
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x0 => Some(FrameType::Data),
            0x1 => Some(FrameType::Headers),
            0x2 => Some(FrameType::Priority),
            0x3 => Some(FrameType::RstStream),
            0x4 => Some(FrameType::Settings),
            0x5 => Some(FrameType::PushPromise),
            0x6 => Some(FrameType::Ping),
            0x7 => Some(FrameType::Goaway),
            0x8 => Some(FrameType::WindowUpdate),
            0x9 => Some(FrameType::Continuation),
            _ => None,
        }
    }

    /// Get frame type name
    pub fn name(&self) -> &'static str {
        match self {
            FrameType::Data => "DATA",
            FrameType::Headers => "HEADERS",
            FrameType::Priority => "PRIORITY",
            FrameType::RstStream => "RST_STREAM",
            FrameType::Settings => "SETTINGS",
            FrameType::PushPromise => "PUSH_PROMISE",
            FrameType::Ping => "PING",
            FrameType::Goaway => "GOAWAY",
            FrameType::WindowUpdate => "WINDOW_UPDATE",
            FrameType::Continuation => "CONTINUATION",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u8())
    }
}

/// HTTP/2 frame flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// Create empty flags
    pub fn empty() -> Self {
        FrameFlags(0)
    }

    /// Create from u8
    pub fn from_u8(flags: u8) -> Self {
        FrameFlags(flags)
    }

    /// Get raw u8 value
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Set a flag
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Check if a flag is set
    pub fn is_set(&self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    // Common flags

    /// END_STREAM flag (0x1)
    pub const END_STREAM: u8 = 0x1;

    /// ACK flag (0x1) - used for SETTINGS and PING
    pub const ACK: u8 = 0x1;

    /// END_HEADERS flag (0x4)
    pub const END_HEADERS: u8 = 0x4;

    /// PADDED flag (0x8)
    pub const PADDED: u8 = 0x8;

    /// PRIORITY flag (0x20)
    pub const PRIORITY: u8 = 0x20;

    /// Check if END_STREAM is set
    pub fn is_end_stream(&self) -> bool {
        self.is_set(Self::END_STREAM)
    }

    /// Check if ACK is set
    pub fn is_ack(&self) -> bool {
        self.is_set(Self::ACK)
    }

    /// Check if END_HEADERS is set
    pub fn is_end_headers(&self) -> bool {
        self.is_set(Self::END_HEADERS)
    }

    /// Check if PADDED is set
    pub fn is_padded(&self) -> bool {
        self.is_set(Self::PADDED)
    }

    /// Check if PRIORITY is set
    pub fn is_priority(&self) -> bool {
        self.is_set(Self::PRIORITY)
    }
}

/// Padding of a DATA, HEADERS or PUSH_PROMISE frame
///
/// `pad_length` is the octet written into the Pad Length field and
/// `padding_len` the number of zero octets actually appended. They agree
/// unless a frame is built to lie about its padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub pad_length: u8,
    pub padding_len: usize,
}

impl Padding {
    /// Consistent padding of `len` octets
    pub fn new(len: u8) -> Self {
        Padding {
            pad_length: len,
            padding_len: len as usize,
        }
    }

    /// Declare `declared` octets of padding but write `actual`
    pub fn declared(declared: u8, actual: usize) -> Self {
        Padding {
            pad_length: declared,
            padding_len: actual,
        }
    }

    /// Octets this padding adds to the payload (Pad Length field included)
    pub fn wire_len(&self) -> usize {
        1 + self.padding_len
    }
}

/// Priority specification (RFC 7540 Section 6.3)
///
/// `weight` is the octet as it appears on the wire, one less than the
/// effective weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrioritySpec {
    /// Stream dependency
    pub stream_dependency: u32,
    /// Exclusive flag
    pub exclusive: bool,
    /// Weight octet (effective weight minus one)
    pub weight: u8,
}

impl PrioritySpec {
    /// Create a new priority specification
    pub fn new(stream_dependency: u32, exclusive: bool, weight: u8) -> Self {
        PrioritySpec {
            stream_dependency,
            exclusive,
            weight,
        }
    }
}

/// Type-specific frame payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Data {
        data: Bytes,
        padding: Option<Padding>,
    },
    Headers {
        priority: Option<PrioritySpec>,
        fragment: Bytes,
        padding: Option<Padding>,
    },
    Priority(PrioritySpec),
    RstStream {
        error_code: ErrorCode,
    },
    Settings {
        entries: Vec<Setting>,
    },
    PushPromise {
        promised_stream_id: u32,
        fragment: Bytes,
        padding: Option<Padding>,
    },
    Ping {
        data: [u8; 8],
    },
    Goaway {
        last_stream_id: u32,
        error_code: ErrorCode,
        debug_data: Bytes,
    },
    WindowUpdate {
        increment: u32,
    },
    Continuation {
        fragment: Bytes,
    },
    /// Opaque payload behind any type byte, known or not
    Raw {
        frame_type: u8,
        payload: Bytes,
    },
}

impl Payload {
    /// Type byte written into the frame header
    pub fn type_byte(&self) -> u8 {
        match self {
            Payload::Data { .. } => FrameType::Data.as_u8(),
            Payload::Headers { .. } => FrameType::Headers.as_u8(),
            Payload::Priority(_) => FrameType::Priority.as_u8(),
            Payload::RstStream { .. } => FrameType::RstStream.as_u8(),
            Payload::Settings { .. } => FrameType::Settings.as_u8(),
            Payload::PushPromise { .. } => FrameType::PushPromise.as_u8(),
            Payload::Ping { .. } => FrameType::Ping.as_u8(),
            Payload::Goaway { .. } => FrameType::Goaway.as_u8(),
            Payload::WindowUpdate { .. } => FrameType::WindowUpdate.as_u8(),
            Payload::Continuation { .. } => FrameType::Continuation.as_u8(),
            Payload::Raw { frame_type, .. } => *frame_type,
        }
    }

    /// Serialized payload size, padding included
    pub fn len(&self) -> usize {
        let pad = |padding: &Option<Padding>| padding.map_or(0, |p| p.wire_len());
        match self {
            Payload::Data { data, padding } => data.len() + pad(padding),
            Payload::Headers {
                priority,
                fragment,
                padding,
            } => priority.map_or(0, |_| 5) + fragment.len() + pad(padding),
            Payload::Priority(_) => 5,
            Payload::RstStream { .. } => 4,
            Payload::Settings { entries } => entries.len() * 6,
            Payload::PushPromise {
                fragment, padding, ..
            } => 4 + fragment.len() + pad(padding),
            Payload::Ping { .. } => 8,
            Payload::Goaway { debug_data, .. } => 8 + debug_data.len(),
            Payload::WindowUpdate { .. } => 4,
            Payload::Continuation { fragment } => fragment.len(),
            Payload::Raw { payload, .. } => payload.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// HTTP/2 frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Stream ID, written as given (the reserved bit included)
    pub stream_id: u32,
    /// Frame flags
    pub flags: FrameFlags,
    /// Declared length written instead of the computed payload size
    pub length: Option<u32>,
    /// Frame payload
    pub payload: Payload,
}

impl Frame {
    /// Create a new frame
    pub fn new(stream_id: u32, flags: FrameFlags, payload: Payload) -> Self {
        Frame {
            stream_id,
            flags,
            length: None,
            payload,
        }
    }

    /// Frame type, `None` for unknown type bytes
    pub fn frame_type(&self) -> Option<FrameType> {
        FrameType::from_u8(self.type_byte())
    }

    /// Raw type byte
    pub fn type_byte(&self) -> u8 {
        self.payload.type_byte()
    }

    /// Get payload size
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Length written into the frame header
    pub fn header_length(&self) -> u32 {
        self.length.unwrap_or(self.payload_len() as u32)
    }

    /// Encode into wire bytes
    pub fn encode(&self) -> Bytes {
        FrameCodec::encode(self)
    }

    pub fn is_ack(&self) -> bool {
        self.flags.is_ack()
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags.is_end_stream()
    }

    pub fn is_end_headers(&self) -> bool {
        self.flags.is_end_headers()
    }

    /// Error code carried by RST_STREAM and GOAWAY frames
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self.payload {
            Payload::RstStream { error_code } | Payload::Goaway { error_code, .. } => {
                Some(error_code)
            }
            _ => None,
        }
    }

    /// Header block fragment carried by HEADERS, PUSH_PROMISE and CONTINUATION
    pub fn fragment(&self) -> Option<&Bytes> {
        match &self.payload {
            Payload::Headers { fragment, .. }
            | Payload::PushPromise { fragment, .. }
            | Payload::Continuation { fragment } => Some(fragment),
            _ => None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame_type() {
            Some(frame_type) => write!(f, "{}", frame_type.name())?,
            None => write!(f, "UNKNOWN(0x{:x})", self.type_byte())?,
        }
        write!(
            f,
            " Frame (length:{}, flags:0x{:02x}, stream_id:{})",
            self.header_length(),
            self.flags.as_u8(),
            self.stream_id
        )
    }
}

/// Fields every builder shares
#[derive(Debug, Clone, Copy)]
struct Head {
    stream_id: u32,
    flags: u8,
    length: Option<u32>,
}

impl Head {
    fn new(stream_id: u32) -> Self {
        Head {
            stream_id,
            flags: 0,
            length: None,
        }
    }

    fn finish(self, implied_flags: u8, payload: Payload) -> Frame {
        Frame {
            stream_id: self.stream_id,
            flags: FrameFlags::from_u8(self.flags | implied_flags),
            length: self.length,
            payload,
        }
    }
}

fn padding_flag(padding: &Option<Padding>) -> u8 {
    if padding.is_some() {
        FrameFlags::PADDED
    } else {
        0
    }
}

macro_rules! common_setters {
    ($builder:ident) => {
        impl $builder {
            /// Set the stream id
            pub fn stream_id(mut self, stream_id: u32) -> Self {
                self.head.stream_id = stream_id;
                self
            }

            /// OR extra flag bits into the flag octet
            pub fn flags(mut self, flags: u8) -> Self {
                self.head.flags |= flags;
                self
            }

            /// Override the length written into the frame header
            pub fn length(mut self, length: u32) -> Self {
                self.head.length = Some(length);
                self
            }
        }

        impl From<$builder> for Frame {
            fn from(builder: $builder) -> Frame {
                builder.build()
            }
        }
    };
}

/// DATA frame builder (RFC 7540 Section 6.1)
#[derive(Debug, Clone)]
pub struct DataFrame {
    head: Head,
    data: Bytes,
    padding: Option<Padding>,
}

impl DataFrame {
    /// Create a new DATA frame on stream 1
    pub fn new(data: impl Into<Bytes>) -> Self {
        DataFrame {
            head: Head::new(1),
            data: data.into(),
            padding: None,
        }
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Set padding
    pub fn padding(mut self, len: u8) -> Self {
        self.padding = Some(Padding::new(len));
        self
    }

    /// Set padding that may disagree with its Pad Length field
    pub fn padding_with(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn end_stream(mut self) -> Self {
        self.head.flags |= FrameFlags::END_STREAM;
        self
    }

    pub fn build(self) -> Frame {
        let implied = padding_flag(&self.padding);
        self.head.finish(
            implied,
            Payload::Data {
                data: self.data,
                padding: self.padding,
            },
        )
    }
}

common_setters!(DataFrame);

/// HEADERS frame builder (RFC 7540 Section 6.2)
#[derive(Debug, Clone)]
pub struct HeadersFrame {
    head: Head,
    fragment: Bytes,
    priority: Option<PrioritySpec>,
    padding: Option<Padding>,
}

impl HeadersFrame {
    /// Create a new HEADERS frame on stream 1
    pub fn new(fragment: impl Into<Bytes>) -> Self {
        HeadersFrame {
            head: Head::new(1),
            fragment: fragment.into(),
            priority: None,
            padding: None,
        }
    }

    pub fn header_block_fragment(mut self, fragment: impl Into<Bytes>) -> Self {
        self.fragment = fragment.into();
        self
    }

    /// Set priority
    pub fn priority(mut self, priority: PrioritySpec) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set padding
    pub fn padding(mut self, len: u8) -> Self {
        self.padding = Some(Padding::new(len));
        self
    }

    pub fn padding_with(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn end_stream(mut self) -> Self {
        self.head.flags |= FrameFlags::END_STREAM;
        self
    }

    pub fn end_headers(mut self) -> Self {
        self.head.flags |= FrameFlags::END_HEADERS;
        self
    }

    pub fn build(self) -> Frame {
        let mut implied = padding_flag(&self.padding);
        if self.priority.is_some() {
            implied |= FrameFlags::PRIORITY;
        }
        self.head.finish(
            implied,
            Payload::Headers {
                priority: self.priority,
                fragment: self.fragment,
                padding: self.padding,
            },
        )
    }
}

common_setters!(HeadersFrame);

/// PRIORITY frame builder (RFC 7540 Section 6.3)
#[derive(Debug, Clone)]
pub struct PriorityFrame {
    head: Head,
    priority: PrioritySpec,
}

impl PriorityFrame {
    pub fn new(priority: PrioritySpec) -> Self {
        PriorityFrame {
            head: Head::new(1),
            priority,
        }
    }

    pub fn priority(mut self, priority: PrioritySpec) -> Self {
        self.priority = priority;
        self
    }

    pub fn build(self) -> Frame {
        self.head.finish(0, Payload::Priority(self.priority))
    }
}

common_setters!(PriorityFrame);

/// RST_STREAM frame builder (RFC 7540 Section 6.4)
#[derive(Debug, Clone)]
pub struct RstStreamFrame {
    head: Head,
    error_code: ErrorCode,
}

impl RstStreamFrame {
    pub fn new(error_code: ErrorCode) -> Self {
        RstStreamFrame {
            head: Head::new(1),
            error_code,
        }
    }

    pub fn error_code(mut self, error_code: ErrorCode) -> Self {
        self.error_code = error_code;
        self
    }

    pub fn build(self) -> Frame {
        self.head.finish(0, Payload::RstStream {
            error_code: self.error_code,
        })
    }
}

common_setters!(RstStreamFrame);

/// SETTINGS frame builder (RFC 7540 Section 6.5)
///
/// Entries are written in the order they were added; repeating a parameter
/// writes it twice.
#[derive(Debug, Clone)]
pub struct SettingsFrame {
    head: Head,
    entries: Vec<Setting>,
}

impl SettingsFrame {
    /// Create an empty SETTINGS frame
    pub fn new() -> Self {
        SettingsFrame {
            head: Head::new(0),
            entries: Vec::new(),
        }
    }

    /// SETTINGS frame carrying every value present in `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        SettingsFrame {
            head: Head::new(0),
            entries: settings.to_entries(),
        }
    }

    /// Append an entry with an arbitrary identifier
    pub fn setting(mut self, id: u16, value: u32) -> Self {
        self.entries.push(Setting::new(id, value));
        self
    }

    fn param(self, param: SettingsParameter, value: u32) -> Self {
        self.setting(param.as_u16(), value)
    }

    pub fn header_table_size(self, size: u32) -> Self {
        self.param(SettingsParameter::HeaderTableSize, size)
    }

    /// Values other than 0 and 1 are written as given
    pub fn enable_push(self, value: u32) -> Self {
        self.param(SettingsParameter::EnablePush, value)
    }

    pub fn max_concurrent_streams(self, max: u32) -> Self {
        self.param(SettingsParameter::MaxConcurrentStreams, max)
    }

    pub fn initial_window_size(self, size: u32) -> Self {
        self.param(SettingsParameter::InitialWindowSize, size)
    }

    pub fn max_frame_size(self, size: u32) -> Self {
        self.param(SettingsParameter::MaxFrameSize, size)
    }

    pub fn max_header_list_size(self, size: u32) -> Self {
        self.param(SettingsParameter::MaxHeaderListSize, size)
    }

    /// Set the ACK flag
    pub fn ack(mut self) -> Self {
        self.head.flags |= FrameFlags::ACK;
        self
    }

    pub fn build(self) -> Frame {
        self.head.finish(0, Payload::Settings {
            entries: self.entries,
        })
    }
}

impl Default for SettingsFrame {
    fn default() -> Self {
        Self::new()
    }
}

common_setters!(SettingsFrame);

/// PUSH_PROMISE frame builder (RFC 7540 Section 6.6)
#[derive(Debug, Clone)]
pub struct PushPromiseFrame {
    head: Head,
    promised_stream_id: u32,
    fragment: Bytes,
    padding: Option<Padding>,
}

impl PushPromiseFrame {
    pub fn new(promised_stream_id: u32, fragment: impl Into<Bytes>) -> Self {
        PushPromiseFrame {
            head: Head::new(1),
            promised_stream_id,
            fragment: fragment.into(),
            padding: None,
        }
    }

    pub fn promised_stream_id(mut self, stream_id: u32) -> Self {
        self.promised_stream_id = stream_id;
        self
    }

    pub fn header_block_fragment(mut self, fragment: impl Into<Bytes>) -> Self {
        self.fragment = fragment.into();
        self
    }

    pub fn padding(mut self, len: u8) -> Self {
        self.padding = Some(Padding::new(len));
        self
    }

    pub fn padding_with(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn end_headers(mut self) -> Self {
        self.head.flags |= FrameFlags::END_HEADERS;
        self
    }

    pub fn build(self) -> Frame {
        let implied = padding_flag(&self.padding);
        self.head.finish(
            implied,
            Payload::PushPromise {
                promised_stream_id: self.promised_stream_id,
                fragment: self.fragment,
                padding: self.padding,
            },
        )
    }
}

common_setters!(PushPromiseFrame);

/// PING frame builder (RFC 7540 Section 6.7)
#[derive(Debug, Clone)]
pub struct PingFrame {
    head: Head,
    data: [u8; 8],
}

impl PingFrame {
    /// PING with an all-zero payload
    pub fn new() -> Self {
        PingFrame {
            head: Head::new(0),
            data: [0; 8],
        }
    }

    pub fn data(mut self, data: [u8; 8]) -> Self {
        self.data = data;
        self
    }

    /// Set the ACK flag
    pub fn ack(mut self) -> Self {
        self.head.flags |= FrameFlags::ACK;
        self
    }

    pub fn build(self) -> Frame {
        self.head.finish(0, Payload::Ping { data: self.data })
    }
}

impl Default for PingFrame {
    fn default() -> Self {
        Self::new()
    }
}

common_setters!(PingFrame);

/// GOAWAY frame builder (RFC 7540 Section 6.8)
#[derive(Debug, Clone)]
pub struct GoawayFrame {
    head: Head,
    last_stream_id: u32,
    error_code: ErrorCode,
    debug_data: Bytes,
}

impl GoawayFrame {
    pub fn new(error_code: ErrorCode) -> Self {
        GoawayFrame {
            head: Head::new(0),
            last_stream_id: 0,
            error_code,
            debug_data: Bytes::new(),
        }
    }

    pub fn last_stream_id(mut self, stream_id: u32) -> Self {
        self.last_stream_id = stream_id;
        self
    }

    pub fn error_code(mut self, error_code: ErrorCode) -> Self {
        self.error_code = error_code;
        self
    }

    pub fn debug_data(mut self, data: impl Into<Bytes>) -> Self {
        self.debug_data = data.into();
        self
    }

    pub fn build(self) -> Frame {
        self.head.finish(0, Payload::Goaway {
            last_stream_id: self.last_stream_id,
            error_code: self.error_code,
            debug_data: self.debug_data,
        })
    }
}

common_setters!(GoawayFrame);

/// WINDOW_UPDATE frame builder (RFC 7540 Section 6.9)
#[derive(Debug, Clone)]
pub struct WindowUpdateFrame {
    head: Head,
    increment: u32,
}

impl WindowUpdateFrame {
    pub fn new(increment: u32) -> Self {
        WindowUpdateFrame {
            head: Head::new(0),
            increment,
        }
    }

    pub fn window_size_increment(mut self, increment: u32) -> Self {
        self.increment = increment;
        self
    }

    pub fn build(self) -> Frame {
        self.head.finish(0, Payload::WindowUpdate {
            increment: self.increment,
        })
    }
}

common_setters!(WindowUpdateFrame);

/// CONTINUATION frame builder (RFC 7540 Section 6.10)
#[derive(Debug, Clone)]
pub struct ContinuationFrame {
    head: Head,
    fragment: Bytes,
}

impl ContinuationFrame {
    pub fn new(fragment: impl Into<Bytes>) -> Self {
        ContinuationFrame {
            head: Head::new(1),
            fragment: fragment.into(),
        }
    }

    pub fn header_block_fragment(mut self, fragment: impl Into<Bytes>) -> Self {
        self.fragment = fragment.into();
        self
    }

    pub fn end_headers(mut self) -> Self {
        self.head.flags |= FrameFlags::END_HEADERS;
        self
    }

    pub fn build(self) -> Frame {
        self.head.finish(0, Payload::Continuation {
            fragment: self.fragment,
        })
    }
}

common_setters!(ContinuationFrame);

/// Frame of any type byte with an opaque payload
#[derive(Debug, Clone)]
pub struct RawFrame {
    head: Head,
    frame_type: u8,
    payload: Bytes,
}

impl RawFrame {
    pub fn new(frame_type: u8, payload: impl Into<Bytes>) -> Self {
        RawFrame {
            head: Head::new(0),
            frame_type,
            payload: payload.into(),
        }
    }

    pub fn build(self) -> Frame {
        self.head.finish(0, Payload::Raw {
            frame_type: self.frame_type,
            payload: self.payload,
        })
    }
}

common_setters!(RawFrame);

/// Slice a header block fragment at the given offsets
///
/// Offsets are taken in order and clamped to the fragment, so the slices
/// always concatenate back to the input.
pub fn split_header_block(fragment: &Bytes, boundaries: &[usize]) -> Vec<Bytes> {
    let mut slices = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0;

    for &boundary in boundaries {
        let end = boundary.clamp(start, fragment.len());
        slices.push(fragment.slice(start..end));
        start = end;
    }
    slices.push(fragment.slice(start..));

    slices
}

/// HEADERS frame followed by as many CONTINUATION frames as `max_len` needs
///
/// END_HEADERS is set on the last frame only; END_STREAM, when requested,
/// goes on the HEADERS frame.
pub fn header_block_frames(
    stream_id: u32,
    fragment: Bytes,
    max_len: usize,
    end_stream: bool,
) -> Vec<Frame> {
    let max_len = max_len.max(1);
    let boundaries: Vec<usize> = (1..)
        .map(|i| i * max_len)
        .take_while(|&offset| offset < fragment.len())
        .collect();
    let slices = split_header_block(&fragment, &boundaries);
    let last = slices.len() - 1;

    slices
        .into_iter()
        .enumerate()
        .map(|(i, slice)| {
            let end_headers = if i == last { FrameFlags::END_HEADERS } else { 0 };
            if i == 0 {
                let mut headers = HeadersFrame::new(slice)
                    .stream_id(stream_id)
                    .flags(end_headers);
                if end_stream {
                    headers = headers.end_stream();
                }
                headers.build()
            } else {
                ContinuationFrame::new(slice)
                    .stream_id(stream_id)
                    .flags(end_headers)
                    .build()
            }
        })
        .collect()
}
