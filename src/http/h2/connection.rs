//! HTTP/2 client connection driven one event at a time
//!
//! A [`Connection`] owns a transport and turns the bytes it reads into a
//! sequence of [`Event`]s in wire order. Nothing sent through it is
//! validated, so a test can write whatever it wants and then inspect how the
//! peer reacts: the frames it sends back, the errors they imply and whether
//! the transport gets closed.

use super::codec::{FrameCodec, FRAME_HEADER_SIZE};
use super::compression::{HeaderCompressionContext, HeaderField, HeaderList};
use super::error::{DecodeError, Error, ErrorCode, ErrorScope, Result};
use super::flow_control::ReceiveWindows;
use super::frames::{Frame, FrameType, Payload, SettingsFrame, WindowUpdateFrame};
use super::settings::{Settings, DEFAULT_HEADER_TABLE_SIZE};
use super::stream::{StreamId, StreamState, StreamTable};
use super::CONNECTION_PREFACE;
use crate::http::{self, HttpSession, SessionOps};
use bytes::{Bytes, BytesMut};
use pretty_hex::PrettyHex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Size of a single transport read
const READ_CHUNK_SIZE: usize = 16384;

/// Which side an error was detected by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// Reported by the peer (GOAWAY)
    Peer,
    /// Classified by this connection from what the peer sent
    Local,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorOrigin::Peer => write!(f, "peer"),
            ErrorOrigin::Local => write!(f, "local"),
        }
    }
}

/// Protocol error surfaced as an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub code: ErrorCode,
    pub scope: ErrorScope,
    pub origin: ErrorOrigin,
    /// GOAWAY debug data, or the reason for locally classified errors
    pub debug_data: Bytes,
}

impl ProtocolError {
    fn local(scope: ErrorScope, code: ErrorCode, reason: impl Into<String>) -> Self {
        ProtocolError {
            code,
            scope,
            origin: ErrorOrigin::Local,
            debug_data: Bytes::from(reason.into()),
        }
    }

    pub fn is_connection_error(&self) -> bool {
        self.scope == ErrorScope::Connection
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} error: {}", self.origin, self.scope, self.code)?;
        if !self.debug_data.is_empty() {
            write!(f, " ({})", String::from_utf8_lossy(&self.debug_data))?;
        }
        Ok(())
    }
}

/// Something observed on the connection
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A complete frame was read
    Frame(Frame),
    /// A connection or stream error, from the peer or classified locally
    Error(ProtocolError),
    /// The transport is gone
    Close {
        /// Whether an error event was emitted before the close
        after_error: bool,
    },
}

impl Event {
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            Event::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ProtocolError> {
        match self {
            Event::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Event::Close { .. })
    }
}

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is up, nothing written yet
    Connecting,
    /// Preface and SETTINGS written, waiting for the peer
    PrefaceSent,
    Established,
    /// An error event was emitted but the transport is still open
    Erroring,
    Closed,
}

/// Header block being reassembled from HEADERS/PUSH_PROMISE + CONTINUATION
#[derive(Debug)]
struct PendingBlock {
    stream_id: StreamId,
    fragment: BytesMut,
}

/// Builder for [`Connection`]
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    settings: Settings,
    auto_ack_settings: bool,
    auto_window_update: bool,
    header_table_size: usize,
    max_frame_size: Option<u32>,
    timeout: Option<Duration>,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        ConnectionBuilder {
            settings: Settings::client_defaults(),
            auto_ack_settings: true,
            auto_window_update: true,
            header_table_size: DEFAULT_HEADER_TABLE_SIZE as usize,
            max_frame_size: None,
            timeout: None,
        }
    }

    /// SETTINGS written during the handshake
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Acknowledge the peer's SETTINGS as soon as they are read
    pub fn auto_ack_settings(mut self, enabled: bool) -> Self {
        self.auto_ack_settings = enabled;
        self
    }

    /// Replenish receive windows as DATA arrives
    pub fn auto_window_update(mut self, enabled: bool) -> Self {
        self.auto_window_update = enabled;
        self
    }

    /// Initial dynamic table size of the header encoder
    pub fn header_table_size(mut self, size: usize) -> Self {
        self.header_table_size = size;
        self
    }

    /// Largest inbound frame payload accepted
    ///
    /// Defaults to the SETTINGS_MAX_FRAME_SIZE of the configured settings.
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = Some(size);
        self
    }

    /// Read timeout applied to the transport
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wrap a transport without any I/O
    pub fn build<S: SessionOps>(self, transport: S) -> Connection<S> {
        let mut session = HttpSession::new(transport);
        session.set_timeout(self.timeout);

        let max_frame_size = self
            .max_frame_size
            .unwrap_or_else(|| self.settings.get_max_frame_size());

        // Peer size updates may not exceed what we advertised
        let mut decoder = loona_hpack::Decoder::new();
        decoder.set_max_allowed_table_size(self.settings.get_header_table_size() as usize);

        Connection {
            session,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            events: VecDeque::new(),
            streams: StreamTable::new(),
            encoder: HeaderCompressionContext::with_max_table_size(self.header_table_size),
            decoder,
            pending_block: None,
            headers: HashMap::new(),
            recv_windows: ReceiveWindows::new(self.settings.get_initial_window_size()),
            local_settings: self.settings,
            remote_settings: Settings::new(),
            auto_ack_settings: self.auto_ack_settings,
            auto_window_update: self.auto_window_update,
            max_frame_size,
            state: ConnectionState::Connecting,
            errored: false,
            closed: false,
        }
    }

    /// Wrap a transport and run the handshake
    pub fn connect<S: SessionOps>(self, transport: S) -> Result<Connection<S>> {
        let mut conn = self.build(transport);
        conn.handshake()?;
        Ok(conn)
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP/2 client connection
pub struct Connection<S: SessionOps> {
    session: HttpSession<S>,
    /// Bytes read but not yet decoded
    buf: BytesMut,
    events: VecDeque<Event>,
    streams: StreamTable,
    encoder: HeaderCompressionContext,
    decoder: loona_hpack::Decoder<'static>,
    pending_block: Option<PendingBlock>,
    /// Decoded inbound header lists per stream, in arrival order
    headers: HashMap<StreamId, Vec<HeaderList>>,
    recv_windows: ReceiveWindows,
    local_settings: Settings,
    remote_settings: Settings,
    auto_ack_settings: bool,
    auto_window_update: bool,
    max_frame_size: u32,
    state: ConnectionState,
    errored: bool,
    closed: bool,
}

impl<S: SessionOps> Connection<S> {
    /// Connect with default options (preface, SETTINGS, wait for ACKs)
    pub fn connect(transport: S) -> Result<Self> {
        ConnectionBuilder::new().connect(transport)
    }

    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Write the preface and local SETTINGS, then read until both sides'
    /// SETTINGS are acknowledged
    ///
    /// Frames read before that point are consumed.
    pub fn handshake(&mut self) -> Result<()> {
        self.send_raw(CONNECTION_PREFACE)?;
        let settings = SettingsFrame::from_settings(&self.local_settings).build();
        self.send(&settings)?;
        self.state = ConnectionState::PrefaceSent;
        debug!("preface sent, waiting for SETTINGS");

        let mut local_acked = false;
        let mut remote_seen = false;
        let mut last_error: Option<ProtocolError> = None;

        while !(local_acked && remote_seen) {
            let event = match self.next_event() {
                Ok(event) => event,
                Err(Error::ConnectionClosed) => {
                    return Err(handshake_closed(last_error.as_ref()));
                }
                Err(e) => return Err(e),
            };

            match event {
                Event::Frame(frame) => {
                    if let Payload::Settings { .. } = frame.payload {
                        if frame.is_ack() {
                            local_acked = true;
                        } else {
                            remote_seen = true;
                            if !self.auto_ack_settings {
                                self.send(&SettingsFrame::new().ack().build())?;
                            }
                        }
                    }
                }
                Event::Error(err) => last_error = Some(err),
                Event::Close { .. } => return Err(handshake_closed(last_error.as_ref())),
            }
        }

        if self.state == ConnectionState::PrefaceSent {
            self.state = ConnectionState::Established;
        }
        debug!("handshake complete");
        Ok(())
    }

    /// Encode and write a frame, then record it in the stream table
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        debug!("[send] {}", frame);
        let bytes = frame.encode();
        self.session.write_all(&bytes)?;
        self.streams.on_send(frame);
        Ok(())
    }

    /// Write bytes exactly as given
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        trace!("[send] {} raw bytes\n{:?}", bytes.len(), bytes.hex_dump());
        self.session.write_all(bytes)?;
        Ok(())
    }

    /// Compress a header list with this connection's encoding context
    pub fn encode_headers(&mut self, headers: &[HeaderField]) -> Bytes {
        self.encoder.compress(headers)
    }

    pub fn compression_context(&self) -> &HeaderCompressionContext {
        &self.encoder
    }

    pub fn compression_context_mut(&mut self) -> &mut HeaderCompressionContext {
        &mut self.encoder
    }

    /// Block until the next event
    ///
    /// Once the close event has been returned, further calls fail with
    /// [`Error::ConnectionClosed`]. A transport read timeout surfaces as
    /// [`Error::Timeout`] and leaves the connection usable.
    pub fn next_event(&mut self) -> Result<Event> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Ok(event);
            }
            if self.closed {
                return Err(Error::ConnectionClosed);
            }
            self.read_more()?;
        }
    }

    /// Skip events until one matches
    pub fn wait_for<F>(&mut self, mut predicate: F) -> Result<Event>
    where
        F: FnMut(&Event) -> bool,
    {
        loop {
            let event = self.next_event()?;
            if predicate(&event) {
                return Ok(event);
            }
        }
    }

    /// Skip events until a frame of the given type arrives
    pub fn wait_for_frame(&mut self, frame_type: FrameType) -> Result<Frame> {
        let event = self.wait_for(|event| {
            event
                .frame()
                .is_some_and(|frame| frame.type_byte() == frame_type.as_u8())
        })?;
        match event {
            Event::Frame(frame) => Ok(frame),
            _ => Err(Error::ConnectionClosed),
        }
    }

    /// Hand events to `handler` until it breaks or the connection closes
    pub fn dispatch<F>(&mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(&Event) -> ControlFlow<()>,
    {
        loop {
            let event = match self.next_event() {
                Ok(event) => event,
                Err(Error::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            };
            if handler(&event).is_break() || event.is_close() {
                return Ok(());
            }
        }
    }

    /// Close the transport and emit the close event
    pub fn close(&mut self) {
        self.on_transport_closed();
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn stream_state(&self, stream_id: StreamId) -> StreamState {
        self.streams.state(stream_id)
    }

    /// Header lists decoded on a stream so far
    pub fn headers(&self, stream_id: StreamId) -> &[HeaderList] {
        self.headers
            .get(&stream_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn local_settings(&self) -> &Settings {
        &self.local_settings
    }

    pub fn remote_settings(&self) -> &Settings {
        &self.remote_settings
    }

    /// Largest frame payload the peer accepts
    pub fn peer_max_frame_size(&self) -> u32 {
        self.remote_settings.get_max_frame_size()
    }

    pub fn receive_windows(&self) -> &ReceiveWindows {
        &self.recv_windows
    }

    pub fn set_auto_window_update(&mut self, enabled: bool) {
        self.auto_window_update = enabled;
    }

    pub fn session(&self) -> &HttpSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut HttpSession<S> {
        &mut self.session
    }

    fn read_more(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        match self.session.read(&mut chunk) {
            Ok(0) => {
                debug!("transport reached EOF");
                self.on_transport_closed();
                Ok(())
            }
            Ok(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                self.process_buffer()
            }
            Err(http::Error::Timeout) => Err(Error::Timeout),
            Err(e) if e.is_disconnect() => {
                debug!("transport disconnected: {}", e);
                self.on_transport_closed();
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Decode and process every complete frame in the buffer
    fn process_buffer(&mut self) -> Result<()> {
        while !self.closed {
            let header = match FrameCodec::decode_header(&self.buf) {
                Ok(header) => header,
                Err(e) if e.is_truncated() => return Ok(()),
                Err(e) => {
                    self.fail_decode(e);
                    return Ok(());
                }
            };

            if header.length > self.max_frame_size as usize {
                self.fail_decode(DecodeError::frame_size(format!(
                    "frame length {} exceeds SETTINGS_MAX_FRAME_SIZE {}",
                    header.length, self.max_frame_size
                )));
                return Ok(());
            }
            if self.buf.len() < header.frame_len() {
                return Ok(());
            }

            let bytes = self.buf.split_to(header.frame_len()).freeze();
            match FrameCodec::decode_frame(&header, bytes.slice(FRAME_HEADER_SIZE..)) {
                Ok(frame) => self.on_frame(frame)?,
                Err(e) => self.fail_decode(e),
            }
        }
        Ok(())
    }

    fn on_frame(&mut self, frame: Frame) -> Result<()> {
        debug!("[recv] {}", frame);
        let violation = self.streams.on_recv(&frame);
        let mut follow_up = Vec::new();

        match &frame.payload {
            Payload::Settings { entries } if !frame.is_ack() => {
                self.remote_settings.apply(entries);
                let table_size = self.remote_settings.get_header_table_size() as usize;
                if table_size < self.encoder.table().max_size() {
                    self.encoder.set_max_table_size(table_size);
                }
                if self.auto_ack_settings {
                    self.write_control(&SettingsFrame::new().ack().build())?;
                }
            }
            Payload::Data { .. } if self.auto_window_update => {
                // Padding counts against the window too
                let len = frame.payload_len();
                for (stream_id, increment) in self.recv_windows.on_data(frame.stream_id, len) {
                    let update = WindowUpdateFrame::new(increment).stream_id(stream_id).build();
                    self.write_control(&update)?;
                }
            }
            Payload::Headers { fragment, .. } => {
                self.start_block(frame.stream_id, fragment, frame.is_end_headers(), &mut follow_up);
            }
            Payload::PushPromise {
                promised_stream_id,
                fragment,
                ..
            } => {
                self.start_block(*promised_stream_id, fragment, frame.is_end_headers(), &mut follow_up);
            }
            Payload::Continuation { fragment } => {
                self.continue_block(fragment, frame.is_end_headers(), &mut follow_up);
            }
            Payload::Goaway {
                error_code,
                debug_data,
                ..
            } => {
                follow_up.push(ProtocolError {
                    code: *error_code,
                    scope: ErrorScope::Connection,
                    origin: ErrorOrigin::Peer,
                    debug_data: debug_data.clone(),
                });
            }
            Payload::RstStream { .. } => self.recv_windows.remove_stream(frame.stream_id),
            _ => {}
        }

        self.events.push_back(Event::Frame(frame));

        if let Some(violation) = violation {
            follow_up.push(ProtocolError::local(
                violation.scope,
                violation.code,
                violation.reason,
            ));
        }
        for err in follow_up {
            self.emit_error(err);
        }
        Ok(())
    }

    fn start_block(
        &mut self,
        stream_id: StreamId,
        fragment: &Bytes,
        end_headers: bool,
        errors: &mut Vec<ProtocolError>,
    ) {
        let block = PendingBlock {
            stream_id,
            fragment: BytesMut::from(&fragment[..]),
        };
        if end_headers {
            self.decode_block(block, errors);
        } else {
            self.pending_block = Some(block);
        }
    }

    fn continue_block(
        &mut self,
        fragment: &Bytes,
        end_headers: bool,
        errors: &mut Vec<ProtocolError>,
    ) {
        // A PUSH_PROMISE block belongs to the promised stream, not the carrying one
        let Some(mut block) = self.pending_block.take() else {
            return;
        };
        block.fragment.extend_from_slice(fragment);
        if end_headers {
            self.decode_block(block, errors);
        } else {
            self.pending_block = Some(block);
        }
    }

    fn decode_block(&mut self, block: PendingBlock, errors: &mut Vec<ProtocolError>) {
        match self.decoder.decode(&block.fragment) {
            Ok(pairs) => {
                let list: HeaderList = pairs
                    .into_iter()
                    .map(|(name, value)| HeaderField::new(name, value))
                    .collect();
                self.headers.entry(block.stream_id).or_default().push(list);
            }
            Err(e) => errors.push(ProtocolError::local(
                ErrorScope::Connection,
                ErrorCode::COMPRESSION_ERROR,
                format!("header block on stream {} failed to decode: {:?}", block.stream_id, e),
            )),
        }
    }

    /// Write an automatic control frame; a peer that already hung up is not an error
    fn write_control(&mut self, frame: &Frame) -> Result<()> {
        match self.send(frame) {
            Err(Error::Http(e)) if e.is_disconnect() => {
                debug!("peer gone before {} could be written", frame);
                Ok(())
            }
            other => other,
        }
    }

    fn emit_error(&mut self, err: ProtocolError) {
        debug!("error event: {}", err);
        self.errored = true;
        if !self.closed {
            self.state = ConnectionState::Erroring;
        }
        self.events.push_back(Event::Error(err));
    }

    fn fail_decode(&mut self, err: DecodeError) {
        warn!("inbound frame failed to decode: {}", err);
        self.emit_error(ProtocolError::local(
            ErrorScope::Connection,
            err.error_code(),
            err.to_string(),
        ));
        self.on_transport_closed();
    }

    fn on_transport_closed(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.session.close() {
            debug!("closing transport: {}", e);
        }
        self.closed = true;
        self.state = ConnectionState::Closed;
        self.buf.clear();
        debug!("close event (after_error: {})", self.errored);
        self.events.push_back(Event::Close {
            after_error: self.errored,
        });
    }
}

fn handshake_closed(last_error: Option<&ProtocolError>) -> Error {
    match last_error {
        Some(err) => Error::Handshake(format!("connection closed after {}", err)),
        None => Error::Handshake("connection closed before SETTINGS exchange completed".to_string()),
    }
}
