//! HTTP/2 stream state tracking
//!
//! This module implements the stream states of RFC 7540 Section 5.1, as far
//! as a client needs them to tell whether an inbound frame references a
//! stream that can still receive it.

use super::error::{ErrorCode, ErrorScope};
use super::frames::{Frame, Payload};
use super::{CONNECTION_STREAM_ID, MAX_STREAM_ID};
use std::collections::{HashMap, HashSet};

/// Stream ID type
pub type StreamId = u32;

/// Stream state as defined in RFC 7540 Section 5.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Idle: No frames have been sent/received
    #[default]
    Idle,
    /// Reserved (local): PUSH_PROMISE sent
    ReservedLocal,
    /// Reserved (remote): PUSH_PROMISE received
    ReservedRemote,
    /// Open: Both sides can send frames
    Open,
    /// Half-closed (local): We can't send, they can
    HalfClosedLocal,
    /// Half-closed (remote): They can't send, we can
    HalfClosedRemote,
    /// Closed: Stream is closed
    Closed,
}

impl StreamState {
    /// Check if stream can send data
    pub fn can_send(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedRemote)
    }

    /// Check if stream can receive data
    pub fn can_receive(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedLocal)
    }

    /// Check if stream is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, StreamState::Closed)
    }

    /// State after the local side ends the stream
    fn close_local(self) -> Self {
        match self {
            StreamState::HalfClosedRemote | StreamState::Closed => StreamState::Closed,
            _ => StreamState::HalfClosedLocal,
        }
    }

    /// State after the peer ends the stream
    fn close_remote(self) -> Self {
        match self {
            StreamState::HalfClosedLocal | StreamState::Closed => StreamState::Closed,
            _ => StreamState::HalfClosedRemote,
        }
    }
}

/// Inbound frame that its stream's state does not allow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamViolation {
    pub scope: ErrorScope,
    pub code: ErrorCode,
    pub reason: String,
}

/// Stream id to state table of one connection
#[derive(Debug, Default)]
pub struct StreamTable {
    streams: HashMap<StreamId, StreamState>,
    /// Streams we sent RST_STREAM on; late peer frames there are ignored
    reset_locally: HashSet<StreamId>,
}

impl StreamTable {
    pub fn new() -> Self {
        StreamTable::default()
    }

    /// Current state; streams never seen are idle
    pub fn state(&self, stream_id: StreamId) -> StreamState {
        self.streams.get(&stream_id).copied().unwrap_or_default()
    }

    fn set(&mut self, stream_id: StreamId, state: StreamState) {
        self.streams.insert(stream_id, state);
    }

    /// Number of streams that have left the idle state
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Whether we closed the stream with our own RST_STREAM
    pub fn is_reset_locally(&self, stream_id: StreamId) -> bool {
        self.reset_locally.contains(&stream_id)
    }

    /// Record a frame we wrote
    ///
    /// Nothing is rejected: frames that are illegal in the current state are
    /// sent anyway and the state is left alone.
    pub fn on_send(&mut self, frame: &Frame) {
        let stream_id = frame.stream_id & MAX_STREAM_ID;
        if stream_id == CONNECTION_STREAM_ID {
            return;
        }
        let state = self.state(stream_id);

        match &frame.payload {
            Payload::Headers { .. } => {
                let opened = match state {
                    StreamState::Idle => StreamState::Open,
                    StreamState::ReservedLocal => StreamState::HalfClosedRemote,
                    other => other,
                };
                let next = if frame.is_end_stream() {
                    opened.close_local()
                } else {
                    opened
                };
                self.set(stream_id, next);
            }
            Payload::Data { .. } if frame.is_end_stream() && state.can_send() => {
                self.set(stream_id, state.close_local());
            }
            Payload::RstStream { .. } => {
                self.set(stream_id, StreamState::Closed);
                self.reset_locally.insert(stream_id);
            }
            Payload::PushPromise {
                promised_stream_id, ..
            } => {
                self.set(promised_stream_id & MAX_STREAM_ID, StreamState::ReservedLocal);
            }
            _ => {}
        }
    }

    /// Record a frame read from the peer
    ///
    /// Returns the error the frame provokes when its stream cannot receive
    /// it. Frames on a stream we reset ourselves are never classified
    /// (RFC 7540 Section 5.1, "closed").
    pub fn on_recv(&mut self, frame: &Frame) -> Option<StreamViolation> {
        let stream_id = frame.stream_id;
        if stream_id == CONNECTION_STREAM_ID {
            return None;
        }
        let state = self.state(stream_id);
        if state == StreamState::Closed && self.is_reset_locally(stream_id) {
            return None;
        }

        match &frame.payload {
            Payload::Headers { .. } => match state {
                StreamState::HalfClosedRemote | StreamState::Closed => {
                    Some(stream_closed(stream_id, "HEADERS", state))
                }
                _ => {
                    let opened = match state {
                        StreamState::Idle => StreamState::Open,
                        StreamState::ReservedRemote => StreamState::HalfClosedLocal,
                        other => other,
                    };
                    let next = if frame.is_end_stream() {
                        opened.close_remote()
                    } else {
                        opened
                    };
                    self.set(stream_id, next);
                    None
                }
            },
            Payload::Data { .. } => match state {
                StreamState::Idle | StreamState::ReservedLocal | StreamState::ReservedRemote => {
                    Some(protocol_error(format!(
                        "DATA on stream {} in state {:?}",
                        stream_id, state
                    )))
                }
                StreamState::HalfClosedRemote | StreamState::Closed => {
                    Some(stream_closed(stream_id, "DATA", state))
                }
                StreamState::Open | StreamState::HalfClosedLocal => {
                    if frame.is_end_stream() {
                        self.set(stream_id, state.close_remote());
                    }
                    None
                }
            },
            Payload::WindowUpdate { .. } if state == StreamState::Idle => Some(protocol_error(
                format!("WINDOW_UPDATE on idle stream {}", stream_id),
            )),
            Payload::RstStream { .. } if state == StreamState::Idle => Some(protocol_error(
                format!("RST_STREAM on idle stream {}", stream_id),
            )),
            Payload::RstStream { .. } => {
                self.set(stream_id, StreamState::Closed);
                None
            }
            Payload::PushPromise {
                promised_stream_id, ..
            } => {
                self.set(*promised_stream_id, StreamState::ReservedRemote);
                None
            }
            _ => None,
        }
    }
}

fn stream_closed(stream_id: StreamId, frame: &str, state: StreamState) -> StreamViolation {
    StreamViolation {
        scope: ErrorScope::Stream(stream_id),
        code: ErrorCode::STREAM_CLOSED,
        reason: format!("{} on stream {} in state {:?}", frame, stream_id, state),
    }
}

fn protocol_error(reason: String) -> StreamViolation {
    StreamViolation {
        scope: ErrorScope::Connection,
        code: ErrorCode::PROTOCOL_ERROR,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::h2::frames::*;

    #[test]
    fn test_request_response_lifecycle() {
        let mut table = StreamTable::new();
        assert_eq!(table.state(1), StreamState::Idle);

        // Idle -> HalfClosedLocal (send HEADERS with END_STREAM)
        table.on_send(&HeadersFrame::new(&b""[..]).end_headers().end_stream().build());
        assert_eq!(table.state(1), StreamState::HalfClosedLocal);

        let response = HeadersFrame::new(&b""[..]).end_headers().build();
        assert_eq!(table.on_recv(&response), None);
        assert_eq!(table.state(1), StreamState::HalfClosedLocal);

        let body = DataFrame::new("ok").end_stream().build();
        assert_eq!(table.on_recv(&body), None);
        assert_eq!(table.state(1), StreamState::Closed);
    }

    #[test]
    fn test_open_then_half_closed_remote() {
        let mut table = StreamTable::new();
        table.on_send(&HeadersFrame::new(&b""[..]).stream_id(3).end_headers().build());
        assert_eq!(table.state(3), StreamState::Open);

        let frame = DataFrame::new("x").stream_id(3).end_stream().build();
        assert_eq!(table.on_recv(&frame), None);
        assert_eq!(table.state(3), StreamState::HalfClosedRemote);

        // Anything else from the peer on that stream is STREAM_CLOSED
        let violation = table
            .on_recv(&DataFrame::new("late").stream_id(3).build())
            .unwrap();
        assert_eq!(violation.scope, ErrorScope::Stream(3));
        assert_eq!(violation.code, ErrorCode::STREAM_CLOSED);
    }

    #[test]
    fn test_data_on_idle_stream_is_connection_error() {
        let mut table = StreamTable::new();
        let violation = table.on_recv(&DataFrame::new("x").stream_id(5).build()).unwrap();

        assert_eq!(violation.scope, ErrorScope::Connection);
        assert_eq!(violation.code, ErrorCode::PROTOCOL_ERROR);
        assert_eq!(table.state(5), StreamState::Idle);
    }

    #[test]
    fn test_window_update_on_idle_stream() {
        let mut table = StreamTable::new();
        let frame = WindowUpdateFrame::new(10).stream_id(7).build();
        let violation = table.on_recv(&frame).unwrap();
        assert_eq!(violation.code, ErrorCode::PROTOCOL_ERROR);

        // Connection-level WINDOW_UPDATE is never classified
        assert_eq!(table.on_recv(&WindowUpdateFrame::new(10).build()), None);
    }

    #[test]
    fn test_rst_stream_closes() {
        let mut table = StreamTable::new();
        table.on_send(&HeadersFrame::new(&b""[..]).end_headers().build());

        let rst = RstStreamFrame::new(ErrorCode::CANCEL).build();
        assert_eq!(table.on_recv(&rst), None);
        assert!(table.state(1).is_closed());

        let violation = table
            .on_recv(&HeadersFrame::new(&b""[..]).end_headers().build())
            .unwrap();
        assert_eq!(violation.code, ErrorCode::STREAM_CLOSED);
    }

    #[test]
    fn test_rst_stream_on_idle_stream() {
        let mut table = StreamTable::new();
        let rst = RstStreamFrame::new(ErrorCode::CANCEL).stream_id(3).build();
        let violation = table.on_recv(&rst).unwrap();

        assert_eq!(violation.scope, ErrorScope::Connection);
        assert_eq!(violation.code, ErrorCode::PROTOCOL_ERROR);
        assert_eq!(table.state(3), StreamState::Idle);
    }

    #[test]
    fn test_frames_after_local_reset_are_ignored() {
        let mut table = StreamTable::new();
        table.on_send(&HeadersFrame::new(&b""[..]).end_headers().build());
        table.on_send(&RstStreamFrame::new(ErrorCode::CANCEL).build());
        assert!(table.is_reset_locally(1));
        assert!(table.state(1).is_closed());

        assert_eq!(table.on_recv(&DataFrame::new("late").build()), None);
        assert_eq!(table.on_recv(&HeadersFrame::new(&b""[..]).end_headers().build()), None);
        assert_eq!(table.on_recv(&RstStreamFrame::new(ErrorCode::CANCEL).build()), None);
        assert!(table.state(1).is_closed());

        // A peer reset does not grant the same leniency
        table.on_send(&HeadersFrame::new(&b""[..]).stream_id(3).end_headers().build());
        table.on_recv(&RstStreamFrame::new(ErrorCode::CANCEL).stream_id(3).build());
        assert!(!table.is_reset_locally(3));
        assert!(table.on_recv(&DataFrame::new("late").stream_id(3).build()).is_some());
    }

    #[test]
    fn test_push_promise_reserves() {
        let mut table = StreamTable::new();
        table.on_send(&HeadersFrame::new(&b""[..]).end_headers().end_stream().build());

        let promise = PushPromiseFrame::new(2, &b""[..]).end_headers().build();
        assert_eq!(table.on_recv(&promise), None);
        assert_eq!(table.state(2), StreamState::ReservedRemote);

        let pushed = HeadersFrame::new(&b""[..]).stream_id(2).end_headers().build();
        assert_eq!(table.on_recv(&pushed), None);
        assert_eq!(table.state(2), StreamState::HalfClosedLocal);
    }

    #[test]
    fn test_priority_always_accepted() {
        let mut table = StreamTable::new();
        let frame = PriorityFrame::new(PrioritySpec::default()).stream_id(9).build();
        assert_eq!(table.on_recv(&frame), None);
        assert!(table.is_empty());
    }
}
