//! HTTP/2 frame encoding and decoding
//!
//! This module provides low-level frame encoding/decoding with full control
//! over frame construction, allowing intentionally malformed frames for testing.
//!
//! Encoding writes exactly what the [`Frame`] holds. Decoding is only ever
//! applied to bytes read back from a peer and checks payload shapes, not
//! protocol semantics.

use super::error::{DecodeError, ErrorCode};
use super::frames::*;
use super::settings::Setting;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// HTTP/2 frame header size (9 bytes)
pub const FRAME_HEADER_SIZE: usize = 9;

/// Largest length the 24-bit length field can carry
pub const MAX_FRAME_SIZE: usize = 0x00FFFFFF;

/// Decoded 9-octet frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Declared payload length
    pub length: usize,
    /// Raw type byte
    pub frame_type: u8,
    pub flags: FrameFlags,
    /// Stream ID with the reserved bit cleared
    pub stream_id: u32,
}

impl FrameHeader {
    /// Total bytes the frame occupies on the wire
    pub fn frame_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.length
    }
}

/// Frame codec for encoding/decoding HTTP/2 frames
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a frame header
    ///
    /// Only the low 24 bits of `length` fit the length field. The stream id
    /// is written as given, reserved bit included.
    pub fn encode_header(
        frame_type: u8,
        flags: FrameFlags,
        stream_id: u32,
        length: u32,
    ) -> [u8; FRAME_HEADER_SIZE] {
        let mut header = [0u8; FRAME_HEADER_SIZE];

        // Length (24 bits, big-endian)
        header[0] = ((length >> 16) & 0xFF) as u8;
        header[1] = ((length >> 8) & 0xFF) as u8;
        header[2] = (length & 0xFF) as u8;

        header[3] = frame_type;
        header[4] = flags.as_u8();
        header[5..9].copy_from_slice(&stream_id.to_be_bytes());

        header
    }

    /// Decode a frame header from the start of `bytes`
    pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader, DecodeError> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(DecodeError::truncated(FRAME_HEADER_SIZE));
        }

        let length =
            ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | (bytes[2] as usize);

        // Ignore the reserved bit
        let stream_id =
            u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) & 0x7FFFFFFF;

        Ok(FrameHeader {
            length,
            frame_type: bytes[3],
            flags: FrameFlags::from_u8(bytes[4]),
            stream_id,
        })
    }

    /// Encode a frame into wire bytes
    pub fn encode(frame: &Frame) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + frame.payload_len());

        let header = Self::encode_header(
            frame.type_byte(),
            frame.flags,
            frame.stream_id,
            frame.header_length(),
        );
        buf.put_slice(&header);
        Self::encode_payload(&frame.payload, &mut buf);

        buf.freeze()
    }

    fn encode_payload(payload: &Payload, buf: &mut BytesMut) {
        match payload {
            Payload::Data { data, padding } => {
                Self::put_pad_length(buf, padding);
                buf.put_slice(data);
                Self::put_padding(buf, padding);
            }
            Payload::Headers {
                priority,
                fragment,
                padding,
            } => {
                Self::put_pad_length(buf, padding);
                if let Some(priority) = priority {
                    Self::put_priority(buf, priority);
                }
                buf.put_slice(fragment);
                Self::put_padding(buf, padding);
            }
            Payload::Priority(priority) => Self::put_priority(buf, priority),
            Payload::RstStream { error_code } => buf.put_u32(error_code.as_u32()),
            Payload::Settings { entries } => {
                for entry in entries {
                    buf.put_u16(entry.id);
                    buf.put_u32(entry.value);
                }
            }
            Payload::PushPromise {
                promised_stream_id,
                fragment,
                padding,
            } => {
                Self::put_pad_length(buf, padding);
                buf.put_u32(*promised_stream_id);
                buf.put_slice(fragment);
                Self::put_padding(buf, padding);
            }
            Payload::Ping { data } => buf.put_slice(data),
            Payload::Goaway {
                last_stream_id,
                error_code,
                debug_data,
            } => {
                buf.put_u32(*last_stream_id);
                buf.put_u32(error_code.as_u32());
                buf.put_slice(debug_data);
            }
            Payload::WindowUpdate { increment } => buf.put_u32(*increment),
            Payload::Continuation { fragment } => buf.put_slice(fragment),
            Payload::Raw { payload, .. } => buf.put_slice(payload),
        }
    }

    fn put_pad_length(buf: &mut BytesMut, padding: &Option<Padding>) {
        if let Some(padding) = padding {
            buf.put_u8(padding.pad_length);
        }
    }

    fn put_padding(buf: &mut BytesMut, padding: &Option<Padding>) {
        if let Some(padding) = padding {
            buf.put_bytes(0, padding.padding_len);
        }
    }

    fn put_priority(buf: &mut BytesMut, priority: &PrioritySpec) {
        let mut dep = priority.stream_dependency;
        if priority.exclusive {
            dep |= 0x80000000;
        }
        buf.put_u32(dep);
        buf.put_u8(priority.weight);
    }

    /// Decode one frame from the start of `bytes`
    ///
    /// Returns the frame and the number of bytes it occupied.
    /// `DecodeErrorKind::Truncated` means more bytes are needed.
    pub fn decode(bytes: &[u8]) -> Result<(Frame, usize), DecodeError> {
        let header = Self::decode_header(bytes)?;
        let frame_len = header.frame_len();
        if bytes.len() < frame_len {
            return Err(DecodeError::truncated(frame_len));
        }

        let payload = Bytes::copy_from_slice(&bytes[FRAME_HEADER_SIZE..frame_len]);
        let frame = Self::decode_frame(&header, payload)?;
        Ok((frame, frame_len))
    }

    /// Decode a payload whose header has already been parsed
    pub fn decode_frame(header: &FrameHeader, mut payload: Bytes) -> Result<Frame, DecodeError> {
        let flags = header.flags;

        let payload = match FrameType::from_u8(header.frame_type) {
            Some(FrameType::Data) => {
                let padding = Self::take_padding(&mut payload, flags, 0, "DATA")?;
                Payload::Data {
                    data: payload,
                    padding,
                }
            }
            Some(FrameType::Headers) => {
                let fixed = if flags.is_priority() { 5 } else { 0 };
                let padding = Self::take_padding(&mut payload, flags, fixed, "HEADERS")?;
                let priority = if flags.is_priority() {
                    Some(Self::get_priority(&mut payload))
                } else {
                    None
                };
                Payload::Headers {
                    priority,
                    fragment: payload,
                    padding,
                }
            }
            Some(FrameType::Priority) => {
                Self::expect_len(&payload, 5, "PRIORITY")?;
                Payload::Priority(Self::get_priority(&mut payload))
            }
            Some(FrameType::RstStream) => {
                Self::expect_len(&payload, 4, "RST_STREAM")?;
                Payload::RstStream {
                    error_code: ErrorCode::from_u32(payload.get_u32()),
                }
            }
            Some(FrameType::Settings) => {
                if flags.is_ack() && !payload.is_empty() {
                    return Err(DecodeError::frame_size(
                        "SETTINGS ACK must have an empty payload",
                    ));
                }
                if payload.len() % 6 != 0 {
                    return Err(DecodeError::frame_size(format!(
                        "SETTINGS payload of {} octets is not a multiple of 6",
                        payload.len()
                    )));
                }
                let mut entries = Vec::with_capacity(payload.len() / 6);
                while payload.has_remaining() {
                    let id = payload.get_u16();
                    let value = payload.get_u32();
                    entries.push(Setting::new(id, value));
                }
                Payload::Settings { entries }
            }
            Some(FrameType::PushPromise) => {
                let padding = Self::take_padding(&mut payload, flags, 4, "PUSH_PROMISE")?;
                let promised_stream_id = payload.get_u32() & 0x7FFFFFFF;
                Payload::PushPromise {
                    promised_stream_id,
                    fragment: payload,
                    padding,
                }
            }
            Some(FrameType::Ping) => {
                Self::expect_len(&payload, 8, "PING")?;
                let mut data = [0u8; 8];
                payload.copy_to_slice(&mut data);
                Payload::Ping { data }
            }
            Some(FrameType::Goaway) => {
                if payload.len() < 8 {
                    return Err(DecodeError::frame_size(format!(
                        "GOAWAY payload of {} octets is shorter than 8",
                        payload.len()
                    )));
                }
                let last_stream_id = payload.get_u32() & 0x7FFFFFFF;
                let error_code = ErrorCode::from_u32(payload.get_u32());
                Payload::Goaway {
                    last_stream_id,
                    error_code,
                    debug_data: payload,
                }
            }
            Some(FrameType::WindowUpdate) => {
                Self::expect_len(&payload, 4, "WINDOW_UPDATE")?;
                Payload::WindowUpdate {
                    increment: payload.get_u32() & 0x7FFFFFFF,
                }
            }
            Some(FrameType::Continuation) => Payload::Continuation { fragment: payload },
            None => Payload::Raw {
                frame_type: header.frame_type,
                payload,
            },
        };

        Ok(Frame {
            stream_id: header.stream_id,
            flags,
            length: None,
            payload,
        })
    }

    fn expect_len(payload: &Bytes, len: usize, name: &str) -> Result<(), DecodeError> {
        if payload.len() != len {
            return Err(DecodeError::frame_size(format!(
                "{} payload must be {} octets, got {}",
                name,
                len,
                payload.len()
            )));
        }
        Ok(())
    }

    /// Strip the Pad Length field and trailing padding from `payload`
    ///
    /// `fixed` is the size of the fields that follow the Pad Length field
    /// and must be present (priority block, promised stream id).
    fn take_padding(
        payload: &mut Bytes,
        flags: FrameFlags,
        fixed: usize,
        name: &str,
    ) -> Result<Option<Padding>, DecodeError> {
        let pad_field = usize::from(flags.is_padded());
        if payload.len() < pad_field + fixed {
            let msg = format!("{} payload of {} octets is too short", name, payload.len());
            return Err(if flags.is_padded() && payload.is_empty() {
                DecodeError::protocol(msg)
            } else {
                DecodeError::frame_size(msg)
            });
        }

        if !flags.is_padded() {
            return Ok(None);
        }

        let pad_length = payload.get_u8();
        let pad = pad_length as usize;
        if pad > payload.len() - fixed {
            return Err(DecodeError::protocol(format!(
                "{} pad length {} exceeds the remaining payload",
                name, pad_length
            )));
        }
        payload.truncate(payload.len() - pad);

        Ok(Some(Padding::new(pad_length)))
    }

    fn get_priority(payload: &mut Bytes) -> PrioritySpec {
        let dep = payload.get_u32();
        let weight = payload.get_u8();
        PrioritySpec {
            stream_dependency: dep & 0x7FFFFFFF,
            exclusive: dep & 0x80000000 != 0,
            weight,
        }
    }
}
