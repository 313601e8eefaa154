//! HTTP/2 codec integration tests
//!
//! These tests verify the wire format end to end:
//! - Round trips for every frame type
//! - Header fidelity when lengths and flags are overridden
//! - SETTINGS, PING, GOAWAY and CONTINUATION scenarios

use bytes::Bytes;
use h2check::http::h2::codec::*;
use h2check::http::h2::compression::dummy_value;
use h2check::http::h2::*;

fn roundtrip(frame: Frame) {
    let encoded = frame.encode();
    let (decoded, used) = FrameCodec::decode(&encoded).unwrap();
    assert_eq!(used, encoded.len());
    assert_eq!(decoded, frame, "round trip of {}", frame);
}

#[test]
fn test_roundtrip_every_frame_type() {
    roundtrip(DataFrame::new("hello").stream_id(3).end_stream().build());
    roundtrip(DataFrame::new("padded").padding(7).build());
    roundtrip(DataFrame::new(Bytes::new()).build());

    roundtrip(
        HeadersFrame::new(&b"\x82\x86\x84"[..])
            .priority(PrioritySpec::new(0, false, 15))
            .padding(4)
            .end_headers()
            .end_stream()
            .build(),
    );
    roundtrip(
        HeadersFrame::new(&b"\x82"[..])
            .stream_id(5)
            .priority(PrioritySpec::new(3, true, 255))
            .build(),
    );

    roundtrip(PriorityFrame::new(PrioritySpec::new(1, true, 0)).stream_id(3).build());
    roundtrip(RstStreamFrame::new(ErrorCode::CANCEL).build());
    roundtrip(RstStreamFrame::new(ErrorCode(0xdead)).stream_id(9).build());

    roundtrip(
        SettingsFrame::new()
            .header_table_size(0)
            .enable_push(0)
            .max_concurrent_streams(100)
            .initial_window_size(0x7FFFFFFF)
            .max_frame_size(16777215)
            .max_header_list_size(1)
            .setting(0xabcd, 42)
            .build(),
    );
    roundtrip(SettingsFrame::new().ack().build());

    roundtrip(
        PushPromiseFrame::new(2, &b"\x82"[..])
            .padding(3)
            .end_headers()
            .build(),
    );

    roundtrip(PingFrame::new().data(*b"\x00\x01\x02\x03\x04\x05\x06\x07").build());
    roundtrip(PingFrame::new().ack().build());

    roundtrip(
        GoawayFrame::new(ErrorCode::ENHANCE_YOUR_CALM)
            .last_stream_id(0x7FFFFFFF)
            .debug_data("calm down")
            .build(),
    );

    roundtrip(WindowUpdateFrame::new(1).build());
    roundtrip(WindowUpdateFrame::new(0x7FFFFFFF).stream_id(1).build());
    roundtrip(ContinuationFrame::new(&b"\x84"[..]).end_headers().build());

    // Extension frame types survive as raw payloads
    roundtrip(RawFrame::new(0xfa, &b"opaque"[..]).stream_id(1).flags(0xff).build());
}

#[test]
fn test_overridden_length_is_written_verbatim() {
    let frame = DataFrame::new("hello world").length(3).build();
    let encoded = frame.encode();

    assert_eq!(&encoded[0..3], &[0, 0, 3]);
    // The payload itself is untouched
    assert_eq!(encoded.len(), FRAME_HEADER_SIZE + 11);
    assert_eq!(&encoded[FRAME_HEADER_SIZE..], b"hello world");

    let header = FrameCodec::decode_header(&encoded).unwrap();
    assert_eq!(header.length, 3);
}

#[test]
fn test_oversized_length_override() {
    let frame = SettingsFrame::new().ack().length(6).build();
    let encoded = frame.encode();
    assert_eq!(&encoded[0..3], &[0, 0, 6]);
    assert_eq!(encoded.len(), FRAME_HEADER_SIZE);
}

#[test]
fn test_extra_flags_and_reserved_bit() {
    let frame = PingFrame::new().flags(0xfe).stream_id(0x80000000).build();
    let encoded = frame.encode();
    assert_eq!(encoded[4], 0xfe);
    assert_eq!(&encoded[5..9], &[0x80, 0, 0, 0]);

    // Decoding masks the reserved bit
    let header = FrameCodec::decode_header(&encoded).unwrap();
    assert_eq!(header.stream_id, 0);
}

#[test]
fn test_settings_scenario() {
    let encoded = SettingsFrame::new().max_concurrent_streams(100).build().encode();
    assert_eq!(encoded.len(), 15);

    let (frame, _) = FrameCodec::decode(&encoded).unwrap();
    assert_eq!(frame.frame_type(), Some(FrameType::Settings));
    assert!(!frame.is_ack());
    assert_eq!(
        frame.payload,
        Payload::Settings {
            entries: vec![Setting::new(0x3, 100)]
        }
    );
}

#[test]
fn test_ping_scenario() {
    let encoded = PingFrame::new().build().encode();
    let (frame, _) = FrameCodec::decode(&encoded).unwrap();

    assert_eq!(frame.frame_type(), Some(FrameType::Ping));
    assert!(!frame.is_ack());
    assert_eq!(frame.payload_len(), 8);
    assert_eq!(frame.stream_id, 0);
}

#[test]
fn test_goaway_scenario() {
    let encoded = GoawayFrame::new(ErrorCode::NO_ERROR)
        .last_stream_id(1)
        .debug_data("h2check")
        .build()
        .encode();
    assert_eq!(encoded.len(), 24);

    let (frame, _) = FrameCodec::decode(&encoded).unwrap();
    match frame.payload {
        Payload::Goaway {
            last_stream_id,
            error_code,
            debug_data,
        } => {
            assert_eq!(last_stream_id, 1);
            assert_eq!(error_code, ErrorCode::NO_ERROR);
            assert_eq!(&debug_data[..], b"h2check");
        }
        other => panic!("expected GOAWAY, got {:?}", other),
    }
}

#[test]
fn test_continuation_scenario() {
    let mut context = HeaderCompressionContext::new();
    let fragment = context.compress(&[HeaderField::new("x-long", dummy_value(22000))]);
    assert!(fragment.len() > 22000);

    let slices = split_header_block(&fragment, &[16384]);
    assert_eq!(slices.len(), 2);
    assert_eq!(slices[0].len(), 16384);

    let mut wire = HeadersFrame::new(slices[0].clone()).build().encode().to_vec();
    wire.extend_from_slice(&ContinuationFrame::new(slices[1].clone()).end_headers().build().encode());

    let (headers, used) = FrameCodec::decode(&wire).unwrap();
    let (continuation, _) = FrameCodec::decode(&wire[used..]).unwrap();
    assert!(!headers.is_end_headers());
    assert!(continuation.is_end_headers());

    let mut reassembled = headers.fragment().unwrap().to_vec();
    reassembled.extend_from_slice(continuation.fragment().unwrap());
    assert_eq!(reassembled, fragment.to_vec());

    let decoded = hpack::Decoder::new().decode(&reassembled).unwrap();
    assert_eq!(decoded[0].1.len(), 22000);
}

#[test]
fn test_header_block_frames_respect_max_len() {
    let fragment = Bytes::from(vec![0x82u8; 40000]);
    let frames = header_block_frames(3, fragment.clone(), 16384, true);

    assert_eq!(frames.len(), 3);
    assert!(frames[0].is_end_stream());
    assert!(frames.iter().all(|f| f.stream_id == 3 && f.payload_len() <= 16384));
    assert!(frames[2].is_end_headers());

    let joined: Vec<u8> = frames
        .iter()
        .flat_map(|f| f.fragment().unwrap().to_vec())
        .collect();
    assert_eq!(joined, fragment.to_vec());
}

#[test]
fn test_decode_stream_of_frames() {
    let mut wire = Vec::new();
    wire.extend_from_slice(&SettingsFrame::new().build().encode());
    wire.extend_from_slice(&WindowUpdateFrame::new(1000).build().encode());
    wire.extend_from_slice(&PingFrame::new().ack().build().encode());

    let mut pos = 0;
    let mut types = Vec::new();
    while pos < wire.len() {
        let (frame, used) = FrameCodec::decode(&wire[pos..]).unwrap();
        types.push(frame.frame_type().unwrap());
        pos += used;
    }
    assert_eq!(types, vec![FrameType::Settings, FrameType::WindowUpdate, FrameType::Ping]);

    // A cut in the middle is truncation, never a hard error
    let err = FrameCodec::decode(&wire[..12]).unwrap_err();
    assert!(err.is_truncated());
}

#[test]
fn test_malformed_payloads() {
    let bad_settings = RawFrame::new(0x4, vec![0u8; 7]).build().encode();
    let err = FrameCodec::decode(&bad_settings).unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::FRAME_SIZE_ERROR);

    let bad_window = RawFrame::new(0x8, vec![0u8; 3]).build().encode();
    let err = FrameCodec::decode(&bad_window).unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::FRAME_SIZE_ERROR);

    // Pad Length larger than the rest of the payload
    let bad_padding = RawFrame::new(0x0, vec![10u8, b'a'])
        .flags(FrameFlags::PADDED)
        .stream_id(1)
        .build()
        .encode();
    let err = FrameCodec::decode(&bad_padding).unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::PROTOCOL_ERROR);
}

#[test]
fn test_error_code_table() {
    let codes = [
        (ErrorCode::NO_ERROR, 0x0),
        (ErrorCode::PROTOCOL_ERROR, 0x1),
        (ErrorCode::INTERNAL_ERROR, 0x2),
        (ErrorCode::FLOW_CONTROL_ERROR, 0x3),
        (ErrorCode::SETTINGS_TIMEOUT, 0x4),
        (ErrorCode::STREAM_CLOSED, 0x5),
        (ErrorCode::FRAME_SIZE_ERROR, 0x6),
        (ErrorCode::REFUSED_STREAM, 0x7),
        (ErrorCode::CANCEL, 0x8),
        (ErrorCode::COMPRESSION_ERROR, 0x9),
        (ErrorCode::CONNECT_ERROR, 0xa),
        (ErrorCode::ENHANCE_YOUR_CALM, 0xb),
        (ErrorCode::INADEQUATE_SECURITY, 0xc),
        (ErrorCode::HTTP_1_1_REQUIRED, 0xd),
    ];
    for (code, value) in codes {
        assert_eq!(code.as_u32(), value);
        assert!(code.is_known());
    }
}

#[test]
fn test_frame_type_table() {
    for byte in 0x0..=0x9u8 {
        let frame_type = FrameType::from_u8(byte).unwrap();
        assert_eq!(frame_type.as_u8(), byte);
    }
    assert_eq!(FrameType::from_u8(0xa), None);
}

#[test]
fn test_connection_preface() {
    assert_eq!(CONNECTION_PREFACE.len(), 24);
    assert_eq!(CONNECTION_PREFACE, b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n");
}
