//! HTTP/2 performance benchmarks
//!
//! This benchmark suite measures:
//! - Frame header encoding/decoding
//! - Whole-frame encoding and decoding for common frame types
//! - HPACK compression with a fresh and a warm dynamic table
//! - Header block slicing into HEADERS + CONTINUATION
//! - Receive window accounting
//!
//! Run with: cargo bench --bench h2_performance

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use h2check::http::h2::compression::dummy_value;
use h2check::http::h2::flow_control::ReceiveWindows;
use h2check::http::h2::settings::DEFAULT_MAX_FRAME_SIZE;
use h2check::http::h2::*;
use std::time::Duration;

// ========== Frame Encoding/Decoding Benchmarks ==========

fn bench_frame_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_header");

    group.bench_function("encode", |b| {
        b.iter(|| {
            let header = FrameCodec::encode_header(
                black_box(FrameType::Headers.as_u8()),
                black_box(FrameFlags::from_u8(0x05)),
                black_box(1),
                black_box(4096),
            );
            black_box(header);
        });
    });

    let encoded =
        FrameCodec::encode_header(FrameType::Data.as_u8(), FrameFlags::from_u8(0x01), 1, 1024);
    group.bench_function("decode", |b| {
        b.iter(|| {
            let _ = black_box(FrameCodec::decode_header(black_box(&encoded)));
        });
    });

    group.finish();
}

fn bench_data_frame_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_frame_sizes");

    for size in [256, 1024, 4096, 16384].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        let data = Bytes::from(vec![0u8; *size]);
        let encoded = DataFrame::new(data.clone()).build().encode();

        group.bench_with_input(BenchmarkId::new("encode", size), size, |b, _| {
            b.iter(|| {
                let frame = DataFrame::new(black_box(data.clone())).padding(16).build();
                black_box(frame.encode());
            });
        });

        group.bench_with_input(BenchmarkId::new("decode", size), size, |b, _| {
            b.iter(|| {
                let _ = black_box(FrameCodec::decode(black_box(&encoded)));
            });
        });
    }

    group.finish();
}

fn bench_control_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_frames");

    group.bench_function("settings", |b| {
        b.iter(|| {
            let frame = SettingsFrame::new()
                .header_table_size(black_box(4096))
                .max_concurrent_streams(black_box(100))
                .initial_window_size(black_box(65535))
                .build();
            black_box(frame.encode());
        });
    });

    group.bench_function("goaway", |b| {
        b.iter(|| {
            let frame = GoawayFrame::new(ErrorCode::NO_ERROR)
                .last_stream_id(black_box(1))
                .debug_data("h2check")
                .build();
            black_box(frame.encode());
        });
    });

    let ping = PingFrame::new().ack().build().encode();
    group.bench_function("ping_decode", |b| {
        b.iter(|| {
            let _ = black_box(FrameCodec::decode(black_box(&ping)));
        });
    });

    group.finish();
}

// ========== HPACK Benchmarks ==========

fn request_headers() -> Vec<HeaderField> {
    vec![
        HeaderField::new(":method", "GET"),
        HeaderField::new(":scheme", "https"),
        HeaderField::new(":path", "/index.html"),
        HeaderField::new(":authority", "example.com"),
        HeaderField::new("user-agent", "h2check"),
        HeaderField::new("accept", "*/*"),
    ]
}

fn bench_hpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("hpack");
    let headers = request_headers();

    group.bench_function("compress_fresh_context", |b| {
        b.iter(|| {
            let mut context = HeaderCompressionContext::new();
            black_box(context.compress(black_box(&headers)));
        });
    });

    let mut warm = HeaderCompressionContext::new();
    warm.compress(&headers);
    group.bench_function("compress_warm_context", |b| {
        b.iter(|| {
            black_box(warm.compress(black_box(&headers)));
        });
    });

    let large = vec![HeaderField::new("x-large", dummy_value(22000))];
    group.throughput(Throughput::Bytes(22000));
    group.bench_function("compress_large_value", |b| {
        b.iter(|| {
            let mut context = HeaderCompressionContext::new();
            black_box(context.compress(black_box(&large)));
        });
    });

    group.finish();
}

fn bench_header_block_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_block_frames");

    for size in [22000, 100_000].iter() {
        let fragment = HeaderCompressionContext::new()
            .compress(&[HeaderField::new("x-large", dummy_value(*size))]);
        group.throughput(Throughput::Bytes(fragment.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let frames = header_block_frames(
                    1,
                    black_box(fragment.clone()),
                    DEFAULT_MAX_FRAME_SIZE as usize,
                    false,
                );
                let wire: Vec<Bytes> = frames.iter().map(Frame::encode).collect();
                black_box(wire);
            });
        });
    }

    group.finish();
}

// ========== Flow Control Benchmarks ==========

fn bench_receive_windows(c: &mut Criterion) {
    let mut group = c.benchmark_group("receive_windows");

    group.bench_function("on_data_16k", |b| {
        b.iter(|| {
            let mut windows = ReceiveWindows::new(65535);
            for _ in 0..64 {
                black_box(windows.on_data(black_box(1), 16384));
            }
        });
    });

    group.finish();
}

criterion_group! {
    name = frame_encoding;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(500);
    targets =
        bench_frame_header,
        bench_data_frame_sizes,
        bench_control_frames
}

criterion_group! {
    name = hpack;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(200);
    targets =
        bench_hpack,
        bench_header_block_frames
}

criterion_group! {
    name = flow_control_benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_receive_windows
}

criterion_main!(frame_encoding, hpack, flow_control_benches);
