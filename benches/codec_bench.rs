//! Benchmarks for the Framecast frame codec

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use framecast::protocol::{decode_message, encode_message, Message, DEFAULT_MAX_FRAME_SIZE};

fn codec_benchmarks(c: &mut Criterion) {
    let ping = Message::ping(Some("bench client".to_string()));
    let broadcast = Message::broadcast_from("127.0.0.1:50000", "x".repeat(256));
    let raw = Message::RawText("y".repeat(256));

    c.bench_function("encode_ping", |b| {
        b.iter(|| encode_message(black_box(&ping)))
    });

    c.bench_function("encode_broadcast_256b", |b| {
        b.iter(|| encode_message(black_box(&broadcast)))
    });

    c.bench_function("encode_raw_text_256b", |b| {
        b.iter(|| encode_message(black_box(&raw)))
    });

    let frame = encode_message(&broadcast);
    c.bench_function("decode_broadcast_256b", |b| {
        b.iter(|| {
            let mut buffer = BytesMut::from(&frame[..]);
            decode_message(black_box(&mut buffer), DEFAULT_MAX_FRAME_SIZE).unwrap()
        })
    });

    // A buffer holding many frames, drained in one pass
    let mut batch = BytesMut::new();
    for _ in 0..64 {
        batch.extend_from_slice(&encode_message(&ping));
    }
    let batch = batch.freeze();
    c.bench_function("decode_64_frame_batch", |b| {
        b.iter(|| {
            let mut buffer = BytesMut::from(&batch[..]);
            let mut count = 0;
            while let Some(message) = decode_message(&mut buffer, DEFAULT_MAX_FRAME_SIZE).unwrap()
            {
                black_box(message);
                count += 1;
            }
            count
        })
    });
}

criterion_group!(benches, codec_benchmarks);
criterion_main!(benches);
