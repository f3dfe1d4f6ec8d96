//! Hot-path codec benchmarks
//!
//! Encode and decode of the two message kinds that dominate gateway traffic,
//! plus reassembly of a burst of frames delivered in one read.

use bytes::BytesMut;
use codec::{decode, encode, encode_into, FrameAssembler};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use types::{MarketData, Message, Order, Side};

fn sample_order() -> Message {
    Message::order_new(Order::new(12345, "AAPL", 150.50, 100, Side::Buy))
}

fn sample_quote() -> Message {
    Message::market_data(MarketData::new("AAPL", 150.45, 150.55, 1000, 1000))
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let order = sample_order();
    let quote = sample_quote();

    group.bench_function("order_new", |b| {
        b.iter(|| black_box(encode(black_box(&order))))
    });
    group.bench_function("market_data", |b| {
        b.iter(|| black_box(encode(black_box(&quote))))
    });
    group.bench_function("order_new_into_reused_buffer", |b| {
        let mut out = BytesMut::with_capacity(4096);
        b.iter(|| {
            out.clear();
            let result = encode_into(black_box(&order), &mut out);
            black_box(result)
        })
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let order = encode(&sample_order()).expect("encode order");
    let quote = encode(&sample_quote()).expect("encode quote");

    group.bench_function("order_new", |b| b.iter(|| black_box(decode(black_box(&order)))));
    group.bench_function("market_data", |b| b.iter(|| black_box(decode(black_box(&quote)))));
    group.bench_function("truncated_error_path", |b| {
        b.iter(|| black_box(decode(black_box(&order[..30]))))
    });

    group.finish();
}

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembly");
    let burst: Vec<u8> = (0..100)
        .flat_map(|i| {
            let message = if i % 2 == 0 { sample_order() } else { sample_quote() };
            encode(&message).expect("encode burst")
        })
        .collect();
    group.throughput(Throughput::Elements(100));

    group.bench_function("burst_of_100", |b| {
        let mut assembler = FrameAssembler::new(8192, 65536);
        b.iter(|| {
            assembler.extend(black_box(&burst)).expect("burst fits");
            let mut count = 0;
            while let Ok(Some(message)) = assembler.next_message() {
                black_box(&message);
                count += 1;
            }
            black_box(count)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_reassembly);
criterion_main!(benches);
