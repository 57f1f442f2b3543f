//! Codec benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use oscwire_core::{codec, endpoint::ANY_ENDPOINT, Bundle, Message, OscAddress, Packet};

fn fader_message() -> Message {
    Message::with_path("/mixer/channel3/volume")
        .unwrap()
        .with_argument(0.75f32)
        .with_argument(3)
        .with_argument("main")
}

fn encode_benchmark(c: &mut Criterion) {
    let packet = Packet::from(fader_message());

    c.bench_function("encode_message", |b| {
        b.iter(|| black_box(codec::encode(&packet).unwrap()))
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let encoded = codec::encode(&Packet::from(fader_message())).unwrap();

    c.bench_function("decode_message", |b| {
        b.iter(|| black_box(codec::decode(&encoded, ANY_ENDPOINT).unwrap()))
    });
}

fn bundle_benchmark(c: &mut Criterion) {
    let mut bundle = Bundle::immediate();
    for ch in 0..16 {
        bundle.add_packet(
            Message::with_path(&format!("/mixer/channel{}/volume", ch))
                .unwrap()
                .with_argument(ch as f32 / 16.0),
        );
    }
    let packet = Packet::from(bundle);

    c.bench_function("roundtrip_bundle_16", |b| {
        b.iter(|| {
            let encoded = codec::encode(&packet).unwrap();
            black_box(codec::decode(&encoded, ANY_ENDPOINT).unwrap())
        })
    });
}

fn match_benchmark(c: &mut Criterion) {
    let pattern: OscAddress = "/mixer/channel[0-9]/{volume,pan}".parse().unwrap();
    let target: OscAddress = "/mixer/channel3/volume".parse().unwrap();

    c.bench_function("pattern_match", |b| {
        b.iter(|| black_box(pattern.matches(&target)))
    });
}

criterion_group!(
    benches,
    encode_benchmark,
    decode_benchmark,
    bundle_benchmark,
    match_benchmark
);
criterion_main!(benches);
