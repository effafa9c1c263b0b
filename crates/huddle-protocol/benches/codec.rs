//! Codec and parser benchmarks for huddle-protocol.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use huddle_protocol::{Command, LineCodec};
use tokio_util::codec::Decoder;

fn bench_decode_lines(c: &mut Criterion) {
    let line = format!("/broadcast {}\r\n", "x".repeat(64));
    let batch = line.repeat(64);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(batch.len() as u64));
    group.bench_function("64_lines_64B", |b| {
        b.iter(|| {
            let mut codec = LineCodec::new();
            let mut buf = BytesMut::from(batch.as_str());
            let mut count = 0;
            while let Ok(Some(line)) = codec.decode(&mut buf) {
                black_box(line);
                count += 1;
            }
            count
        })
    });
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let lines = [
        "/broadcast hello everyone",
        "/msg bob are you there?",
        "/group_msg CS425 lecture moved to 3pm",
        "/join_group CS425",
        "/exit",
        "not a command",
    ];

    c.bench_function("parse_mixed", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(Command::parse(black_box(line)));
            }
        })
    });
}

criterion_group!(benches, bench_decode_lines, bench_parse);
criterion_main!(benches);
