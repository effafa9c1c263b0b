//! Routing throughput benchmarks for Huddle.
//!
//! Every recipient outbox is drained inside the measured loop, so the numbers
//! include the cost of consuming what was delivered.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use huddle_core::{outbox, ConnectionId, GroupRegistry, OutboxReceiver, Router, SessionRegistry};
use huddle_protocol::Command;
use std::sync::Arc;

fn new_router() -> Router {
    Router::new(
        Arc::new(SessionRegistry::new()),
        Arc::new(GroupRegistry::new()),
    )
}

/// Register `size` sessions named `user-N`.
fn populate(router: &Router, size: usize) -> Vec<(ConnectionId, OutboxReceiver)> {
    (0..size)
        .map(|i| {
            let id = ConnectionId::next();
            let (tx, rx) = outbox();
            router.connect(id, &format!("user-{i}"), tx).unwrap();
            (id, rx)
        })
        .collect()
}

fn drain(receivers: &mut [(ConnectionId, OutboxReceiver)]) -> usize {
    let mut count = 0;
    for (_, rx) in receivers.iter_mut() {
        while rx.try_recv().is_ok() {
            count += 1;
        }
    }
    count
}

/// Benchmark broadcast fan-out at different session counts.
fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");

    for size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64 - 1));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let router = new_router();
            let mut receivers = populate(&router, size);
            drain(&mut receivers);
            let sender = receivers[0].0;

            b.iter(|| {
                router.broadcast(sender, black_box("hello everyone")).unwrap();
                drain(&mut receivers)
            });
        });
    }

    group.finish();
}

/// Benchmark private delivery among many online sessions.
fn bench_private(c: &mut Criterion) {
    let mut group = c.benchmark_group("private");

    group.bench_function("1000_sessions", |b| {
        let router = new_router();
        let mut receivers = populate(&router, 1000);
        drain(&mut receivers);
        let sender = receivers[0].0;
        let (_, target_rx) = &mut receivers[999];

        b.iter(|| {
            router
                .private(sender, black_box("user-999"), black_box("psst"))
                .unwrap();
            target_rx.try_recv().is_ok()
        });
    });

    group.finish();
}

/// Benchmark group messages with every session in one group.
fn bench_group_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_msg");

    for size in [10, 100].iter() {
        group.throughput(Throughput::Elements(*size as u64 - 1));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let router = new_router();
            let mut receivers = populate(&router, size);
            let founder = receivers[0].0;
            router.create_group(founder, "bench").unwrap();
            for (id, _) in &receivers[1..] {
                router.join_group(*id, "bench").unwrap();
            }
            drain(&mut receivers);

            b.iter(|| {
                router
                    .group_message(founder, black_box("bench"), black_box("standup in 5"))
                    .unwrap();
                drain(&mut receivers)
            });
        });
    }

    group.finish();
}

/// Benchmark a session joining and leaving the chat.
fn bench_session_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");

    group.bench_function("connect_disconnect_100_online", |b| {
        let router = new_router();
        let mut receivers = populate(&router, 100);
        let founder = receivers[0].0;
        router.create_group(founder, "lobby").unwrap();
        drain(&mut receivers);

        b.iter(|| {
            let id = ConnectionId::next();
            let (tx, _rx) = outbox();
            router.connect(id, "visitor", tx).unwrap();
            router.join_group(id, "lobby").unwrap();
            router.disconnect(id);
            drain(&mut receivers)
        });
    });

    group.finish();
}

/// Benchmark parsing plus routing of a raw command line.
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("parse_and_broadcast_100", |b| {
        let router = new_router();
        let mut receivers = populate(&router, 100);
        drain(&mut receivers);
        let sender = receivers[0].0;

        b.iter(|| {
            if let Command::Broadcast { body } = Command::parse(black_box("/broadcast hi all")) {
                router.broadcast(sender, body).unwrap();
            }
            drain(&mut receivers)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_broadcast,
    bench_private,
    bench_group_message,
    bench_session_churn,
    bench_dispatch,
);
criterion_main!(benches);
