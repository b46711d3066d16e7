//! Benchmark line dispatch throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kismet_client::{Dispatcher, StateStore};

fn network_line(i: u32) -> String {
    format!(
        "*NETWORK: 00:0C:41:{:02X}:{:02X}:{:02X} 0 \x01net-{}\x01 \x01\x02\x01 10 20 3 1 6 1 {} {} \
         4 192.168.1.0 255.255.255.0 192.168.1.1 \
         1 45.1 -122.7 10.0 0.0 45.2 -122.6 30.0 5.5 \
         3 0 100 54.0 12 2 40 -50 -95 60 -40 -96 \
         45.15 -122.65 20.0 90.3 -245.3 60.0 2\n",
        (i >> 16) & 0xFF,
        (i >> 8) & 0xFF,
        i & 0xFF,
        i,
        1_060_000_000 + i,
        1_060_000_100 + i
    )
}

const PACKET_LINE: &str = "*PACKET: 2 1060000000 0 1 1 00:11:22:33:44:55 FF:FF:FF:FF:FF:FF \
     00:0C:41:A2:0B:11 \x01probe\x01 3 10.0.0.2 10.0.0.255 137 137 1 \x01WORKGROUP\x01\n";

fn bench_network_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("network_lines");

    for count in [100u32, 1000] {
        let lines: Vec<String> = (0..count).map(network_line).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &lines, |b, lines| {
            b.iter(|| {
                let mut store = StateStore::default();
                let mut dispatcher = Dispatcher::new();
                for line in lines {
                    black_box(dispatcher.dispatch(line, &mut store));
                }
                black_box(store.network_count())
            })
        });
    }

    group.finish();
}

fn bench_packet_history(c: &mut Criterion) {
    let mut store = StateStore::default();
    let mut dispatcher = Dispatcher::new();

    c.bench_function("packet_line", |b| {
        b.iter(|| black_box(dispatcher.dispatch(black_box(PACKET_LINE), &mut store)))
    });
}

fn bench_most_recent(c: &mut Criterion) {
    let mut store = StateStore::default();
    let mut dispatcher = Dispatcher::new();
    for i in 0..2000 {
        dispatcher.dispatch(&network_line(i), &mut store);
    }

    c.bench_function("most_recent_50_of_2000", |b| {
        b.iter(|| black_box(store.most_recent(black_box(50)).len()))
    });
}

criterion_group!(benches, bench_network_lines, bench_packet_history, bench_most_recent);
criterion_main!(benches);
