//! Performance benchmarks for the tag ingestion path.
//!
//! Raw reads arrive in dense bursts while the trigger is held, so every
//! step between the driver callback and the notification is on the hot
//! path: parsing, filtered matching, and buffering.
//!
//! # Run Benchmarks
//!
//! ```sh
//! # Run all inventory benchmarks
//! cargo bench --bench inventory_bench
//!
//! # Run a specific group
//! cargo bench --bench inventory_bench -- filtered_match
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use uhf_core::{Epc, Rssi, TagRecord};
use uhf_hardware::RawTagRead;
use uhf_hardware::mock::MockUhfDriver;
use uhf_reader::{
    FilteredReadingSession, InventoryBuffer, OverflowPolicy, ReaderConfig, ReaderSession,
};

fn epc(i: usize) -> String {
    format!("E2000017221101441890{i:04X}")
}

fn record(i: usize) -> TagRecord {
    TagRecord::new(Epc::parse(&epc(i)).unwrap(), Rssi::new(-60))
}

fn bench_parse_raw_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_raw_read");
    group.throughput(Throughput::Elements(1));

    group.bench_function("integer_rssi", |b| {
        b.iter(|| {
            black_box(TagRecord::from_raw(
                black_box("e2000017221101441890aabb"),
                black_box("-61"),
                None,
            ))
        });
    });
    group.bench_function("fractional_rssi", |b| {
        b.iter(|| {
            black_box(TagRecord::from_raw(
                black_box("e2000017221101441890aabb"),
                black_box("-61.5"),
                Some(1_700_000_000_000),
            ))
        });
    });

    group.finish();
}

fn bench_buffer_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_push");
    group.throughput(Throughput::Elements(1));

    for policy in [OverflowPolicy::EvictOldest, OverflowPolicy::RejectNew] {
        let buffer = InventoryBuffer::new(1024, policy);
        for i in 0..1024 {
            buffer.push(record(i));
        }
        let incoming = record(9999);

        group.bench_with_input(
            BenchmarkId::new("full", format!("{policy:?}")),
            &incoming,
            |b, incoming| {
                b.iter(|| black_box(buffer.push(incoming.clone())));
            },
        );
    }

    group.finish();
}

fn bench_filtered_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_match");
    group.throughput(Throughput::Elements(1));

    for target_count in [1usize, 16, 256] {
        let session = FilteredReadingSession::new();
        session.start((0..target_count).map(epc)).unwrap();
        session.on_raw_tag(&record(0));

        let repeat = record(0);
        let miss = record(target_count + 1);

        group.bench_with_input(
            BenchmarkId::new("repeat_target", target_count),
            &repeat,
            |b, read| b.iter(|| black_box(session.on_raw_tag(read))),
        );
        group.bench_with_input(
            BenchmarkId::new("non_target", target_count),
            &miss,
            |b, read| b.iter(|| black_box(session.on_raw_tag(read))),
        );
    }

    group.finish();
}

fn bench_session_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_ingest");
    group.throughput(Throughput::Elements(1));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (driver, _handle) = MockUhfDriver::new();
    let session = ReaderSession::new(driver, ReaderConfig::default()).unwrap();
    runtime.block_on(async {
        session.init().await.unwrap();
        session.start_reading().await.unwrap();
    });
    let read = RawTagRead::new(epc(1), "-61");

    group.bench_function("plain_mode", |b| {
        b.iter(|| session.ingest_tag(black_box(&read)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_raw_read,
    bench_buffer_push,
    bench_filtered_match,
    bench_session_ingest,
);
criterion_main!(benches);
