//! Throughput benchmarks for imgxfer-files.
//!
//! Run with: `cargo bench -p imgxfer-files`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use imgxfer_files::{AlignedBuffer, ReceiveOptions, Receiver};
use rand::RngCore;
use std::io::Cursor;
use tempfile::NamedTempFile;

const IMAGE_SIZE: usize = 64 * 1024 * 1024;

/// Benchmark receive throughput for various chunk sizes
fn bench_receive_chunk_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("receive_chunk_size");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(IMAGE_SIZE as u64));

    let mut data = vec![0u8; IMAGE_SIZE];
    rand::thread_rng().fill_bytes(&mut data);

    let target = NamedTempFile::new_in("/var/tmp").unwrap();
    target.as_file().set_len(IMAGE_SIZE as u64).unwrap();

    for chunk_size in [64 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
        let mut receiver = Receiver::new(ReceiveOptions {
            chunk_size,
            ..ReceiveOptions::default()
        })
        .unwrap();

        group.bench_with_input(
            BenchmarkId::new("chunk_size", chunk_size),
            &chunk_size,
            |b, _| {
                b.iter(|| {
                    let mut reader = Cursor::new(&data);
                    let n = receiver
                        .receive(target.path(), &mut reader, IMAGE_SIZE as u64, 0, None)
                        .unwrap();
                    black_box(n)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark aligned buffer allocation
fn bench_aligned_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("aligned_buffer");

    for size in [4096, 1024 * 1024, 8 * 1024 * 1024] {
        group.bench_with_input(BenchmarkId::new("size", size), &size, |b, &size| {
            b.iter(|| black_box(AlignedBuffer::new(size, 4096).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_receive_chunk_size, bench_aligned_buffer);
criterion_main!(benches);
