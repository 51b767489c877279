//! Memory block benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use memblock::{AllocationParams, MapFlags, Memory, MemoryFlags};
use std::sync::Arc;

fn bench_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc");

    for size in [64, 4096, 65536] {
        let params = AllocationParams::default();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| Memory::alloc(None, size, &params).expect("allocation"));
        });
    }

    group.finish();
}

fn bench_map_unmap(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_unmap");
    let mem = Memory::new_wrapped(MemoryFlags::empty(), vec![0u8; 4096], 4096, 0, 4096).unwrap();

    group.bench_function("read", |b| {
        b.iter(|| {
            let map = mem.map(MapFlags::READ).expect("readable");
            std::hint::black_box(map.as_ptr());
        });
    });
    group.bench_function("write", |b| {
        b.iter(|| {
            let map = mem.map(MapFlags::WRITE).expect("writable");
            std::hint::black_box(map.as_ptr());
        });
    });

    group.finish();
}

fn bench_copy_vs_share(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_vs_share");

    for size in [1024, 65536, 1024 * 1024] {
        let mem = Memory::alloc(None, size, &AllocationParams::default()).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("copy", size), &mem, |b, mem| {
            b.iter(|| mem.copy(0, None).expect("copy"));
        });
        group.bench_with_input(BenchmarkId::new("share", size), &mem, |b, mem| {
            b.iter(|| mem.share(0, None).expect("share"));
        });
    }

    group.finish();
}

fn bench_concurrent_read_maps(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_read_maps");
    let mem = Arc::new(Memory::alloc(None, 4096, &AllocationParams::default()).unwrap());

    group.throughput(Throughput::Elements(400));
    group.bench_function("4_threads_100_maps_each", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let mem = Arc::clone(&mem);
                    std::thread::spawn(move || {
                        for _ in 0..100 {
                            if let Some(map) = mem.map(MapFlags::READ) {
                                std::hint::black_box(map.as_ptr());
                            }
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_alloc,
    bench_map_unmap,
    bench_copy_vs_share,
    bench_concurrent_read_maps
);
criterion_main!(benches);
