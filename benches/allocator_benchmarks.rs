use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

use inference_wrapper::engine::MemoryType;
use inference_wrapper::{DataType, ResponseAllocator};

// =====================================================================
// Allocation/release cycle
// =====================================================================

fn bench_allocate_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_release");

    for byte_size in [64usize, 4 * 1024, 1024 * 1024] {
        group.bench_with_input(
            BenchmarkId::new("cpu", byte_size),
            &byte_size,
            |b, &byte_size| {
                let allocator = ResponseAllocator::with_host_runtime();
                b.iter(|| {
                    let allocation = allocator
                        .allocate("bench_output", byte_size, MemoryType::Cpu, 0)
                        .unwrap();
                    allocator.release(allocation.buffer, byte_size, MemoryType::Cpu, 0)
                });
            },
        );
    }

    group.finish();
}

fn bench_zero_byte_allocation(c: &mut Criterion) {
    let allocator = ResponseAllocator::with_host_runtime();
    c.bench_function("allocate_zero_byte", |b| {
        b.iter(|| {
            allocator
                .allocate("empty_output", 0, MemoryType::Cpu, 0)
                .unwrap()
        });
    });
}

// =====================================================================
// Conversion tables
// =====================================================================

fn bench_data_type_parsing(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut names: Vec<&str> = vec![
        "BOOL", "TYPE_BOOL", "UINT8", "INT32", "TYPE_INT32", "INT64", "FP16", "TYPE_FP32",
        "FP64", "BYTES", "TYPE_STRING", "BF16", "TYPE_BF16", "NOT_A_TYPE",
    ];
    names.shuffle(&mut rng);

    c.bench_function("data_type_from_config_str", |b| {
        b.iter(|| {
            names
                .iter()
                .map(|name| DataType::from_config_str(name))
                .filter(|dtype| *dtype != DataType::Invalid)
                .count()
        });
    });
}

criterion_group!(
    benches,
    bench_allocate_release,
    bench_zero_byte_allocation,
    bench_data_type_parsing
);
criterion_main!(benches);
