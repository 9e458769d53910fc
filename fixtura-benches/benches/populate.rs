//! Population throughput as schema depth and breadth grow.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use fixtura_benches::{error::BenchSetupError, params::ShapeParams, schemas::chain};
use fixtura_core::FixtureBuilder;

const SEED: u64 = 42;

const SHAPES: &[ShapeParams] = &[
    ShapeParams { depth: 2, breadth: 4 },
    ShapeParams { depth: 4, breadth: 4 },
    ShapeParams { depth: 4, breadth: 16 },
    ShapeParams { depth: 6, breadth: 8 },
];

fn populate_chain_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("populate_chain");
    group.sample_size(30);

    for &shape in SHAPES {
        let (schema, root) = chain(shape)?;
        let builder = FixtureBuilder::from_schema(schema, root)
            .with_seed(SEED)
            .with_max_depth(shape.depth.saturating_mul(2));
        builder.create_value()?;

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(shape), &builder, |b, builder| {
            b.iter(|| builder.create_value());
        });
    }

    group.finish();
    Ok(())
}

fn create_list_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("create_list");
    let shape = ShapeParams { depth: 3, breadth: 6 };
    let (schema, root) = chain(shape)?;
    let builder = FixtureBuilder::from_schema(schema, root).with_seed(SEED);

    for count in [1_usize, 10, 100] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| builder.create_values(count));
        });
    }

    group.finish();
    Ok(())
}

fn populate_chain(c: &mut Criterion) {
    if let Err(err) = populate_chain_impl(c) {
        panic!("populate_chain benchmark setup failed: {err}");
    }
}

fn create_list(c: &mut Criterion) {
    if let Err(err) = create_list_impl(c) {
        panic!("create_list benchmark setup failed: {err}");
    }
}

criterion_group!(benches, populate_chain, create_list);
criterion_main!(benches);
