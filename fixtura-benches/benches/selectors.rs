//! Matching cost as declared selectors and their scopes grow.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use fixtura_benches::{
    error::BenchSetupError,
    params::{SelectorParams, ShapeParams},
    schemas::{chain, level_name, member_name},
};
use fixtura_core::{
    FixtureBuilder, Gen,
    select::{field, scope},
};

const SEED: u64 = 42;
const SHAPE: ShapeParams = ShapeParams { depth: 4, breadth: 8 };

const RUNS: &[SelectorParams] = &[
    SelectorParams { selectors: 0, scopes: 0 },
    SelectorParams { selectors: 8, scopes: 0 },
    SelectorParams { selectors: 32, scopes: 0 },
    SelectorParams { selectors: 32, scopes: 2 },
];

fn declare(params: SelectorParams) -> Result<FixtureBuilder, BenchSetupError> {
    let (schema, root) = chain(SHAPE)?;
    let mut builder = FixtureBuilder::from_schema(schema, root)
        .with_seed(SEED)
        .lenient();
    for index in 0..params.selectors {
        let level = index % SHAPE.depth;
        // Every fourth member is a `String`.
        let member = member_name((index / SHAPE.depth).saturating_mul(4) % SHAPE.breadth);
        let scopes = (1..=params.scopes.min(level))
            .rev()
            .map(|up| scope(&level_name(level - up)));
        let selector = field(&level_name(level), &member).within(scopes);
        builder = builder.generate(selector, Gen::strings().prefix("bench-"));
    }
    Ok(builder)
}

fn match_selectors_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("match_selectors");
    group.sample_size(30);

    for &params in RUNS {
        let builder = declare(params)?;
        builder.create_value()?;
        group.bench_with_input(BenchmarkId::from_parameter(params), &builder, |b, builder| {
            b.iter(|| builder.create_value());
        });
    }

    group.finish();
    Ok(())
}

fn match_selectors(c: &mut Criterion) {
    if let Err(err) = match_selectors_impl(c) {
        panic!("match_selectors benchmark setup failed: {err}");
    }
}

criterion_group!(benches, match_selectors);
criterion_main!(benches);
