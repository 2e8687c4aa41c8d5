use criterion::{criterion_group, criterion_main, Criterion};
use fragplan::{
    validate_plan, DataType, Fragment, InMemoryCatalog, Operator, PartitionFunction, Plan,
    RelationKey, Schema, ValidatorConfig,
};

fn key(rel: &str) -> RelationKey {
    RelationKey::new("jwang", "global_join", rel)
}

fn follows() -> Schema {
    Schema::from_pairs([("follower", DataType::Long), ("followee", DataType::Long)])
}

/// Two Scan → Scatter fragments feeding Gather×2 → Join → Insert.
fn single_join() -> Plan {
    let scatter = |name: &str, child: &str, id: &str, index: usize| {
        Operator::shuffle_producer(name, child, id, PartitionFunction::SingleFieldHash { index })
    };
    Plan::new(vec![
        Fragment::new(vec![
            Operator::scan("Scan0", key("smallTable")),
            scatter("Scatter0", "Scan0", "hash(x)", 0),
        ])
        .with_workers([1, 2]),
        Fragment::new(vec![
            Operator::scan("Scan1", key("smallTable")),
            scatter("Scatter1", "Scan1", "hash(y)", 1),
        ])
        .with_workers([1, 2]),
        Fragment::new(vec![
            Operator::shuffle_consumer("Gather0", "hash(x)", follows()),
            Operator::shuffle_consumer("Gather1", "hash(y)", follows()),
            Operator::local_join("Join", "Gather1", "Gather0", vec![1], vec![0], vec![0], vec![1]),
            Operator::insert("Insert", "Join", key("smallTable_join_smallTable"), true),
        ])
        .with_workers([3, 4]),
    ])
}

fn bench_validate(c: &mut Criterion) {
    let plan = single_join();
    let catalog = InMemoryCatalog::new().with(key("smallTable"), follows());
    let cfg = ValidatorConfig::default();
    c.bench_function("validate_single_join", |b| {
        b.iter(|| {
            let _ = validate_plan(&plan, &catalog, &cfg).unwrap();
        })
    });

    let json = plan.to_json().unwrap();
    c.bench_function("decode_single_join", |b| {
        b.iter(|| {
            let _ = Plan::from_json(&json).unwrap();
        })
    });
}

criterion_group!(validation, bench_validate);
criterion_main!(validation);
