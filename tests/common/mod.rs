//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::path::PathBuf;

use fragplan::{
    DataType, Fragment, InMemoryCatalog, Operator, PartitionFunction, Plan, RelationKey, Schema,
};

pub fn key(relation: &str) -> RelationKey {
    RelationKey::new("jwang", "global_join", relation)
}

pub fn follows() -> Schema {
    Schema::from_pairs([("follower", DataType::Long), ("followee", DataType::Long)])
}

/// Catalog holding `smallTable(follower, followee)`.
pub fn small_table_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new().with(key("smallTable"), follows())
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture_text(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("fixture readable")
}

pub fn scatter(name: &str, child: &str, id: &str, index: usize) -> Operator {
    Operator::shuffle_producer(name, child, id, PartitionFunction::SingleFieldHash { index })
}

pub fn gather(name: &str, id: &str, schema: Schema) -> Operator {
    Operator::shuffle_consumer(name, id, schema)
}

pub fn scan_then_insert() -> Plan {
    Plan::new(vec![Fragment::new(vec![
        Operator::scan("Scan", key("smallTable")),
        Operator::insert("Insert", "Scan", key("smallTable2"), true),
    ])
    .with_workers([1, 2])])
    .with_provenance(
        "smallTable2(_) :- smallTable(_).",
        "Insert[Scan[smallTable], smallTable2]",
    )
}

/// Scan → Scatter on `hash(follower)`, Gather → Insert. `gather_schema` is
/// what the consumer declares.
pub fn repartition_with(gather_schema: Schema) -> Plan {
    Plan::new(vec![
        Fragment::new(vec![
            Operator::scan("Scan", key("smallTable")),
            scatter("Scatter", "Scan", "hash(follower)", 0),
        ]),
        Fragment::new(vec![
            gather("Gather", "hash(follower)", gather_schema),
            Operator::insert("Insert", "Gather", key("smallTable_hash_follower"), true),
        ]),
    ])
    .with_provenance(
        "smallTable_hash_follower(x,y) :- smallTable(x,y), @hash(x).",
        "Insert[Shuffle(0)[Scan[smallTable], smallTable2]]",
    )
}

pub fn repartition_on_x() -> Plan {
    repartition_with(follows())
}

/// Two Scan → Scatter fragments feeding Gather×2 → Join → Insert.
pub fn single_join_with(select1: Vec<usize>, select2: Vec<usize>) -> Plan {
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
            gather("Gather0", "hash(x)", follows()),
            gather("Gather1", "hash(y)", follows()),
            Operator::local_join("Join", "Gather1", "Gather0", vec![1], vec![0], select1, select2),
            Operator::insert("Insert", "Join", key("smallTable_join_smallTable"), true),
        ])
        .with_workers([3, 4]),
    ])
    .with_provenance(
        "smallTable_join_smallTable(x,z) :- smallTable(x,y), mallTable(y,z)",
        "Insert(smallTable_join_smallTable)[Join(1=0; [0,3])[Shuffle(1)[Scan], Shuffle(1)[Scan]]]",
    )
}

pub fn single_join() -> Plan {
    single_join_with(vec![0], vec![1])
}

pub fn codes(report: &fragplan::ValidationReport) -> Vec<&'static str> {
    report.iter().map(|e| e.kind.code()).collect()
}
