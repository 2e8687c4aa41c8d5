//! `validate_plan`: every phase, every error, one report.
//!
//! Report order is phase, then fragment, then operator declaration position:
//! 1. operator shape and worker lists
//! 2. reference resolution
//! 3. shuffle pairing
//! 4. schema propagation, then producer/consumer cross-checks
//!
//! A fragment that fails to resolve is skipped by propagation; every other
//! phase always runs over the whole plan.

use thiserror::Error;

use fragplan_core::catalog::RelationCatalog;
use fragplan_core::config::ValidatorConfig;
use fragplan_core::diagnostic::{PlanError, ValidationReport};
use fragplan_core::hash::Hash256;
use fragplan_core::id::OpRef;
use fragplan_core::plan::Plan;
use fragplan_core::schema::Schema;

use crate::metrics::emit_phase;
use crate::propagate::{propagate_with, PlanSchemas};
use crate::resolve::{resolve_fragment, ResolvedFragment};
use crate::shuffle::{check_shuffles, ShuffleMap};
use crate::verify;
use crate::workers::check_workers;

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Core(#[from] fragplan_core::Error),

    #[error("plan rejected with {} error(s)", .0.len())]
    Rejected(ValidationReport),
}

pub type Result<T> = std::result::Result<T, ValidateError>;

/// A plan that passed every check, with everything derived while checking it.
/// Borrows the plan; never mutates it.
#[derive(Debug, Clone)]
pub struct ValidatedPlan<'a> {
    plan: &'a Plan,
    resolved: Vec<ResolvedFragment>,
    schemas: PlanSchemas,
    shuffles: ShuffleMap,
}

impl<'a> ValidatedPlan<'a> {
    pub fn plan(&self) -> &'a Plan {
        self.plan
    }

    pub fn resolved(&self, fragment: usize) -> Option<&ResolvedFragment> {
        self.resolved.get(fragment)
    }

    pub fn resolved_fragments(&self) -> &[ResolvedFragment] {
        &self.resolved
    }

    pub fn schemas(&self) -> &PlanSchemas {
        &self.schemas
    }

    pub fn schema_of(&self, at: OpRef) -> Option<&Schema> {
        self.schemas.get(at)
    }

    /// Output schema of the operator called `op_name` in `fragment`.
    pub fn schema_by_name(&self, fragment: usize, op_name: &str) -> Option<&Schema> {
        let op = self.resolved(fragment)?.index_of(op_name)?;
        self.schemas.get(OpRef::new(fragment, op.get()))
    }

    pub fn shuffles(&self) -> &ShuffleMap {
        &self.shuffles
    }

    /// blake3 over the plan's canonical JSON.
    pub fn fingerprint(&self) -> fragplan_core::Result<Hash256> {
        self.plan.fingerprint()
    }
}

/// Run every check over `plan`. Ok only when no phase found anything.
pub fn validate_plan<'a>(
    plan: &'a Plan,
    catalog: &dyn RelationCatalog,
    cfg: &ValidatorConfig,
) -> std::result::Result<ValidatedPlan<'a>, ValidationReport> {
    let mut report = ValidationReport::new();

    // 1. shape + workers
    for (fi, fragment) in plan.fragments.iter().enumerate() {
        for op in &fragment.operators {
            report.extend(
                op.shape_errors()
                    .into_iter()
                    .map(|k| PlanError::new(k).in_fragment(fi).at(op.op_name())),
            );
        }
        report.extend(check_workers(fi, fragment, cfg));
    }
    emit_phase("shape", &[("errors", report.len())]);

    // 2. resolve
    let results = per_fragment(plan.fragments.len(), cfg.parallel, |fi| {
        resolve_fragment(fi, &plan.fragments[fi])
    });
    let mut resolved: Vec<Option<ResolvedFragment>> = Vec::with_capacity(results.len());
    for r in results {
        match r {
            Ok(r) => resolved.push(Some(r)),
            Err(errs) => {
                report.extend(errs);
                resolved.push(None);
            }
        }
    }
    if cfg!(debug_assertions) {
        for r in resolved.iter().flatten() {
            verify::assert_topological(r);
            verify::assert_single_sink(r);
        }
    }
    emit_phase(
        "resolve",
        &[
            ("fragments", plan.fragments.len()),
            ("resolved", resolved.iter().flatten().count()),
        ],
    );

    // 3. shuffles
    let (shuffles, errs) = check_shuffles(plan);
    report.extend(errs);
    emit_phase("shuffle", &[("routes", shuffles.len())]);

    // 4. schemas
    let (schemas, errs) = propagate_with(plan, &resolved, &shuffles, catalog, cfg);
    report.extend(errs);
    emit_phase("propagate", &[("errors", report.len())]);

    #[cfg(feature = "tracing")]
    tracing::info!(
        fragments = plan.fragments.len(),
        errors = report.len(),
        "plan validated"
    );

    report.into_result()?;
    Ok(ValidatedPlan {
        plan,
        resolved: resolved.into_iter().flatten().collect(),
        schemas,
        shuffles,
    })
}

/// Decode `json` and validate it. Decode problems come back as `Rejected`
/// just like validation problems.
pub fn validate_json(
    json: &str,
    catalog: &dyn RelationCatalog,
    cfg: &ValidatorConfig,
) -> Result<Plan> {
    let plan = match Plan::from_json(json) {
        Ok(plan) => plan,
        Err(fragplan_core::Error::Decode(report)) => return Err(ValidateError::Rejected(report)),
        Err(e) => return Err(e.into()),
    };
    validate_plan(&plan, catalog, cfg).map_err(ValidateError::Rejected)?;
    Ok(plan)
}

/// Run `f` over fragment positions `0..n`, on rayon when built with the
/// `parallel` feature and asked to. Results are always in position order.
pub(crate) fn per_fragment<T, F>(n: usize, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;
            return (0..n).into_par_iter().map(f).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;
    (0..n).map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fragplan_core::catalog::InMemoryCatalog;
    use fragplan_core::operator::{Operator, PartitionFunction};
    use fragplan_core::plan::Fragment;
    use fragplan_core::relation::RelationKey;
    use fragplan_core::schema::DataType;

    fn key(rel: &str) -> RelationKey {
        RelationKey::new("jwang", "global_join", rel)
    }

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new().with(
            key("smallTable"),
            Schema::from_pairs([("follower", DataType::Long), ("followee", DataType::Long)]),
        )
    }

    fn codes(report: &ValidationReport) -> Vec<&'static str> {
        report.iter().map(|e| e.kind.code()).collect()
    }

    #[test]
    fn accepts_scan_then_insert() {
        let plan = Plan::new(vec![Fragment::new(vec![
            Operator::scan("Scan", key("smallTable")),
            Operator::insert("Insert", "Scan", key("smallTable2"), true),
        ])
        .with_workers([1, 2])]);
        let v = validate_plan(&plan, &catalog(), &ValidatorConfig::default()).unwrap();
        assert_eq!(v.resolved_fragments().len(), 1);
        assert_eq!(v.schema_by_name(0, "Scan").map(Schema::len), Some(2));
        assert_eq!(v.fingerprint().unwrap(), plan.fingerprint().unwrap());
    }

    #[test]
    fn report_is_ordered_by_phase() {
        let plan = Plan::new(vec![
            Fragment::new(vec![
                Operator::scan("Scan", key("nope")),
                Operator::shuffle_producer("Scatter", "Scan", "h", PartitionFunction::RoundRobin),
            ])
            .with_workers([]),
            Fragment::new(vec![Operator::insert("Insert", "Gone", key("out"), true)]),
        ]);
        let report = validate_plan(&plan, &catalog(), &ValidatorConfig::default()).unwrap_err();
        assert_eq!(
            codes(&report),
            vec![
                "EmptyWorkerList",
                "UnresolvedChildReference",
                "UnmatchedShuffleId",
                "UnknownRelation"
            ]
        );
    }

    #[test]
    fn report_is_ordered_by_fragment_within_a_phase() {
        let lone = |name: &str, id: &str| {
            Fragment::new(vec![
                Operator::scan("Scan", key("smallTable")),
                Operator::shuffle_producer(name, "Scan", id, PartitionFunction::RoundRobin),
            ])
        };
        let plan = Plan::new(vec![lone("P0", "zz"), lone("P1", "aa")]);
        let report = validate_plan(&plan, &catalog(), &ValidatorConfig::default()).unwrap_err();
        let at: Vec<_> = report.iter().map(|e| (e.kind.code(), e.fragment)).collect();
        assert_eq!(at, vec![("UnmatchedShuffleId", Some(0)), ("UnmatchedShuffleId", Some(1))]);
    }

    #[test]
    fn shape_errors_on_plans_built_in_code() {
        let plan = Plan::new(vec![Fragment::new(vec![
            Operator::scan("A", key("smallTable")),
            Operator::scan("B", key("smallTable")),
            Operator::local_join("J", "A", "B", vec![0, 1], vec![0], vec![0], vec![0]),
            Operator::insert("Insert", "J", key("out"), true),
        ])]);
        let report = validate_plan(&plan, &catalog(), &ValidatorConfig::default()).unwrap_err();
        assert_eq!(codes(&report), vec!["JoinColumnListLengthMismatch"]);
    }

    #[test]
    fn validate_json_maps_decode_errors_to_rejected() {
        let doc = r#"{"fragments":[{"operators":[{"op_name":"X","op_type":"Apply"}]}]}"#;
        match validate_json(doc, &catalog(), &ValidatorConfig::default()) {
            Err(ValidateError::Rejected(report)) => assert!(report.has("UnknownOpType")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            validate_json("{", &catalog(), &ValidatorConfig::default()),
            Err(ValidateError::Core(fragplan_core::Error::Json(_)))
        ));
    }
}
