//! Schema propagation, leaves to sink.
//!
//! Each fragment is walked in its topological order. Leaves get their schema
//! from the catalog (`Scan`) or from their own declaration
//! (`ShuffleConsumer`); every other operator derives its schema from its
//! inputs. After all fragments are done, each shuffle consumer's declared
//! schema is checked against the schema its producer actually computes.
//! Downstream of a consumer the declared schema is used; the cross-check is
//! what makes that sound.
//!
//! An operator whose input schema is unknown stays unknown and raises nothing:
//! the upstream problem has already been reported.

use serde::Serialize;

use fragplan_core::catalog::RelationCatalog;
use fragplan_core::config::ValidatorConfig;
use fragplan_core::diagnostic::{ErrorKind, PlanError};
use fragplan_core::id::{OpIndex, OpRef};
use fragplan_core::operator::Operator;
use fragplan_core::plan::Plan;
use fragplan_core::schema::Schema;

use crate::resolve::ResolvedFragment;
use crate::shuffle::ShuffleMap;
use crate::validate::per_fragment;

/// Computed output schema of every operator, by plan address.
///
/// `None` means unknown (an error upstream, or the fragment did not resolve)
/// or, for `Insert`, that the operator has no output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSchemas {
    per_fragment: Vec<Vec<Option<Schema>>>,
}

impl PlanSchemas {
    pub fn get(&self, at: OpRef) -> Option<&Schema> {
        self.per_fragment
            .get(at.fragment.get())?
            .get(at.op.get())?
            .as_ref()
    }

    /// Schemas of one fragment in declaration order.
    pub fn fragment(&self, index: usize) -> &[Option<Schema>] {
        self.per_fragment.get(index).map_or(&[], Vec::as_slice)
    }
}

/// Propagate schemas with the default configuration (append check enabled,
/// sequential).
pub fn propagate(
    plan: &Plan,
    resolved: &[Option<ResolvedFragment>],
    shuffles: &ShuffleMap,
    catalog: &dyn RelationCatalog,
) -> (PlanSchemas, Vec<PlanError>) {
    propagate_with(plan, resolved, shuffles, catalog, &ValidatorConfig::default())
}

/// Propagate schemas honoring `cfg.check_append_schema` and `cfg.parallel`.
pub fn propagate_with(
    plan: &Plan,
    resolved: &[Option<ResolvedFragment>],
    shuffles: &ShuffleMap,
    catalog: &dyn RelationCatalog,
    cfg: &ValidatorConfig,
) -> (PlanSchemas, Vec<PlanError>) {
    let per: Vec<(Vec<Option<Schema>>, Vec<PlanError>)> =
        per_fragment(plan.fragments.len(), cfg.parallel, |fi| {
            let ops = plan
                .fragments
                .get(fi)
                .map_or(&[][..], |f| f.operators.as_slice());
            // A resolution of some other fragment (or plan) is ignored.
            match resolved.get(fi).and_then(Option::as_ref) {
                Some(r) if r.fragment().get() == fi && r.len() == ops.len() => {
                    propagate_fragment(ops, r, catalog, cfg.check_append_schema)
                }
                _ => (vec![None; ops.len()], Vec::new()),
            }
        });

    let mut schemas = PlanSchemas::default();
    let mut errors = Vec::new();
    for (s, e) in per {
        schemas.per_fragment.push(s);
        errors.extend(e);
    }
    errors.extend(cross_check(plan, &schemas, shuffles));
    (schemas, errors)
}

/// Walks in topological order; errors come back in declaration order.
fn propagate_fragment(
    ops: &[Operator],
    r: &ResolvedFragment,
    catalog: &dyn RelationCatalog,
    check_append: bool,
) -> (Vec<Option<Schema>>, Vec<PlanError>) {
    let fi = r.fragment().get();
    let mut out: Vec<Option<Schema>> = vec![None; ops.len()];
    let mut errors: Vec<(OpIndex, PlanError)> = Vec::new();

    for &at in r.topo_order() {
        let op = &ops[at.get()];
        let input = |k: usize| -> Option<&Schema> {
            let child: OpIndex = *r.children(at).get(k)?;
            out[child.get()].as_ref()
        };
        let (schema, kinds) = match op {
            Operator::Scan { relation_key, .. } => match catalog.schema_of(relation_key) {
                Some(s) => (Some(s), vec![]),
                None => (
                    None,
                    vec![ErrorKind::UnknownRelation {
                        relation: relation_key.clone(),
                    }],
                ),
            },
            Operator::ShuffleConsumer { arg_schema, .. } => (Some(arg_schema.clone()), vec![]),
            Operator::ShuffleProducer { arg_pf, .. } => match input(0) {
                Some(child) => {
                    let kinds: Vec<ErrorKind> = arg_pf
                        .indexes()
                        .iter()
                        .filter(|&&i| i >= child.len())
                        .map(|&i| ErrorKind::InvalidPartitionFunction {
                            reason: format!(
                                "{} index {i} is out of range for a {}-column input",
                                arg_pf.type_name(),
                                child.len()
                            ),
                        })
                        .collect();
                    (Some(child.clone()), kinds)
                }
                None => (None, vec![]),
            },
            Operator::LocalJoin {
                arg_columns1,
                arg_columns2,
                arg_select1,
                arg_select2,
                ..
            } => match (input(0), input(1)) {
                (Some(left), Some(right)) => join_schema(
                    left,
                    right,
                    [arg_columns1, arg_columns2],
                    [arg_select1, arg_select2],
                ),
                _ => (None, vec![]),
            },
            Operator::Insert {
                relation_key,
                arg_overwrite_table,
                ..
            } => {
                let mut kinds = Vec::new();
                if let Some(child) = input(0) {
                    if child.is_empty() {
                        kinds.push(ErrorKind::EmptyInsertSchema);
                    } else if !arg_overwrite_table && check_append {
                        let stored = catalog.schema_of(relation_key);
                        if let Some(diff) = stored.and_then(|s| s.first_mismatch(child)) {
                            kinds.push(ErrorKind::SchemaMismatch { diff });
                        }
                    }
                }
                (None, kinds)
            }
        };

        errors.extend(
            kinds
                .into_iter()
                .map(|k| (at, PlanError::new(k).in_fragment(fi).at(op.op_name()))),
        );
        out[at.get()] = schema;
    }

    errors.sort_by_key(|(at, _)| *at);
    (out, errors.into_iter().map(|(_, e)| e).collect())
}

/// Output of a join: `select1` over the left input then `select2` over the
/// right. Every index list is bounds-checked and paired key columns must
/// agree on type. Any problem leaves the output unknown.
fn join_schema(
    left: &Schema,
    right: &Schema,
    columns: [&Vec<usize>; 2],
    selects: [&Vec<usize>; 2],
) -> (Option<Schema>, Vec<ErrorKind>) {
    let mut kinds = Vec::new();
    let sides = [left, right];
    let lists = [
        ("arg_columns1", columns[0], 0),
        ("arg_columns2", columns[1], 1),
        ("arg_select1", selects[0], 0),
        ("arg_select2", selects[1], 1),
    ];
    for (field, list, side) in lists {
        let arity = sides[side].len();
        for &index in list.iter().filter(|&&i| i >= arity) {
            kinds.push(ErrorKind::ProjectionIndexOutOfRange {
                field: field.to_string(),
                index,
                arity,
            });
        }
    }
    if !kinds.is_empty() {
        return (None, kinds);
    }

    for (position, (&l, &r)) in columns[0].iter().zip(columns[1].iter()).enumerate() {
        let (lt, rt) = (left.fields[l].data_type, right.fields[r].data_type);
        if lt != rt {
            kinds.push(ErrorKind::JoinKeyTypeMismatch {
                position,
                left: lt,
                right: rt,
            });
        }
    }
    if !kinds.is_empty() {
        return (None, kinds);
    }

    match (left.project(selects[0]), right.project(selects[1])) {
        (Ok(l), Ok(r)) => (Some(l.concat(r)), kinds),
        _ => (None, kinds),
    }
}

/// Every consumer's declared schema against its producer's computed one, in
/// consumer plan order.
fn cross_check(plan: &Plan, schemas: &PlanSchemas, shuffles: &ShuffleMap) -> Vec<PlanError> {
    let mut errors: Vec<(OpRef, PlanError)> = Vec::new();
    for route in shuffles.iter() {
        let Some(produced) = schemas.get(route.producer) else {
            continue;
        };
        let producer_name = plan
            .operator(route.producer)
            .map(Operator::op_name)
            .unwrap_or_default();
        for &consumer in &route.consumers {
            let Some(Operator::ShuffleConsumer {
                op_name,
                arg_schema,
                ..
            }) = plan.operator(consumer)
            else {
                continue;
            };
            if let Some(diff) = produced.first_mismatch(arg_schema) {
                errors.push((
                    consumer,
                    PlanError::new(ErrorKind::SchemaMismatch { diff })
                        .in_fragment(consumer.fragment.get())
                        .at(op_name.as_str())
                        .at(producer_name),
                ));
            }
        }
    }
    errors.sort_by_key(|(at, _)| *at);
    errors.into_iter().map(|(_, e)| e).collect()
}
