//! Structured decoding of plan documents.
//!
//! The wire form is loosely typed: every operator is a JSON object whose
//! required keys depend on `op_type`. Decoding first reads each operator as a
//! plain map, then checks it field by field so that a single pass reports every
//! missing or malformed field in the whole document.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::diagnostic::{ErrorKind, PlanError, ValidationReport};
use crate::error::{Error, Result};
use crate::operator::{OpType, Operator, PartitionFunction};
use crate::plan::{Fragment, Plan};
use crate::relation::RelationKey;
use crate::schema::Schema;

/// One operator exactly as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawOperator(pub Map<String, Value>);

#[derive(Debug, Clone, Deserialize)]
struct RawFragment {
    operators: Vec<RawOperator>,
    #[serde(default)]
    workers: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPlan {
    #[serde(default)]
    raw_datalog: String,
    #[serde(default)]
    logical_ra: String,
    fragments: Vec<RawFragment>,
}

impl TryFrom<RawOperator> for Operator {
    type Error = PlanError;

    fn try_from(raw: RawOperator) -> std::result::Result<Self, Self::Error> {
        decode_operator(&raw).map_err(|mut errs| errs.remove(0))
    }
}

/// Decode a whole plan document, collecting every operator-level problem.
pub fn decode_plan(json: &str) -> Result<Plan> {
    let raw: RawPlan = serde_json::from_str(json)?;
    decode_raw_plan(raw)
}

/// Same as [`decode_plan`] for an already-parsed JSON value.
pub fn decode_plan_value(value: Value) -> Result<Plan> {
    let raw: RawPlan = serde_json::from_value(value)?;
    decode_raw_plan(raw)
}

fn decode_raw_plan(raw: RawPlan) -> Result<Plan> {
    let mut report = ValidationReport::new();
    let mut fragments = Vec::with_capacity(raw.fragments.len());

    for (fi, frag) in raw.fragments.into_iter().enumerate() {
        let mut operators = Vec::with_capacity(frag.operators.len());
        for raw_op in &frag.operators {
            match decode_operator(raw_op) {
                Ok(op) => operators.push(op),
                Err(errs) => report.extend(errs.into_iter().map(|e| e.in_fragment(fi))),
            }
        }
        fragments.push(Fragment {
            operators,
            workers: frag.workers,
        });
    }

    if !report.is_empty() {
        #[cfg(feature = "tracing")]
        tracing::debug!(errors = report.len(), "plan document failed to decode");
        return Err(Error::Decode(report));
    }

    Ok(Plan {
        raw_datalog: raw.raw_datalog,
        logical_ra: raw.logical_ra,
        fragments,
    })
}

/// Decode one operator. On failure returns every problem found in it.
pub fn decode_operator(raw: &RawOperator) -> std::result::Result<Operator, Vec<PlanError>> {
    let mut f = Fields::new(&raw.0);

    let op_name: Option<String> = match raw.0.get("op_name") {
        None | Some(Value::Null) => {
            f.errors.push(ErrorKind::MissingOperatorName);
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            f.errors.push(ErrorKind::MalformedField {
                field: "op_name".into(),
                reason: format!("expected a string, found {other}"),
            });
            None
        }
    };

    let op_type = f.required::<String>("op_type").and_then(|t| {
        let parsed = OpType::from_wire(&t);
        if parsed.is_none() {
            f.errors.push(ErrorKind::UnknownOpType { op_type: t });
        }
        parsed
    });

    let op = match op_type {
        Some(t) => decode_variant(t, op_name.clone().unwrap_or_default(), &mut f),
        None => None,
    };
    if let Some(op) = &op {
        f.errors.extend(op.shape_errors());
    }

    match op {
        Some(op) if op_name.is_some() && f.errors.is_empty() => Ok(op),
        _ => Err(f
            .errors
            .into_iter()
            .map(|kind| {
                let e = PlanError::new(kind);
                match &op_name {
                    Some(n) => e.at(n.clone()),
                    None => e,
                }
            })
            .collect()),
    }
}

/// Reads the variant fields. Returns `None` when any of them is missing or
/// malformed; the problems are left in `f.errors`.
fn decode_variant(t: OpType, op_name: String, f: &mut Fields<'_>) -> Option<Operator> {
    match t {
        OpType::Scan => {
            let relation_key: RelationKey = f.required("relation_key")?;
            Some(Operator::Scan {
                op_name,
                relation_key,
            })
        }
        OpType::Insert => {
            let arg_child: Option<String> = f.required("arg_child");
            let relation_key: Option<RelationKey> = f.required("relation_key");
            let arg_overwrite_table: Option<bool> = f.required("arg_overwrite_table");
            Some(Operator::Insert {
                op_name,
                arg_child: arg_child?,
                relation_key: relation_key?,
                arg_overwrite_table: arg_overwrite_table?,
            })
        }
        OpType::ShuffleProducer => {
            let arg_child: Option<String> = f.required("arg_child");
            let arg_operator_id: Option<String> = f.required("arg_operator_id");
            let arg_pf = f.partition_function();
            Some(Operator::ShuffleProducer {
                op_name,
                arg_child: arg_child?,
                arg_operator_id: arg_operator_id?,
                arg_pf: arg_pf?,
            })
        }
        OpType::ShuffleConsumer => {
            let arg_operator_id: Option<String> = f.required("arg_operator_id");
            let arg_schema: Option<Schema> = f.required("arg_schema");
            Some(Operator::ShuffleConsumer {
                op_name,
                arg_operator_id: arg_operator_id?,
                arg_schema: arg_schema?,
            })
        }
        OpType::LocalJoin => {
            let arg_child1: Option<String> = f.required("arg_child1");
            let arg_child2: Option<String> = f.required("arg_child2");
            let arg_columns1: Option<Vec<usize>> = f.required("arg_columns1");
            let arg_columns2: Option<Vec<usize>> = f.required("arg_columns2");
            let arg_select1: Option<Vec<usize>> = f.required("arg_select1");
            let arg_select2: Option<Vec<usize>> = f.required("arg_select2");

            Some(Operator::LocalJoin {
                op_name,
                arg_child1: arg_child1?,
                arg_child2: arg_child2?,
                arg_columns1: arg_columns1?,
                arg_columns2: arg_columns2?,
                arg_select1: arg_select1?,
                arg_select2: arg_select2?,
            })
        }
    }
}

/// Field reader that records problems instead of returning early.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    errors: Vec<ErrorKind>,
}

impl<'a> Fields<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            errors: Vec::new(),
        }
    }

    fn present(&mut self, field: &str) -> Option<&'a Value> {
        match self.map.get(field) {
            None | Some(Value::Null) => {
                self.errors.push(ErrorKind::MissingRequiredField {
                    field: field.to_string(),
                });
                None
            }
            Some(v) => Some(v),
        }
    }

    fn required<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        let v = self.present(field)?;
        match T::deserialize(v) {
            Ok(t) => Some(t),
            Err(e) => {
                self.errors.push(ErrorKind::MalformedField {
                    field: field.to_string(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn partition_function(&mut self) -> Option<PartitionFunction> {
        let v = self.present("arg_pf")?;
        match PartitionFunction::deserialize(v) {
            Ok(pf) => Some(pf),
            Err(e) => {
                self.errors.push(ErrorKind::InvalidPartitionFunction {
                    reason: e.to_string(),
                });
                None
            }
        }
    }
}
