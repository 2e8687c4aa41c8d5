//! Physical operators, one enum variant per `op_type`.
//!
//! Operators name their children (`arg_child`, `arg_child1`, `arg_child2`)
//! instead of holding them; `fragplan-validate` resolves the names inside the
//! owning fragment. Shuffle operators are correlated plan-wide through
//! `arg_operator_id`.
//!
//! Serialization writes the canonical wire form. Deserialization goes through
//! `decode::RawOperator` so every input path reports the same error kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decode::RawOperator;
use crate::diagnostic::ErrorKind;
use crate::relation::RelationKey;
use crate::schema::Schema;

/// Routing rule of a `ShuffleProducer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PartitionFunction {
    /// Hash the value at one column.
    SingleFieldHash { index: usize },
    /// Hash the values at several columns together.
    MultiFieldHash { indexes: Vec<usize> },
    /// Spread tuples evenly, ignoring their contents.
    RoundRobin,
}

impl PartitionFunction {
    /// Column positions the function reads.
    pub fn indexes(&self) -> &[usize] {
        match self {
            PartitionFunction::SingleFieldHash { index } => std::slice::from_ref(index),
            PartitionFunction::MultiFieldHash { indexes } => indexes,
            PartitionFunction::RoundRobin => &[],
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PartitionFunction::SingleFieldHash { .. } => "SingleFieldHash",
            PartitionFunction::MultiFieldHash { .. } => "MultiFieldHash",
            PartitionFunction::RoundRobin => "RoundRobin",
        }
    }
}

/// Discriminant of an operator, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpType {
    Scan,
    Insert,
    ShuffleProducer,
    ShuffleConsumer,
    LocalJoin,
}

impl OpType {
    /// Parse a wire `op_type`, including the `SQLite*` spellings used by older documents.
    pub fn from_wire(s: &str) -> Option<OpType> {
        match s {
            "Scan" | "SQLiteScan" => Some(OpType::Scan),
            "Insert" | "SQLiteInsert" => Some(OpType::Insert),
            "ShuffleProducer" => Some(OpType::ShuffleProducer),
            "ShuffleConsumer" => Some(OpType::ShuffleConsumer),
            "LocalJoin" => Some(OpType::LocalJoin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Scan => "Scan",
            OpType::Insert => "Insert",
            OpType::ShuffleProducer => "ShuffleProducer",
            OpType::ShuffleConsumer => "ShuffleConsumer",
            OpType::LocalJoin => "LocalJoin",
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op_type", try_from = "RawOperator")]
pub enum Operator {
    Scan {
        op_name: String,
        relation_key: RelationKey,
    },
    Insert {
        op_name: String,
        arg_child: String,
        relation_key: RelationKey,
        arg_overwrite_table: bool,
    },
    ShuffleProducer {
        op_name: String,
        arg_child: String,
        arg_operator_id: String,
        arg_pf: PartitionFunction,
    },
    ShuffleConsumer {
        op_name: String,
        arg_operator_id: String,
        arg_schema: Schema,
    },
    LocalJoin {
        op_name: String,
        arg_child1: String,
        arg_child2: String,
        arg_columns1: Vec<usize>,
        arg_columns2: Vec<usize>,
        arg_select1: Vec<usize>,
        arg_select2: Vec<usize>,
    },
}

impl Operator {
    pub fn op_name(&self) -> &str {
        use Operator::*;
        match self {
            Scan { op_name, .. }
            | Insert { op_name, .. }
            | ShuffleProducer { op_name, .. }
            | ShuffleConsumer { op_name, .. }
            | LocalJoin { op_name, .. } => op_name,
        }
    }

    pub fn op_type(&self) -> OpType {
        match self {
            Operator::Scan { .. } => OpType::Scan,
            Operator::Insert { .. } => OpType::Insert,
            Operator::ShuffleProducer { .. } => OpType::ShuffleProducer,
            Operator::ShuffleConsumer { .. } => OpType::ShuffleConsumer,
            Operator::LocalJoin { .. } => OpType::LocalJoin,
        }
    }

    /// Child names in input order (`arg_child1` before `arg_child2`).
    pub fn children(&self) -> Vec<&str> {
        match self {
            Operator::Scan { .. } | Operator::ShuffleConsumer { .. } => vec![],
            Operator::Insert { arg_child, .. } | Operator::ShuffleProducer { arg_child, .. } => {
                vec![arg_child.as_str()]
            }
            Operator::LocalJoin {
                arg_child1,
                arg_child2,
                ..
            } => vec![arg_child1.as_str(), arg_child2.as_str()],
        }
    }

    /// Returns the number of inputs for this node.
    pub fn inputs(&self) -> usize {
        self.children().len()
    }

    /// Shuffle correlation id for producers and consumers.
    pub fn shuffle_id(&self) -> Option<&str> {
        match self {
            Operator::ShuffleProducer {
                arg_operator_id, ..
            }
            | Operator::ShuffleConsumer {
                arg_operator_id, ..
            } => Some(arg_operator_id),
            _ => None,
        }
    }

    /// True for operators whose fragment-local input is empty.
    pub fn is_leaf(&self) -> bool {
        self.inputs() == 0
    }

    /// Problems visible on the operator alone, without its children or the
    /// catalog: empty or unequal join column lists, an empty multi-field hash.
    pub fn shape_errors(&self) -> Vec<ErrorKind> {
        match self {
            Operator::LocalJoin {
                arg_columns1,
                arg_columns2,
                ..
            } => {
                let mut errs = Vec::new();
                let lists = [("arg_columns1", arg_columns1), ("arg_columns2", arg_columns2)];
                for (field, cols) in lists {
                    if cols.is_empty() {
                        errs.push(ErrorKind::EmptyJoinColumnList {
                            field: field.to_string(),
                        });
                    }
                }
                if errs.is_empty() && arg_columns1.len() != arg_columns2.len() {
                    errs.push(ErrorKind::JoinColumnListLengthMismatch {
                        left: arg_columns1.len(),
                        right: arg_columns2.len(),
                    });
                }
                errs
            }
            Operator::ShuffleProducer {
                arg_pf: PartitionFunction::MultiFieldHash { indexes },
                ..
            } if indexes.is_empty() => vec![ErrorKind::InvalidPartitionFunction {
                reason: "MultiFieldHash needs at least one index".into(),
            }],
            _ => vec![],
        }
    }

    // --- constructors (mostly for tests and tools that build plans in code) ---

    pub fn scan(op_name: impl Into<String>, relation_key: RelationKey) -> Self {
        Operator::Scan {
            op_name: op_name.into(),
            relation_key,
        }
    }

    pub fn insert(
        op_name: impl Into<String>,
        arg_child: impl Into<String>,
        relation_key: RelationKey,
        arg_overwrite_table: bool,
    ) -> Self {
        Operator::Insert {
            op_name: op_name.into(),
            arg_child: arg_child.into(),
            relation_key,
            arg_overwrite_table,
        }
    }

    pub fn shuffle_producer(
        op_name: impl Into<String>,
        arg_child: impl Into<String>,
        arg_operator_id: impl Into<String>,
        arg_pf: PartitionFunction,
    ) -> Self {
        Operator::ShuffleProducer {
            op_name: op_name.into(),
            arg_child: arg_child.into(),
            arg_operator_id: arg_operator_id.into(),
            arg_pf,
        }
    }

    pub fn shuffle_consumer(
        op_name: impl Into<String>,
        arg_operator_id: impl Into<String>,
        arg_schema: Schema,
    ) -> Self {
        Operator::ShuffleConsumer {
            op_name: op_name.into(),
            arg_operator_id: arg_operator_id.into(),
            arg_schema,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn local_join(
        op_name: impl Into<String>,
        arg_child1: impl Into<String>,
        arg_child2: impl Into<String>,
        arg_columns1: Vec<usize>,
        arg_columns2: Vec<usize>,
        arg_select1: Vec<usize>,
        arg_select2: Vec<usize>,
    ) -> Self {
        Operator::LocalJoin {
            op_name: op_name.into(),
            arg_child1: arg_child1.into(),
            arg_child2: arg_child2.into(),
            arg_columns1,
            arg_columns2,
            arg_select1,
            arg_select2,
        }
    }
}
