//! Structured validation diagnostics.
//!
//! Every problem found in a plan document becomes one `PlanError`: the failing
//! fragment (when the problem belongs to one), the offending operator names and
//! the error kind. Validation never stops at the first problem; errors are
//! accumulated into a `ValidationReport` in the order the phases produce them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::relation::RelationKey;
use crate::schema::{DataType, SchemaDiff};

/// Which side of a shuffle pairing is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShuffleSide {
    Producer,
    Consumer,
}

impl fmt::Display for ShuffleSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShuffleSide::Producer => f.write_str("producer"),
            ShuffleSide::Consumer => f.write_str("consumer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ErrorKind {
    // --- decode ---
    #[error("operator has no op_name")]
    MissingOperatorName,

    #[error("missing required field `{field}`")]
    MissingRequiredField { field: String },

    #[error("unknown op_type `{op_type}`")]
    UnknownOpType { op_type: String },

    #[error("field `{field}` is malformed: {reason}")]
    MalformedField { field: String, reason: String },

    #[error("invalid partition function: {reason}")]
    InvalidPartitionFunction { reason: String },

    #[error("join column list `{field}` is empty")]
    EmptyJoinColumnList { field: String },

    #[error("arg_columns1 has {left} entries but arg_columns2 has {right}")]
    JoinColumnListLengthMismatch { left: usize, right: usize },

    // --- fragment structure ---
    #[error("operator name `{name}` is declared more than once")]
    DuplicateOperatorName { name: String },

    #[error("child reference `{child}` does not name an operator in this fragment")]
    UnresolvedChildReference { child: String },

    #[error("child references form a cycle: {}", .cycle.join(" -> "))]
    CyclicReference { cycle: Vec<String> },

    #[error("fragment must have exactly one terminal operator, found {count}")]
    MultipleOrNoTerminalOperator { count: usize },

    #[error("fragment declares an empty worker list")]
    EmptyWorkerList,

    #[error("worker {worker} is listed more than once")]
    DuplicateWorker { worker: i32 },

    #[error("worker {worker} is not a known worker")]
    UnknownWorker { worker: i32 },

    // --- shuffle pairing ---
    #[error("shuffle id `{id}` has no {missing}")]
    UnmatchedShuffleId { id: String, missing: ShuffleSide },

    #[error("shuffle id `{id}` has its producer and a consumer in the same fragment")]
    ShuffleSameFragment { id: String },

    #[error("shuffle id `{id}` is produced by {count} producers")]
    DuplicateProducerForId { id: String, count: usize },

    // --- schema ---
    #[error("relation {relation} is not in the catalog")]
    UnknownRelation { relation: RelationKey },

    #[error("schema mismatch: {diff}")]
    SchemaMismatch { diff: SchemaDiff },

    #[error("`{field}` index {index} is out of range for a {arity}-column input")]
    ProjectionIndexOutOfRange {
        field: String,
        index: usize,
        arity: usize,
    },

    #[error("join key {position}: left is {left}, right is {right}")]
    JoinKeyTypeMismatch {
        position: usize,
        left: DataType,
        right: DataType,
    },

    #[error("insert child produces no columns")]
    EmptyInsertSchema,
}

impl ErrorKind {
    /// Stable kind name, independent of the payload.
    pub fn code(&self) -> &'static str {
        use ErrorKind::*;
        match self {
            MissingOperatorName => "MissingOperatorName",
            MissingRequiredField { .. } => "MissingRequiredField",
            UnknownOpType { .. } => "UnknownOpType",
            MalformedField { .. } => "MalformedField",
            InvalidPartitionFunction { .. } => "InvalidPartitionFunction",
            EmptyJoinColumnList { .. } => "EmptyJoinColumnList",
            JoinColumnListLengthMismatch { .. } => "JoinColumnListLengthMismatch",
            DuplicateOperatorName { .. } => "DuplicateOperatorName",
            UnresolvedChildReference { .. } => "UnresolvedChildReference",
            CyclicReference { .. } => "CyclicReference",
            MultipleOrNoTerminalOperator { .. } => "MultipleOrNoTerminalOperator",
            EmptyWorkerList => "EmptyWorkerList",
            DuplicateWorker { .. } => "DuplicateWorker",
            UnknownWorker { .. } => "UnknownWorker",
            UnmatchedShuffleId { .. } => "UnmatchedShuffleId",
            ShuffleSameFragment { .. } => "ShuffleSameFragment",
            DuplicateProducerForId { .. } => "DuplicateProducerForId",
            UnknownRelation { .. } => "UnknownRelation",
            SchemaMismatch { .. } => "SchemaMismatch",
            ProjectionIndexOutOfRange { .. } => "ProjectionIndexOutOfRange",
            JoinKeyTypeMismatch { .. } => "JoinKeyTypeMismatch",
            EmptyInsertSchema => "EmptyInsertSchema",
        }
    }
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanError {
    /// Fragment position, `None` for plan-wide problems.
    pub fragment: Option<usize>,
    /// Offending operator names (may be empty).
    pub operators: Vec<String>,
    pub kind: ErrorKind,
}

impl PlanError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            fragment: None,
            operators: Vec::new(),
            kind,
        }
    }

    pub fn in_fragment(mut self, fragment: usize) -> Self {
        self.fragment = Some(fragment);
        self
    }

    pub fn at(mut self, op_name: impl Into<String>) -> Self {
        self.operators.push(op_name.into());
        self
    }

    pub fn at_all<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operators.extend(names.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.code())?;
        if let Some(frag) = self.fragment {
            write!(f, " [fragment {frag}]")?;
        }
        if !self.operators.is_empty() {
            write!(f, " [{}]", self.operators.join(", "))?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for PlanError {}

/// All errors found in one pass over a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationReport {
    errors: Vec<PlanError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: PlanError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[PlanError] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanError> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<PlanError> {
        self.errors
    }

    /// True when any error has the given kind name (see `ErrorKind::code`).
    pub fn has(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.kind.code() == code)
    }

    /// Errors of the given kind name.
    pub fn of_kind<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a PlanError> + 'a {
        self.errors.iter().filter(move |e| e.kind.code() == code)
    }

    /// Ok when empty, otherwise the report itself as the error.
    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Extend<PlanError> for ValidationReport {
    fn extend<T: IntoIterator<Item = PlanError>>(&mut self, iter: T) {
        self.errors.extend(iter);
    }
}

impl FromIterator<PlanError> for ValidationReport {
    fn from_iter<T: IntoIterator<Item = PlanError>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationReport {
    type Item = PlanError;
    type IntoIter = std::vec::IntoIter<PlanError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationReport {
    type Item = &'a PlanError;
    type IntoIter = std::slice::Iter<'a, PlanError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}
