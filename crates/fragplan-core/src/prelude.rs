//! Convenient re-exports for downstream crates.

pub use crate::catalog::{InMemoryCatalog, RelationCatalog};
pub use crate::config::ValidatorConfig;
pub use crate::diagnostic::{ErrorKind, PlanError, ShuffleSide, ValidationReport};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{FragmentId, OpIndex, OpRef};
pub use crate::operator::{OpType, Operator, PartitionFunction};
pub use crate::plan::{Fragment, Plan};
pub use crate::relation::RelationKey;
pub use crate::schema::{DataType, Field, Schema, SchemaDiff};
