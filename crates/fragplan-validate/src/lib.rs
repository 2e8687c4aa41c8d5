#![forbid(unsafe_code)]
//! fragplan-validate: structural and schema validation of plan documents.
//!
//! Phases, in report order:
//! - operator shape and worker lists (per fragment)
//! - reference resolution: name arena, dangling/duplicate names, cycles, single sink
//! - shuffle pairing across the whole plan (grouped by `arg_operator_id`)
//! - schema propagation leaves → sink, then producer/consumer cross-checks
//!
//! Every phase collects all of its errors. Schema propagation is skipped for a
//! fragment whose resolution failed.
//!
//! **Pure and synchronous.** With the `parallel` feature the per-fragment
//! phases may run on rayon; results are always collected in fragment order.

pub mod metrics;
pub mod propagate;
pub mod resolve;
pub mod shuffle;
pub mod validate;
pub mod verify;
pub mod workers;

pub use propagate::{propagate, propagate_with, PlanSchemas};
pub use resolve::{resolve_fragment, ResolvedFragment};
pub use shuffle::{check_shuffles, ShuffleMap, ShuffleRoute};
pub use workers::check_workers;
pub use validate::{validate_json, validate_plan, ValidateError, ValidatedPlan};
