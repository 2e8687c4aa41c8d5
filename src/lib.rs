#![forbid(unsafe_code)]
//! fragplan: validation of distributed query plan fragments.
//!
//! Facade over the workspace crates; the integration tests and benches link
//! against this.

pub use fragplan_core;
pub use fragplan_validate;

pub use fragplan_core::prelude::*;
pub use fragplan_validate::{validate_json, validate_plan, ValidateError, ValidatedPlan};
