#![forbid(unsafe_code)]
//! fragplan-core: the plan IR for distributed query fragments.
//!
//! Responsibilities:
//! - Value types for plans: `Schema`, `RelationKey`, `Operator`, `Fragment`, `Plan`.
//! - Structured decoding of the JSON wire form (collects every problem it finds).
//! - Validation diagnostics (`PlanError`, `ErrorKind`, `ValidationReport`).
//! - The relation catalog collaborator interface plus an in-memory catalog.
//! - Validator configuration and stable plan fingerprints.
//!
//! **No graph reasoning here.** Resolution, shuffle pairing and schema
//! propagation live in `fragplan-validate`.

pub mod catalog;
pub mod config;
pub mod decode;
pub mod diagnostic;
pub mod error;
pub mod hash;
pub mod id;
pub mod operator;
pub mod plan;
pub mod prelude;
pub mod relation;
pub mod schema;

pub use error::{Error, Result};

/// Crate version, embedded into CLI output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
