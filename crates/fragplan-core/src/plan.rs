//! Fragments and plans.
//!
//! A `Plan` is an ordered list of `Fragment`s plus free-text provenance. Each
//! fragment is an operator pipeline instantiated once per listed worker.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hash::{self, Hash256};
use crate::id::OpRef;
use crate::operator::Operator;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Declaration order, not necessarily execution order.
    pub operators: Vec<Operator>,

    /// Workers this fragment runs on (one pipeline copy each). Absent means the
    /// scheduler decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<Vec<i32>>,
}

impl Fragment {
    pub fn new(operators: Vec<Operator>) -> Self {
        Self {
            operators,
            workers: None,
        }
    }

    pub fn with_workers(mut self, workers: impl IntoIterator<Item = i32>) -> Self {
        self.workers = Some(workers.into_iter().collect());
        self
    }

    pub fn operator(&self, idx: usize) -> Option<&Operator> {
        self.operators.get(idx)
    }

    /// Number of pipeline instances, when the worker list is known.
    pub fn instance_count(&self) -> Option<usize> {
        self.workers.as_ref().map(Vec::len)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Source query text; documentation only.
    #[serde(default)]
    pub raw_datalog: String,
    /// Logical algebra description; documentation only.
    #[serde(default)]
    pub logical_ra: String,
    pub fragments: Vec<Fragment>,
}

impl Plan {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self {
            raw_datalog: String::new(),
            logical_ra: String::new(),
            fragments,
        }
    }

    pub fn with_provenance(
        mut self,
        raw_datalog: impl Into<String>,
        logical_ra: impl Into<String>,
    ) -> Self {
        self.raw_datalog = raw_datalog.into();
        self.logical_ra = logical_ra.into();
        self
    }

    /// Decode a JSON document, reporting every operator-level problem at once.
    pub fn from_json(json: &str) -> Result<Plan> {
        crate::decode::decode_plan(json)
    }

    /// Read and decode a JSON plan file.
    pub fn load(path: impl AsRef<Path>) -> Result<Plan> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Stable fingerprint of the canonical encoding.
    pub fn fingerprint(&self) -> Result<Hash256> {
        hash::fingerprint(self)
    }

    pub fn operator(&self, at: OpRef) -> Option<&Operator> {
        self.fragments
            .get(at.fragment.get())
            .and_then(|f| f.operator(at.op.get()))
    }

    /// Every operator with its plan-wide address, in declaration order.
    pub fn operators(&self) -> impl Iterator<Item = (OpRef, &Operator)> + '_ {
        self.fragments.iter().enumerate().flat_map(|(fi, frag)| {
            frag.operators
                .iter()
                .enumerate()
                .map(move |(oi, op)| (OpRef::new(fi, oi), op))
        })
    }
}
