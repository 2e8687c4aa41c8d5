//! Strongly-typed positions used across the validator.
//!
//! Fragments and operators are addressed by their declaration position; these
//! wrappers keep the two from being mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            pub const fn new(v: usize) -> Self {
                Self(v)
            }
            pub const fn get(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

new_id!(FragmentId, "fragment");
new_id!(OpIndex, "op");

/// Plan-wide address of one operator: fragment position plus operator position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct OpRef {
    pub fragment: FragmentId,
    pub op: OpIndex,
}

impl OpRef {
    pub const fn new(fragment: usize, op: usize) -> Self {
        Self {
            fragment: FragmentId::new(fragment),
            op: OpIndex::new(op),
        }
    }
}

impl fmt::Display for OpRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.fragment, self.op)
    }
}
