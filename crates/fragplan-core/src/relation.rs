//! Persistent relation identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a relation in the external catalog. Compared structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationKey {
    pub user_name: String,
    pub program_name: String,
    pub relation_name: String,
}

impl RelationKey {
    pub fn new(
        user_name: impl Into<String>,
        program_name: impl Into<String>,
        relation_name: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            program_name: program_name.into(),
            relation_name: relation_name.into(),
        }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.user_name, self.program_name, self.relation_name
        )
    }
}
