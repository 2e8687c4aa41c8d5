//! Tuple schemas. Pure data.
//!
//! In memory a schema is a list of `Field`s; on the wire it is two parallel
//! arrays (`column_types`, `column_names`). Conversion between the two forms
//! rejects arrays of different lengths.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "INT_TYPE")]
    Int,
    #[serde(rename = "LONG_TYPE")]
    Long,
    #[serde(rename = "FLOAT_TYPE")]
    Float,
    #[serde(rename = "DOUBLE_TYPE")]
    Double,
    #[serde(rename = "STRING_TYPE")]
    String,
    #[serde(rename = "BOOLEAN_TYPE")]
    Boolean,
    #[serde(rename = "DATETIME_TYPE")]
    DateTime,
}

impl DataType {
    /// Wire name of the type tag.
    pub fn wire_name(self) -> &'static str {
        match self {
            DataType::Int => "INT_TYPE",
            DataType::Long => "LONG_TYPE",
            DataType::Float => "FLOAT_TYPE",
            DataType::Double => "DOUBLE_TYPE",
            DataType::String => "STRING_TYPE",
            DataType::Boolean => "BOOLEAN_TYPE",
            DataType::DateTime => "DATETIME_TYPE",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireSchema", into = "WireSchema")]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Convenience constructor from `(name, type)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, DataType)>) -> Self {
        Self::new(pairs.into_iter().map(|(n, t)| Field::new(n, t)).collect())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn types(&self) -> impl Iterator<Item = DataType> + '_ {
        self.fields.iter().map(|f| f.data_type)
    }

    /// Positional compatibility: same arity and the same type at every position.
    /// Column names are labels only and are not compared.
    pub fn is_compatible_with(&self, other: &Schema) -> bool {
        self.len() == other.len() && self.types().eq(other.types())
    }

    /// First position where `other` disagrees with `self`, if any.
    pub fn first_mismatch(&self, other: &Schema) -> Option<SchemaDiff> {
        if self.len() != other.len() {
            return Some(SchemaDiff::Arity {
                expected: self.len(),
                found: other.len(),
            });
        }
        self.types()
            .zip(other.types())
            .enumerate()
            .find(|(_, (a, b))| a != b)
            .map(|(position, (expected, found))| SchemaDiff::Type {
                position,
                expected,
                found,
            })
    }

    /// Select columns by position. Returns the first out-of-range index on failure.
    pub fn project(&self, indexes: &[usize]) -> Result<Schema, usize> {
        indexes
            .iter()
            .map(|&i| self.fields.get(i).cloned().ok_or(i))
            .collect::<Result<Vec<_>, _>>()
            .map(Schema::new)
    }

    /// Concatenate two schemas (left columns first).
    pub fn concat(mut self, other: Schema) -> Schema {
        self.fields.extend(other.fields);
        self
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.name, field.data_type)?;
        }
        f.write_str(")")
    }
}

/// How two schemas disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaDiff {
    Arity {
        expected: usize,
        found: usize,
    },
    Type {
        position: usize,
        expected: DataType,
        found: DataType,
    },
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaDiff::Arity { expected, found } => {
                write!(f, "expected {expected} columns, found {found}")
            }
            SchemaDiff::Type {
                position,
                expected,
                found,
            } => write!(f, "column {position}: expected {expected}, found {found}"),
        }
    }
}

/// Wire shape: parallel arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSchema {
    pub column_types: Vec<DataType>,
    pub column_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column_types has {types} entries but column_names has {names}")]
pub struct SchemaShapeError {
    pub types: usize,
    pub names: usize,
}

impl TryFrom<WireSchema> for Schema {
    type Error = SchemaShapeError;

    fn try_from(w: WireSchema) -> Result<Self, Self::Error> {
        if w.column_types.len() != w.column_names.len() {
            return Err(SchemaShapeError {
                types: w.column_types.len(),
                names: w.column_names.len(),
            });
        }
        Ok(Schema::new(
            w.column_names
                .into_iter()
                .zip(w.column_types)
                .map(|(name, data_type)| Field { name, data_type })
                .collect(),
        ))
    }
}

impl From<Schema> for WireSchema {
    fn from(s: Schema) -> Self {
        let (column_names, column_types) = s
            .fields
            .into_iter()
            .map(|f| (f.name, f.data_type))
            .unzip();
        WireSchema {
            column_types,
            column_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follows() -> Schema {
        Schema::from_pairs([("follower", DataType::Long), ("followee", DataType::Long)])
    }

    #[test]
    fn wire_form_is_parallel_arrays() {
        let json = serde_json::to_value(follows()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "column_types": ["LONG_TYPE", "LONG_TYPE"],
                "column_names": ["follower", "followee"]
            })
        );
    }

    #[test]
    fn unequal_arrays_are_rejected() {
        let err = serde_json::from_str::<Schema>(
            r#"{"column_types":["LONG_TYPE"],"column_names":["a","b"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("column_names has 2"));
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        assert!(serde_json::from_str::<Schema>(
            r#"{"column_types":["BLOB_TYPE"],"column_names":["a"]}"#
        )
        .is_err());
    }

    #[test]
    fn compatibility_ignores_names() {
        let renamed = Schema::from_pairs([("x", DataType::Long), ("y", DataType::Long)]);
        assert!(follows().is_compatible_with(&renamed));

        let narrow = Schema::from_pairs([("a", DataType::Long)]);
        assert_eq!(
            follows().first_mismatch(&narrow),
            Some(SchemaDiff::Arity {
                expected: 2,
                found: 1
            })
        );

        let typed = Schema::from_pairs([("x", DataType::Long), ("y", DataType::String)]);
        assert_eq!(
            follows().first_mismatch(&typed),
            Some(SchemaDiff::Type {
                position: 1,
                expected: DataType::Long,
                found: DataType::String
            })
        );
    }

    #[test]
    fn project_reports_first_bad_index() {
        let s = follows();
        assert_eq!(s.project(&[1, 0]).unwrap().fields[0].name, "followee");
        assert_eq!(s.project(&[0, 5, 7]), Err(5));
    }
}
