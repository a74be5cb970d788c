pub mod builder;
pub mod resolution;

pub use builder::{build_query, QueryDescriptor, SqlStatement};
pub use resolution::{select_resolution, Resolution, ResolutionSetting};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A time window in milliseconds since the epoch. Either bound may be unset,
/// which means "use the full available range".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl TimeRange {
    /// Zero is the "unset" sentinel for either bound.
    pub fn new(start: u64, end: u64) -> Self {
        Self::from_parts(Some(start), Some(end))
    }

    pub fn full() -> Self {
        Self::default()
    }

    pub fn from_parts(start: Option<u64>, end: Option<u64>) -> Self {
        Self {
            start: start.filter(|&s| s != 0),
            end: end.filter(|&e| e != 0),
        }
    }

    /// Both bounds or neither: a half-open range filters nothing, and so does
    /// a reversed one.
    pub fn bounds(&self) -> Option<(u64, u64)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        }
    }

    pub fn span(&self) -> Option<u64> {
        self.bounds().map(|(start, end)| end - start)
    }

    pub fn is_full(&self) -> bool {
        self.bounds().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Double,
    Integer,
    BigInt,
    SmallInt,
    TinyInt,
    Time,
    Other(String),
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Double
                | FieldType::Integer
                | FieldType::BigInt
                | FieldType::SmallInt
                | FieldType::TinyInt
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Double => "DOUBLE",
            FieldType::Integer => "INTEGER",
            FieldType::BigInt => "BIGINT",
            FieldType::SmallInt => "SMALLINT",
            FieldType::TinyInt => "TINYINT",
            FieldType::Time => "TIME",
            FieldType::Other(other) => other,
        }
    }
}

impl From<&str> for FieldType {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "DOUBLE" => FieldType::Double,
            "INTEGER" => FieldType::Integer,
            "BIGINT" => FieldType::BigInt,
            "SMALLINT" => FieldType::SmallInt,
            "TINYINT" => FieldType::TinyInt,
            "TIME" => FieldType::Time,
            _ => FieldType::Other(s.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        FieldType::from(s.as_str())
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn is_numeric(&self) -> bool {
        self.field_type.is_numeric()
    }
}

/// The table (sensor) a chart reads from and the fields it asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTarget {
    pub table: String,
    pub fields: Vec<FieldSpec>,
}

impl QueryTarget {
    pub fn new(table: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            table: table.into(),
            fields,
        }
    }

    /// Restricts `known` to the `requested` names, in request order. Names
    /// the sensor does not declare are dropped.
    pub fn select<S: AsRef<str>>(
        table: impl Into<String>,
        known: &[FieldSpec],
        requested: &[S],
    ) -> Self {
        let mut fields: Vec<FieldSpec> = Vec::with_capacity(requested.len());
        for name in requested {
            let name = name.as_ref().trim();
            if fields.iter().any(|f| f.name == name) {
                continue;
            }
            if let Some(spec) = known.iter().find(|f| f.name == name) {
                fields.push(spec.clone());
            }
        }
        Self::new(table, fields)
    }

    pub fn numeric_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_numeric())
    }
}
