pub mod buffer;

pub use buffer::{decode_aggregate, ChartArrays, SeriesBuffer, MISSING_AGGREGATE_VALUE};

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row as returned by the datastore: the bucket timestamp plus
/// one column per requested field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub bucket: Value,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl SeriesRow {
    pub fn new(bucket: u64) -> Self {
        Self {
            bucket: Value::from(bucket),
            values: Map::new(),
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Bucket timestamp in milliseconds, see [`timestamp_millis`].
    pub fn bucket_time(&self) -> Option<u64> {
        timestamp_millis(&self.bucket)
    }
}

/// Reads a millisecond timestamp from integer or float millis, numeric
/// strings, or RFC 3339 text. Negative and non-finite values are rejected.
pub fn timestamp_millis(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<u64>() {
                return Some(ms);
            }
            if let Ok(f) = s.parse::<f64>() {
                return (f.is_finite() && f >= 0.0).then_some(f as u64);
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis())
                .filter(|&ms| ms >= 0)
                .map(|ms| ms as u64)
        }
        _ => None,
    }
}

/// Body of a `/series` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub rows: Vec<SeriesRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub bucket_time: u64,
    pub value: Option<f64>,
}
