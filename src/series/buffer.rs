use super::{SeriesPoint, SeriesRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Stored in place of an average that is null, missing or unparseable.
/// Charts downstream expect a fully numeric array, so holes are zero-filled.
pub const MISSING_AGGREGATE_VALUE: f64 = 0.0;

/// Decodes one aggregate cell. Numbers and numeric strings (Postgres returns
/// `avg(numeric)` as text) parse as `f64`; anything else, including
/// non-finite results, becomes [`MISSING_AGGREGATE_VALUE`].
pub fn decode_aggregate(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .unwrap_or(MISSING_AGGREGATE_VALUE)
}

/// Column-major view handed to the chart: `axis[i]` is the timestamp of
/// `values[f][i]` for every field `f`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartArrays {
    pub axis: Vec<u64>,
    pub fields: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl ChartArrays {
    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn column(&self, field: &str) -> Option<&[f64]> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|i| self.values[i].as_slice())
    }
}

/// The samples a chart currently displays. Every column shares `axis`, which
/// is strictly increasing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesBuffer {
    fields: Vec<String>,
    axis: Vec<u64>,
    columns: Vec<Vec<f64>>,
    window: Option<(u64, u64)>,
}

impl SeriesBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds every series from `rows`, discarding prior content.
    pub fn replace_all(&mut self, fields: &[String], rows: &[SeriesRow]) {
        *self = Self::decode(fields, rows, None);
    }

    /// Swaps in the result of a zoomed query. The whole buffer is replaced;
    /// old and new resolutions are never spliced together.
    pub fn replace_window(&mut self, fields: &[String], rows: &[SeriesRow], window: (u64, u64)) {
        *self = Self::decode(fields, rows, Some(window));
    }

    fn decode(fields: &[String], rows: &[SeriesRow], window: Option<(u64, u64)>) -> Self {
        let mut keyed: Vec<(u64, &SeriesRow)> = Vec::with_capacity(rows.len());
        let mut dropped = 0;
        for row in rows {
            match row.bucket_time() {
                Some(t) => keyed.push((t, row)),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!("Dropped {} rows with an undecodable bucket timestamp", dropped);
        }

        keyed.sort_by_key(|(t, _)| *t);
        keyed.dedup_by_key(|(t, _)| *t);

        let axis: Vec<u64> = keyed.iter().map(|(t, _)| *t).collect();
        let columns: Vec<Vec<f64>> = fields
            .iter()
            .map(|field| {
                keyed
                    .iter()
                    .map(|(_, row)| decode_aggregate(row.value(field)))
                    .collect()
            })
            .collect();

        debug!("Decoded {} buckets for {} fields", axis.len(), fields.len());

        Self {
            fields: fields.to_vec(),
            axis,
            columns,
            window,
        }
    }

    pub fn to_chart_arrays(&self) -> ChartArrays {
        ChartArrays {
            axis: self.axis.clone(),
            fields: self.fields.clone(),
            values: self.columns.clone(),
        }
    }

    pub fn series(&self, field: &str) -> Option<Vec<SeriesPoint>> {
        let i = self.fields.iter().position(|f| f == field)?;
        Some(
            self.axis
                .iter()
                .zip(&self.columns[i])
                .map(|(&bucket_time, &value)| SeriesPoint {
                    bucket_time,
                    value: Some(value),
                })
                .collect(),
        )
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn axis(&self) -> &[u64] {
        &self.axis
    }

    /// The zoom window this content was queried for, if any.
    pub fn window(&self) -> Option<(u64, u64)> {
        self.window
    }

    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
