use super::{QueryTarget, Resolution, TimeRange};
use crate::error::{ChartError, ChartResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Sample timestamp column in every sensor table.
pub const TIME_COLUMN: &str = "timed";

/// Alias of the bucket timestamp in result rows.
pub const BUCKET_COLUMN: &str = "bucket";

/// A bucketed-average request, ready for a datastore to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub table: String,
    pub fields: Vec<String>,
    /// Exclusive `(start, end)` filter on the sample timestamp; `None` reads
    /// the full range.
    pub bounds: Option<(u64, u64)>,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pub text: String,
    pub params: Vec<i64>,
}

impl QueryDescriptor {
    /// No numeric fields survived: nothing to ask the datastore.
    pub fn is_noop(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders the descriptor as a parameterized statement. Identifiers were
    /// validated in [`build_query`]; every number travels as a parameter.
    pub fn to_sql(&self) -> SqlStatement {
        let mut params = Vec::new();
        let mut text = String::from("SELECT ");

        match self.resolution {
            Resolution::Bucket(width) => {
                params.push(width as i64);
                text.push_str(&format!(
                    "time_bucket(${}, {}) AS {}",
                    params.len(),
                    TIME_COLUMN,
                    BUCKET_COLUMN
                ));
                for field in &self.fields {
                    text.push_str(&format!(", avg(\"{0}\"::numeric) AS \"{0}\"", field));
                }
            }
            Resolution::Raw => {
                text.push_str(&format!("{} AS {}", TIME_COLUMN, BUCKET_COLUMN));
                for field in &self.fields {
                    text.push_str(&format!(", \"{}\"", field));
                }
            }
        }

        text.push_str(&format!(" FROM \"{}\"", self.table));

        if let Some((start, end)) = self.bounds {
            params.push(start as i64);
            params.push(end as i64);
            text.push_str(&format!(
                " WHERE {0} > ${1} AND {0} < ${2}",
                TIME_COLUMN,
                params.len() - 1,
                params.len()
            ));
        }

        if !self.resolution.is_raw() {
            text.push_str(&format!(" GROUP BY {}", BUCKET_COLUMN));
        }
        text.push_str(&format!(" ORDER BY {} ASC", BUCKET_COLUMN));

        SqlStatement { text, params }
    }
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Names that would collide with the time column or the bucket alias in
/// result rows.
fn is_reserved_column(name: &str) -> bool {
    name.eq_ignore_ascii_case(TIME_COLUMN) || name.eq_ignore_ascii_case(BUCKET_COLUMN)
}

/// Builds the aggregate request for `target` over `range`.
///
/// Non-numeric fields, and fields named like the time column or the bucket
/// alias, are filtered out; an empty result is a no-op
/// descriptor. A zero bucket width is replaced by the monthly default. Fails
/// only when the table name is not a plain identifier.
pub fn build_query(
    target: &QueryTarget,
    range: &TimeRange,
    resolution: Resolution,
) -> ChartResult<QueryDescriptor> {
    if !is_identifier(&target.table) {
        return Err(ChartError::InvalidIdentifier(target.table.clone()));
    }

    let mut fields = Vec::new();
    for spec in target.numeric_fields() {
        if !is_identifier(&spec.name) {
            warn!("Dropping field with invalid name {:?} from {}", spec.name, target.table);
        } else if is_reserved_column(&spec.name) {
            warn!("Dropping field {:?} from {}: reserved column name", spec.name, target.table);
        } else {
            fields.push(spec.name.clone());
        }
    }

    if fields.is_empty() {
        debug!("No numeric fields selected for {}, query is a no-op", target.table);
    }

    let resolution = match resolution {
        Resolution::Bucket(0) => Resolution::DEFAULT,
        other => other,
    };

    Ok(QueryDescriptor {
        table: target.table.clone(),
        fields,
        bounds: range.bounds(),
        resolution,
    })
}
