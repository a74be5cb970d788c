use super::SeriesSource;
use crate::catalog::SensorInfo;
use crate::error::{ChartError, ChartResult};
use crate::query::resolution::DAY_MS;
use crate::query::{FieldSpec, QueryDescriptor, Resolution};
use crate::series::SeriesRow;
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Start of the bucket containing `timestamp`, aligned to the epoch.
pub fn time_bucket(width: u64, timestamp: u64) -> u64 {
    if width == 0 {
        return timestamp;
    }
    timestamp - timestamp % width
}

#[derive(Debug, Default)]
struct Table {
    fields: Vec<FieldSpec>,
    samples: BTreeMap<u64, HashMap<String, f64>>,
}

impl Table {
    fn samples_in(
        &self,
        bounds: Option<(u64, u64)>,
    ) -> Box<dyn Iterator<Item = (&u64, &HashMap<String, f64>)> + '_> {
        match bounds {
            // Both ends exclusive; an empty or inverted window matches nothing.
            Some((start, end)) if start >= end => Box::new(std::iter::empty()),
            Some((start, end)) => Box::new(
                self.samples
                    .range((Bound::Excluded(start), Bound::Excluded(end))),
            ),
            None => Box::new(self.samples.iter()),
        }
    }

    fn execute(&self, query: &QueryDescriptor) -> Vec<SeriesRow> {
        match query.resolution {
            Resolution::Raw => self
                .samples_in(query.bounds)
                .map(|(&timestamp, values)| {
                    let mut row = SeriesRow::new(timestamp);
                    for field in &query.fields {
                        let value = values
                            .get(field)
                            .copied()
                            .map(Value::from)
                            .unwrap_or(Value::Null);
                        row.values.insert(field.clone(), value);
                    }
                    row
                })
                .collect(),
            Resolution::Bucket(width) => {
                // bucket -> per-field (sum, count)
                let mut buckets: BTreeMap<u64, Vec<(f64, usize)>> = BTreeMap::new();
                for (&timestamp, values) in self.samples_in(query.bounds) {
                    let acc = buckets
                        .entry(time_bucket(width, timestamp))
                        .or_insert_with(|| vec![(0.0, 0); query.fields.len()]);
                    for (i, field) in query.fields.iter().enumerate() {
                        if let Some(v) = values.get(field) {
                            acc[i].0 += v;
                            acc[i].1 += 1;
                        }
                    }
                }

                buckets
                    .into_iter()
                    .map(|(bucket, acc)| {
                        let mut row = SeriesRow::new(bucket);
                        for (field, (sum, count)) in query.fields.iter().zip(acc) {
                            let avg = if count == 0 {
                                Value::Null
                            } else {
                                Value::from(sum / count as f64)
                            };
                            row.values.insert(field.clone(), avg);
                        }
                        row
                    })
                    .collect()
            }
        }
    }
}

/// In-memory sensor tables answering `time_bucket` + `avg` queries.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares (or redeclares) a table's fields. Existing samples are kept.
    pub async fn register(&self, table: impl Into<String>, fields: Vec<FieldSpec>) {
        let mut tables = self.tables.write().await;
        tables.entry(table.into()).or_default().fields = fields;
    }

    pub async fn insert(
        &self,
        table: &str,
        timestamp: u64,
        values: HashMap<String, f64>,
    ) -> ChartResult<()> {
        let mut tables = self.tables.write().await;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| ChartError::UnknownTarget(table.to_string()))?;
        t.samples.entry(timestamp).or_default().extend(values);
        Ok(())
    }

    pub async fn fields(&self, table: &str) -> Option<Vec<FieldSpec>> {
        let tables = self.tables.read().await;
        tables.get(table).map(|t| t.fields.clone())
    }

    pub async fn tables(&self) -> Vec<String> {
        let tables = self.tables.read().await;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// First and last sample timestamps of `table`.
    pub async fn extent(&self, table: &str) -> Option<(u64, u64)> {
        let tables = self.tables.read().await;
        let t = tables.get(table)?;
        let first = *t.samples.keys().next()?;
        let last = *t.samples.keys().next_back()?;
        Some((first, last))
    }

    pub async fn sample_count(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map(|t| t.samples.len()).unwrap_or(0)
    }

    /// Fills every numeric field of `table` with a noisy daily cycle on
    /// `[start, end)` every `step_ms`. Returns the number of samples written.
    pub async fn seed_synthetic(
        &self,
        table: &str,
        start: u64,
        end: u64,
        step_ms: u64,
    ) -> ChartResult<usize> {
        let mut tables = self.tables.write().await;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| ChartError::UnknownTarget(table.to_string()))?;

        let numeric: Vec<String> = t
            .fields
            .iter()
            .filter(|f| f.is_numeric())
            .map(|f| f.name.clone())
            .collect();
        if numeric.is_empty() || step_ms == 0 {
            return Ok(0);
        }

        let mut rng = rand::thread_rng();
        let mut levels: Vec<f64> = numeric.iter().map(|_| rng.gen_range(-10.0..30.0)).collect();
        let mut written = 0;
        let mut timestamp = start;

        while timestamp < end {
            let phase = (timestamp % DAY_MS) as f64 / DAY_MS as f64 * std::f64::consts::TAU;
            let sample = t.samples.entry(timestamp).or_default();
            for (field, level) in numeric.iter().zip(levels.iter_mut()) {
                *level += rng.gen_range(-0.2..0.2);
                sample.insert(field.clone(), *level + 5.0 * phase.sin());
            }
            written += 1;
            timestamp += step_ms;
        }

        info!("Seeded {} synthetic samples into {}", written, table);
        Ok(written)
    }

    /// Registers every sensor of `sensors` and fills `days` of synthetic
    /// history ending at `end`. Sensor extents are updated to what was
    /// written.
    pub async fn seed_catalog(
        &self,
        sensors: &mut [SensorInfo],
        end: u64,
        days: u64,
        step_ms: u64,
    ) -> ChartResult<usize> {
        let start = end.saturating_sub(days * DAY_MS);
        let mut total = 0;
        for sensor in sensors.iter_mut() {
            self.register(sensor.name.clone(), sensor.fields.clone()).await;
            total += self.seed_synthetic(&sensor.name, start, end, step_ms).await?;
            if let Some((first, last)) = self.extent(&sensor.name).await {
                sensor.start = Some(first);
                sensor.end = Some(last);
            }
        }
        Ok(total)
    }
}

#[async_trait]
impl SeriesSource for MemoryStore {
    async fn fetch(&self, query: &QueryDescriptor) -> ChartResult<Vec<SeriesRow>> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&query.table)
            .ok_or_else(|| ChartError::UnknownTarget(query.table.clone()))?;

        let rows = table.execute(query);
        debug!(
            "Answered {} at {} with {} rows",
            query.table,
            query.resolution,
            rows.len()
        );
        Ok(rows)
    }
}
