//! Sensor metadata as published by the sensor API's `/api/sensors` listing.
//!
//! Only what the chart engine needs is kept: the sensor (table) name, its
//! declared fields with types and units, and the time extent of its data.

use crate::error::ChartResult;
use crate::query::{FieldSpec, QueryTarget, TimeRange};
use crate::series::timestamp_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub start: Option<u64>,
    #[serde(default)]
    pub end: Option<u64>,
}

impl SensorInfo {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
            start: None,
            end: None,
        }
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::from_parts(self.start, self.end)
    }

    pub fn numeric_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_numeric())
    }

    /// Chart target over every numeric field of this sensor.
    pub fn target(&self) -> QueryTarget {
        QueryTarget::new(self.name.clone(), self.numeric_fields().cloned().collect())
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Properties {
    vs_name: String,
    #[serde(default)]
    fields: Vec<FieldSpec>,
    #[serde(default)]
    stats: Option<Stats>,
}

#[derive(Debug, Default, Deserialize)]
struct Stats {
    #[serde(rename = "start-datetime", default)]
    start: Option<Value>,
    #[serde(rename = "end-datetime", default)]
    end: Option<Value>,
}

pub fn parse_sensor_list(json: &str) -> ChartResult<Vec<SensorInfo>> {
    let collection: FeatureCollection = serde_json::from_str(json)?;
    let sensors = collection
        .features
        .into_iter()
        .map(|feature| {
            let props = feature.properties;
            let stats = props.stats.unwrap_or_default();
            let start = stats.start.as_ref().and_then(timestamp_millis);
            let end = stats.end.as_ref().and_then(timestamp_millis);
            if stats.start.is_some() && start.is_none() {
                warn!("Unreadable start-datetime for sensor {}", props.vs_name);
            }
            SensorInfo {
                name: props.vs_name,
                fields: props.fields,
                start,
                end,
            }
        })
        .collect();
    Ok(sensors)
}

/// Sensors served when no listing is configured.
pub fn demo_catalog() -> Vec<SensorInfo> {
    vec![
        SensorInfo::new(
            "matterhorn_temperature_rock",
            vec![
                FieldSpec::new("timed", "TIME"),
                FieldSpec::new("temperature_5cm", "DOUBLE").with_unit("°C"),
                FieldSpec::new("temperature_50cm", "DOUBLE").with_unit("°C"),
            ],
        ),
        SensorInfo::new(
            "matterhorn_displacement",
            vec![
                FieldSpec::new("timed", "TIME"),
                FieldSpec::new("displacement_dx1", "DOUBLE").with_unit("mm"),
                FieldSpec::new("position", "INTEGER"),
            ],
        ),
    ]
}

pub async fn load_catalog(path: impl AsRef<Path>) -> ChartResult<Vec<SensorInfo>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;
    let sensors = parse_sensor_list(&contents)?;
    info!("Loaded {} sensors from {}", sensors.len(), path.display());
    Ok(sensors)
}
