pub mod api;
pub mod catalog;
pub mod error;
pub mod query;
pub mod series;
pub mod storage;
pub mod zoom;

pub use catalog::SensorInfo;
pub use error::{ChartError, ChartResult};
pub use query::{
    build_query, select_resolution, FieldSpec, FieldType, QueryDescriptor, QueryTarget,
    Resolution, ResolutionSetting, TimeRange,
};
pub use series::{ChartArrays, SeriesBuffer, SeriesRow};
pub use storage::{HttpSource, MemoryStore, SeriesSource};
pub use zoom::{ChartOptions, ZoomController, ZoomState};

#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub bind_address: String,
    /// Remote query service; the bundled in-memory store is used when unset.
    pub series_url: Option<String>,
    /// Sensor listing (GeoJSON feature collection) to load at startup.
    pub sensor_catalog: Option<String>,
    pub request_timeout_seconds: u64,
    pub seed_demo_data: bool,
    pub demo_days: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            series_url: None,
            sensor_catalog: None,
            request_timeout_seconds: 30,
            seed_demo_data: true,
            demo_days: 60,
        }
    }
}

impl ChartConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(bind_addr) = std::env::var("BIND_ADDRESS") {
            config.bind_address = bind_addr;
        }

        if let Ok(url) = std::env::var("SERIES_URL") {
            if !url.trim().is_empty() {
                config.series_url = Some(url.trim().to_string());
            }
        }

        if let Ok(path) = std::env::var("SENSOR_CATALOG") {
            if !path.trim().is_empty() {
                config.sensor_catalog = Some(path.trim().to_string());
            }
        }

        if let Ok(timeout_str) = std::env::var("REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout_seconds = timeout_str.parse().unwrap_or(30);
        }

        if let Ok(seed) = std::env::var("SEED_DEMO_DATA") {
            config.seed_demo_data = seed.parse().unwrap_or(true);
        }

        if let Ok(days) = std::env::var("DEMO_DAYS") {
            config.demo_days = days.parse().unwrap_or(60);
        }

        config
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChartConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1:3000");
        assert!(config.series_url.is_none());
        assert_eq!(config.request_timeout().as_secs(), 30);
        assert!(config.seed_demo_data);
    }
}
