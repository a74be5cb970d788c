use sensorchart::{
    api::{router, ApiState},
    catalog::{demo_catalog, load_catalog},
    query::resolution::MINUTE_MS,
    storage::SeriesSource,
    ChartConfig, HttpSource, MemoryStore,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting sensor chart query service");

    let config = ChartConfig::from_env();
    info!("Bind address: {}", config.bind_address);

    let mut sensors = match &config.sensor_catalog {
        Some(path) => load_catalog(path).await?,
        None => {
            warn!("SENSOR_CATALOG not set, serving demo sensors");
            demo_catalog()
        }
    };

    let source: Arc<dyn SeriesSource> = match &config.series_url {
        Some(url) => {
            info!("Proxying series queries to {}", url);
            Arc::new(HttpSource::new(url.clone(), config.request_timeout()))
        }
        None => {
            let store = MemoryStore::new();
            if config.seed_demo_data {
                let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
                let written = store
                    .seed_catalog(&mut sensors, now, config.demo_days, 10 * MINUTE_MS)
                    .await?;
                info!("Seeded {} samples over {} days", written, config.demo_days);
            } else {
                for sensor in &sensors {
                    store.register(sensor.name.clone(), sensor.fields.clone()).await;
                }
            }
            Arc::new(store)
        }
    };

    info!("Serving {} sensors", sensors.len());
    let app = router(Arc::new(ApiState::new(source, sensors)));

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
