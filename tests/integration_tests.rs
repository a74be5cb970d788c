use sensorchart::api::{router, ApiState, ErrorResponse, HealthResponse};
use sensorchart::query::resolution::{DAY_MS, HOUR_MS, MINUTE_MS};
use sensorchart::storage::{memory::time_bucket, SeriesSource};
use sensorchart::zoom::Outcome;
use sensorchart::{
    ChartError, FieldSpec, HttpSource, MemoryStore, Resolution, ResolutionSetting, SensorInfo,
    TimeRange, ZoomController, ZoomState,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;

// 2023-11-14T00:00:00Z, aligned to every bucket width below a day
const BASE: u64 = 19_675 * DAY_MS;

fn rock_sensor() -> SensorInfo {
    SensorInfo::new(
        "rock",
        vec![
            FieldSpec::new("timed", "TIME"),
            FieldSpec::new("temperature_5cm", "DOUBLE").with_unit("°C"),
            FieldSpec::new("position", "INTEGER"),
            FieldSpec::new("comment", "VARCHAR"),
        ],
    )
}

/// Ten days of 10-minute samples with a value equal to the hour of the range.
async fn seeded_store() -> (Arc<MemoryStore>, SensorInfo) {
    let store = Arc::new(MemoryStore::new());
    let mut sensor = rock_sensor();
    store.register(sensor.name.clone(), sensor.fields.clone()).await;

    let mut t = BASE;
    while t < BASE + 10 * DAY_MS {
        let hour = ((t - BASE) / HOUR_MS) as f64;
        let mut values = HashMap::new();
        values.insert("temperature_5cm".to_string(), hour);
        values.insert("position".to_string(), 1.0);
        store.insert(&sensor.name, t, values).await.unwrap();
        t += 10 * MINUTE_MS;
    }

    let (first, last) = store.extent(&sensor.name).await.unwrap();
    sensor.start = Some(first);
    sensor.end = Some(last);
    (store, sensor)
}

fn dynamic_chart(sensor: &SensorInfo) -> ZoomController {
    ZoomController::new(sensor.target(), sensor.time_range(), ResolutionSetting::Dynamic)
}

async fn spawn_server(source: Arc<dyn SeriesSource>, sensors: Vec<SensorInfo>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::new(ApiState::new(source, sensors)));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_zoom_and_reset_flow() {
    let (store, sensor) = seeded_store().await;
    let mut chart = dynamic_chart(&sensor);

    chart.load(&*store).await.unwrap();
    // ~10 day extent -> daily buckets
    assert_eq!(chart.resolution(), Some(Resolution::Bucket(DAY_MS)));
    let full = chart.chart_arrays();
    assert_eq!(full.fields, vec!["temperature_5cm", "position"]);
    assert!(full.axis.windows(2).all(|w| w[0] < w[1]));
    assert!(full.values.iter().all(|c| c.len() == full.len()));

    let min = BASE + 2 * DAY_MS;
    let max = min + 6 * HOUR_MS;
    chart.drag_select(&*store, min, max).await.unwrap();
    assert_eq!(chart.state(), ZoomState::Zoomed { min, max });
    assert_eq!(chart.resolution(), Some(Resolution::Bucket(5 * MINUTE_MS)));
    let zoomed = chart.chart_arrays();
    assert!(zoomed.axis.iter().all(|&t| t > min - 5 * MINUTE_MS && t < max));

    chart
        .change_resolution(&*store, ResolutionSetting::parse(Some("1h")))
        .await
        .unwrap();
    assert_eq!(chart.state(), ZoomState::Zoomed { min, max });
    assert_eq!(chart.axis_scale(), Some((min, max)));
    let hourly = chart.chart_arrays().column("temperature_5cm").unwrap().to_vec();
    // the first bucket misses its :00 sample because bounds are exclusive
    assert_eq!(hourly.len(), 6);
    assert_eq!(hourly[1], 49.0);

    assert!(chart.double_click());
    assert_eq!(chart.chart_arrays(), full);
    assert_eq!(chart.axis_scale(), None);
}

#[tokio::test]
async fn test_unset_range_reads_everything_at_default_resolution() {
    let (store, sensor) = seeded_store().await;
    let mut chart =
        ZoomController::new(sensor.target(), TimeRange::new(0, 0), ResolutionSetting::Dynamic);

    let pending = chart.begin_load().unwrap();
    assert_eq!(pending.descriptor().bounds, None);
    assert_eq!(pending.descriptor().resolution, Resolution::DEFAULT);

    let rows = store.fetch(pending.descriptor()).await.unwrap();
    assert_eq!(chart.complete(pending, Ok(rows)).unwrap(), Outcome::Applied);

    let (first, last) = store.extent("rock").await.unwrap();
    let width = Resolution::DEFAULT.width();
    let arrays = chart.chart_arrays();
    assert_eq!(arrays.axis.first(), Some(&time_bucket(width, first)));
    assert_eq!(arrays.axis.last(), Some(&time_bucket(width, last)));
    assert_eq!(arrays.column("position").unwrap().iter().sum::<f64>(), arrays.len() as f64);
}

#[tokio::test]
async fn test_zero_width_drag_issues_nothing() {
    let (store, sensor) = seeded_store().await;
    let mut chart = dynamic_chart(&sensor);
    chart.load(&*store).await.unwrap();
    let before = chart.chart_arrays();

    assert!(chart.begin_drag_select(100, 100).unwrap().is_none());
    assert_eq!(chart.state(), ZoomState::Idle);
    assert_eq!(chart.chart_arrays(), before);
}

#[tokio::test]
async fn test_late_response_is_discarded() {
    let (store, sensor) = seeded_store().await;
    let mut chart = dynamic_chart(&sensor);

    let a = chart.begin_drag_select(BASE + DAY_MS, BASE + 2 * DAY_MS).unwrap().unwrap();
    let b = chart.begin_drag_select(BASE + 5 * DAY_MS, BASE + 6 * DAY_MS).unwrap().unwrap();

    let (rows_a, rows_b) = tokio::join!(store.fetch(a.descriptor()), store.fetch(b.descriptor()));
    let rows_b = rows_b.unwrap();
    let expected_len = rows_b.len();

    assert_eq!(chart.complete(b, Ok(rows_b)).unwrap(), Outcome::Applied);
    assert_eq!(chart.complete(a, rows_a).unwrap(), Outcome::Stale);

    assert_eq!(
        chart.state(),
        ZoomState::Zoomed { min: BASE + 5 * DAY_MS, max: BASE + 6 * DAY_MS }
    );
    assert_eq!(chart.buffer().len(), expected_len);
    assert!(chart.buffer().axis().iter().all(|&t| t >= BASE + 5 * DAY_MS));
}

#[tokio::test]
async fn test_http_source_matches_local_store() {
    let (store, sensor) = seeded_store().await;
    let base_url = spawn_server(store.clone(), vec![sensor.clone()]).await;
    let remote = HttpSource::new(base_url, Duration::from_secs(5));

    let mut local_chart = dynamic_chart(&sensor);
    let mut remote_chart = dynamic_chart(&sensor);

    local_chart.load(&*store).await.unwrap();
    remote_chart.load(&remote).await.unwrap();
    assert_eq!(remote_chart.chart_arrays(), local_chart.chart_arrays());

    let (min, max) = (BASE + 3 * DAY_MS, BASE + 3 * DAY_MS + 4 * HOUR_MS);
    local_chart.drag_select(&*store, min, max).await.unwrap();
    remote_chart.drag_select(&remote, min, max).await.unwrap();
    assert_eq!(remote_chart.chart_arrays(), local_chart.chart_arrays());

    let raw = ResolutionSetting::Explicit(Resolution::Raw);
    local_chart.change_resolution(&*store, raw).await.unwrap();
    remote_chart.change_resolution(&remote, raw).await.unwrap();
    assert_eq!(remote_chart.chart_arrays(), local_chart.chart_arrays());
    // 10-minute samples strictly inside a 4 hour window
    assert_eq!(remote_chart.buffer().len(), 23);
}

#[tokio::test]
async fn test_server_endpoints() {
    let (store, sensor) = seeded_store().await;
    let bad = SensorInfo::new("bad-name", vec![FieldSpec::new("x", "DOUBLE")]);
    let base_url = spawn_server(store.clone(), vec![sensor.clone(), bad]).await;
    let client = reqwest::Client::new();

    let health: HealthResponse = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.sensors, 2);

    let source = HttpSource::new(base_url.clone(), Duration::from_secs(5));
    let sensors = source.sensors().await.unwrap();
    assert_eq!(sensors[0], sensor);

    let response = client
        .get(format!("{}/series", base_url))
        .query(&[("target", "missing")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: ErrorResponse = response.json().await.unwrap();
    assert!(body.error.contains("missing"));

    let response = client
        .get(format!("{}/series", base_url))
        .query(&[("target", "bad-name")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    // field selection keeps request order and ignores undeclared names
    let start = (BASE + DAY_MS).to_string();
    let end = (BASE + 3 * DAY_MS).to_string();
    let body: serde_json::Value = client
        .get(format!("{}/series", base_url))
        .query(&[
            ("target", "rock"),
            ("fields", "position,nope,temperature_5cm"),
            ("resolution", "1d"),
            ("startTime", start.as_str()),
            ("endTime", end.as_str()),
        ])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = body["rows"].as_array().unwrap();
    assert!(!rows.is_empty());
    let row = rows[0].as_object().unwrap();
    assert!(row.contains_key("bucket"));
    assert!(row.contains_key("position"));
    assert!(row.contains_key("temperature_5cm"));
    assert!(!row.contains_key("nope"));

    // malformed bounds fall back to the full range
    let full: serde_json::Value = client
        .get(format!("{}/series", base_url))
        .query(&[("target", "rock"), ("resolution", "1d")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let full_rows = full["rows"].as_array().unwrap().len();
    assert_eq!(full_rows, 10);

    for (start, end) in [("", ""), ("abc", "123"), ("-5", "100"), ("1.5e12", "1.7e12")] {
        let response = client
            .get(format!("{}/series", base_url))
            .query(&[
                ("target", "rock"),
                ("resolution", "1d"),
                ("startTime", start),
                ("endTime", end),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["rows"].as_array().unwrap().len(), full_rows);
    }
}

#[tokio::test]
async fn test_unreachable_service_keeps_view() {
    let (store, sensor) = seeded_store().await;
    let mut chart = dynamic_chart(&sensor);
    chart.load(&*store).await.unwrap();
    let before = chart.chart_arrays();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let dead = HttpSource::new(format!("http://{}", addr), Duration::from_secs(1));

    let err = chart
        .drag_select(&dead, BASE + DAY_MS, BASE + 2 * DAY_MS)
        .await
        .unwrap_err();
    assert!(matches!(err, ChartError::Transport { .. }));
    assert_eq!(chart.state(), ZoomState::Idle);
    assert_eq!(chart.chart_arrays(), before);

    let outcome = chart
        .drag_select(&*store, BASE + DAY_MS, BASE + 2 * DAY_MS)
        .await
        .unwrap();
    assert_eq!(outcome, Some(Outcome::Applied));
}
