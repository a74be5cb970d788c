use sensorchart::{
    catalog::demo_catalog,
    query::resolution::{HOUR_MS, MINUTE_MS},
    storage::SeriesSource,
    ChartConfig, ChartOptions, HttpSource, MemoryStore, ResolutionSetting, SensorInfo,
    ZoomController,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Sensor Chart - Resolution-Adaptive Time Series Viewer");
    println!("======================================================");

    let config = ChartConfig::from_env();

    match &config.series_url {
        Some(url) => {
            println!("Using query service at {}", url);
            let source = HttpSource::new(url.clone(), config.request_timeout());
            let sensors = source.sensors().await?;
            let sensor = sensors
                .into_iter()
                .find(|s| s.numeric_fields().next().is_some())
                .ok_or("query service lists no sensor with numeric fields")?;
            run_session(&source, &sensor).await?;
        }
        None => {
            println!("Using in-memory demo store ({} days)", config.demo_days);
            let store = MemoryStore::new();
            let mut sensors = demo_catalog();
            let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
            store
                .seed_catalog(&mut sensors, now, config.demo_days, 10 * MINUTE_MS)
                .await?;
            run_session(&store, &sensors[0]).await?;
        }
    }

    println!("\nDemo completed successfully!");
    Ok(())
}

async fn run_session<S>(source: &S, sensor: &SensorInfo) -> Result<(), Box<dyn std::error::Error>>
where
    S: SeriesSource + ?Sized,
{
    let mut chart = ZoomController::new(
        sensor.target(),
        sensor.time_range(),
        ResolutionSetting::Dynamic,
    );

    println!("\n1. Loading full range of {}", sensor.name);
    chart.load(source).await?;
    print_chart(&chart, &sensor.name);

    let (start, end) = sensor
        .time_range()
        .bounds()
        .ok_or("sensor has no recorded time extent")?;
    let mid = start + (end - start) / 2;

    println!("\n2. Zooming into one week");
    chart.drag_select(source, mid, mid + 7 * 24 * HOUR_MS).await?;
    print_chart(&chart, &sensor.name);

    println!("\n3. Zooming into six hours");
    chart.drag_select(source, mid, mid + 6 * HOUR_MS).await?;
    print_chart(&chart, &sensor.name);

    println!("\n4. Switching to 30 minute buckets");
    chart
        .change_resolution(source, ResolutionSetting::parse(Some("30m")))
        .await?;
    print_chart(&chart, &sensor.name);

    println!("\n5. Double-click reset");
    chart.double_click();
    print_chart(&chart, &sensor.name);

    Ok(())
}

fn print_chart(chart: &ZoomController, title: &str) {
    let options: ChartOptions = chart.options(title);
    let arrays = chart.chart_arrays();

    let resolution = options
        .resolution
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  state: {:?}, setting: {}, resolution: {}, buckets: {}",
        chart.state(),
        options.setting.as_param(),
        resolution,
        arrays.len()
    );

    for (series, column) in options.series.iter().zip(&arrays.values) {
        if column.is_empty() {
            continue;
        }
        let min = column.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = column.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let avg = column.iter().sum::<f64>() / column.len() as f64;
        println!(
            "    {:<28} min: {:>8.2}  avg: {:>8.2}  max: {:>8.2}",
            series.label, min, avg, max
        );
    }
}
