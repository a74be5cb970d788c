use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sensorchart::query::resolution::{DAY_MS, HOUR_MS, MINUTE_MS};
use sensorchart::{
    build_query, select_resolution, FieldSpec, MemoryStore, QueryTarget, Resolution,
    ResolutionSetting, SeriesBuffer, SeriesRow, TimeRange, ZoomController,
};
use sensorchart::storage::SeriesSource;
use tokio::runtime::Runtime;

fn target() -> QueryTarget {
    QueryTarget::new(
        "bench",
        vec![
            FieldSpec::new("a", "DOUBLE"),
            FieldSpec::new("b", "INTEGER"),
            FieldSpec::new("label", "VARCHAR"),
        ],
    )
}

fn benchmark_resolution_selection(c: &mut Criterion) {
    let dynamic = ResolutionSetting::Dynamic;
    c.bench_function("select_resolution_dynamic", |b| {
        b.iter(|| {
            for days in 0..400u64 {
                let range = TimeRange::new(DAY_MS, DAY_MS + days * DAY_MS + 1);
                black_box(select_resolution(&range, &dynamic));
            }
        })
    });

    c.bench_function("build_query_to_sql", |b| {
        let target = target();
        let range = TimeRange::new(DAY_MS, 30 * DAY_MS);
        b.iter(|| {
            let query = build_query(&target, &range, Resolution::Bucket(HOUR_MS)).unwrap();
            black_box(query.to_sql())
        })
    });
}

fn benchmark_buffer_decode(c: &mut Criterion) {
    let fields = vec!["a".to_string(), "b".to_string()];
    let rows: Vec<SeriesRow> = (0..10_000u64)
        .rev()
        .map(|i| {
            SeriesRow::new(i * MINUTE_MS)
                .with_value("a", (i as f64 / 100.0).sin())
                .with_value("b", format!("{}", i % 7))
        })
        .collect();

    c.bench_function("replace_all_10000_rows", |b| {
        let mut buffer = SeriesBuffer::new();
        b.iter(|| {
            buffer.replace_all(&fields, &rows);
            black_box(buffer.to_chart_arrays())
        })
    });
}

fn benchmark_zoom_session(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let store = rt.block_on(async {
        let store = MemoryStore::new();
        store.register("bench", target().fields).await;
        store.seed_synthetic("bench", DAY_MS, 61 * DAY_MS, MINUTE_MS).await.unwrap();
        store
    });

    c.bench_function("memory_store_full_range", |b| {
        let query = build_query(&target(), &TimeRange::full(), Resolution::Bucket(DAY_MS)).unwrap();
        b.iter(|| rt.block_on(async { black_box(store.fetch(&query).await.unwrap()) }))
    });

    c.bench_function("load_zoom_reset", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut chart = ZoomController::new(
                    target(),
                    TimeRange::new(DAY_MS, 61 * DAY_MS),
                    ResolutionSetting::Dynamic,
                );
                chart.load(&store).await.unwrap();
                chart.drag_select(&store, 10 * DAY_MS, 12 * DAY_MS).await.unwrap();
                chart.drag_select(&store, 10 * DAY_MS, 10 * DAY_MS + 6 * HOUR_MS).await.unwrap();
                black_box(chart.double_click())
            })
        })
    });
}

criterion_group!(
    benches,
    benchmark_resolution_selection,
    benchmark_buffer_decode,
    benchmark_zoom_session
);
criterion_main!(benches);
