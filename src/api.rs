//! HTTP query service: `/series` answers bucketed-average requests the same
//! way [`HttpSource`](crate::storage::HttpSource) asks for them.

use crate::catalog::SensorInfo;
use crate::error::ChartError;
use crate::query::{build_query, select_resolution, QueryTarget, ResolutionSetting, TimeRange};
use crate::series::SeriesResponse;
use crate::storage::{run_query, SeriesSource};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub struct ApiState {
    source: Arc<dyn SeriesSource>,
    sensors: Vec<SensorInfo>,
}

impl ApiState {
    pub fn new(source: Arc<dyn SeriesSource>, sensors: Vec<SensorInfo>) -> Self {
        Self { source, sensors }
    }

    pub fn sensor(&self, name: &str) -> Option<&SensorInfo> {
        self.sensors.iter().find(|s| s.name == name)
    }
}

pub type AppState = Arc<ApiState>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesParams {
    pub target: String,
    /// Comma-separated; every numeric field of the sensor when absent.
    pub fields: Option<String>,
    pub resolution: Option<String>,
    /// Malformed bounds read as unset.
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

fn parse_bound(value: Option<&str>) -> Option<u64> {
    value.and_then(|s| s.trim().parse::<u64>().ok())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sensors: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: ChartError) -> ApiError {
    let status = match e {
        ChartError::UnknownTarget(_) => StatusCode::NOT_FOUND,
        ChartError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sensors", get(list_sensors))
        .route("/series", get(query_series))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        sensors: state.sensors.len(),
    })
}

async fn list_sensors(State(state): State<AppState>) -> Json<Vec<SensorInfo>> {
    Json(state.sensors.clone())
}

async fn query_series(
    State(state): State<AppState>,
    Query(params): Query<SeriesParams>,
) -> Result<Json<SeriesResponse>, ApiError> {
    let sensor = state
        .sensor(&params.target)
        .ok_or_else(|| api_error(ChartError::UnknownTarget(params.target.clone())))?;

    let target = match params.fields.as_deref() {
        Some(list) => {
            let requested: Vec<&str> = list.split(',').filter(|s| !s.trim().is_empty()).collect();
            QueryTarget::select(sensor.name.clone(), &sensor.fields, &requested)
        }
        None => sensor.target(),
    };

    let range = TimeRange::from_parts(
        parse_bound(params.start_time.as_deref()),
        parse_bound(params.end_time.as_deref()),
    );
    let setting = ResolutionSetting::parse(params.resolution.as_deref());
    let resolution = select_resolution(&range, &setting);
    let query = build_query(&target, &range, resolution).map_err(api_error)?;

    let rows = run_query(state.source.as_ref(), &query)
        .await
        .map_err(api_error)?;
    info!(
        "Served {} rows of {} at {}",
        rows.len(),
        query.table,
        query.resolution
    );

    Ok(Json(SeriesResponse { rows }))
}
