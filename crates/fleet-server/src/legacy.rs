//! Single-gateway routes in the flattened shapes older dashboards expect.
//! Each one reads the first configured gateway unless `?gateway=` names another.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json},
    routing::get,
};
use serde::Deserialize;

use domain::fleet::legacy::{self, LegacyBattery, LegacyMeters, LegacyPower, LegacySoe};
use domain::gateway::DeviceStatus;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LegacyParams {
    gateway: Option<String>,
    headers: Option<String>,
}

impl LegacyParams {
    fn status(&self, state: &AppState) -> ApiResult<Arc<DeviceStatus>> {
        Ok(state.registry.resolve(self.gateway.as_deref())?)
    }

    fn with_headers(&self) -> bool {
        self.headers
            .as_deref()
            .is_some_and(|value| value.eq_ignore_ascii_case("yes"))
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/aggregates", get(aggregates))
        .route("/soe", get(soe))
        .route("/battery", get(battery))
        .route("/power", get(power))
        .route("/csv", get(csv))
}

async fn aggregates(
    Query(params): Query<LegacyParams>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Option<LegacyMeters>>> {
    Ok(Json(legacy::meters(&*params.status(&state)?)))
}

async fn soe(
    Query(params): Query<LegacyParams>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<LegacySoe>> {
    Ok(Json(legacy::soe(&*params.status(&state)?)))
}

async fn battery(
    Query(params): Query<LegacyParams>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<LegacyBattery>> {
    Ok(Json(legacy::battery(&*params.status(&state)?)))
}

async fn power(
    Query(params): Query<LegacyParams>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<LegacyPower>> {
    Ok(Json(legacy::power(&*params.status(&state)?)))
}

async fn csv(
    Query(params): Query<LegacyParams>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let status = params.status(&state)?;
    let mut body = String::new();
    if params.with_headers() {
        body.push_str(legacy::CSV_HEADER);
        body.push('\n');
    }
    body.push_str(&legacy::csv_line(&status));
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body))
}
