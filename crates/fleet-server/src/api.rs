use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    response::{
        IntoResponse, Json,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::{Stream, StreamExt};
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use domain::FleetEvent;
use domain::fleet::{FleetAggregate, FleetPower, FleetSoe};
use domain::gateway::{DeviceStatus, Snapshot};

use crate::error::ApiResult;
use crate::legacy;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/gateways", get(get_gateways))
        .route("/api/gateways/{id}", get(get_gateway))
        .route("/api/gateways/{id}/aggregates", get(get_aggregates))
        .route("/api/gateways/{id}/vitals", get(get_vitals))
        .route("/api/gateways/{id}/strings", get(get_strings))
        .route("/api/gateways/{id}/alerts", get(get_alerts))
        .route("/api/gateways/{id}/temperatures", get(get_temperatures))
        .route("/api/gateways/{id}/system_status", get(get_system_status))
        .route("/api/aggregate", get(get_fleet_aggregate))
        .route("/api/aggregate/power", get(get_fleet_power))
        .route("/api/aggregate/soe", get(get_fleet_soe))
        .route("/api/stream", get(sse_handler))
        .merge(legacy::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let aggregate = state.registry.aggregate();
    Json(json!({
        "status": "ok",
        "num_devices": aggregate.num_devices,
        "num_online": aggregate.num_online,
    }))
}

async fn get_gateways(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Arc<DeviceStatus>>>> {
    let aggregate = state.registry.fleet_aggregate()?;
    Ok(Json(aggregate.gateways.into_values().collect()))
}

async fn get_gateway(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Arc<DeviceStatus>>> {
    Ok(Json(state.registry.status(&id)?))
}

/// One snapshot field of a gateway; `null` while the gateway is offline or
/// when that read failed on the last cycle.
fn snapshot_field<T>(
    state: &AppState,
    id: &str,
    field: impl FnOnce(&Snapshot) -> Option<T>,
) -> ApiResult<Json<Option<T>>> {
    let status = state.registry.status(id)?;
    Ok(Json(status.snapshot.as_ref().and_then(field)))
}

async fn get_aggregates(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    snapshot_field(&state, &id, |s| Some(s.aggregates))
}

async fn get_vitals(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    snapshot_field(&state, &id, |s| s.vitals.clone())
}

async fn get_strings(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    snapshot_field(&state, &id, |s| s.strings.clone())
}

async fn get_alerts(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    snapshot_field(&state, &id, |s| s.alerts.clone())
}

async fn get_temperatures(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    snapshot_field(&state, &id, |s| s.temperatures.clone())
}

async fn get_system_status(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    snapshot_field(&state, &id, |s| s.system_status)
}

async fn get_fleet_aggregate(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<FleetAggregate>> {
    Ok(Json(state.registry.fleet_aggregate()?))
}

async fn get_fleet_power(State(state): State<Arc<AppState>>) -> ApiResult<Json<FleetPower>> {
    Ok(Json(state.registry.fleet_aggregate()?.power()))
}

async fn get_fleet_soe(State(state): State<Arc<AppState>>) -> ApiResult<Json<FleetSoe>> {
    Ok(Json(state.registry.fleet_aggregate()?.soe()))
}

fn to_sse(event: &FleetEvent) -> Option<Event> {
    let sse = Event::default().event(event.event_type());
    let data = match event {
        FleetEvent::AggregateUpdated(aggregate) => sse.json_data(aggregate),
        FleetEvent::GatewayUpdated(status) => sse.json_data(status),
    };
    match data {
        Ok(sse) => Some(sse),
        Err(e) => {
            warn!(error = %e, "Failed to serialize stream event");
            None
        }
    }
}

/// Current fleet aggregate first, then gateway and aggregate updates as they
/// are committed. The subscription is released when the client disconnects.
async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (handle, rx) = state.registry.subscribe();
    debug!(subscriber = handle.id(), "Stream client connected");

    let stream = ReceiverStream::new(rx)
        .filter_map(move |event| {
            // Owning the handle ties the subscription to the response body.
            let _subscription = &handle;
            futures::future::ready(to_sse(&event).map(Ok))
        })
        .take_until(state.shutdown.clone().cancelled_owned());

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive))
}
