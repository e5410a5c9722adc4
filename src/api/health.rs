use super::AppState;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub latest_price: Option<f64>,
    pub price_timestamp: Option<DateTime<Utc>>,
    pub active_policies: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let observed = state.observed_price();
    Json(HealthResponse {
        status: "ok",
        latest_price: observed.map(|o| o.price),
        price_timestamp: observed.map(|o| o.published_at),
        active_policies: state.store.count_active(),
    })
}

pub async fn ready() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ready"}))
}
