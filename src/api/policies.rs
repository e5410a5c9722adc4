//! Policy registration and lookup endpoints.

use super::{AppState, JsonBody};
use crate::domain::{NewPolicy, OptionType, Policy, PolicyId, UnderlyingAsset, Wallet};
use crate::engine::premium::{
    DEFAULT_DAYS_TO_EXPIRATION, DEFAULT_RISK_FREE_RATE, DEFAULT_VOLATILITY,
};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    #[serde(default)]
    pub barrier_price: f64,
    #[serde(default)]
    pub coverage_amount: f64,
    pub user_wallet: Option<String>,
    #[serde(default)]
    pub premium_paid: bool,
    /// Defaults to `put`: protection against a falling price.
    #[serde(alias = "optionType")]
    pub option_direction: Option<OptionType>,
    pub asset: Option<UnderlyingAsset>,
    pub volatility: Option<f64>,
    pub risk_free_rate: Option<f64>,
    /// `YYYY-MM-DD`; coverage runs through the end of that day (UTC).
    pub expiration_date: Option<String>,
    pub premium: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePoliciesResponse {
    pub count: usize,
    pub policies: Vec<Policy>,
}

pub async fn register_policy(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterBody>,
) -> Result<(StatusCode, Json<Policy>), AppError> {
    let now = Utc::now();
    let (expires_at, days_to_expiration) = match body.expiration_date.as_deref() {
        Some(raw) => {
            let expires_at = parse_expiry(raw)?;
            if expires_at <= now {
                return Err(AppError::BadRequest(format!(
                    "expiration date {} is in the past",
                    raw
                )));
            }
            let days = (expires_at.date_naive() - now.date_naive()).num_days() - 1;
            (Some(expires_at), days.max(0))
        }
        None => (None, DEFAULT_DAYS_TO_EXPIRATION),
    };

    let new = NewPolicy {
        asset: body.asset.unwrap_or_default(),
        barrier_price: body.barrier_price,
        direction: body.option_direction.unwrap_or(OptionType::Put).direction(),
        coverage_amount: body.coverage_amount,
        volatility: body.volatility.unwrap_or(DEFAULT_VOLATILITY),
        risk_free_rate: body.risk_free_rate.unwrap_or(DEFAULT_RISK_FREE_RATE),
        days_to_expiration,
        user_wallet: body.user_wallet.map(Wallet::new),
        premium_paid: body.premium_paid,
        premium: body.premium,
        expires_at,
    };

    let policy = state.store.add(new)?;
    Ok((StatusCode::CREATED, Json(policy)))
}

pub async fn get_active_policies(State(state): State<AppState>) -> Json<ActivePoliciesResponse> {
    let policies = state.store.snapshot_active();
    Json(ActivePoliciesResponse {
        count: policies.len(),
        policies,
    })
}

pub async fn get_policy(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Policy>, AppError> {
    let id = parse_policy_id(&id)?;
    state
        .store
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("policy {}", id)))
}

pub async fn delete_policy(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Policy>, AppError> {
    let id = parse_policy_id(&id)?;
    let removed = state.store.remove(&id)?;
    tracing::info!(policy_id = %id, status = ?removed.status, "policy removed");
    Ok(Json(removed))
}

pub(crate) fn parse_policy_id(raw: &str) -> Result<PolicyId, AppError> {
    raw.parse::<PolicyId>()
        .map_err(|_| AppError::BadRequest(format!("Invalid policy id: {}", raw)))
}

/// End of the given day, i.e. the following midnight in UTC.
fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.succ_opt())
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid expiration date: {}", raw)))
}
