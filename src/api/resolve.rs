//! Manual resolution trigger. Calls the resolution handler in-process, the same
//! path the monitor takes.

use super::policies::parse_policy_id;
use super::{AppState, JsonBody};
use crate::domain::{Direction, PolicyStatus};
use crate::error::AppError;
use crate::orchestration::ResolutionOutcome;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveBody {
    pub policy_id: String,
    pub observed_price: f64,
    pub barrier_price: Option<f64>,
    pub direction: Option<Direction>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub policy_id: String,
    pub outcome: &'static str,
    pub status: PolicyStatus,
    pub payout_amount: Option<f64>,
    pub resolved_at: Option<DateTime<Utc>>,
}

pub async fn post_resolve(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ResolveBody>,
) -> Result<Json<ResolveResponse>, AppError> {
    let id = parse_policy_id(&body.policy_id)?;
    let policy = state
        .store
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("policy {}", id)))?;

    if let Some(barrier) = body.barrier_price {
        if (barrier - policy.barrier_price).abs() > f64::EPSILON * policy.barrier_price.abs() {
            return Err(AppError::BadRequest(format!(
                "barrier {} does not match policy barrier {}",
                barrier, policy.barrier_price
            )));
        }
    }
    if let Some(direction) = body.direction {
        if direction != policy.direction {
            return Err(AppError::BadRequest(format!(
                "direction {} does not match policy direction {}",
                direction, policy.direction
            )));
        }
    }
    if policy.is_active() && !policy.is_triggered_by(body.observed_price) {
        return Err(AppError::Conflict(format!(
            "trigger condition not met: price {} vs barrier {} ({})",
            body.observed_price, policy.barrier_price, policy.direction
        )));
    }

    info!(
        policy_id = %id,
        observed_price = body.observed_price,
        timestamp = ?body.timestamp,
        "manual resolution requested"
    );

    let outcome = state.resolver.resolve(&id, body.observed_price).await?;
    let outcome_label = match outcome {
        ResolutionOutcome::Resolved(_) => "resolved",
        ResolutionOutcome::InFlight => "inFlight",
        ResolutionOutcome::AlreadyClosed(_) => "alreadyClosed",
    };

    let current = state
        .store
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("policy {}", id)))?;

    Ok(Json(ResolveResponse {
        policy_id: id.to_string(),
        outcome: outcome_label,
        status: current.status,
        payout_amount: current.payout_amount,
        resolved_at: current.resolved_at,
    }))
}
