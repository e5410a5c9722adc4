pub mod health;
pub mod policies;
pub mod quote;
pub mod resolve;

use crate::domain::ObservedPrice;
use crate::engine::PremiumCalculator;
use crate::error::AppError;
use crate::orchestration::ResolutionHandler;
use crate::store::PolicyStore;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PolicyStore>,
    pub calculator: PremiumCalculator,
    pub resolver: Arc<ResolutionHandler>,
    pub latest_price: watch::Receiver<Option<ObservedPrice>>,
}

impl AppState {
    pub fn new(
        store: Arc<PolicyStore>,
        calculator: PremiumCalculator,
        resolver: Arc<ResolutionHandler>,
        latest_price: watch::Receiver<Option<ObservedPrice>>,
    ) -> Self {
        Self {
            store,
            calculator,
            resolver,
            latest_price,
        }
    }

    /// Latest price seen by the monitor, if any poll has succeeded yet.
    pub fn observed_price(&self) -> Option<ObservedPrice> {
        *self.latest_price.borrow()
    }
}

/// JSON request body whose rejections use the `{"error": ...}` shape with a 400.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/quote", post(quote::post_quote))
        .route("/v1/policies", post(policies::register_policy))
        .route("/v1/policies/active", get(policies::get_active_policies))
        .route(
            "/v1/policies/:id",
            get(policies::get_policy).delete(policies::delete_policy),
        )
        .route("/v1/resolve", post(resolve::post_resolve))
        .layer(cors)
        .with_state(state)
}
