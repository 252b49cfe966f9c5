pub mod auth;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use actionkit_runtime::{Network, ProviderRegistry, WalletPort};

pub struct ActionApiState {
    pub registry: ProviderRegistry,
    pub wallet: Arc<dyn WalletPort>,
    /// Network every invocation is gated against.
    pub network: Network,
    pub api_token: String,
}

pub fn build_router(state: Arc<ActionApiState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::actions::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
