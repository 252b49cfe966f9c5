use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use actionkit_runtime::{
    ActionError, ActionOutcome, FieldViolation, Network, RegisteredAction, ValidationError,
};

use crate::ActionApiState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionsResponse {
    pub network: Network,
    pub wallet: String,
    pub actions: Vec<RegisteredAction>,
}

pub fn router() -> Router<Arc<ActionApiState>> {
    Router::new()
        .route("/actions", get(list_actions))
        .route("/actions/{name}", post(invoke_action))
}

async fn list_actions(State(state): State<Arc<ActionApiState>>) -> Json<ActionsResponse> {
    Json(ActionsResponse {
        network: state.network.clone(),
        wallet: state.wallet.address().to_string(),
        actions: state.registry.actions(&state.network),
    })
}

/// Run one action. Failures inside the action, including a body that is not
/// JSON, are still `200` with `success: false`; only an unknown action name
/// is `404`.
async fn invoke_action(
    State(state): State<Arc<ActionApiState>>,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ActionOutcome>, (StatusCode, String)> {
    if !state.registry.contains(&name) {
        return Err((StatusCode::NOT_FOUND, format!("Unknown action: {name}")));
    }

    let args = match body {
        Ok(Json(args)) => args,
        Err(rejection) => {
            let error = ActionError::Validation(ValidationError::new(vec![FieldViolation::new(
                "$",
                rejection.body_text(),
            )]));
            return Ok(Json(state.registry.failure(&name, error)));
        }
    };

    let outcome = state
        .registry
        .execute(&state.network, &name, state.wallet.as_ref(), &args)
        .await;
    tracing::info!(action = %name, success = outcome.success, "action invoked");
    Ok(Json(outcome))
}
