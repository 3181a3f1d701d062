// src/handlers/gate.rs

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    config::AppState,
    middleware::auth::MaybeAuthenticated,
    models::gate::{GateAnswer, GateArea, GateQuery},
};

// GET /api/gate
// Mesma decisão do middleware, respondida como dado para o front.
#[utoipa::path(
    get,
    path = "/api/gate",
    tag = "Gate",
    params(GateQuery),
    responses(
        (status = 200, description = "Decisão do gate", body = GateAnswer)
    ),
    security((), ("api_jwt" = []))
)]
pub async fn check_gate(
    State(app_state): State<AppState>,
    MaybeAuthenticated(caller): MaybeAuthenticated,
    Query(query): Query<GateQuery>,
) -> Json<GateAnswer> {
    let user_id = caller.map(|c| c.user.id);
    let gate = &app_state.gate_service;

    let decision = match query.area {
        GateArea::Client => gate.check_client_area(user_id, &query.target).await,
        GateArea::Admin => gate.check_admin_area(user_id, &query.target).await,
    };

    Json(decision.answer())
}
