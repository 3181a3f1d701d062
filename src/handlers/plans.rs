// src/handlers/plans.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::plan::Plan};

// GET /api/plans
#[utoipa::path(
    get,
    path = "/api/plans",
    tag = "Plans",
    responses(
        (status = 200, description = "Planos ativos, do mais barato ao mais caro", body = Vec<Plan>)
    )
)]
pub async fn list_plans(State(app_state): State<AppState>) -> Result<Json<Vec<Plan>>, AppError> {
    let plans = app_state.plan_repo.list_active().await?;
    Ok(Json(plans))
}

// GET /api/plans/{id}
#[utoipa::path(
    get,
    path = "/api/plans/{id}",
    tag = "Plans",
    params(("id" = Uuid, Path, description = "ID do plano")),
    responses(
        (status = 200, description = "Plano", body = Plan),
        (status = 404, description = "Plano não encontrado ou inativo")
    )
)]
pub async fn get_plan(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Plan>, AppError> {
    let plan = app_state
        .plan_repo
        .find_active(id)
        .await?
        .ok_or(AppError::PlanNotFound)?;
    Ok(Json(plan))
}
