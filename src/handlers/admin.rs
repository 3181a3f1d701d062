// src/handlers/admin.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::{Profile, UpdateRolePayload},
        clinic::{Clinic, CreateClinicPayload},
        dashboard::{AdminDashboard, FinanceQuery, FinanceReport},
        order::{AdminOrderQuery, Order, OrderStatus, TransitionResult, UpdateOrderStatusPayload},
    },
};

// =============================================================================
//  1. PEDIDOS
// =============================================================================

// GET /api/admin/orders
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    tag = "Admin",
    params(AdminOrderQuery),
    responses(
        (status = 200, description = "Pedidos, mais recentes primeiro (máx. 200)", body = Vec<Order>),
        (status = 403, description = "Área restrita a administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = app_state
        .order_service
        .list_admin(query.status, query.search.as_deref())
        .await?;
    Ok(Json(orders))
}

// PATCH /api/admin/orders/{id}/status
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = UpdateOrderStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = TransitionResult),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_order_status(
    State(app_state): State<AppState>,
    admin: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusPayload>,
) -> Result<Json<TransitionResult>, AppError> {
    tracing::info!(admin_id = %admin.user.id, %order_id, to = payload.new_status.as_str(), "Alteração manual de status");

    let result = app_state
        .order_service
        .transition(order_id, payload.new_status)
        .await?;
    Ok(Json(result))
}

// POST /api/admin/orders/{id}/confirm-payment
#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/confirm-payment",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido marcado como pago", body = TransitionResult),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_payment(
    State(app_state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<TransitionResult>, AppError> {
    let result = app_state
        .order_service
        .transition(order_id, OrderStatus::Pago)
        .await?;
    Ok(Json(result))
}

// =============================================================================
//  2. PERFIS E CARTÕES
// =============================================================================

// GET /api/admin/profiles
#[utoipa::path(
    get,
    path = "/api/admin/profiles",
    tag = "Admin",
    responses(
        (status = 200, description = "Perfis, mais recentes primeiro", body = Vec<Profile>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_profiles(State(app_state): State<AppState>) -> Result<Json<Vec<Profile>>, AppError> {
    let profiles = app_state.profile_repo.list_all().await?;
    Ok(Json(profiles))
}

// PATCH /api/admin/profiles/{id}/role
#[utoipa::path(
    patch,
    path = "/api/admin/profiles/{id}/role",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do perfil")),
    request_body = UpdateRolePayload,
    responses(
        (status = 200, description = "Cargo atualizado", body = Profile),
        (status = 404, description = "Perfil não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_role(
    State(app_state): State<AppState>,
    admin: AuthenticatedUser,
    Path(profile_id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<Json<Profile>, AppError> {
    let profile = app_state
        .profile_repo
        .update_role(profile_id, payload.role)
        .await?
        .ok_or(AppError::UserNotFound)?;

    tracing::info!(admin_id = %admin.user.id, %profile_id, role = ?payload.role, "Cargo alterado");
    Ok(Json(profile))
}

// POST /api/admin/profiles/{id}/card
#[utoipa::path(
    post,
    path = "/api/admin/profiles/{id}/card",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do perfil")),
    responses(
        (status = 201, description = "Cartão emitido", body = Profile),
        (status = 404, description = "Perfil não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn issue_card(
    State(app_state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let profile = app_state.card_service.issue_card(profile_id).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

// =============================================================================
//  3. CLÍNICAS
// =============================================================================

// GET /api/admin/clinics
#[utoipa::path(
    get,
    path = "/api/admin/clinics",
    tag = "Admin",
    responses(
        (status = 200, description = "Clínicas conveniadas", body = Vec<Clinic>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_clinics(State(app_state): State<AppState>) -> Result<Json<Vec<Clinic>>, AppError> {
    let clinics = app_state.clinic_repo.list_all().await?;
    Ok(Json(clinics))
}

// POST /api/admin/clinics
#[utoipa::path(
    post,
    path = "/api/admin/clinics",
    tag = "Admin",
    request_body = CreateClinicPayload,
    responses(
        (status = 201, description = "Clínica cadastrada", body = Clinic),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_clinic(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateClinicPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let clinic = app_state.clinic_repo.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(clinic)))
}

// =============================================================================
//  4. PAINEL E FINANCEIRO
// =============================================================================

// GET /api/admin/dashboard
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "Admin",
    responses(
        (status = 200, description = "KPIs e faturamento dos últimos 30 dias", body = AdminDashboard)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_dashboard(State(app_state): State<AppState>) -> Result<Json<AdminDashboard>, AppError> {
    let dashboard = app_state.dashboard_service.admin_dashboard().await?;
    Ok(Json(dashboard))
}

// GET /api/admin/finance
#[utoipa::path(
    get,
    path = "/api/admin/finance",
    tag = "Admin",
    params(FinanceQuery),
    responses(
        (status = 200, description = "Pedidos e KPIs do período (máx. 500)", body = FinanceReport),
        (status = 400, description = "Período inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_finance(
    State(app_state): State<AppState>,
    Query(query): Query<FinanceQuery>,
) -> Result<Json<FinanceReport>, AppError> {
    let report = app_state.dashboard_service.finance_report(&query).await?;
    Ok(Json(report))
}
