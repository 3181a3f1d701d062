// src/handlers/orders.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::order::{CheckoutPayload, CreatedOrder, Order, OrderStatusSummary},
};

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CheckoutPayload,
    responses(
        (status = 201, description = "Pedido criado como pendente", body = CreatedOrder),
        (status = 400, description = "Checkout inválido"),
        (status = 404, description = "Plano não encontrado ou inativo"),
        (status = 409, description = "Pedido em aberto ou envio duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<CheckoutPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let created = app_state
        .order_service
        .checkout(caller.user.id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedidos do usuário, mais recentes primeiro", body = Vec<Order>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_orders(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = app_state.order_service.list_for_user(caller.user.id).await?;
    Ok(Json(orders))
}

// GET /api/orders/status
#[utoipa::path(
    get,
    path = "/api/orders/status",
    tag = "Orders",
    responses(
        (status = 200, description = "Benefícios ativos e bloqueio de checkout", body = OrderStatusSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn my_order_status(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<Json<OrderStatusSummary>, AppError> {
    let summary = app_state.order_service.status_summary(caller.user.id).await?;
    Ok(Json(summary))
}
