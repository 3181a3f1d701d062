// src/handlers/card.rs

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::card::{CardValidation, CardView, ValidateCardRequest},
};

// GET /api/card
#[utoipa::path(
    get,
    path = "/api/card",
    tag = "Card",
    responses(
        (status = 200, description = "Cartão do cliente", body = CardView),
        (status = 402, description = "Pedido aguardando pagamento"),
        (status = 403, description = "Cartão exibido apenas para clientes")
    ),
    security(("api_jwt" = []))
)]
pub async fn my_card(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<Json<CardView>, AppError> {
    let card = app_state.card_service.my_card(caller.user.id).await?;
    Ok(Json(card))
}

// GET /api/card/qrcode
#[utoipa::path(
    get,
    path = "/api/card/qrcode",
    tag = "Card",
    responses(
        (status = 200, description = "QR code de validação", content_type = "image/svg+xml"),
        (status = 404, description = "Cartão não emitido")
    ),
    security(("api_jwt" = []))
)]
pub async fn my_card_qrcode(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let svg = app_state.card_service.qrcode_svg(caller.user.id).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

// GET /api/validate-card?token=
#[utoipa::path(
    get,
    path = "/api/validate-card",
    tag = "Card",
    params(ValidateCardRequest),
    responses(
        (status = 200, description = "Resultado da validação", body = CardValidation)
    )
)]
pub async fn validate_card_query(
    State(app_state): State<AppState>,
    Query(request): Query<ValidateCardRequest>,
) -> Result<Json<CardValidation>, AppError> {
    let result = app_state.card_service.validate(&request).await?;
    Ok(Json(result))
}

// POST /api/validate-card
#[utoipa::path(
    post,
    path = "/api/validate-card",
    tag = "Card",
    request_body = ValidateCardRequest,
    responses(
        (status = 200, description = "Resultado da validação", body = CardValidation),
        (status = 400, description = "Nem número nem token informados")
    )
)]
pub async fn validate_card(
    State(app_state): State<AppState>,
    Json(request): Json<ValidateCardRequest>,
) -> Result<Json<CardValidation>, AppError> {
    let result = app_state.card_service.validate(&request).await?;
    Ok(Json(result))
}
