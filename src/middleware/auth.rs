// src/middleware/auth.rs

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::User,
};

// Usuário autenticado + sessão que ele está usando
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub session_id: Uuid,
}

// Lê o Bearer e resolve a sessão. Qualquer falha vira `None`.
async fn resolve_caller(app_state: &AppState, headers: &HeaderMap) -> Option<AuthenticatedUser> {
    let bearer = headers.typed_get::<Authorization<Bearer>>()?;

    match app_state.auth_service.validate_token(bearer.token()).await {
        Ok((user, session_id)) => Some(AuthenticatedUser { user, session_id }),
        Err(AppError::InvalidToken) => None,
        Err(e) => {
            tracing::warn!("Falha ao resolver sessão: {:?}", e);
            None
        }
    }
}

// Caminho completo pedido (o router aninhado só vê o sufixo)
fn requested_path(request: &Request) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

// Sessão obrigatória (401 sem ela)
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers().clone();
    let caller = resolve_caller(&app_state, &headers)
        .await
        .ok_or(AppError::InvalidToken)?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

// Área do cliente: sessão + pendência de pagamento
pub async fn client_area_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // O body não é `Sync`: nada de `&request` atravessando um `.await`
    let headers = request.headers().clone();
    let path = requested_path(&request);
    let caller = resolve_caller(&app_state, &headers).await;

    let decision = app_state
        .gate_service
        .check_client_area(caller.as_ref().map(|c| c.user.id), &path)
        .await;

    match (decision.is_allowed(), caller) {
        (true, Some(caller)) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        _ => decision.into_response(),
    }
}

// Área administrativa: sessão + cargo admin
pub async fn admin_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers().clone();
    let path = requested_path(&request);
    let caller = resolve_caller(&app_state, &headers).await;

    let decision = app_state
        .gate_service
        .check_admin_area(caller.as_ref().map(|c| c.user.id), &path)
        .await;

    match (decision.is_allowed(), caller) {
        (true, Some(caller)) => {
            tracing::debug!(user_id = %caller.user.id, %path, "acesso admin");
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        _ => decision.into_response(),
    }
}

// Extrator para obter o usuário autenticado diretamente nos handlers
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

/// Sessão opcional, para rotas públicas que mudam de resposta com login.
pub struct MaybeAuthenticated(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for MaybeAuthenticated {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(caller) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(MaybeAuthenticated(Some(caller.clone())));
        }
        Ok(MaybeAuthenticated(resolve_caller(state, &parts.headers).await))
    }
}
