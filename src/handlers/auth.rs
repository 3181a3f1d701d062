// src/handlers/auth.rs

use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::Stream;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthResponse, LoginUserPayload, Profile, RegisterUserPayload},
    services::session_hub::SessionEvent,
};

// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Cadastro realizado", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail ou CPF já cadastrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let token = app_state.auth_service.register_user(&payload).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token })))
}

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login realizado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let token = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;

    Ok(Json(AuthResponse { token }))
}

// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Sessão encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<StatusCode, AppError> {
    app_state
        .auth_service
        .logout(caller.user.id, caller.session_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Perfil do usuário logado", body = Profile)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<Json<Profile>, AppError> {
    let profile = app_state.auth_service.get_profile(caller.user.id).await?;
    Ok(Json(profile))
}

// GET /api/auth/events
// Transições de sessão do próprio usuário. Termina quando esta sessão sai.
#[utoipa::path(
    get,
    path = "/api/auth/events",
    tag = "Auth",
    responses(
        (status = 200, description = "Stream SSE (signed_in / signed_out)", content_type = "text/event-stream")
    ),
    security(("api_jwt" = []))
)]
pub async fn session_events(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = app_state.session_hub.subscribe();
    let user_id = caller.user.id;
    let session_id = caller.session_id;

    // Estado: a assinatura, ou `None` depois do logout desta sessão
    let stream = futures::stream::unfold(Some(subscription), move |state| async move {
        let mut subscription = state?;
        loop {
            let event = subscription.recv().await?;
            if event.user_id() != user_id {
                continue;
            }

            let sse = match Event::default().event(event.name()).json_data(&event) {
                Ok(sse) => sse,
                Err(e) => {
                    tracing::warn!("Falha ao serializar evento de sessão: {:?}", e);
                    continue;
                }
            };

            let own_sign_out = matches!(event, SessionEvent::SignedOut { .. })
                && event.session_id() == session_id;
            let next = if own_sign_out {
                subscription.unsubscribe();
                None
            } else {
                Some(subscription)
            };

            return Some((Ok::<Event, Infallible>(sse), next));
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
