// src/services/gate_service.rs

//! Gate de sessão/cargo da área logada.
//!
//! Uma única política, usada tanto pelo middleware das rotas quanto pelo
//! endpoint `GET /api/gate` que o roteador do front consulta.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{OrderRepository, ProfileRepository},
    models::{auth::Role, gate::GateAnswer, order::OrderStatus},
};

pub const LOGIN_PATH: &str = "/login";
pub const PENDING_PAYMENT_PATH: &str = "/checkout/pendente";
pub const CLIENT_AREA_PATH: &str = "/app";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Sem sessão: volta para o login lembrando de onde veio
    Login { from: String },
    /// Cliente com o último pedido em aberto
    PendingPayment,
    /// Área administrativa acessada por quem não é admin
    ClientArea,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }

    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            GateDecision::Allow => None,
            GateDecision::Login { .. } => Some(LOGIN_PATH),
            GateDecision::PendingPayment => Some(PENDING_PAYMENT_PATH),
            GateDecision::ClientArea => Some(CLIENT_AREA_PATH),
        }
    }

    pub fn answer(&self) -> GateAnswer {
        let from = match self {
            GateDecision::Login { from } => Some(from.clone()),
            _ => None,
        };
        GateAnswer {
            allowed: self.is_allowed(),
            redirect: self.redirect().map(str::to_string),
            from,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GateDecision::Allow => StatusCode::OK,
            GateDecision::Login { .. } => StatusCode::UNAUTHORIZED,
            GateDecision::PendingPayment => StatusCode::PAYMENT_REQUIRED,
            GateDecision::ClientArea => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            GateDecision::Allow => "Acesso liberado.",
            GateDecision::Login { .. } => "Faça login para continuar.",
            GateDecision::PendingPayment => "Seu pedido está aguardando pagamento.",
            GateDecision::ClientArea => "Área restrita a administradores.",
        }
    }
}

// Resposta usada pelo middleware quando o gate barra a requisição
impl IntoResponse for GateDecision {
    fn into_response(self) -> Response {
        let answer = self.answer();
        let body = Json(json!({
            "error": self.message(),
            "redirect": answer.redirect,
            "from": answer.from,
        }));
        (self.status(), body).into_response()
    }
}

/// De onde o gate lê cargo e último pedido.
#[async_trait]
pub trait GateSource: Send + Sync {
    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, AppError>;
    async fn latest_order_status(&self, user_id: Uuid) -> Result<Option<OrderStatus>, AppError>;
}

pub struct PgGateSource {
    profiles: ProfileRepository,
    orders: OrderRepository,
}

impl PgGateSource {
    pub fn new(profiles: ProfileRepository, orders: OrderRepository) -> Self {
        Self { profiles, orders }
    }
}

#[async_trait]
impl GateSource for PgGateSource {
    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, AppError> {
        self.profiles.find_role(user_id).await
    }

    async fn latest_order_status(&self, user_id: Uuid) -> Result<Option<OrderStatus>, AppError> {
        self.orders.latest_status_for_user(user_id).await
    }
}

#[derive(Clone)]
pub struct GateService {
    source: Arc<dyn GateSource>,
    watchdog: Duration,
}

impl GateService {
    pub fn new(source: Arc<dyn GateSource>, watchdog: Duration) -> Self {
        Self { source, watchdog }
    }

    /// Área do cliente. `caller` é o usuário da sessão já resolvida.
    pub async fn check_client_area(&self, caller: Option<Uuid>, target: &str) -> GateDecision {
        let Some(user_id) = caller else {
            return GateDecision::Login { from: target.to_string() };
        };

        // O watchdog só cobre cargo + pedido: sem sessão nunca chega aqui.
        match tokio::time::timeout(self.watchdog, self.client_policy(user_id, target)).await {
            Ok(decision) => decision,
            Err(_) => {
                tracing::warn!(%user_id, path = %target, "[gate] watchdog acionado, liberando acesso");
                GateDecision::Allow
            }
        }
    }

    /// Área administrativa: só sessão + cargo `admin`.
    pub async fn check_admin_area(&self, caller: Option<Uuid>, target: &str) -> GateDecision {
        let Some(user_id) = caller else {
            return GateDecision::Login { from: target.to_string() };
        };

        match tokio::time::timeout(self.watchdog, self.resolve_role(user_id)).await {
            Ok(Role::Admin) => GateDecision::Allow,
            Ok(Role::Client) => GateDecision::ClientArea,
            Err(_) => {
                // Aqui o watchdog nunca concede acesso de admin
                tracing::warn!(%user_id, path = %target, "[gate] watchdog acionado na área admin");
                GateDecision::ClientArea
            }
        }
    }

    async fn client_policy(&self, user_id: Uuid, target: &str) -> GateDecision {
        // Admin não checa pendência
        if self.resolve_role(user_id).await.is_admin() {
            return GateDecision::Allow;
        }

        // A própria tela de pagamento pendente é sempre liberada
        if is_pending_payment_screen(target) {
            return GateDecision::Allow;
        }

        match self.source.latest_order_status(user_id).await {
            Ok(Some(status)) if status.is_awaiting_payment() => GateDecision::PendingPayment,
            Ok(_) => GateDecision::Allow,
            Err(e) => {
                tracing::error!(%user_id, "[gate] erro ao checar pedido: {}", e);
                GateDecision::Allow
            }
        }
    }

    // Falha na leitura do cargo cai para `client` (o menos privilegiado)
    async fn resolve_role(&self, user_id: Uuid) -> Role {
        match self.source.role_of(user_id).await {
            Ok(Some(role)) => role,
            Ok(None) => {
                tracing::warn!(%user_id, "[gate] perfil sem cargo, assumindo client");
                Role::Client
            }
            Err(e) => {
                tracing::warn!(%user_id, "[gate] erro ao buscar cargo: {}", e);
                Role::Client
            }
        }
    }
}

fn is_pending_payment_screen(target: &str) -> bool {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    path == PENDING_PAYMENT_PATH
}
