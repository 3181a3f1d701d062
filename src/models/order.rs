// src/models/order.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pendente,
    AguardandoPagamento,
    Pago,
    Aprovado,
    Cancelado,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pendente,
        OrderStatus::AguardandoPagamento,
        OrderStatus::Pago,
        OrderStatus::Aprovado,
        OrderStatus::Cancelado,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pendente => "pendente",
            OrderStatus::AguardandoPagamento => "aguardando_pagamento",
            OrderStatus::Pago => "pago",
            OrderStatus::Aprovado => "aprovado",
            OrderStatus::Cancelado => "cancelado",
        }
    }

    /// Pedido em aberto: bloqueia o checkout e a área do cliente.
    pub fn is_awaiting_payment(self) -> bool {
        matches!(self, OrderStatus::Pendente | OrderStatus::AguardandoPagamento)
    }

    /// Pedido que dá direito aos benefícios do cartão.
    pub fn grants_benefits(self) -> bool {
        matches!(self, OrderStatus::Pago | OrderStatus::Aprovado)
    }

    // Posição na progressão observada; `cancelado` fica fora da linha.
    fn stage(self) -> Option<u8> {
        match self {
            OrderStatus::Pendente => Some(0),
            OrderStatus::AguardandoPagamento => Some(1),
            OrderStatus::Pago => Some(2),
            OrderStatus::Aprovado => Some(3),
            OrderStatus::Cancelado => None,
        }
    }

    /// Movimento "para trás" (ex.: pago -> pendente, ou reabrir um cancelado).
    /// Não é bloqueado, apenas registrado.
    pub fn is_reverse_of(self, previous: OrderStatus) -> bool {
        match (previous.stage(), self.stage()) {
            (Some(from), Some(to)) => to < from,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Ativa,
    Cancelada,
}

// --- Registros ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "plano_id")]
    pub plan_id: Uuid,
    #[sqlx(rename = "valor_total")]
    #[schema(example = "358.80")]
    pub total_value: Decimal,
    pub status: OrderStatus,
    #[sqlx(rename = "quantidade_colaboradores")]
    #[schema(example = 12)]
    pub collaborator_count: Option<i32>,
    #[sqlx(rename = "observacoes")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dependent {
    pub id: Uuid,
    #[sqlx(rename = "pedido_id")]
    pub order_id: Uuid,
    #[sqlx(rename = "nome")]
    pub name: String,
    #[sqlx(rename = "parentesco")]
    #[schema(example = "cônjuge")]
    pub relationship: String,
    #[sqlx(rename = "data_nascimento")]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "plano_id")]
    pub plan_id: Uuid,
    #[sqlx(rename = "pedido_id")]
    pub order_id: Uuid,
    pub status: SubscriptionStatus,
    #[sqlx(rename = "proximo_pagamento")]
    pub next_payment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// Pedido recém-criado com os dependentes que conseguiram ser gravados
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub dependents: Vec<Dependent>,
    /// Quantos dependentes falharam ao gravar (o pedido é mantido mesmo assim)
    pub failed_dependents: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusSummary {
    pub active_benefits: bool,
    pub checkout_blocked: bool,
    pub latest_order: Option<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResult {
    pub order: Order,
    pub previous_status: OrderStatus,
    pub subscription: Option<Subscription>,
}

// --- Payloads ---

#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependentPayload {
    #[validate(length(min = 1, message = "Informe o nome do dependente."))]
    #[schema(example = "João Souza")]
    pub name: String,
    #[validate(length(min = 1, message = "Informe o parentesco."))]
    #[schema(example = "filho")]
    pub relationship: String,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub plan_id: Uuid,

    /// Só vale para o plano empresarial; nos demais é ignorado.
    #[schema(example = 12)]
    pub collaborator_count: Option<i32>,

    #[serde(default)]
    #[validate(nested)]
    pub dependents: Vec<DependentPayload>,

    #[validate(length(max = 1000, message = "Observações muito longas."))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusPayload {
    pub new_status: OrderStatus,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminOrderQuery {
    /// Filtra por status (omitido = todos)
    pub status: Option<OrderStatus>,
    /// Busca por id do pedido, id do usuário ou status
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_paid_sets_are_disjoint() {
        for status in OrderStatus::ALL {
            assert!(!(status.is_awaiting_payment() && status.grants_benefits()));
        }
        assert!(OrderStatus::Pendente.is_awaiting_payment());
        assert!(OrderStatus::AguardandoPagamento.is_awaiting_payment());
        assert!(OrderStatus::Aprovado.grants_benefits());
        assert!(!OrderStatus::Cancelado.grants_benefits());
    }

    #[test]
    fn reverse_moves_are_detected() {
        assert!(OrderStatus::Pendente.is_reverse_of(OrderStatus::Pago));
        assert!(OrderStatus::Pago.is_reverse_of(OrderStatus::Cancelado));
        assert!(!OrderStatus::Pago.is_reverse_of(OrderStatus::AguardandoPagamento));
        assert!(!OrderStatus::Cancelado.is_reverse_of(OrderStatus::Aprovado));
        assert!(!OrderStatus::Pago.is_reverse_of(OrderStatus::Pago));
    }

    #[test]
    fn status_wire_names_match_database_labels() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn collaborator_count_is_left_to_the_plan_rules() {
        // Sem o plano não dá para saber se a quantidade se aplica
        let payload = CheckoutPayload {
            plan_id: Uuid::new_v4(),
            collaborator_count: Some(0),
            dependents: vec![],
            notes: None,
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn checkout_payload_validates_nested_dependents() {
        let payload = CheckoutPayload {
            plan_id: Uuid::new_v4(),
            collaborator_count: None,
            dependents: vec![DependentPayload {
                name: String::new(),
                relationship: "filho".into(),
                birth_date: None,
            }],
            notes: None,
        };
        assert!(payload.validate().is_err());
    }
}
