// src/models/plan.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "plan_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Individual,
    Familia,
    Empresarial,
}

// Plano do catálogo (tabela `planos`), somente leitura para o cliente
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    #[sqlx(rename = "nome")]
    #[schema(example = "Família")]
    pub name: String,
    #[sqlx(rename = "descricao")]
    pub description: String,
    #[sqlx(rename = "preco")]
    #[schema(example = "69.90")]
    pub monthly_price: Decimal,
    #[sqlx(rename = "tipo")]
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    #[sqlx(rename = "assessoria_juridica")]
    pub legal_advisory_included: bool,
    #[sqlx(rename = "max_dependentes")]
    #[schema(example = 4)]
    pub max_dependents: Option<i32>,
    #[sqlx(rename = "preco_por_colaborador")]
    pub per_collaborator_pricing: bool,
    #[sqlx(rename = "ativo")]
    pub active: bool,
}
