// src/models/dashboard.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::order::OrderStatus;

// 1. Cards do topo do painel administrativo
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminKpis {
    pub active_clients: i64,   // Clientes com pedido pago/aprovado
    pub revenue_month: Decimal, // Faturamento do mês (pago/aprovado)
    pub total_open: Decimal,    // Pendente + aguardando pagamento
}

// 2. Faturamento diário (últimos 30 dias, dias sem venda = 0)
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub day: NaiveDate,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub kpis: AdminKpis,
    pub series: Vec<DailyRevenue>,
}

// Linha enxuta de pedido usada nos relatórios
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderReportRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "valor_total")]
    pub total_value: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

// 3. Financeiro por período (agregado no banco, sobre o período inteiro)
#[derive(Debug, Default, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinanceKpis {
    pub revenue: Decimal,
    pub open_amount: Decimal,
    pub paid_count: i64,
    pub open_count: i64,
    /// Total de pedidos do período; `orders` traz no máximo 500
    pub order_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinanceReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub kpis: FinanceKpis,
    pub orders: Vec<OrderReportRow>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FinanceQuery {
    /// Início do período (padrão: primeiro dia do mês)
    pub from: Option<NaiveDate>,
    /// Fim do período, inclusivo (padrão: hoje)
    pub to: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
}
