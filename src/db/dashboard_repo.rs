// src/db/dashboard_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::{
        dashboard::{AdminKpis, DailyRevenue, FinanceKpis, OrderReportRow},
        order::OrderStatus,
    },
};

// Só a listagem é limitada; os totais cobrem o período inteiro
const FINANCE_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Cards do painel, lidos num snapshot só
    pub async fn get_kpis(&self, month_start: DateTime<Utc>) -> Result<AdminKpis, AppError> {
        let mut tx = self.pool.begin().await?;

        // A. Clientes com benefício ativo
        let active_clients = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT user_id)
            FROM pedidos
            WHERE status IN ('pago', 'aprovado')
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        // B. Faturamento do mês
        let revenue_month = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(valor_total), 0)
            FROM pedidos
            WHERE status IN ('pago', 'aprovado')
              AND created_at >= $1
            "#,
        )
        .bind(month_start)
        .fetch_one(&mut *tx)
        .await?;

        // C. Em aberto
        let total_open = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(valor_total), 0)
            FROM pedidos
            WHERE status IN ('pendente', 'aguardando_pagamento')
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AdminKpis {
            active_clients,
            revenue_month,
            total_open,
        })
    }

    // Faturamento por dia (UTC) desde `since`; dias sem venda não aparecem
    pub async fn daily_revenue(&self, since: DateTime<Utc>) -> Result<Vec<DailyRevenue>, AppError> {
        let rows = sqlx::query_as::<_, DailyRevenue>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   SUM(valor_total) AS revenue
            FROM pedidos
            WHERE status IN ('pago', 'aprovado')
              AND created_at >= $1
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // Totais do período [from, to)
    pub async fn period_kpis(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        status: Option<OrderStatus>,
    ) -> Result<FinanceKpis, AppError> {
        let kpis = sqlx::query_as::<_, FinanceKpis>(
            r#"
            SELECT
                COALESCE(SUM(valor_total) FILTER (WHERE status IN ('pago', 'aprovado')), 0) AS revenue,
                COALESCE(SUM(valor_total) FILTER (WHERE status IN ('pendente', 'aguardando_pagamento')), 0) AS open_amount,
                COUNT(*) FILTER (WHERE status IN ('pago', 'aprovado')) AS paid_count,
                COUNT(*) FILTER (WHERE status IN ('pendente', 'aguardando_pagamento')) AS open_count,
                COUNT(*) AS order_count
            FROM pedidos
            WHERE created_at >= $1
              AND created_at < $2
              AND ($3::order_status IS NULL OR status = $3)
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(kpis)
    }

    // Pedidos do período [from, to) para o financeiro
    pub async fn orders_in_period(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderReportRow>, AppError> {
        let rows = sqlx::query_as::<_, OrderReportRow>(
            r#"
            SELECT id, user_id, valor_total, status, created_at
            FROM pedidos
            WHERE created_at >= $1
              AND created_at < $2
              AND ($3::order_status IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(status)
        .bind(FINANCE_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
