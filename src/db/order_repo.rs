// src/db/order_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::order::{Dependent, DependentPayload, Order, OrderStatus, Subscription},
};

const ORDER_COLUMNS: &str = r#"
    id, user_id, plano_id, valor_total, status,
    quantidade_colaboradores, observacoes, created_at, updated_at
"#;

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, plano_id, pedido_id, status, proximo_pagamento, created_at";

// Limite da listagem administrativa
const ADMIN_LIST_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PEDIDOS
    // =========================================================================

    // Todo pedido nasce `pendente`
    pub async fn create_order<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        plan_id: Uuid,
        total_value: Decimal,
        collaborator_count: Option<i32>,
        notes: Option<&str>,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO pedidos (user_id, plano_id, valor_total, status, quantidade_colaboradores, observacoes)
            VALUES ($1, $2, $3, 'pendente', $4, $5)
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .bind(plan_id)
            .bind(total_value)
            .bind(collaborator_count)
            .bind(notes)
            .fetch_one(executor)
            .await?;

        Ok(order)
    }

    pub async fn add_dependent<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        dependent: &DependentPayload,
    ) -> Result<Dependent, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Dependent>(
            r#"
            INSERT INTO dependentes (pedido_id, nome, parentesco, data_nascimento)
            VALUES ($1, $2, $3, $4)
            RETURNING id, pedido_id, nome, parentesco, data_nascimento
            "#,
        )
        .bind(order_id)
        .bind(dependent.name.trim())
        .bind(dependent.relationship.trim())
        .bind(dependent.birth_date)
        .fetch_one(executor)
        .await?;

        Ok(created)
    }

    /// Pedido mais recente do usuário (por `created_at`).
    pub async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<Order>, AppError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM pedidos WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1"
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    // Versão leve para o gate: só o status
    pub async fn latest_status_for_user(&self, user_id: Uuid) -> Result<Option<OrderStatus>, AppError> {
        let status = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM pedidos WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(status)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM pedidos WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    /// "Benefícios ativos": existe ao menos um pedido pago ou aprovado.
    pub async fn has_active_benefits(&self, user_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM pedidos
                WHERE user_id = $1 AND status IN ('pago', 'aprovado')
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn list_admin(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
    ) -> Result<Vec<Order>, AppError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")));

        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM pedidos
            WHERE ($1::order_status IS NULL OR status = $1)
              AND (
                $2::text IS NULL
                OR id::text ILIKE $2
                OR user_id::text ILIKE $2
                OR status::text ILIKE $2
              )
            ORDER BY created_at DESC
            LIMIT $3
            "#
        );

        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(status)
            .bind(pattern)
            .bind(ADMIN_LIST_LIMIT)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    // =========================================================================
    //  TRANSIÇÃO (usado dentro de transação)
    // =========================================================================

    pub async fn lock_order<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM pedidos WHERE id = $1 FOR UPDATE");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE pedidos SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .bind(new_status)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::OrderNotFound)?;
        Ok(order)
    }

    /// Ativa a assinatura do pedido. Se já existir (pedido voltou a `pago`),
    /// é reativada com o novo vencimento.
    pub async fn upsert_subscription<'e, E>(
        &self,
        executor: E,
        order: &Order,
        next_payment_date: NaiveDate,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO assinaturas (user_id, plano_id, pedido_id, status, proximo_pagamento)
            VALUES ($1, $2, $3, 'ativa', $4)
            ON CONFLICT (pedido_id) DO UPDATE
                SET status = 'ativa', proximo_pagamento = EXCLUDED.proximo_pagamento
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        );
        let subscription = sqlx::query_as::<_, Subscription>(&sql)
            .bind(order.user_id)
            .bind(order.plan_id)
            .bind(order.id)
            .bind(next_payment_date)
            .fetch_one(executor)
            .await?;
        Ok(subscription)
    }

    // `None` quando o pedido nunca teve assinatura
    pub async fn cancel_subscription<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Option<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE assinaturas SET status = 'cancelada'
            WHERE pedido_id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        );
        let subscription = sqlx::query_as::<_, Subscription>(&sql)
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
        Ok(subscription)
    }
}
