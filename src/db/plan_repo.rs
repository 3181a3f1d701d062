// src/db/plan_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::plan::Plan};

const PLAN_COLUMNS: &str = r#"
    id, nome, descricao, preco, tipo, assessoria_juridica,
    max_dependentes, preco_por_colaborador, ativo
"#;

#[derive(Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Catálogo público: só planos ativos, do mais barato ao mais caro
    pub async fn list_active(&self) -> Result<Vec<Plan>, AppError> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM planos WHERE ativo = true ORDER BY preco ASC");
        let plans = sqlx::query_as::<_, Plan>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(plans)
    }

    pub async fn find_active(&self, id: Uuid) -> Result<Option<Plan>, AppError> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM planos WHERE id = $1 AND ativo = true");
        let plan = sqlx::query_as::<_, Plan>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(plan)
    }
}
