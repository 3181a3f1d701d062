// src/db/clinic_repo.rs

use sqlx::PgPool;

use crate::{
    common::{documents::only_digits, error::AppError},
    models::clinic::{Clinic, CreateClinicPayload},
};

#[derive(Clone)]
pub struct ClinicRepository {
    pool: PgPool,
}

impl ClinicRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<Clinic>, AppError> {
        let clinics = sqlx::query_as::<_, Clinic>(
            "SELECT id, nome, cnpj, email, ativo, created_at FROM clinicas ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(clinics)
    }

    pub async fn create(&self, payload: &CreateClinicPayload) -> Result<Clinic, AppError> {
        // CNPJ é gravado só com dígitos
        let cnpj = payload.cnpj.as_deref().map(only_digits);

        let clinic = sqlx::query_as::<_, Clinic>(
            r#"
            INSERT INTO clinicas (nome, cnpj, email, ativo)
            VALUES ($1, $2, $3, $4)
            RETURNING id, nome, cnpj, email, ativo, created_at
            "#,
        )
        .bind(payload.name.trim())
        .bind(cnpj)
        .bind(payload.email.as_deref())
        .bind(payload.active)
        .fetch_one(&self.pool)
        .await?;
        Ok(clinic)
    }
}
