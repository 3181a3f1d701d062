// src/db/profile_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Profile, Role},
};

const PROFILE_COLUMNS: &str = r#"
    id, nome, role, status, cpf, telefone,
    card_number, card_valid_until, validation_token, created_at
"#;

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Perfil criado junto com o usuário (sempre como `client`)
    pub async fn create_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        name: &str,
        cpf: &str,
        phone: &str,
    ) -> Result<Profile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO profiles (id, nome, role, status, cpf, telefone)
            VALUES ($1, $2, 'client', 'active', $3, $4)
            RETURNING {PROFILE_COLUMNS}
            "#
        );

        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .bind(name)
            .bind(cpf)
            .bind(phone)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return match db_err.constraint() {
                            Some("profiles_cpf_key") => AppError::CpfAlreadyExists,
                            Some(other) => AppError::UniqueConstraintViolation(other.to_string()),
                            None => AppError::UniqueConstraintViolation("profiles".into()),
                        };
                    }
                }
                e.into()
            })?;

        Ok(profile)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    // Consulta leve usada pelo gate
    pub async fn find_role(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    pub async fn list_all(&self) -> Result<Vec<Profile>, AppError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC");
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>, AppError> {
        let sql = format!("UPDATE profiles SET role = $2 WHERE id = $1 RETURNING {PROFILE_COLUMNS}");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn issue_card(
        &self,
        id: Uuid,
        card_number: &str,
        valid_until: NaiveDate,
        validation_token: &str,
    ) -> Result<Option<Profile>, AppError> {
        let sql = format!(
            r#"
            UPDATE profiles
            SET card_number = $2, card_valid_until = $3, validation_token = $4
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(card_number)
            .bind(valid_until)
            .bind(validation_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::UniqueConstraintViolation(
                            "Número de cartão já utilizado, tente novamente.".into(),
                        );
                    }
                }
                e.into()
            })?;
        Ok(profile)
    }

    pub async fn find_by_card_number(&self, card_number: &str) -> Result<Option<Profile>, AppError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE card_number = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(card_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn find_by_validation_token(&self, token: &str) -> Result<Option<Profile>, AppError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE validation_token = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }
}
