// src/models/auth.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::documents::{validate_cpf, validate_phone};

// Identidade de autenticação (tabela `users`)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "cliente@radioclim.com.br")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "profile_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Active,
    Inactive,
}

// Perfil do usuário (tabela canônica `profiles`)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    #[sqlx(rename = "nome")]
    #[schema(example = "Maria Souza")]
    pub name: String,
    pub role: Role,
    pub status: ProfileStatus,
    #[schema(example = "52998224725")]
    pub cpf: String,
    #[sqlx(rename = "telefone")]
    #[schema(example = "11987654321")]
    pub phone: String,
    #[schema(example = "4921000012345678")]
    pub card_number: Option<String>,
    pub card_valid_until: Option<NaiveDate>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub validation_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Sessão aberta por login/cadastro (revogável no logout)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "cliente@radioclim.com.br")]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[validate(length(min = 1, message = "Informe seu nome."))]
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[validate(custom(function = "validate_cpf"))]
    #[schema(example = "529.982.247-25")]
    pub cpf: String,
    #[validate(custom(function = "validate_phone"))]
    #[schema(example = "(11) 98765-4321")]
    pub phone: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRolePayload {
    pub role: Role,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub sid: Uuid,  // ID da sessão (permite revogar no logout)
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued At
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(cpf: &str, phone: &str) -> RegisterUserPayload {
        RegisterUserPayload {
            email: "maria@radioclim.com.br".into(),
            password: "segredo123".into(),
            name: "Maria".into(),
            cpf: cpf.into(),
            phone: phone.into(),
        }
    }

    #[test]
    fn register_payload_checks_cpf_and_phone() {
        assert!(register("529.982.247-25", "(11) 98765-4321").validate().is_ok());

        let errors = register("111.111.111-11", "123").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("cpf"));
        assert!(fields.contains_key("phone"));
    }

    #[test]
    fn revoked_or_expired_sessions_are_not_live() {
        let now = Utc::now();
        let mut session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + chrono::Duration::days(7),
            revoked_at: None,
        };
        assert!(session.is_live(now));

        session.revoked_at = Some(now);
        assert!(!session.is_live(now));

        session.revoked_at = None;
        session.expires_at = now - chrono::Duration::seconds(1);
        assert!(!session.is_live(now));
    }

    #[test]
    fn role_uses_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"client\"").unwrap();
        assert!(!role.is_admin());
    }
}
