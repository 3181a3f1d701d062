// src/models/clinic.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::documents::validate_cnpj;

// Clínica conveniada (tabela `clinicas`)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    pub id: Uuid,
    #[sqlx(rename = "nome")]
    #[schema(example = "Clínica Exemplo")]
    pub name: String,
    #[schema(example = "12345678000195")]
    pub cnpj: Option<String>,
    pub email: Option<String>,
    #[sqlx(rename = "ativo")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClinicPayload {
    #[validate(length(min = 1, message = "O nome da clínica é obrigatório."))]
    pub name: String,
    #[validate(custom(function = "validate_cnpj"))]
    #[schema(example = "12.345.678/0001-95")]
    pub cnpj: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnpj_and_email_are_optional_but_checked() {
        let ok = CreateClinicPayload {
            name: "Clínica Centro".into(),
            cnpj: None,
            email: None,
            active: true,
        };
        assert!(ok.validate().is_ok());

        let bad = CreateClinicPayload {
            name: "Clínica Centro".into(),
            cnpj: Some("123".into()),
            email: Some("sem-arroba".into()),
            active: true,
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("cnpj"));
        assert!(errors.field_errors().contains_key("email"));
    }
}
