// src/models/card.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    #[schema(example = "Maria Souza")]
    pub holder_name: String,
    pub card_number: Option<String>,
    pub card_valid_until: Option<NaiveDate>,
    pub validation_token: Option<String>,
    pub active_plan: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ValidateCardRequest {
    pub card_number: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardRejection {
    NotFound,
    Expired,
    NoActivePlan,
}

impl CardRejection {
    pub fn message(self) -> &'static str {
        match self {
            CardRejection::NotFound => "Cartão não encontrado.",
            CardRejection::Expired => "Cartão expirado.",
            CardRejection::NoActivePlan => "Titular sem plano ativo.",
        }
    }
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CardValidation {
    pub fn accepted(name: String, valid_until: NaiveDate) -> Self {
        Self { valid: true, name: Some(name), valid_until: Some(valid_until), reason: None }
    }

    pub fn rejected(reason: CardRejection) -> Self {
        Self { valid: false, name: None, valid_until: None, reason: Some(reason.message().to_string()) }
    }
}
