// src/models/gate.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GateArea {
    #[default]
    Client,
    Admin,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GateQuery {
    /// Caminho que o front quer abrir (ex.: /app/meu-card)
    pub target: String,
    #[serde(default)]
    pub area: GateArea,
}

#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GateAnswer {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "/checkout/pendente")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}
