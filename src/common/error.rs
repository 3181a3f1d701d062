use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("CPF já cadastrado")]
    CpfAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("Plano não encontrado")]
    PlanNotFound,

    #[error("Pedido não encontrado")]
    OrderNotFound,

    #[error("Cartão não emitido")]
    CardNotIssued,

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Checkout inválido: {0}")]
    InvalidCheckout(String),

    #[error("Limite de dependentes excedido (máximo {max})")]
    DependentLimitExceeded { max: i32 },

    #[error("Existe um pedido aguardando pagamento")]
    CheckoutBlocked,

    #[error("Pedido já está sendo processado")]
    SubmissionInProgress,

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` carrega o contexto do erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::InvalidCheckout(_)
            | AppError::DependentLimitExceeded { .. } => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists
            | AppError::CpfAlreadyExists
            | AppError::CheckoutBlocked
            | AppError::SubmissionInProgress
            | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UserNotFound
            | AppError::PlanNotFound
            | AppError::OrderNotFound
            | AppError::CardNotIssued => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = match self {
            // Retorna todos os detalhes da validação, campo a campo
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::EmailAlreadyExists => "Este e-mail já está em uso.".to_string(),
            AppError::CpfAlreadyExists => "Este CPF já está cadastrado.".to_string(),
            AppError::InvalidCredentials => "E-mail ou senha inválidos.".to_string(),
            AppError::InvalidToken => "Token de autenticação inválido ou ausente.".to_string(),
            AppError::UserNotFound => "Usuário não encontrado.".to_string(),
            AppError::Forbidden(reason) => reason,
            AppError::PlanNotFound => "Plano não encontrado ou inativo.".to_string(),
            AppError::OrderNotFound => "Pedido não encontrado.".to_string(),
            AppError::CardNotIssued => "Nenhum cartão foi emitido para este perfil.".to_string(),
            AppError::BadRequest(reason) | AppError::InvalidCheckout(reason) => reason,
            AppError::DependentLimitExceeded { max } => {
                format!("Este plano permite no máximo {} dependente(s).", max)
            }
            AppError::CheckoutBlocked => {
                "Você já possui um pedido aguardando pagamento.".to_string()
            }
            AppError::SubmissionInProgress => {
                "Seu pedido já está sendo processado. Aguarde.".to_string()
            }
            AppError::UniqueConstraintViolation(detail) => detail,

            // DatabaseError, InternalServerError etc. viram 500 com mensagem genérica;
            // o detalhe fica só no log.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                "Ocorreu um erro inesperado.".to_string()
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
