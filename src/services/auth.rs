// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{documents::only_digits, error::AppError},
    db::{ProfileRepository, SessionRepository, UserRepository},
    models::auth::{Claims, Profile, RegisterUserPayload, User},
    services::session_hub::{SessionEvent, SessionHub},
};

const SESSION_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    session_repo: SessionRepository,
    profile_repo: ProfileRepository,
    hub: SessionHub,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        session_repo: SessionRepository,
        profile_repo: ProfileRepository,
        hub: SessionHub,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, session_repo, profile_repo, hub, jwt_secret, pool }
    }

    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<String, AppError> {
        // 1. Hashing fora da transação (não toca no banco)
        let password_clone = payload.password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let email = payload.email.trim().to_lowercase();
        let cpf = only_digits(&payload.cpf);
        let phone = only_digits(&payload.phone);

        // --- INÍCIO DA TRANSAÇÃO ---
        // Usuário, perfil e sessão entram juntos ou não entram
        let mut tx = self.pool.begin().await?;

        let new_user = self.user_repo
            .create_user(&mut *tx, &email, &hashed_password)
            .await?;

        let profile = self.profile_repo
            .create_profile(&mut *tx, new_user.id, payload.name.trim(), &cpf, &phone)
            .await?;

        let session = self.session_repo
            .create(&mut *tx, new_user.id, Self::session_expiry(Utc::now()))
            .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!(user_id = %new_user.id, role = ?profile.role, "📝 Cadastro realizado");

        self.hub.publish(SessionEvent::SignedIn { user_id: new_user.id, session_id: session.id });
        self.create_token(new_user.id, session.id, session.expires_at)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self.user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::warn!(user_id = %user.id, "Tentativa de login com senha inválida");
            return Err(AppError::InvalidCredentials);
        }

        let session = self.session_repo
            .create(&self.pool, user.id, Self::session_expiry(Utc::now()))
            .await?;

        self.hub.publish(SessionEvent::SignedIn { user_id: user.id, session_id: session.id });
        self.create_token(user.id, session.id, session.expires_at)
    }

    pub async fn logout(&self, user_id: Uuid, session_id: Uuid) -> Result<(), AppError> {
        if self.session_repo.revoke(session_id).await? {
            self.hub.publish(SessionEvent::SignedOut { user_id, session_id });
        }
        Ok(())
    }

    /// Token -> usuário. Exige sessão viva (não revogada, não expirada).
    pub async fn validate_token(&self, token: &str) -> Result<(User, Uuid), AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        let claims = token_data.claims;

        let session = self.session_repo
            .find_by_id(claims.sid)
            .await?
            .filter(|s| s.user_id == claims.sub && s.is_live(Utc::now()))
            .ok_or(AppError::InvalidToken)?;

        let user = self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)?;

        Ok((user, session.id))
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.profile_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    fn session_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::days(SESSION_DAYS)
    }

    fn create_token(&self, user_id: Uuid, session_id: Uuid, expires_at: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id,
            sid: session_id,
            exp: expires_at.timestamp() as usize,
            iat: Utc::now().timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
