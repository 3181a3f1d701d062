// src/config.rs

use std::{env, fmt, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{ClinicRepository, DashboardRepository, OrderRepository, PlanRepository, ProfileRepository, SessionRepository, UserRepository},
    services::{
        auth::AuthService,
        card_service::CardService,
        dashboard_service::DashboardService,
        gate_service::{GateService, PgGateSource},
        order_service::{OrderService, PgOrderStore, SubmissionGuard},
        session_hub::SessionHub,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_WATCHDOG_SECS: u64 = 8;
const DEFAULT_CARD_VALIDATION_URL: &str = "https://radioclim.com.br/validar";

/// Configuração lida do ambiente (`.env` incluído).
#[derive(Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub gate_watchdog: Duration,
    pub card_validation_url: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR inválido")?;

        let gate_watchdog = parse_watchdog(env::var("GATE_WATCHDOG_SECS").ok().as_deref())?;

        let card_validation_url = env::var("CARD_VALIDATION_URL")
            .unwrap_or_else(|_| DEFAULT_CARD_VALIDATION_URL.to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            gate_watchdog,
            card_validation_url,
        })
    }
}

// Segredos nunca vão para o log
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("database_url", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("bind_addr", &self.bind_addr)
            .field("gate_watchdog", &self.gate_watchdog)
            .field("card_validation_url", &self.card_validation_url)
            .finish()
    }
}

fn parse_watchdog(raw: Option<&str>) -> anyhow::Result<Duration> {
    match raw {
        None => Ok(Duration::from_secs(DEFAULT_WATCHDOG_SECS)),
        Some(value) => {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("GATE_WATCHDOG_SECS inválido: {value}"))?;
            anyhow::ensure!(secs > 0, "GATE_WATCHDOG_SECS deve ser maior que zero");
            Ok(Duration::from_secs(secs))
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub gate_service: GateService,
    pub order_service: OrderService,
    pub card_service: CardService,
    pub dashboard_service: DashboardService,
    pub session_hub: SessionHub,
    pub plan_repo: PlanRepository,
    pub profile_repo: ProfileRepository,
    pub clinic_repo: ClinicRepository,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let session_repo = SessionRepository::new(db_pool.clone());
        let profile_repo = ProfileRepository::new(db_pool.clone());
        let plan_repo = PlanRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let clinic_repo = ClinicRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        let session_hub = SessionHub::new();

        let auth_service = AuthService::new(
            user_repo,
            session_repo,
            profile_repo.clone(),
            session_hub.clone(),
            settings.jwt_secret.clone(),
            db_pool.clone(),
        );

        let gate_source = PgGateSource::new(profile_repo.clone(), order_repo.clone());
        let gate_service = GateService::new(Arc::new(gate_source), settings.gate_watchdog);

        let order_store = PgOrderStore::new(order_repo.clone(), plan_repo.clone(), db_pool.clone());
        let order_service = OrderService::new(Arc::new(order_store), SubmissionGuard::new());

        let card_service = CardService::new(
            profile_repo.clone(),
            order_repo,
            settings.card_validation_url.clone(),
        );

        let dashboard_service = DashboardService::new(dashboard_repo);

        Ok(Self {
            db_pool,
            auth_service,
            gate_service,
            order_service,
            card_service,
            dashboard_service,
            session_hub,
            plan_repo,
            profile_repo,
            clinic_repo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchdog_defaults_to_eight_seconds() {
        assert_eq!(parse_watchdog(None).unwrap(), Duration::from_secs(8));
    }

    #[test]
    fn watchdog_accepts_override_and_rejects_garbage() {
        assert_eq!(parse_watchdog(Some(" 3 ")).unwrap(), Duration::from_secs(3));
        assert!(parse_watchdog(Some("abc")).is_err());
        assert!(parse_watchdog(Some("0")).is_err());
    }

    #[test]
    fn debug_output_hides_credentials() {
        let settings = Settings {
            database_url: "postgres://radioclim:senha-do-banco@db/radioclim".into(),
            jwt_secret: "segredo-jwt".into(),
            bind_addr: DEFAULT_BIND_ADDR.parse().unwrap(),
            gate_watchdog: Duration::from_secs(8),
            card_validation_url: DEFAULT_CARD_VALIDATION_URL.into(),
        };

        let printed = format!("{settings:?}");
        assert!(!printed.contains("senha-do-banco"));
        assert!(!printed.contains("segredo-jwt"));
        assert!(printed.contains("0.0.0.0:3000"));
    }
}
