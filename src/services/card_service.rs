// src/services/card_service.rs

use chrono::{Months, NaiveDate, Utc};
use qrcode::{render::svg, QrCode};
use uuid::Uuid;

use crate::{
    common::{documents::only_digits, error::AppError},
    db::{OrderRepository, ProfileRepository},
    models::{
        auth::Profile,
        card::{CardRejection, CardValidation, CardView, ValidateCardRequest},
    },
};

const CARD_DIGITS: u32 = 16;
const FALLBACK_HOLDER: &str = "Cliente";

/// Decide se um cartão é aceito, dado o perfil encontrado (se houver).
pub fn evaluate_card(profile: Option<&Profile>, has_benefits: bool, today: NaiveDate) -> CardValidation {
    let Some(profile) = profile else {
        return CardValidation::rejected(CardRejection::NotFound);
    };
    let Some(valid_until) = profile.card_valid_until else {
        return CardValidation::rejected(CardRejection::NotFound);
    };
    if valid_until < today {
        return CardValidation::rejected(CardRejection::Expired);
    }
    if !has_benefits {
        return CardValidation::rejected(CardRejection::NoActivePlan);
    }
    CardValidation::accepted(holder_name(profile), valid_until)
}

fn holder_name(profile: &Profile) -> String {
    let name = profile.name.trim();
    if name.is_empty() { FALLBACK_HOLDER.to_string() } else { name.to_string() }
}

// Número de 16 dígitos, com zeros à esquerda
fn card_number_from(seed: Uuid) -> String {
    let modulus = 10u128.pow(CARD_DIGITS);
    format!("{:0width$}", seed.as_u128() % modulus, width = CARD_DIGITS as usize)
}

#[derive(Clone)]
pub struct CardService {
    profile_repo: ProfileRepository,
    order_repo: OrderRepository,
    validation_url: String,
}

impl CardService {
    pub fn new(profile_repo: ProfileRepository, order_repo: OrderRepository, validation_url: String) -> Self {
        Self { profile_repo, order_repo, validation_url }
    }

    pub async fn my_card(&self, user_id: Uuid) -> Result<CardView, AppError> {
        let profile = self.profile_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if profile.role.is_admin() {
            return Err(AppError::Forbidden("O cartão é exibido apenas para clientes.".into()));
        }

        let active_plan = self.order_repo.has_active_benefits(user_id).await?;

        Ok(CardView {
            holder_name: holder_name(&profile),
            card_number: profile.card_number,
            card_valid_until: profile.card_valid_until,
            validation_token: profile.validation_token,
            active_plan,
        })
    }

    pub async fn qrcode_svg(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = self.profile_repo
            .find_by_id(user_id)
            .await?
            .and_then(|p| p.validation_token)
            .ok_or(AppError::CardNotIssued)?;

        let url = format!("{}?token={}", self.validation_url, token);
        let code = QrCode::new(url.as_bytes())
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        Ok(code
            .render::<svg::Color>()
            .min_dimensions(240, 240)
            .quiet_zone(true)
            .build())
    }

    pub async fn validate(&self, request: &ValidateCardRequest) -> Result<CardValidation, AppError> {
        let token = request.token.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let number = request
            .card_number
            .as_deref()
            .map(only_digits)
            .filter(|n| !n.is_empty());

        let profile = match (token, number) {
            (Some(token), _) => self.profile_repo.find_by_validation_token(token).await?,
            (None, Some(number)) => self.profile_repo.find_by_card_number(&number).await?,
            (None, None) => return Err(AppError::BadRequest("Informe o número do cartão ou o token.".into())),
        };

        let has_benefits = match &profile {
            Some(p) => self.order_repo.has_active_benefits(p.id).await?,
            None => false,
        };

        let result = evaluate_card(profile.as_ref(), has_benefits, Utc::now().date_naive());
        tracing::info!(valid = result.valid, "🔎 Validação de cartão");
        Ok(result)
    }

    /// Emite (ou reemite) o cartão: número novo, validade de um ano, token novo.
    pub async fn issue_card(&self, profile_id: Uuid) -> Result<Profile, AppError> {
        let today = Utc::now().date_naive();
        let valid_until = today
            .checked_add_months(Months::new(12))
            .ok_or_else(|| anyhow::anyhow!("Data de validade fora do intervalo"))?;

        let number = card_number_from(Uuid::new_v4());
        let token = Uuid::new_v4().simple().to_string();

        let profile = self.profile_repo
            .issue_card(profile_id, &number, valid_until, &token)
            .await?
            .ok_or(AppError::UserNotFound)?;

        tracing::info!(profile_id = %profile_id, %valid_until, "💳 Cartão emitido");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::{ProfileStatus, Role};

    fn profile(name: &str, valid_until: Option<NaiveDate>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            role: Role::Client,
            status: ProfileStatus::Active,
            cpf: "52998224725".into(),
            phone: "11987654321".into(),
            card_number: Some("0000123412341234".into()),
            card_valid_until: valid_until,
            validation_token: Some("abc".into()),
            created_at: Utc::now(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn unknown_card_is_rejected() {
        let result = evaluate_card(None, true, day(2025, 1, 1));
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some(CardRejection::NotFound.message()));
    }

    #[test]
    fn card_valid_through_its_last_day() {
        let p = profile("Maria", Some(day(2025, 6, 30)));
        let result = evaluate_card(Some(&p), true, day(2025, 6, 30));
        assert_eq!(result, CardValidation::accepted("Maria".into(), day(2025, 6, 30)));

        let expired = evaluate_card(Some(&p), true, day(2025, 7, 1));
        assert_eq!(expired.reason.as_deref(), Some(CardRejection::Expired.message()));
    }

    #[test]
    fn holder_without_paid_order_is_rejected() {
        let p = profile("Maria", Some(day(2030, 1, 1)));
        let result = evaluate_card(Some(&p), false, day(2025, 1, 1));
        assert_eq!(result, CardValidation::rejected(CardRejection::NoActivePlan));
    }

    #[test]
    fn blank_name_falls_back_to_cliente() {
        let p = profile("   ", Some(day(2030, 1, 1)));
        let result = evaluate_card(Some(&p), true, day(2025, 1, 1));
        assert_eq!(result.name.as_deref(), Some("Cliente"));
    }

    #[test]
    fn card_numbers_have_sixteen_digits() {
        assert_eq!(card_number_from(Uuid::nil()), "0000000000000000");
        let n = card_number_from(Uuid::new_v4());
        assert_eq!(n.len(), 16);
        assert!(n.chars().all(|c| c.is_ascii_digit()));
    }
}
