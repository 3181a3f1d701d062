// src/services/dashboard_service.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::{AdminDashboard, DailyRevenue, FinanceQuery, FinanceReport},
};

const SERIES_DAYS: i64 = 30;

// Anos aceitos no filtro do financeiro
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

fn first_of_month(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// Faturamento por dia a partir de `start`, `days` dias, preenchendo com zero.
pub fn daily_revenue_series(totals: &[DailyRevenue], start: NaiveDate, days: i64) -> Vec<DailyRevenue> {
    let by_day: BTreeMap<NaiveDate, Decimal> = totals
        .iter()
        .map(|entry| (entry.day, entry.revenue))
        .collect();

    (0..days)
        .map(|offset| {
            let day = start + Duration::days(offset);
            DailyRevenue {
                day,
                revenue: by_day.get(&day).copied().unwrap_or_default(),
            }
        })
        .collect()
}

/// Período do financeiro já resolvido: datas pedidas e o intervalo `[start, end)`.
#[derive(Debug, PartialEq)]
pub struct FinancePeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub fn finance_period(query: &FinanceQuery, today: NaiveDate) -> Result<FinancePeriod, AppError> {
    let from = query.from.unwrap_or_else(|| first_of_month(today));
    let to = query.to.unwrap_or(today);

    if to < from {
        return Err(AppError::BadRequest("A data final deve ser posterior à inicial.".into()));
    }

    let in_range = |d: NaiveDate| (MIN_YEAR..=MAX_YEAR).contains(&d.year());
    if !in_range(from) || !in_range(to) {
        return Err(AppError::BadRequest("Período fora do intervalo suportado.".into()));
    }

    // `to` é inclusivo: consulta até o início do dia seguinte
    let day_after = to
        .succ_opt()
        .ok_or_else(|| AppError::BadRequest("Período fora do intervalo suportado.".into()))?;

    Ok(FinancePeriod {
        from,
        to,
        start: start_of_day(from),
        end: start_of_day(day_after),
    })
}

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn admin_dashboard(&self) -> Result<AdminDashboard, AppError> {
        let today = Utc::now().date_naive();
        let kpis = self.repo.get_kpis(start_of_day(first_of_month(today))).await?;

        let series_start = today - Duration::days(SERIES_DAYS - 1);
        let totals = self.repo.daily_revenue(start_of_day(series_start)).await?;

        Ok(AdminDashboard {
            kpis,
            series: daily_revenue_series(&totals, series_start, SERIES_DAYS),
        })
    }

    pub async fn finance_report(&self, query: &FinanceQuery) -> Result<FinanceReport, AppError> {
        let period = finance_period(query, Utc::now().date_naive())?;

        let kpis = self
            .repo
            .period_kpis(period.start, period.end, query.status)
            .await?;
        let orders = self
            .repo
            .orders_in_period(period.start, period.end, query.status)
            .await?;

        if (orders.len() as i64) < kpis.order_count {
            tracing::debug!(
                listed = orders.len(),
                total = kpis.order_count,
                "Financeiro: listagem truncada"
            );
        }

        Ok(FinanceReport {
            from: period.from,
            to: period.to,
            kpis,
            orders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn revenue(d: u32, cents: i64) -> DailyRevenue {
        DailyRevenue {
            day: day(d),
            revenue: Decimal::new(cents, 2),
        }
    }

    #[test]
    fn series_fills_missing_days_with_zero() {
        let totals = vec![revenue(2, 10980), revenue(4, 2990)];
        let series = daily_revenue_series(&totals, day(1), 5);

        assert_eq!(series.len(), 5);
        assert_eq!(series[0].revenue, Decimal::ZERO);
        assert_eq!(series[1].revenue, Decimal::new(10980, 2));
        assert_eq!(series[2].revenue, Decimal::ZERO);
        assert_eq!(series[3], revenue(4, 2990));
        assert_eq!(series[4].day, day(5));
    }

    #[test]
    fn series_ignores_days_outside_the_window() {
        let totals = vec![revenue(1, 5000), revenue(9, 7000)];
        let series = daily_revenue_series(&totals, day(2), 3);

        assert!(series.iter().all(|entry| entry.revenue == Decimal::ZERO));
        assert_eq!(series.first().map(|e| e.day), Some(day(2)));
    }

    #[test]
    fn default_period_runs_from_month_start_to_today() {
        let period = finance_period(&FinanceQuery::default(), day(17)).unwrap();

        assert_eq!(period.from, day(1));
        assert_eq!(period.to, day(17));
        assert_eq!(period.start, start_of_day(day(1)));
        assert_eq!(period.end, start_of_day(day(18)));
    }

    #[test]
    fn inverted_period_is_rejected() {
        let query = FinanceQuery {
            from: Some(day(10)),
            to: Some(day(9)),
            status: None,
        };
        assert!(matches!(finance_period(&query, day(17)), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn extreme_dates_are_rejected_instead_of_overflowing() {
        let last_day = FinanceQuery {
            from: Some(day(1)),
            to: Some(NaiveDate::MAX),
            status: None,
        };
        assert!(matches!(finance_period(&last_day, day(17)), Err(AppError::BadRequest(_))));

        let first_day = FinanceQuery {
            from: Some(NaiveDate::MIN),
            to: Some(day(1)),
            status: None,
        };
        assert!(matches!(finance_period(&first_day, day(17)), Err(AppError::BadRequest(_))));

        let year_end = NaiveDate::from_ymd_opt(MAX_YEAR, 12, 31).unwrap();
        let edge = FinanceQuery {
            from: Some(year_end),
            to: Some(year_end),
            status: None,
        };
        let period = finance_period(&edge, day(17)).unwrap();
        assert_eq!(period.end - period.start, Duration::days(1));
    }
}
