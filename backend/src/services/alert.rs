//! Forecast hazard alerts
//!
//! Each hazard is stored once per farm, kind and forecast date. Only newly
//! stored alerts are sent to the farm owner, so re-running a check is quiet.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use shared::hazards::{check_day, Hazard};
use shared::models::ForecastDay;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::{AlertNotice, Notifier};
use crate::services::farm::Farm;

/// Alert service
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
}

/// Stored alert
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub kind: String,
    pub forecast_date: NaiveDate,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Result of screening a forecast
#[derive(Debug, Default, Serialize)]
pub struct AlertCheckReport {
    pub days_checked: usize,
    pub new_alerts: Vec<Alert>,
    /// Hazards that had already been raised by an earlier check
    pub already_raised: usize,
    pub notifications_sent: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct OwnerContact {
    email: String,
    fcm_token: Option<String>,
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Alerts for a farm, soonest forecast date first
    pub async fn list(&self, farm_id: Uuid) -> AppResult<Vec<Alert>> {
        let alerts = sqlx::query_as::<_, Alert>(
            r#"
            SELECT id, farm_id, kind, forecast_date, message, created_at
            FROM alerts
            WHERE farm_id = $1
            ORDER BY forecast_date ASC, kind ASC
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        Ok(alerts)
    }

    /// Screen forecast days for hazards, store new alerts and notify the owner
    pub async fn check(
        &self,
        farm: &Farm,
        days: &[ForecastDay],
        notifier: &Notifier,
    ) -> AppResult<AlertCheckReport> {
        let mut report = AlertCheckReport {
            days_checked: days.len(),
            ..Default::default()
        };

        let contact = sqlx::query_as::<_, OwnerContact>(
            r#"
            SELECT u.email, p.fcm_token
            FROM users u
            LEFT JOIN profiles p ON p.user_id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(farm.owner_id)
        .fetch_optional(&self.db)
        .await?;

        for day in days {
            for hazard in check_day(day) {
                let Some(alert) = self.record(farm.id, day.date, &hazard).await? else {
                    report.already_raised += 1;
                    continue;
                };

                tracing::info!(farm_id = %farm.id, kind = %hazard.kind, date = %day.date, "New weather alert");

                match &contact {
                    Some(contact) => {
                        let delivery = notifier
                            .notify_alert(&AlertNotice {
                                email: &contact.email,
                                push_token: contact.fcm_token.as_deref(),
                                farm_name: &farm.name,
                                message: &alert.message,
                            })
                            .await;
                        if delivery.email_sent || delivery.push_sent {
                            report.notifications_sent += 1;
                        }
                        report.warnings.extend(delivery.warnings);
                    }
                    None => {
                        tracing::warn!(owner_id = %farm.owner_id, "Farm owner has no contact details");
                    }
                }

                report.new_alerts.push(alert);
            }
        }

        Ok(report)
    }

    /// Store an alert unless the same hazard was already raised for that day
    async fn record(
        &self,
        farm_id: Uuid,
        forecast_date: NaiveDate,
        hazard: &Hazard,
    ) -> AppResult<Option<Alert>> {
        let alert = sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (farm_id, kind, forecast_date, message)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT uq_alerts_farm_kind_date DO NOTHING
            RETURNING id, farm_id, kind, forecast_date, message, created_at
            "#,
        )
        .bind(farm_id)
        .bind(hazard.kind.as_str())
        .bind(forecast_date)
        .bind(&hazard.message)
        .fetch_optional(&self.db)
        .await?;

        Ok(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationsConfig;
    use crate::services::testing::fixture_farm;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn day(date: NaiveDate, temp_min: f64, temp_max: f64, rainfall: f64) -> ForecastDay {
        ForecastDay {
            date,
            temp_min,
            temp_max,
            temperature: (temp_min + temp_max) / 2.0,
            humidity: 50.0,
            rainfall,
            wind_speed: 10.0,
            pressure: None,
            precipitation_probability: 0.0,
            description: "clear sky".to_string(),
        }
    }

    fn notifier(server: &MockServer) -> Notifier {
        Notifier::new(&NotificationsConfig {
            email_endpoint: format!("{}/email", server.uri()),
            email_api_key: "mail-key".to_string(),
            from_email: "alerts@example.com".to_string(),
            push_endpoint: String::new(),
            push_server_key: String::new(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("farms")))]
    async fn repeated_check_raises_nothing_new(pool: PgPool) -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/email"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;
        let notifier = notifier(&server);

        let farm = fixture_farm(&pool).await?;
        let hot = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let cold = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        // Heat on the later day; frost and a 16 °C swing on the earlier one
        let days = [day(hot, 24.0, 38.0, 10.0), day(cold, -2.0, 14.0, 0.0)];
        let service = AlertService::new(pool);

        let first = service.check(&farm, &days, &notifier).await?;
        assert_eq!(first.days_checked, 2);
        assert_eq!(first.new_alerts.len(), 3);
        assert_eq!(first.already_raised, 0);
        assert_eq!(first.notifications_sent, 3);
        assert!(first.warnings.is_empty());

        let second = service.check(&farm, &days, &notifier).await?;
        assert!(second.new_alerts.is_empty());
        assert_eq!(second.already_raised, 3);
        assert_eq!(second.notifications_sent, 0);

        let listed: Vec<(NaiveDate, String)> = service
            .list(farm.id)
            .await?
            .into_iter()
            .map(|alert| (alert.forecast_date, alert.kind))
            .collect();
        assert_eq!(
            listed,
            vec![
                (cold, "frost".to_string()),
                (cold, "temperature_swing".to_string()),
                (hot, "heat".to_string()),
            ]
        );
        Ok(())
    }
}
