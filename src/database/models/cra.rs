use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CraStatus {
    Draft,
    Submitted,
    Validated,
    Rejected,
}

impl CraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CraStatus::Draft => "draft",
            CraStatus::Submitted => "submitted",
            CraStatus::Validated => "validated",
            CraStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayState {
    Worked,
    Absent,
}

impl DayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayState::Worked => "worked",
            DayState::Absent => "absent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationAction {
    Approve,
    Reject,
}

impl ValidationAction {
    /// Resulting `client_validation_status`
    pub fn status(&self) -> &'static str {
        match self {
            ValidationAction::Approve => "approved",
            ValidationAction::Reject => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CraReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub month: String,
    pub client_id: Option<Uuid>,
    pub company_name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub worked_days: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub absent_days: Decimal,
    pub monthly_comment: Option<String>,
    pub admin_comment: Option<String>,
    pub status: String,
    pub client_email: Option<String>,
    #[serde(skip_serializing, default)]
    pub validation_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub client_validation_status: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Report joined with consultant and client names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CraReportView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub report: CraReport,
    pub consultant_email: Option<String>,
    pub consultant_name: Option<String>,
    pub client_name: Option<String>,
}

impl CraReportView {
    pub fn consultant_label(&self) -> String {
        self.consultant_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.consultant_email.clone())
            .unwrap_or_else(|| "Consultant".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CraDayDetail {
    pub id: Uuid,
    pub cra_report_id: Uuid,
    pub date: NaiveDate,
    pub state: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `YYYY-MM` with a real month
pub fn validate_month(month: &str) -> Result<(), ValidationError> {
    let valid = month.len() == 7
        && NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_ok();
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("month").with_message("Mois invalide (AAAA-MM)".into()))
    }
}

fn validate_days(days: &Decimal) -> Result<(), ValidationError> {
    if days.is_sign_negative() || *days > Decimal::from(31) {
        return Err(ValidationError::new("days").with_message("Nombre de jours invalide".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCraRequest {
    #[validate(custom(function = "validate_month"))]
    pub month: String,
    pub client_id: Option<Uuid>,
    pub company_name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[validate(custom(function = "validate_days"))]
    pub worked_days: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[validate(custom(function = "validate_days"))]
    pub absent_days: Option<Decimal>,
    pub monthly_comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCraRequest {
    pub client_id: Option<Uuid>,
    pub company_name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[validate(custom(function = "validate_days"))]
    pub worked_days: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[validate(custom(function = "validate_days"))]
    pub absent_days: Option<Decimal>,
    pub monthly_comment: Option<String>,
    /// Admin only
    pub status: Option<CraStatus>,
    /// Admin only
    pub admin_comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayInput {
    pub date: NaiveDate,
    pub state: DayState,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendValidationRequest {
    pub cra_id: Uuid,
    #[validate(email(message = "Email client invalide"))]
    pub client_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_format() {
        assert!(validate_month("2024-03").is_ok());
        assert!(validate_month("2024-13").is_err());
        assert!(validate_month("2024-3").is_err());
        assert!(validate_month("march").is_err());
    }

    #[test]
    fn validation_token_is_not_serialized() {
        let report = CraReport {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            month: "2024-03".to_string(),
            client_id: None,
            company_name: None,
            worked_days: Decimal::new(185, 1),
            absent_days: Decimal::ZERO,
            monthly_comment: None,
            admin_comment: None,
            status: "draft".to_string(),
            client_email: None,
            validation_token: Some("secret-token".to_string()),
            token_expires_at: None,
            client_validation_status: None,
            validated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("validation_token").is_none());
        assert_eq!(value["worked_days"], 18.5);
    }

    #[test]
    fn negative_days_rejected() {
        let req = CreateCraRequest {
            month: "2024-03".to_string(),
            client_id: None,
            company_name: None,
            worked_days: Some(Decimal::from(-1)),
            absent_days: None,
            monthly_comment: None,
        };
        assert!(req.validate().is_err());
    }
}
