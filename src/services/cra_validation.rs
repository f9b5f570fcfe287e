//! Client-side approval of a CRA through an emailed link.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::email::{send_logged, templates, Attachment, EmailMessage, Mailer};
use super::pdf::{self, CraPdfData, PdfDay};
use super::tokens::{self, TokenKind, TokenRejection};
use crate::config::AppConfig;
use crate::database::models::cra::{CraDayDetail, CraReportView, DayState, ValidationAction};
use crate::error::ApiError;
use crate::middleware::AuthUser;

pub(crate) const REPORT_VIEW: &str = "SELECT r.*, p.email AS consultant_email, p.full_name AS consultant_name, \
     c.name AS client_name \
     FROM cra_reports r \
     LEFT JOIN profiles p ON p.id = r.user_id \
     LEFT JOIN clients c ON c.id = r.client_id";

const NO_CLIENT: &str = "Non spécifié";
const DEFAULT_COMPANY: &str = "Wavy Services";

/// `uuid-uuid`
pub fn generate_token() -> String {
    format!("{}-{}", Uuid::new_v4(), Uuid::new_v4())
}

fn summary<'a>(report: &'a CraReportView, consultant: &'a str, month_label: &'a str) -> templates::CraSummary<'a> {
    templates::CraSummary {
        consultant,
        month_label,
        client_name: report.client_name.as_deref().unwrap_or(NO_CLIENT),
        worked_days: report.report.worked_days.normalize().to_string(),
        absent_days: report.report.absent_days.normalize().to_string(),
        monthly_comment: report.report.monthly_comment.as_deref(),
    }
}

/// Issue a validation token for a report and mail the approve/reject links
pub async fn send_validation(
    pool: &PgPool,
    mailer: &dyn Mailer,
    config: &AppConfig,
    user: &AuthUser,
    cra_id: Uuid,
    client_email: &str,
) -> Result<(), ApiError> {
    let report: Option<CraReportView> = sqlx::query_as(&format!("{} WHERE r.id = $1", REPORT_VIEW))
        .bind(cra_id)
        .fetch_optional(pool)
        .await?;
    let report = report.ok_or_else(|| ApiError::not_found("CRA introuvable"))?;
    if !user.owns(report.report.user_id) {
        tracing::warn!("User {} tried to send CRA {} for validation", user.id, cra_id);
        return Err(ApiError::forbidden("Accès refusé"));
    }

    // An approval is final; a rejected report may be corrected and sent again
    let approved = || {
        TokenRejection::AlreadyProcessed("approved".to_string()).into_api_error(TokenKind::CraValidation)
    };
    if report.report.client_validation_status.as_deref() == Some("approved") {
        return Err(approved());
    }

    let token = generate_token();
    let expires_at = Utc::now() + Duration::days(config.tokens.cra_validation_ttl_days);
    let updated = sqlx::query(
        "UPDATE cra_reports SET client_email = $1, validation_token = $2, token_expires_at = $3, \
         client_validation_status = 'sent', updated_at = NOW() \
         WHERE id = $4 AND client_validation_status IS DISTINCT FROM 'approved'",
    )
    .bind(client_email)
    .bind(&token)
    .bind(expires_at)
    .bind(cra_id)
    .execute(pool)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(approved());
    }
    tracing::info!("CRA {} sent for client validation", cra_id);

    let month_label = pdf::month_label(&report.report.month);
    let consultant = report.consultant_label();
    let base = format!("{}/cra/validate?token={}", config.security.frontend_url, token);
    let html = templates::cra_validation(
        &summary(&report, &consultant, &month_label),
        &format!("{}&action=approve", base),
        &format!("{}&action=reject", base),
        config.tokens.cra_validation_ttl_days,
    );
    send_logged(
        mailer,
        EmailMessage::new(client_email, templates::cra_validation_subject(&month_label), html),
    )
    .await;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub status: String,
    pub message: String,
    pub month: String,
    pub client_name: Option<String>,
}

/// Apply the client's decision. Rejections are reported in the order unknown
/// token, expired, already processed; the final update is guarded so the
/// decision is recorded once.
pub async fn validate(
    pool: &PgPool,
    mailer: &dyn Mailer,
    token: &str,
    action: ValidationAction,
) -> Result<ValidationOutcome, ApiError> {
    let report: Option<CraReportView> =
        sqlx::query_as(&format!("{} WHERE r.validation_token = $1", REPORT_VIEW))
            .bind(token)
            .fetch_optional(pool)
            .await?;
    let report = report.ok_or_else(|| TokenRejection::Unknown.into_api_error(TokenKind::CraValidation))?;

    tokens::check(
        report.report.token_expires_at,
        report.report.client_validation_status.as_deref(),
        Utc::now(),
    )
    .map_err(|r| r.into_api_error(TokenKind::CraValidation))?;

    let new_status = action.status();
    let updated = sqlx::query(
        "UPDATE cra_reports SET client_validation_status = $1, validated_at = NOW(), \
         validation_token = NULL, updated_at = NOW() \
         WHERE id = $2 AND validation_token = $3 \
         AND client_validation_status IS DISTINCT FROM 'approved' \
         AND client_validation_status IS DISTINCT FROM 'rejected'",
    )
    .bind(new_status)
    .bind(report.report.id)
    .bind(token)
    .execute(pool)
    .await?
    .rows_affected();
    if updated == 0 {
        // Lost a race with another presentation of the same link
        return Err(TokenRejection::Unknown.into_api_error(TokenKind::CraValidation));
    }
    tracing::info!("CRA {} {} by client", report.report.id, new_status);

    let month_label = pdf::month_label(&report.report.month);
    if action == ValidationAction::Approve {
        send_approval(pool, mailer, &report, &month_label).await;
    }

    let message = match action {
        ValidationAction::Approve => format!("Le CRA de {} a été approuvé avec succès.", month_label),
        ValidationAction::Reject => format!("Le CRA de {} a été rejeté.", month_label),
    };
    Ok(ValidationOutcome {
        status: new_status.to_string(),
        message,
        month: month_label,
        client_name: report.client_name.clone(),
    })
}

/// `15 avril 2024 à 14:30`
fn validated_at_label(now: chrono::DateTime<Utc>) -> String {
    let day = pdf::month_label(&now.format("%Y-%m").to_string());
    format!("{} {} à {}", now.format("%-d"), day, now.format("%H:%M"))
}

/// PDF receipt to the client contact and the consultant; failures are logged
async fn send_approval(pool: &PgPool, mailer: &dyn Mailer, report: &CraReportView, month_label: &str) {
    let days: Vec<CraDayDetail> =
        match sqlx::query_as("SELECT * FROM cra_day_details WHERE cra_report_id = $1 ORDER BY date")
            .bind(report.report.id)
            .fetch_all(pool)
            .await
        {
            Ok(days) => days,
            Err(e) => {
                tracing::error!("Failed to load days of CRA {}: {}", report.report.id, e);
                return;
            }
        };

    let consultant = report.consultant_label();
    let data = CraPdfData {
        month: report.report.month.clone(),
        client_name: report.client_name.clone().unwrap_or_else(|| NO_CLIENT.to_string()),
        company_name: report
            .report
            .company_name
            .clone()
            .unwrap_or_else(|| DEFAULT_COMPANY.to_string()),
        consultant: consultant.clone(),
        worked_days: report.report.worked_days,
        absent_days: report.report.absent_days,
        monthly_comment: report.report.monthly_comment.clone(),
        days: days
            .into_iter()
            .map(|d| PdfDay {
                date: d.date,
                worked: d.state == DayState::Worked.as_str(),
                comment: d.comment,
            })
            .collect(),
        validated_at: validated_at_label(Utc::now()),
        validator_name: None,
    };

    let content = match pdf::generate_cra_pdf(&data) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!("Failed to render PDF for CRA {}: {}", report.report.id, e);
            return;
        }
    };
    let attachment = Attachment {
        filename: pdf::pdf_filename(&consultant, &report.report.month),
        content,
    };

    let subject = templates::cra_approved_subject(&consultant, month_label);
    let html = templates::cra_approved(&summary(report, &consultant, month_label));
    let recipients = [report.report.client_email.as_deref(), report.consultant_email.as_deref()];
    for to in recipients.into_iter().flatten() {
        let mut message = EmailMessage::new(to, subject.clone(), html.clone());
        message.attachments.push(attachment.clone());
        send_logged(mailer, message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn token_is_two_uuids() {
        let token = generate_token();
        assert_eq!(token.len(), 73);
        assert!(Uuid::parse_str(&token[..36]).is_ok());
        assert!(Uuid::parse_str(&token[37..]).is_ok());
    }

    #[test]
    fn validation_date_label() {
        let at = Utc.with_ymd_and_hms(2024, 4, 15, 14, 30, 0).unwrap();
        assert_eq!(validated_at_label(at), "15 avril 2024 à 14:30");
    }
}
