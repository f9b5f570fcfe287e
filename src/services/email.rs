use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::config::EmailConfig;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// File attached to an outgoing message; `content` is base64
#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            html: html.into(),
            attachments: Vec::new(),
        }
    }
}

/// Outbound mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Sends through the Resend HTTP API
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, config: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url: config.api_url.clone(),
            from: config.from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let mut body = json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        });
        if !message.attachments.is_empty() {
            body["attachments"] = json!(message.attachments);
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status, body });
        }

        tracing::info!("Email '{}' sent to {} recipient(s)", message.subject, message.to.len());
        Ok(())
    }
}

/// Used when no API key is configured: logs and drops every message
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        tracing::warn!("RESEND_API_KEY not set, email not sent: {}", message.subject);
        Ok(())
    }
}

/// Pick the transport for a configuration
pub fn mailer_from_config(config: &EmailConfig) -> std::sync::Arc<dyn Mailer> {
    match &config.resend_api_key {
        Some(key) => std::sync::Arc::new(ResendMailer::new(key.clone(), config)),
        None => std::sync::Arc::new(LogMailer),
    }
}

/// Send and log a failure instead of returning it
pub async fn send_logged(mailer: &dyn Mailer, message: EmailMessage) {
    let subject = message.subject.clone();
    if let Err(e) = mailer.send(message).await {
        tracing::error!("Failed to send email '{}': {}", subject, e);
    }
}

pub mod templates {
    //! French HTML bodies; every interpolated value is escaped.

    use ammonia::clean_text;

    fn layout(content: &str) -> String {
        format!(
            r#"<div style="font-family: sans-serif; max-width: 560px; margin: 0 auto; padding: 24px;">{}</div>"#,
            content
        )
    }

    pub const OTP_SUBJECT: &str = "Votre code de vérification Wavy Services";
    pub const RESET_SUBJECT: &str = "Réinitialisation de mot de passe - Wavy Services";
    pub const INVITATION_SUBJECT: &str = "Invitation à rejoindre l'espace CRA - Wavy Services";

    pub fn otp(code: &str, ttl_minutes: i64) -> String {
        layout(&format!(
            r#"<h2>Code de vérification</h2>
<p>Votre code de connexion à Wavy Services :</p>
<div style="font-size: 36px; font-weight: bold; letter-spacing: 8px; text-align: center; background: #f5f5f5; padding: 24px; border-radius: 8px; margin: 24px 0;">{}</div>
<p style="color: #666;">Ce code est valable {} minutes.</p>
<p style="color: #999; font-size: 12px;">Si vous n'avez pas demandé ce code, ignorez cet email.</p>"#,
            clean_text(code),
            ttl_minutes
        ))
    }

    pub fn password_reset(link: &str) -> String {
        layout(&format!(
            r#"<h2>Réinitialisation de mot de passe</h2>
<p>Vous avez demandé à réinitialiser votre mot de passe.</p>
<p><a href="{0}" style="background: #2563eb; color: white; padding: 12px 24px; border-radius: 6px; text-decoration: none;">Choisir un nouveau mot de passe</a></p>
<p style="color: #666;">Ce lien est valable 1 heure.</p>
<p style="color: #999; font-size: 12px;">Si vous n'êtes pas à l'origine de cette demande, ignorez cet email.</p>"#,
            clean_text(link)
        ))
    }

    pub fn invitation(first_name: Option<&str>, link: &str, ttl_days: i64) -> String {
        let greeting = match first_name {
            Some(name) if !name.trim().is_empty() => format!("Bonjour {},", clean_text(name)),
            _ => "Bonjour,".to_string(),
        };
        layout(&format!(
            r#"<h2>Invitation à l'espace CRA</h2>
<p>{}</p>
<p>Vous êtes invité(e) à rejoindre l'espace CRA de Wavy Services pour saisir vos comptes-rendus d'activité.</p>
<p><a href="{}" style="background: #2563eb; color: white; padding: 12px 24px; border-radius: 6px; text-decoration: none;">Créer mon compte</a></p>
<p style="color: #666;">Cette invitation est valable {} jours.</p>"#,
            greeting,
            clean_text(link),
            ttl_days
        ))
    }

    /// Figures shown in both CRA emails
    pub struct CraSummary<'a> {
        pub consultant: &'a str,
        pub month_label: &'a str,
        pub client_name: &'a str,
        pub worked_days: String,
        pub absent_days: String,
        pub monthly_comment: Option<&'a str>,
    }

    fn cra_details(summary: &CraSummary<'_>) -> String {
        let mut rows = format!(
            r#"<p><strong>Consultant :</strong> {}</p>
<p><strong>Période :</strong> {}</p>
<p><strong>Client :</strong> {}</p>
<p><strong>Jours travaillés :</strong> {}</p>
<p><strong>Jours d'absence :</strong> {}</p>"#,
            clean_text(summary.consultant),
            clean_text(summary.month_label),
            clean_text(summary.client_name),
            clean_text(&summary.worked_days),
            clean_text(&summary.absent_days)
        );
        if let Some(comment) = summary.monthly_comment.filter(|c| !c.trim().is_empty()) {
            rows.push_str(&format!("\n<p><strong>Commentaire :</strong> {}</p>", clean_text(comment)));
        }
        format!(
            r#"<div style="background: white; padding: 20px; border-radius: 8px; margin: 20px 0; border-left: 4px solid #667eea;">{}</div>"#,
            rows
        )
    }

    pub fn cra_validation_subject(month_label: &str) -> String {
        format!("Validation du Compte-Rendu d'Activité - {}", month_label)
    }

    pub fn cra_validation(summary: &CraSummary<'_>, approve_url: &str, reject_url: &str, ttl_days: i64) -> String {
        layout(&format!(
            r#"<h2>Validation du CRA</h2>
<p>Bonjour,</p>
<p>Vous êtes invité(e) à valider le Compte-Rendu d'Activité suivant :</p>
{}
<p style="text-align: center; margin: 30px 0;">
<a href="{}" style="display: inline-block; background: #22c55e; color: white; padding: 15px 30px; text-decoration: none; border-radius: 8px; margin: 5px;">Approuver</a>
<a href="{}" style="display: inline-block; background: #ef4444; color: white; padding: 15px 30px; text-decoration: none; border-radius: 8px; margin: 5px;">Rejeter</a>
</p>
<p style="color: #666; font-size: 14px;">Ce lien expire dans {} jours.</p>"#,
            cra_details(summary),
            clean_text(approve_url),
            clean_text(reject_url),
            ttl_days
        ))
    }

    pub fn cra_approved_subject(consultant: &str, month_label: &str) -> String {
        format!("CRA Approuvé - {} - {}", consultant, month_label)
    }

    pub fn cra_approved(summary: &CraSummary<'_>) -> String {
        layout(&format!(
            r#"<h2>CRA approuvé</h2>
<p>Le Compte-Rendu d'Activité suivant a été <strong style="color: #22c55e;">approuvé</strong> :</p>
{}
<p>Vous trouverez en pièce jointe le récapitulatif PDF.</p>"#,
            cra_details(summary)
        ))
    }
}
