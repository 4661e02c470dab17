//! Transactional email dispatch.
//!
//! Flows hand the lifecycle engine an [`EmailMessage`]; the engine decides
//! per flow whether delivery failure is fatal. Senders only deliver:
//! [`LogEmailSender`] logs and succeeds (local dev default), and
//! [`HttpEmailSender`] posts to a transactional-email HTTP API.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone)]
pub enum EmailKind {
    /// Registration verification code.
    Otp { code: String },
    /// Password-reset link.
    PasswordReset { reset_url: String },
    /// Post-verification welcome note.
    Welcome,
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub kind: EmailKind,
}

impl EmailMessage {
    #[must_use]
    pub fn subject(&self) -> &'static str {
        match &self.kind {
            EmailKind::Otp { .. } => "Email Verification - OTP Code",
            EmailKind::PasswordReset { .. } => "Password Reset Request",
            EmailKind::Welcome => "Welcome to Our Platform!",
        }
    }

    #[must_use]
    pub fn text_body(&self) -> String {
        let greeting = match &self.to_name {
            Some(name) => format!("Hi {name},"),
            None => "Hello,".to_string(),
        };
        match &self.kind {
            EmailKind::Otp { code } => format!(
                "{greeting}\n\n\
                 Thank you for registering! Please use the following OTP code to \
                 verify your email address:\n\n\
                 {code}\n\n\
                 This code will expire in 10 minutes. If you didn't request this \
                 verification, please ignore this email."
            ),
            EmailKind::PasswordReset { reset_url } => format!(
                "{greeting}\n\n\
                 You requested to reset your password. Open the link below to \
                 create a new password:\n\n\
                 {reset_url}\n\n\
                 This link will expire in 1 hour. If you didn't request this \
                 reset, please ignore this email."
            ),
            EmailKind::Welcome => format!(
                "{greeting}\n\n\
                 Welcome to our platform! Your email has been successfully \
                 verified and your account is now active.\n\n\
                 We're excited to have you on board!"
            ),
        }
    }

    /// Template name used for logging and API payloads.
    #[must_use]
    pub const fn template(&self) -> &'static str {
        match &self.kind {
            EmailKind::Otp { .. } => "otp",
            EmailKind::PasswordReset { .. } => "password_reset",
            EmailKind::Welcome => "welcome",
        }
    }
}

/// Email delivery abstraction injected into the lifecycle engine.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error for the engine's criticality
    /// policy to act on.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            template = %message.template(),
            subject = %message.subject(),
            "email send stub"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiSendBody {
    sender: ApiAddress,
    to: Vec<ApiAddress>,
    subject: String,
    text_content: String,
}

/// Sender for Brevo-style transactional email HTTP APIs.
pub struct HttpEmailSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    from_email: String,
    from_name: Option<String>,
}

impl HttpEmailSender {
    #[must_use]
    pub fn new(
        endpoint: String,
        api_key: SecretString,
        from_email: String,
        from_name: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            from_email,
            from_name,
        }
    }

    fn body(&self, message: &EmailMessage) -> ApiSendBody {
        ApiSendBody {
            sender: ApiAddress {
                email: self.from_email.clone(),
                name: self.from_name.clone(),
            },
            to: vec![ApiAddress {
                email: message.to.clone(),
                name: message.to_name.clone(),
            }],
            subject: message.subject().to_string(),
            text_content: message.text_body(),
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", self.api_key.expose_secret())
            .header("user-agent", crate::APP_USER_AGENT)
            .json(&self.body(message))
            .send()
            .await
            .context("failed to reach email API")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        bail!("email API rejected {} (status={status}): {detail}", message.template());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(kind: EmailKind, name: Option<&str>) -> EmailMessage {
        EmailMessage {
            to: "alice@example.com".to_string(),
            to_name: name.map(str::to_string),
            kind,
        }
    }

    #[test]
    fn otp_body_contains_code_and_greeting() {
        let body = message(
            EmailKind::Otp {
                code: "042137".to_string(),
            },
            Some("Alice"),
        )
        .text_body();
        assert!(body.starts_with("Hi Alice,"));
        assert!(body.contains("042137"));
    }

    #[test]
    fn anonymous_greeting_falls_back_to_hello() {
        let body = message(EmailKind::Welcome, None).text_body();
        assert!(body.starts_with("Hello,"));
    }

    #[test]
    fn reset_body_contains_link() {
        let body = message(
            EmailKind::PasswordReset {
                reset_url: "https://atesti.dev/reset-password/abc".to_string(),
            },
            None,
        )
        .text_body();
        assert!(body.contains("https://atesti.dev/reset-password/abc"));
    }

    #[test]
    fn templates_are_distinct() {
        let otp = message(
            EmailKind::Otp {
                code: "000000".to_string(),
            },
            None,
        );
        let reset = message(
            EmailKind::PasswordReset {
                reset_url: String::new(),
            },
            None,
        );
        let welcome = message(EmailKind::Welcome, None);
        assert_eq!(otp.template(), "otp");
        assert_eq!(reset.template(), "password_reset");
        assert_eq!(welcome.template(), "welcome");
        assert_ne!(otp.subject(), reset.subject());
        assert_ne!(reset.subject(), welcome.subject());
    }

    #[tokio::test]
    async fn log_sender_always_succeeds() -> Result<()> {
        LogEmailSender
            .send(&message(EmailKind::Welcome, Some("Bob")))
            .await
    }

    #[test]
    fn api_body_shape() -> Result<()> {
        let sender = HttpEmailSender::new(
            "https://mail.test/v3/smtp/email".to_string(),
            SecretString::from("key"),
            "no-reply@atesti.dev".to_string(),
            Some("Atesti".to_string()),
        );
        let body = sender.body(&message(
            EmailKind::Otp {
                code: "123456".to_string(),
            },
            None,
        ));
        let value = serde_json::to_value(&body)?;
        assert_eq!(value["sender"]["email"], "no-reply@atesti.dev");
        assert_eq!(value["to"][0]["email"], "alice@example.com");
        assert_eq!(value["subject"], "Email Verification - OTP Code");
        assert!(value["textContent"].as_str().is_some_and(|t| t.contains("123456")));
        Ok(())
    }
}
