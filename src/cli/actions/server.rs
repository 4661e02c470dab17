use crate::{
    api,
    auth::AuthConfig,
    email::{EmailSender, HttpEmailSender, LogEmailSender},
};
use anyhow::{Result, anyhow};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub signing_secret: SecretString,
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub access_token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub email_api_url: Option<String>,
    pub email_api_key: Option<SecretString>,
    pub email_from: String,
    pub email_from_name: Option<String>,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &self.dsn)
            .field("signing_secret", &"***")
            .field("frontend_base_url", &self.frontend_base_url)
            .field("otp_ttl_seconds", &self.otp_ttl_seconds)
            .field("reset_token_ttl_seconds", &self.reset_token_ttl_seconds)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("email_api_url", &self.email_api_url)
            .field("email_api_key", &"***")
            .field("email_from", &self.email_from)
            .field("email_from_name", &self.email_from_name)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the email sender configuration is inconsistent or
/// the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.signing_secret, args.frontend_base_url)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_reset_token_ttl_seconds(args.reset_token_ttl_seconds)
        .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
        .with_bcrypt_cost(args.bcrypt_cost);

    let mailer: Arc<dyn EmailSender> = match (args.email_api_url, args.email_api_key) {
        (Some(url), Some(key)) => Arc::new(HttpEmailSender::new(
            url,
            key,
            args.email_from,
            args.email_from_name,
        )),
        (Some(_), None) => {
            return Err(anyhow!(
                "--email-api-key is required when --email-api-url is set"
            ));
        }
        _ => {
            info!("email API not configured; outbound email will be logged");
            Arc::new(LogEmailSender)
        }
    };

    api::new(args.port, args.dsn, auth_config, mailer).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            port: 8080,
            dsn: "postgres://localhost/atesti".to_string(),
            signing_secret: SecretString::from("sekret"),
            frontend_base_url: "https://atesti.dev".to_string(),
            otp_ttl_seconds: 600,
            reset_token_ttl_seconds: 3600,
            access_token_ttl_seconds: 900,
            bcrypt_cost: 12,
            email_api_url: None,
            email_api_key: None,
            email_from: "no-reply@atesti.dev".to_string(),
            email_from_name: None,
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", args());
        assert!(rendered.contains("***"));
        assert!(!rendered.contains("sekret"));
    }

    #[tokio::test]
    async fn api_url_without_key_is_rejected() {
        let result = execute(Args {
            email_api_url: Some("https://mail.test/v3/smtp/email".to_string()),
            ..args()
        })
        .await;
        assert!(result.is_err());
    }
}
