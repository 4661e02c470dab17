//! Lifecycle engine configuration, immutable after startup.

use secrecy::SecretString;

use super::forge::DEFAULT_ACCESS_TOKEN_TTL_SECONDS;
use super::hasher::DEFAULT_BCRYPT_COST;

const DEFAULT_OTP_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    signing_secret: SecretString,
    frontend_base_url: String,
    otp_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    access_token_ttl_seconds: i64,
    bcrypt_cost: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(signing_secret: SecretString, frontend_base_url: String) -> Self {
        Self {
            signing_secret,
            frontend_base_url,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    #[must_use]
    pub fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }

    /// Build the reset link included in the password-reset email.
    #[must_use]
    pub fn reset_url(&self, token: &str) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        format!("{base}/reset-password/{token}")
    }
}
