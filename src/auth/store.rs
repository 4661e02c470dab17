//! Persistence contract for users and their credential artifacts.
//!
//! The lifecycle engine only sees this trait; the production implementation
//! is [`crate::auth::postgres::PgCredentialStore`]. Every operation is
//! atomic with respect to its single record. "Active" for OTP and reset
//! lookups means `used = false AND expires_at > now`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint (e.g. users.email) rejected the write.
    #[error("unique constraint violation")]
    Conflict,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// `None` for federated-only accounts that never set a local password.
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub id: Uuid,
    pub code: String,
    pub email: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOtp {
    pub code: String,
    pub email: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResetTokenRecord {
    pub id: Uuid,
    /// SHA-256 of the raw token; raw values never touch the store.
    pub token_hash: Vec<u8>,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResetToken {
    pub token_hash: Vec<u8>,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    /// SHA-256 of the signed token; raw values never touch the store.
    pub token_hash: Vec<u8>,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token_hash: Vec<u8>,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Create a user. Concurrent registrations for the same email race on
    /// the store's uniqueness constraint; the loser gets `Conflict`.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn update_user_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;

    async fn mark_user_verified(&self, id: Uuid) -> StoreResult<()>;

    async fn create_otp(&self, otp: NewOtp) -> StoreResult<OtpRecord>;

    async fn find_active_otp(&self, email: &str, code: &str) -> StoreResult<Option<OtpRecord>>;

    /// Conditionally mark an OTP consumed. Returns whether this caller won;
    /// concurrent redemptions of the same code see exactly one `true`.
    async fn mark_otp_used(&self, id: Uuid) -> StoreResult<bool>;

    /// Purge OTP records for an email, optionally keeping one record
    /// (the one just consumed).
    async fn delete_otps_for_email(&self, email: &str, excluding: Option<Uuid>) -> StoreResult<()>;

    async fn create_reset_token(&self, token: NewResetToken) -> StoreResult<()>;

    /// Look up an active reset token by hash, joined with its owning user.
    async fn find_active_reset_token(
        &self,
        token_hash: &[u8],
    ) -> StoreResult<Option<(ResetTokenRecord, User)>>;

    /// Conditionally mark a reset token consumed. Returns whether this
    /// caller won; a consumed token never authorizes another reset.
    async fn mark_reset_token_used(&self, id: Uuid) -> StoreResult<bool>;

    /// Purge used-or-expired reset tokens for a user before issuing a new one.
    async fn delete_stale_reset_tokens_for_user(&self, user_id: Uuid) -> StoreResult<()>;

    async fn create_refresh_token(&self, token: NewRefreshToken) -> StoreResult<()>;

    /// Look up an unexpired refresh token by hash. Expired or revoked
    /// tokens are indistinguishable from never-issued ones.
    async fn find_refresh_token(
        &self,
        token_hash: &[u8],
    ) -> StoreResult<Option<RefreshTokenRecord>>;

    async fn delete_expired_refresh_tokens_for_user(&self, user_id: Uuid) -> StoreResult<()>;

    /// Session-wide logout: drop every refresh token the user owns.
    async fn delete_all_refresh_tokens_for_user(&self, user_id: Uuid) -> StoreResult<()>;
}
