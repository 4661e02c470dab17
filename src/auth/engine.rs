//! Credential lifecycle engine.
//!
//! Orchestrates registration, OTP verification, login, refresh, and the
//! password-reset flows over injected capabilities: a [`CredentialStore`],
//! an [`EmailSender`], the password hasher, and the token forge. There are
//! no ambient singletons; everything arrives at construction and the engine
//! is immutable afterwards.
//!
//! Ordering inside a flow matters (stale records are purged before new ones
//! are issued); across requests the store's uniqueness constraint and
//! conditional consume operations resolve the races.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::task;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::config::AuthConfig;
use super::error::{AuthError, CredentialKind};
use super::forge::{self, REFRESH_TOKEN_TTL_SECONDS, TokenForge};
use super::hasher::PasswordHasher;
use super::store::{CredentialStore, NewOtp, NewRefreshToken, NewResetToken, NewUser, User};
use crate::email::{EmailKind, EmailMessage, EmailSender};

/// The one message forgot-password ever returns, found account or not.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, we have sent a password reset link.";

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VerifyOtpCommand {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ResetPasswordCommand {
    pub token: String,
    pub new_password: String,
}

/// User representation with secret fields stripped.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedUser {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for SanitizedUser {
    fn from(user: User) -> Self {
        // The password hash stops here; it never reaches a response type.
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            email_verified: user.email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub requires_verification: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: SanitizedUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthEngine {
    store: Arc<dyn CredentialStore>,
    mailer: Arc<dyn EmailSender>,
    hasher: PasswordHasher,
    forge: TokenForge,
    config: AuthConfig,
}

impl AuthEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        mailer: Arc<dyn EmailSender>,
        config: AuthConfig,
    ) -> Self {
        let hasher = PasswordHasher::new(config.bcrypt_cost());
        let forge = TokenForge::new(config.signing_secret(), config.access_token_ttl_seconds());
        Self {
            store,
            mailer,
            hasher,
            forge,
            config,
        }
    }

    #[must_use]
    pub fn forge(&self) -> &TokenForge {
        &self.forge
    }

    /// Register a new account and send the verification OTP.
    ///
    /// # Errors
    /// `Conflict` if the email already owns a user (including the loser of a
    /// concurrent registration race), `Internal` if the OTP email cannot be
    /// delivered — registration has already persisted at that point.
    pub async fn register(&self, cmd: RegisterCommand) -> Result<Registration, AuthError> {
        if self.store.find_user_by_email(&cmd.email).await?.is_some() {
            return Err(AuthError::Conflict);
        }

        let password_hash = self.hash_password(cmd.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                email: cmd.email,
                password_hash: Some(password_hash),
                name: cmd.name,
            })
            .await?;

        // Stale codes go first so only the new record is authoritative.
        self.store.delete_otps_for_email(&user.email, None).await?;
        let code = forge::generate_otp();
        let expires_at = Utc::now() + Duration::seconds(self.config.otp_ttl_seconds());
        self.store
            .create_otp(NewOtp {
                code: code.clone(),
                email: user.email.clone(),
                user_id: user.id,
                expires_at,
            })
            .await?;

        // The OTP email is the user's only path forward, so a failed send is
        // an internal error rather than a silent success.
        self.dispatch_email(
            EmailMessage {
                to: user.email.clone(),
                to_name: user.name.clone(),
                kind: EmailKind::Otp { code },
            },
            true,
        )
        .await
        .map_err(|err| match err {
            AuthError::EmailDelivery(inner) => AuthError::Internal(inner),
            other => other,
        })?;

        debug!(user_id = %user.id, "registered unverified user");
        Ok(Registration {
            email: user.email,
            name: user.name,
            requires_verification: true,
        })
    }

    /// Consume an OTP and mark the owning user verified.
    ///
    /// # Errors
    /// `InvalidOrExpired` when no active record matches or another request
    /// consumed the code first.
    pub async fn verify_otp(&self, cmd: VerifyOtpCommand) -> Result<(), AuthError> {
        let Some(otp) = self.store.find_active_otp(&cmd.email, &cmd.code).await? else {
            return Err(AuthError::InvalidOrExpired(CredentialKind::Otp));
        };

        // Conditional consume: concurrent redemptions see exactly one winner.
        if !self.store.mark_otp_used(otp.id).await? {
            return Err(AuthError::InvalidOrExpired(CredentialKind::Otp));
        }

        if let Some(user) = self.store.find_user_by_id(otp.user_id).await? {
            self.store.mark_user_verified(user.id).await?;
            // Welcome email is best-effort; verification already succeeded.
            self.dispatch_email(
                EmailMessage {
                    to: user.email,
                    to_name: user.name,
                    kind: EmailKind::Welcome,
                },
                false,
            )
            .await?;
        }

        self.store
            .delete_otps_for_email(&cmd.email, Some(otp.id))
            .await?;
        Ok(())
    }

    /// Authenticate with email and password, returning tokens.
    ///
    /// # Errors
    /// `InvalidCredentials` for unknown email, passwordless account, or
    /// wrong password — deliberately indistinguishable.
    /// `VerificationRequired` when the password checks out but the email was
    /// never verified; carries the email so the client can resume OTP.
    pub async fn login(&self, cmd: LoginCommand) -> Result<Session, AuthError> {
        let Some(user) = self.store.find_user_by_email(&cmd.email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        let Some(password_hash) = user.password_hash.clone() else {
            return Err(AuthError::InvalidCredentials);
        };
        if !self.verify_password(cmd.password, password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.email_verified {
            return Err(AuthError::VerificationRequired { email: user.email });
        }

        self.store
            .delete_expired_refresh_tokens_for_user(user.id)
            .await?;
        let (access_token, refresh_token) = self.issue_token_pair(user.id, &user.email).await?;

        debug!(user_id = %user.id, "login succeeded");
        Ok(Session {
            user: user.into(),
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access/refresh pair.
    ///
    /// A valid signature is not enough: the token's hash must still be in
    /// the store, so a password reset revokes outstanding tokens
    /// immediately. The presented token itself is not revoked — multiple
    /// valid refresh tokens may coexist per user.
    ///
    /// # Errors
    /// `InvalidToken` for signature, expiry, or store-presence failures;
    /// `NotFound` when the claimed user no longer exists.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let Some(claims) = self.forge.verify_refresh_token(refresh_token) else {
            return Err(AuthError::InvalidToken);
        };
        if self
            .store
            .find_refresh_token(&forge::hash_token(refresh_token))
            .await?
            .is_none()
        {
            return Err(AuthError::InvalidToken);
        }
        let Some(user_id) = claims.user_id() else {
            return Err(AuthError::InvalidToken);
        };
        let Some(user) = self.store.find_user_by_id(user_id).await? else {
            return Err(AuthError::NotFound);
        };

        let (access_token, refresh_token) = self.issue_token_pair(user.id, &user.email).await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Issue a reset token and email the reset link.
    ///
    /// Returns `Ok` for unknown emails too; the boundary answers with
    /// [`FORGOT_PASSWORD_MESSAGE`] either way so accounts cannot be
    /// enumerated.
    ///
    /// # Errors
    /// `EmailDelivery` when the reset email cannot be sent — the one
    /// accepted asymmetry versus enumeration safety, since a silent drop
    /// would strand the user.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            return Ok(());
        };

        self.store
            .delete_stale_reset_tokens_for_user(user.id)
            .await?;
        let token = forge::generate_reset_token()?;
        let expires_at = Utc::now() + Duration::seconds(self.config.reset_token_ttl_seconds());
        self.store
            .create_reset_token(NewResetToken {
                token_hash: forge::hash_token(&token),
                user_id: user.id,
                expires_at,
            })
            .await?;

        let reset_url = self.config.reset_url(&token);
        self.dispatch_email(
            EmailMessage {
                to: user.email,
                to_name: user.name,
                kind: EmailKind::PasswordReset { reset_url },
            },
            true,
        )
        .await
    }

    /// Redeem a reset token: replace the password and log out every session.
    ///
    /// # Errors
    /// `InvalidOrExpired` when the token is unknown, expired, or already
    /// consumed (including losing a concurrent redemption race).
    pub async fn reset_password(&self, cmd: ResetPasswordCommand) -> Result<(), AuthError> {
        let token_hash = forge::hash_token(&cmd.token);
        let Some((record, user)) = self.store.find_active_reset_token(&token_hash).await? else {
            return Err(AuthError::InvalidOrExpired(CredentialKind::ResetToken));
        };

        // Consume before mutating: the loser of a concurrent redemption
        // race must not touch the user row.
        if !self.store.mark_reset_token_used(record.id).await? {
            return Err(AuthError::InvalidOrExpired(CredentialKind::ResetToken));
        }

        let password_hash = self.hash_password(cmd.new_password).await?;
        self.store
            .update_user_password(user.id, &password_hash)
            .await?;

        // Forced global logout: every outstanding refresh token dies with
        // the old password.
        self.store
            .delete_all_refresh_tokens_for_user(user.id)
            .await?;

        debug!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    async fn issue_token_pair(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<(String, String), AuthError> {
        let access_token = self.forge.sign_access_token(user_id, email)?;
        let refresh_token = self.forge.sign_refresh_token(user_id, email)?;
        let expires_at = Utc::now() + Duration::seconds(REFRESH_TOKEN_TTL_SECONDS);
        self.store
            .create_refresh_token(NewRefreshToken {
                token_hash: forge::hash_token(&refresh_token),
                user_id,
                expires_at,
            })
            .await?;
        Ok((access_token, refresh_token))
    }

    /// bcrypt is deliberately slow; keep it off the async workers.
    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher;
        let hash = task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("password hashing task failed")??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hashed: String) -> Result<bool, AuthError> {
        let hasher = self.hasher;
        let ok = task::spawn_blocking(move || hasher.verify(&password, &hashed))
            .await
            .context("password verification task failed")?;
        Ok(ok)
    }

    /// Send a transactional email under the per-flow criticality policy:
    /// critical sends propagate failure, best-effort sends log and swallow.
    async fn dispatch_email(
        &self,
        message: EmailMessage,
        critical: bool,
    ) -> Result<(), AuthError> {
        match self.mailer.send(&message).await {
            Ok(()) => Ok(()),
            Err(err) if critical => Err(AuthError::EmailDelivery(err)),
            Err(err) => {
                warn!(
                    template = %message.template(),
                    to = %message.to,
                    "best-effort email failed: {err:#}"
                );
                Ok(())
            }
        }
    }
}
