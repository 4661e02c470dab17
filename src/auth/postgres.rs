//! Postgres-backed credential store.
//!
//! Token consumption relies on conditional single-row updates
//! (`... AND used = FALSE RETURNING id`) so concurrent redemption attempts
//! of the same code or token see exactly one winner. Registration races on
//! the `users.email` unique index, surfaced as [`StoreError::Conflict`].

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::store::{
    CredentialStore, NewOtp, NewRefreshToken, NewResetToken, NewUser, OtpRecord,
    RefreshTokenRecord, ResetTokenRecord, StoreError, StoreResult, User,
};

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        email_verified: row.get("email_verified"),
        email_verified_at: row.get("email_verified_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn otp_from_row(row: &PgRow) -> OtpRecord {
    OtpRecord {
        id: row.get("id"),
        code: row.get("code"),
        email: row.get("email"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        used: row.get("used"),
        created_at: row.get("created_at"),
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, email_verified, email_verified_at, created_at, updated_at";

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to find user by email")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to find user by id")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let query = format!(
            r"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(user_from_row(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(StoreError::Other(
                anyhow::Error::new(err).context("failed to create user"),
            )),
        }
    }

    async fn update_user_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let query = r"
            UPDATE users
            SET password_hash = $2,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update user password")?;
        Ok(())
    }

    async fn mark_user_verified(&self, id: Uuid) -> StoreResult<()> {
        let query = r"
            UPDATE users
            SET email_verified = TRUE,
                email_verified_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark user verified")?;
        Ok(())
    }

    async fn create_otp(&self, otp: NewOtp) -> StoreResult<OtpRecord> {
        let query = r"
            INSERT INTO otp_codes (code, email, user_id, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, email, user_id, expires_at, used, created_at
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&otp.code)
            .bind(&otp.email)
            .bind(otp.user_id)
            .bind(otp.expires_at)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to create OTP record")?;
        Ok(otp_from_row(&row))
    }

    async fn find_active_otp(&self, email: &str, code: &str) -> StoreResult<Option<OtpRecord>> {
        let query = r"
            SELECT id, code, email, user_id, expires_at, used, created_at
            FROM otp_codes
            WHERE email = $1
              AND code = $2
              AND used = FALSE
              AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .bind(code)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to find active OTP")?;
        Ok(row.as_ref().map(otp_from_row))
    }

    async fn mark_otp_used(&self, id: Uuid) -> StoreResult<bool> {
        // Conditional consume; the second concurrent caller gets no row back.
        let query = r"
            UPDATE otp_codes
            SET used = TRUE
            WHERE id = $1
              AND used = FALSE
            RETURNING id
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark OTP used")?;
        Ok(row.is_some())
    }

    async fn delete_otps_for_email(&self, email: &str, excluding: Option<Uuid>) -> StoreResult<()> {
        let query = r"
            DELETE FROM otp_codes
            WHERE email = $1
              AND ($2::uuid IS NULL OR id <> $2)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(email)
            .bind(excluding)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete OTP records")?;
        Ok(())
    }

    async fn create_reset_token(&self, token: NewResetToken) -> StoreResult<()> {
        let query = r"
            INSERT INTO reset_tokens (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&token.token_hash)
            .bind(token.user_id)
            .bind(token.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to create reset token")?;
        Ok(())
    }

    async fn find_active_reset_token(
        &self,
        token_hash: &[u8],
    ) -> StoreResult<Option<(ResetTokenRecord, User)>> {
        let query = r"
            SELECT reset_tokens.id AS token_id,
                   reset_tokens.token_hash,
                   reset_tokens.user_id AS token_user_id,
                   reset_tokens.expires_at AS token_expires_at,
                   reset_tokens.used,
                   reset_tokens.created_at AS token_created_at,
                   users.id, users.email, users.password_hash, users.name,
                   users.email_verified, users.email_verified_at,
                   users.created_at, users.updated_at
            FROM reset_tokens
            JOIN users ON users.id = reset_tokens.user_id
            WHERE reset_tokens.token_hash = $1
              AND reset_tokens.used = FALSE
              AND reset_tokens.expires_at > NOW()
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to find active reset token")?;

        Ok(row.map(|row| {
            let record = ResetTokenRecord {
                id: row.get("token_id"),
                token_hash: row.get("token_hash"),
                user_id: row.get("token_user_id"),
                expires_at: row.get("token_expires_at"),
                used: row.get("used"),
                created_at: row.get("token_created_at"),
            };
            let user = user_from_row(&row);
            (record, user)
        }))
    }

    async fn mark_reset_token_used(&self, id: Uuid) -> StoreResult<bool> {
        // Conditional consume; a used token never wins again.
        let query = r"
            UPDATE reset_tokens
            SET used = TRUE
            WHERE id = $1
              AND used = FALSE
            RETURNING id
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark reset token used")?;
        Ok(row.is_some())
    }

    async fn delete_stale_reset_tokens_for_user(&self, user_id: Uuid) -> StoreResult<()> {
        let query = r"
            DELETE FROM reset_tokens
            WHERE user_id = $1
              AND (used = TRUE OR expires_at <= NOW())
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete stale reset tokens")?;
        Ok(())
    }

    async fn create_refresh_token(&self, token: NewRefreshToken) -> StoreResult<()> {
        let query = r"
            INSERT INTO refresh_tokens (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&token.token_hash)
            .bind(token.user_id)
            .bind(token.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to create refresh token")?;
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token_hash: &[u8],
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        let query = r"
            SELECT id, token_hash, user_id, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
              AND expires_at > NOW()
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to find refresh token")?;
        Ok(row.map(|row| RefreshTokenRecord {
            id: row.get("id"),
            token_hash: row.get("token_hash"),
            user_id: row.get("user_id"),
            expires_at: row.get("expires_at"),
            created_at: row.get("created_at"),
        }))
    }

    async fn delete_expired_refresh_tokens_for_user(&self, user_id: Uuid) -> StoreResult<()> {
        let query = r"
            DELETE FROM refresh_tokens
            WHERE user_id = $1
              AND expires_at <= NOW()
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete expired refresh tokens")?;
        Ok(())
    }

    async fn delete_all_refresh_tokens_for_user(&self, user_id: Uuid) -> StoreResult<()> {
        let query = "DELETE FROM refresh_tokens WHERE user_id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete refresh tokens")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
