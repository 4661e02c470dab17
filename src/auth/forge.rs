//! Token generation, signing, and verification.
//!
//! Covers the three credential artifacts that are random (OTP codes and
//! opaque reset tokens) and the two that are signed (access and refresh
//! tokens). Raw reset/refresh tokens are only sent to the user; the store
//! keeps a SHA-256 hash, so a database leak exposes nothing redeemable.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{Rng, RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Refresh tokens always live 7 days; access tokens must expire sooner.
pub const REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;

/// Generate a 6-digit one-time code, uniform over 000000-999999.
/// Leading zeros are kept; the code is a string, not a number.
#[must_use]
pub fn generate_otp() -> String {
    let code = OsRng.gen_range(0..1_000_000u32);
    format!("{code:06}")
}

/// Generate an opaque password-reset token: 32 random bytes, hex-encoded.
///
/// The raw value goes into the reset link only; the store keeps its hash.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_reset_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate reset token")?;
    Ok(hex::encode(bytes))
}

/// Hash a token for at-rest storage and lookups.
#[must_use]
pub fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Discriminates access from refresh tokens. Both are signed with the same
/// secret, so the claim set must carry which kind it is.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by signed access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Owning user id.
    pub sub: String,
    pub email: String,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Parse the subject back into a user id.
    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Signs and verifies structured tokens with a process-wide symmetric secret.
pub struct TokenForge {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_seconds: i64,
}

impl TokenForge {
    #[must_use]
    pub fn new(secret: &SecretString, access_ttl_seconds: i64) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            access_ttl_seconds,
        }
    }

    /// Sign a short-lived access token for the given user.
    ///
    /// # Errors
    /// Returns an error if JWT encoding fails.
    pub fn sign_access_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        self.sign(user_id, email, TokenKind::Access, self.access_ttl_seconds)
    }

    /// Sign a 7-day refresh token for the given user.
    ///
    /// # Errors
    /// Returns an error if JWT encoding fails.
    pub fn sign_refresh_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        self.sign(user_id, email, TokenKind::Refresh, REFRESH_TOKEN_TTL_SECONDS)
    }

    fn sign(&self, user_id: Uuid, email: &str, kind: TokenKind, ttl_seconds: i64) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            kind,
            exp: now + ttl_seconds,
            iat: now,
        };
        encode(&Header::default(), &claims, &self.encoding_key).context("failed to sign token")
    }

    /// Verify an access token, rejecting expired, malformed, or wrong-kind
    /// input and anything signed with a different secret.
    ///
    /// # Errors
    /// Returns an error describing why the token was rejected. The detail is
    /// for logs; callers surface a uniform invalid-token response.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .context("invalid access token")?
            .claims;
        if claims.kind != TokenKind::Access {
            bail!("token kind mismatch: expected access token");
        }
        Ok(claims)
    }

    /// Verify a refresh token. `None` means reject; callers never need the
    /// failure detail for this path.
    #[must_use]
    pub fn verify_refresh_token(&self, token: &str) -> Option<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .ok()?
            .claims;
        if claims.kind != TokenKind::Refresh {
            return None;
        }
        Some(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn forge() -> TokenForge {
        TokenForge::new(
            &SecretString::from("test-signing-secret"),
            DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
        )
    }

    #[test]
    fn otp_is_always_six_digits() {
        for _ in 0..256 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn reset_token_is_64_hex_chars() -> Result<()> {
        let token = generate_reset_token()?;
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        Ok(())
    }

    #[test]
    fn hash_token_is_stable_and_discriminating() {
        assert_eq!(hash_token("token"), hash_token("token"));
        assert_ne!(hash_token("token"), hash_token("other"));
        assert_eq!(hash_token("token").len(), 32);
    }

    #[test]
    fn access_token_round_trips() -> Result<()> {
        let forge = forge();
        let user_id = Uuid::new_v4();
        let token = forge.sign_access_token(user_id, "alice@example.com")?;
        let claims = forge.verify_access_token(&token)?;
        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.kind, TokenKind::Access);
        Ok(())
    }

    #[test]
    fn refresh_token_round_trips() -> Result<()> {
        let forge = forge();
        let user_id = Uuid::new_v4();
        let token = forge.sign_refresh_token(user_id, "alice@example.com")?;
        let claims = forge.verify_refresh_token(&token).context("should verify")?;
        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.kind, TokenKind::Refresh);
        Ok(())
    }

    #[test]
    fn wrong_secret_is_rejected() -> Result<()> {
        let forge = forge();
        let other = TokenForge::new(
            &SecretString::from("a-different-secret"),
            DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
        );
        let token = forge.sign_refresh_token(Uuid::new_v4(), "a@x.com")?;
        assert!(other.verify_refresh_token(&token).is_none());
        let token = forge.sign_access_token(Uuid::new_v4(), "a@x.com")?;
        assert!(other.verify_access_token(&token).is_err());
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_rejected_without_panicking() {
        let forge = forge();
        for garbage in ["", "not-a-jwt", "a.b.c", "ey.ey.ey"] {
            assert!(forge.verify_access_token(garbage).is_err());
            assert!(forge.verify_refresh_token(garbage).is_none());
        }
    }

    #[test]
    fn kinds_are_not_interchangeable() -> Result<()> {
        let forge = forge();
        let access = forge.sign_access_token(Uuid::new_v4(), "a@x.com")?;
        let refresh = forge.sign_refresh_token(Uuid::new_v4(), "a@x.com")?;
        assert!(forge.verify_refresh_token(&access).is_none());
        assert!(forge.verify_access_token(&refresh).is_err());
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> Result<()> {
        let forge = forge();
        // Past the default validation leeway of 60 seconds.
        let token = forge.sign(Uuid::new_v4(), "a@x.com", TokenKind::Refresh, -120)?;
        assert!(forge.verify_refresh_token(&token).is_none());
        Ok(())
    }

    #[test]
    fn access_expiry_is_shorter_than_refresh() {
        assert!(DEFAULT_ACCESS_TOKEN_TTL_SECONDS < REFRESH_TOKEN_TTL_SECONDS);
    }
}
