//! # Atesti (User Authentication Backend)
//!
//! `atesti` handles registration with email OTP verification, credential
//! login, refresh-token rotation, and password reset. Its core is the
//! credential lifecycle engine: the rules for generating, storing,
//! validating, rotating, invalidating, and expiring access tokens, refresh
//! tokens, one-time codes, and reset tokens.
//!
//! ## Credential Lifecycle
//!
//! - **Registration** creates an unverified user, purges stale OTP codes,
//!   and emails a fresh 6-digit code. The OTP email is a hard dependency;
//!   its failure surfaces as an error.
//! - **Verification** consumes the code exactly once (conditional update),
//!   activates the user, and sends a best-effort welcome email.
//! - **Login** issues a short-lived signed access token plus a 7-day
//!   refresh token whose hash is persisted; expired refresh tokens for the
//!   user are swept on the way.
//! - **Refresh** requires both a valid signature and store presence, so a
//!   password reset (which deletes every refresh token the user owns)
//!   revokes outstanding sessions immediately.
//! - **Password reset** uses a single-use opaque token delivered by email;
//!   only its SHA-256 hash is stored.
//!
//! ## Enumeration Resistance
//!
//! Unknown email, missing password, and wrong password all collapse to the
//! same `401` message. Forgot-password returns an identical success message
//! whether or not the account exists.

pub mod api;
pub mod auth;
pub mod cli;
pub mod email;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
