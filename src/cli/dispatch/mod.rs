//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, email};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let email_opts = email::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        signing_secret: auth_opts.signing_secret,
        frontend_base_url: auth_opts.frontend_base_url,
        otp_ttl_seconds: auth_opts.otp_ttl_seconds,
        reset_token_ttl_seconds: auth_opts.reset_token_ttl_seconds,
        access_token_ttl_seconds: auth_opts.access_token_ttl_seconds,
        bcrypt_cost: auth_opts.bcrypt_cost,
        email_api_url: email_opts.api_url,
        email_api_key: email_opts.api_key,
        email_from: email_opts.from_email,
        email_from_name: email_opts.from_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                (
                    "ATESTI_DSN",
                    Some("postgres://user@localhost:5432/atesti"),
                ),
                ("ATESTI_SIGNING_SECRET", Some("sekret")),
                ("ATESTI_OTP_TTL_SECONDS", Some("300")),
                ("ATESTI_EMAIL_API_URL", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["atesti"]);
                let action = handler(&matches).expect("handler should succeed");
                let Action::Server(args) = action;
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/atesti");
                assert_eq!(args.signing_secret.expose_secret(), "sekret");
                assert_eq!(args.otp_ttl_seconds, 300);
                assert!(args.email_api_url.is_none());
            },
        );
    }
}
