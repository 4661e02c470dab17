use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_SIGNING_SECRET: &str = "signing-secret";

pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_password_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SIGNING_SECRET)
                .long("signing-secret")
                .help("Symmetric secret used to sign access and refresh tokens")
                .env("ATESTI_SIGNING_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used for password reset links")
                .env("ATESTI_FRONTEND_BASE_URL")
                .default_value("https://atesti.dev"),
        )
        .arg(
            Arg::new("otp-ttl-seconds")
                .long("otp-ttl-seconds")
                .help("Verification OTP TTL in seconds")
                .env("ATESTI_OTP_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("reset-token-ttl-seconds")
                .long("reset-token-ttl-seconds")
                .help("Password reset token TTL in seconds")
                .env("ATESTI_RESET_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("access-token-ttl-seconds")
                .long("access-token-ttl-seconds")
                .help("Access token TTL in seconds (refresh tokens are fixed at 7 days)")
                .env("ATESTI_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_password_args(command: Command) -> Command {
    command.arg(
        Arg::new("bcrypt-cost")
            .long("bcrypt-cost")
            .help("bcrypt cost factor for password hashing")
            .env("ATESTI_BCRYPT_COST")
            .default_value("12")
            .value_parser(clap::value_parser!(u32)),
    )
}

#[derive(Debug)]
pub struct Options {
    pub signing_secret: SecretString,
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub access_token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
}

impl Options {
    /// Extract auth options from parsed CLI matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let signing_secret = matches
            .get_one::<String>(ARG_SIGNING_SECRET)
            .cloned()
            .context("missing required argument: --signing-secret")?;

        Ok(Self {
            signing_secret: SecretString::from(signing_secret),
            frontend_base_url: matches
                .get_one::<String>("frontend-base-url")
                .cloned()
                .unwrap_or_else(|| "https://atesti.dev".to_string()),
            otp_ttl_seconds: matches
                .get_one::<i64>("otp-ttl-seconds")
                .copied()
                .unwrap_or(600),
            reset_token_ttl_seconds: matches
                .get_one::<i64>("reset-token-ttl-seconds")
                .copied()
                .unwrap_or(3600),
            access_token_ttl_seconds: matches
                .get_one::<i64>("access-token-ttl-seconds")
                .copied()
                .unwrap_or(900),
            bcrypt_cost: matches.get_one::<u32>("bcrypt-cost").copied().unwrap_or(12),
        })
    }
}
