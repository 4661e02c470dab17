use clap::{Arg, Command};
use secrecy::SecretString;

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("email-api-url")
                .long("email-api-url")
                .help("Transactional email API endpoint; outbound email is logged when unset")
                .env("ATESTI_EMAIL_API_URL"),
        )
        .arg(
            Arg::new("email-api-key")
                .long("email-api-key")
                .help("API key for the transactional email service")
                .env("ATESTI_EMAIL_API_KEY"),
        )
        .arg(
            Arg::new("email-from")
                .long("email-from")
                .help("From address for outbound email")
                .env("ATESTI_EMAIL_FROM")
                .default_value("no-reply@atesti.dev"),
        )
        .arg(
            Arg::new("email-from-name")
                .long("email-from-name")
                .help("From display name for outbound email")
                .env("ATESTI_EMAIL_FROM_NAME"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub api_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub from_email: String,
    pub from_name: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &clap::ArgMatches) -> Self {
        Self {
            api_url: matches.get_one::<String>("email-api-url").cloned(),
            api_key: matches
                .get_one::<String>("email-api-key")
                .cloned()
                .map(SecretString::from),
            from_email: matches
                .get_one::<String>("email-from")
                .cloned()
                .unwrap_or_else(|| "no-reply@atesti.dev".to_string()),
            from_name: matches.get_one::<String>("email-from-name").cloned(),
        }
    }
}
