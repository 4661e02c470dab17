//! Request/response types and boundary validation for auth endpoints.
//!
//! Validation happens here, before anything reaches the lifecycle engine:
//! each request type turns into a typed command or the first failing
//! message, which callers surface as a 400.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{
    LoginCommand, RegisterCommand, Registration, ResetPasswordCommand, Session, VerifyOtpCommand,
};

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Password policy: at least one lowercase letter, one uppercase letter,
/// one digit, and one special character. Length is checked separately so
/// the caller can surface the more specific message first.
fn password_composition_ok(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| "@$!%*?&".contains(c))
}

fn validate_new_password(password: &str, confirm: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if !password_composition_ok(password) {
        return Err("Password must contain at least one uppercase letter, one lowercase \
                    letter, one number, and one special character"
            .to_string());
    }
    if password != confirm {
        return Err("Passwords don't match".to_string());
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<String, String> {
    let normalized = normalize_email(email);
    if !valid_email(&normalized) {
        return Err("Invalid email format".to_string());
    }
    Ok(normalized)
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl RegisterRequest {
    /// First failing check wins, in schema order.
    pub fn validate(&self) -> Result<RegisterCommand, String> {
        let email = validate_email(&self.email)?;
        let name = match &self.name {
            Some(name) => {
                let name = name.trim();
                if name.len() < 2 {
                    return Err("Name must be at least 2 characters".to_string());
                }
                Some(name.to_string())
            }
            None => None,
        };
        validate_new_password(&self.password, &self.confirm_password)?;
        Ok(RegisterCommand {
            email,
            password: self.password.clone(),
            name,
        })
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

impl VerifyOtpRequest {
    pub fn validate(&self) -> Result<VerifyOtpCommand, String> {
        let email = validate_email(&self.email)?;
        let code = self.otp.trim();
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err("OTP must be exactly 6 digits".to_string());
        }
        Ok(VerifyOtpCommand {
            email,
            code: code.to_string(),
        })
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Accepted for client compatibility; token lifetimes are fixed
    /// server-side.
    #[serde(default)]
    pub remember_me: Option<bool>,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<LoginCommand, String> {
        let email = validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err("Password is required".to_string());
        }
        Ok(LoginCommand {
            email,
            password: self.password.clone(),
        })
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

impl RefreshTokenRequest {
    pub fn validate(&self) -> Result<String, String> {
        let token = self.refresh_token.trim();
        if token.is_empty() {
            return Err("Refresh token is required".to_string());
        }
        Ok(token.to_string())
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl ForgotPasswordRequest {
    pub fn validate(&self) -> Result<String, String> {
        validate_email(&self.email)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
    pub confirm_password: String,
}

impl ResetPasswordRequest {
    /// The token arrives as a path parameter, not in the body.
    pub fn validate(&self, token: &str) -> Result<ResetPasswordCommand, String> {
        let token = token.trim();
        if token.is_empty() {
            return Err("Reset token is missing".to_string());
        }
        validate_new_password(&self.new_password, &self.confirm_password)?;
        Ok(ResetPasswordCommand {
            token: token.to_string(),
            new_password: self.new_password.clone(),
        })
    }
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub data: Registration,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub data: Session,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_verification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request(email: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            name: None,
        }
    }

    #[test]
    fn register_normalizes_email() {
        let request = register_request(" Alice@Example.COM ", "Str0ng!Pass", "Str0ng!Pass");
        let command = request.validate().expect("should validate");
        assert_eq!(command.email, "alice@example.com");
    }

    #[test]
    fn register_rejects_bad_email_first() {
        let request = register_request("not-an-email", "short", "short");
        assert_eq!(request.validate().unwrap_err(), "Invalid email format");
    }

    #[test]
    fn register_rejects_short_password() {
        let request = register_request("a@x.com", "S1!a", "S1!a");
        assert_eq!(
            request.validate().unwrap_err(),
            "Password must be at least 8 characters"
        );
    }

    #[test]
    fn register_rejects_weak_composition() {
        for weak in ["alllowercase1!", "ALLUPPERCASE1!", "NoDigits!!", "NoSpecial123"] {
            let request = register_request("a@x.com", weak, weak);
            assert!(
                request
                    .validate()
                    .unwrap_err()
                    .starts_with("Password must contain"),
                "{weak} should fail composition"
            );
        }
    }

    #[test]
    fn register_rejects_mismatched_confirmation() {
        let request = register_request("a@x.com", "Str0ng!Pass", "Str0ng!Pass2");
        assert_eq!(request.validate().unwrap_err(), "Passwords don't match");
    }

    #[test]
    fn register_rejects_one_character_name() {
        let request = RegisterRequest {
            name: Some("A".to_string()),
            ..register_request("a@x.com", "Str0ng!Pass", "Str0ng!Pass")
        };
        assert_eq!(
            request.validate().unwrap_err(),
            "Name must be at least 2 characters"
        );
    }

    #[test]
    fn otp_must_be_six_digits() {
        for bad in ["12345", "1234567", "12a456", ""] {
            let request = VerifyOtpRequest {
                email: "a@x.com".to_string(),
                otp: bad.to_string(),
            };
            assert_eq!(
                request.validate().unwrap_err(),
                "OTP must be exactly 6 digits"
            );
        }
        let request = VerifyOtpRequest {
            email: "a@x.com".to_string(),
            otp: "042137".to_string(),
        };
        assert_eq!(request.validate().expect("valid").code, "042137");
    }

    #[test]
    fn login_requires_password() {
        let request = LoginRequest {
            email: "a@x.com".to_string(),
            password: String::new(),
            remember_me: None,
        };
        assert_eq!(request.validate().unwrap_err(), "Password is required");
    }

    #[test]
    fn refresh_requires_token() {
        let request = RefreshTokenRequest {
            refresh_token: "  ".to_string(),
        };
        assert_eq!(
            request.validate().unwrap_err(),
            "Refresh token is required"
        );
    }

    #[test]
    fn reset_requires_token_in_path() {
        let request = ResetPasswordRequest {
            new_password: "Str0ng!Pass".to_string(),
            confirm_password: "Str0ng!Pass".to_string(),
        };
        assert_eq!(
            request.validate("  ").unwrap_err(),
            "Reset token is missing"
        );
        let command = request.validate("abc123").expect("valid");
        assert_eq!(command.token, "abc123");
    }

    #[test]
    fn requests_deserialize_camel_case() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@x.com","password":"Str0ng!Pass","confirmPassword":"Str0ng!Pass","name":"Alice"}"#,
        )
        .expect("should deserialize");
        assert_eq!(request.name.as_deref(), Some("Alice"));

        let request: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw","rememberMe":true}"#)
                .expect("should deserialize");
        assert_eq!(request.remember_me, Some(true));
    }
}
