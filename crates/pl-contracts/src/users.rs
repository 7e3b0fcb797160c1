//! User contracts
//!
//! Registration, login and profile updates. Passwords leave this crate in
//! plain text; hashing happens in the auth layer.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use pl_core::ValidationErrors;

use crate::base::{finish, optional_text, required_text, Contract, ValidationResult};

/// Valid email pattern
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

fn validate_email(email: &str, errors: &mut ValidationErrors) {
    if !EMAIL_PATTERN.is_match(email) {
        errors.add("email", "is not a valid email address");
    }
}

/// Body of `POST /register` and `POST /login`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsParams {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Checked credentials
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration: both fields present and a well-formed email
pub struct RegisterContract;

impl Contract<CredentialsParams> for RegisterContract {
    type Output = Credentials;

    fn validate(&self, input: CredentialsParams) -> ValidationResult<Credentials> {
        let mut errors = ValidationErrors::new();
        let email = required_text(&mut errors, "email", input.email).map(|e| e.trim().to_string());
        let password = required_text(&mut errors, "password", input.password);

        if let Some(email) = &email {
            validate_email(email, &mut errors);
        }

        let credentials = email
            .zip(password)
            .map(|(email, password)| Credentials { email, password });
        finish(errors, credentials)
    }
}

/// Login only needs both fields; bad values fail authentication instead
pub struct LoginContract;

impl Contract<CredentialsParams> for LoginContract {
    type Output = Credentials;

    fn validate(&self, input: CredentialsParams) -> ValidationResult<Credentials> {
        let mut errors = ValidationErrors::new();
        let email = required_text(&mut errors, "email", input.email).map(|e| e.trim().to_string());
        let password = required_text(&mut errors, "password", input.password);

        let credentials = email
            .zip(password)
            .map(|(email, password)| Credentials { email, password });
        finish(errors, credentials)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserParams {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// Checked user update; the password still needs hashing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

pub struct UpdateUserContract;

impl Contract<UpdateUserParams> for UpdateUserContract {
    type Output = UserChanges;

    fn validate(&self, input: UpdateUserParams) -> ValidationResult<UserChanges> {
        let mut errors = ValidationErrors::new();
        let email = optional_text(input.email).map(|e| e.trim().to_string());
        if let Some(email) = &email {
            validate_email(email, &mut errors);
        }

        let changes = UserChanges {
            email,
            password: optional_text(input.password),
            is_active: input.is_active,
        };
        finish(errors, Some(changes))
    }
}
