//! User account models and authentication payloads.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Authorization level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(AppError::Validation(format!(
                "Unknown role '{}': expected 'admin' or 'user'",
                other
            ))),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub nickname: String,
    pub role: Role,
}

/// A validated account ready to be stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nickname: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Request body for registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub role: String,
}

/// Registration input after boundary validation.
#[derive(Debug, Clone)]
pub struct Registration {
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, AppError> {
        let nickname = self.nickname.trim();
        if nickname.is_empty() {
            return Err(AppError::Validation("nickname is required".to_string()));
        }
        let email = self.email.trim();
        if !EMAIL_RE.is_match(email) {
            return Err(AppError::Validation("email is not valid".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("password is required".to_string()));
        }
        if self.password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::Validation(format!(
                "password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        if self.password != self.password_confirm {
            return Err(AppError::Validation("passwords do not match".to_string()));
        }
        let role = self.role.parse()?;

        Ok(Registration {
            nickname: nickname.to_string(),
            email: email.to_string(),
            password: self.password,
            role,
        })
    }
}

/// Request body for login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub nickname: String,
    pub password: String,
}
