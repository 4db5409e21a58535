//! User identifiers and credential validation rules.

use rantboard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated, lowercased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Requires exactly one `@`, a non-empty local part and a domain with at
    /// least one `.`.
    pub fn new(value: &str) -> AppResult<Self> {
        let normalised = value.trim().to_lowercase();

        let Some((local, domain)) = normalised.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        };

        if local.is_empty() || domain.contains('@') {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if normalised.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(normalised))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Minimum accepted password length.
pub const PASSWORD_MIN_LENGTH: usize = 10;

/// Maximum accepted password length (bounds hashing cost).
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates a plaintext password for a new account.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        return Err(AppError::Validation(
            "this password is too common and has appeared in data breaches".to_owned(),
        ));
    }

    Ok(())
}

// Only entries of at least PASSWORD_MIN_LENGTH characters matter here.
static COMMON_PASSWORDS: &[&str] = &[
    "1234567890",
    "qwertyuiop",
    "password12",
    "password123",
    "password1234",
    "iloveyou123",
    "qwerty1234",
    "1q2w3e4r5t",
    "0987654321",
    "1234qwerty",
    "letmein123",
    "welcome123",
    "administrator",
];
