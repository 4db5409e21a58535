use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

/// Role carried by an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Moderator with access to the admin panel.
    Admin,
    /// Registered poster.
    User,
}

impl Role {
    /// Returns the stable string form used in tokens and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

/// Identity decoded from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    login: String,
    role: Role,
}

impl UserIdentity {
    /// Creates a user identity from verified token claims.
    #[must_use]
    pub fn new(subject: impl Into<String>, login: impl Into<String>, role: Role) -> Self {
        Self {
            subject: subject.into(),
            login: login.into(),
            role,
        }
    }

    /// Returns the stable subject (user id) of the identity.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the username or email the identity logged in with.
    #[must_use]
    pub fn login(&self) -> &str {
        self.login.as_str()
    }

    /// Returns the identity's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns whether the identity may use the admin panel.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, UserIdentity};

    #[test]
    fn role_round_trips_through_string_form() {
        assert_eq!("admin".parse::<Role>().ok(), Some(Role::Admin));
        assert_eq!(Role::User.to_string(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn only_admin_role_is_admin() {
        assert!(UserIdentity::new("1", "admin", Role::Admin).is_admin());
        assert!(!UserIdentity::new("42", "sam@example.com", Role::User).is_admin());
    }
}
