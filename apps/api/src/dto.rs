use chrono::{DateTime, Utc};
use rantboard_application::{IssuedToken, LockoutStats, RateLimitStats};
use rantboard_core::{Role, UserIdentity};
use serde::{Deserialize, Serialize};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Generic message response.
#[derive(Debug, Serialize)]
pub struct GenericMessageResponse {
    pub message: String,
}

/// Incoming payload for post creation.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Incoming payload for comment creation.
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(alias = "postId")]
    pub post_id: String,
    pub content: String,
    pub author: String,
}

/// Incoming payload for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(alias = "displayName", alias = "name")]
    pub display_name: String,
}

/// Incoming payload for admin and user login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub login: String,
    pub password: String,
}

/// Incoming payload for password reset requests.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Identity carried by a verified token.
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub subject: String,
    pub login: String,
    pub role: Role,
}

impl From<UserIdentity> for IdentityResponse {
    fn from(identity: UserIdentity) -> Self {
        Self {
            subject: identity.subject().to_owned(),
            login: identity.login().to_owned(),
            role: identity.role(),
        }
    }
}

/// Issued bearer token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub identity: IdentityResponse,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.expires_at,
            identity: issued.identity.into(),
        }
    }
}

/// Admin view of throttling and lockout state.
#[derive(Debug, Serialize)]
pub struct AbuseDiagnosticsResponse {
    pub rate_limits: RateLimitStats,
    pub admin_lockouts: LockoutStats,
    pub user_lockouts: LockoutStats,
}

/// Result of a bulk clear.
#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub removed: usize,
}

/// Result of removing a single entry.
#[derive(Debug, Serialize)]
pub struct EntryRemovedResponse {
    pub identifier: String,
    pub removed: bool,
}
