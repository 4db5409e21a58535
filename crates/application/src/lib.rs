//! Application services and ports.

#![forbid(unsafe_code)]

mod auth_service;
mod clock;
mod content_service;
mod login_lockout_tracker;
mod rate_limit_service;

pub use auth_service::{
    AuthService, CredentialRecord, CredentialRepository, IssuedToken, LoginOutcome,
    NewCredential, PasswordHasher, RegisterParams, TokenService,
};
pub use clock::Clock;
pub use content_service::{CommentRecord, ContentRepository, ContentService, PostRecord};
pub use login_lockout_tracker::{
    FailureOutcome, LockoutRecordSnapshot, LockoutStats, LoginLockoutTracker,
};
pub use rate_limit_service::{RateLimitEntrySnapshot, RateLimitService, RateLimitStats};
