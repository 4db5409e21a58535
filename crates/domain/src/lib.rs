//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod content;
mod duration_text;
mod lockout;
mod rate_limit;
mod user;

pub use content::{
    COMMENT_AUTHOR_MAX_LENGTH, COMMENT_CONTENT_MAX_LENGTH, CommentDraft, POST_CONTENT_MAX_LENGTH,
    POST_MAX_TAGS, POST_TITLE_MAX_LENGTH, PostDraft,
};
pub use duration_text::describe_duration;
pub use lockout::{LockoutPolicy, LockoutState, LoginAttemptRecord};
pub use rate_limit::{
    CallerClass, EndpointClass, RateLimitDecision, RateLimitEntry, RateLimitKey, RateLimitPolicy,
    UNKNOWN_CLIENT_ADDRESS,
};
pub use user::{EmailAddress, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, UserId, validate_password};
