//! Rate limit keys, quota policy and fixed-window bookkeeping.
//!
//! Every throttled write endpoint owns an independent quota. Keys are
//! composed of the endpoint class, the caller class and the raw caller id
//! so that adding a new throttled endpoint can never collide with an
//! existing bucket.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use rantboard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Shared bucket for anonymous callers whose address could not be resolved.
pub const UNKNOWN_CLIENT_ADDRESS: &str = "unknown";

/// Write endpoint family that owns an independent quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
    /// Complaint post creation.
    Post,
    /// Comment creation.
    Comment,
    /// Password reset requests.
    PasswordReset,
}

impl EndpointClass {
    /// Returns the stable string form used inside rate limit identifiers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::PasswordReset => "password_reset",
        }
    }

    /// Returns the plural noun used in user-facing quota messages.
    #[must_use]
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Comment => "comments",
            Self::PasswordReset => "password reset requests",
        }
    }
}

impl FromStr for EndpointClass {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            "password_reset" => Ok(Self::PasswordReset),
            _ => Err(AppError::Validation(format!(
                "unknown endpoint class '{value}'"
            ))),
        }
    }
}

/// Caller class selecting which quota applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerClass {
    /// Caller without a verified bearer token, keyed by network address.
    Anonymous,
    /// Caller with a verified bearer token, keyed by user id.
    Authenticated,
}

impl CallerClass {
    /// Returns the stable string form used inside rate limit identifiers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticated => "user",
        }
    }
}

impl FromStr for CallerClass {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "anonymous" => Ok(Self::Anonymous),
            "user" => Ok(Self::Authenticated),
            _ => Err(AppError::Validation(format!(
                "unknown caller class '{value}'"
            ))),
        }
    }
}

/// Identifier of one quota bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateLimitKey {
    endpoint: EndpointClass,
    caller: CallerClass,
    raw_id: String,
}

impl RateLimitKey {
    /// Creates a key for an anonymous caller identified by network address.
    pub fn anonymous(endpoint: EndpointClass, address: &str) -> AppResult<Self> {
        Self::new(endpoint, CallerClass::Anonymous, address)
    }

    /// Creates a key for a caller authenticated by a verified token.
    pub fn authenticated(endpoint: EndpointClass, user_id: &str) -> AppResult<Self> {
        Self::new(endpoint, CallerClass::Authenticated, user_id)
    }

    fn new(endpoint: EndpointClass, caller: CallerClass, raw_id: &str) -> AppResult<Self> {
        let raw_id = raw_id.trim();
        if raw_id.is_empty() {
            return Err(AppError::Validation(
                "rate limit identifier must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            endpoint,
            caller,
            raw_id: raw_id.to_owned(),
        })
    }

    /// Returns the endpoint class owning this bucket.
    #[must_use]
    pub fn endpoint(&self) -> EndpointClass {
        self.endpoint
    }

    /// Returns the caller class, which selects the quota.
    #[must_use]
    pub fn caller(&self) -> CallerClass {
        self.caller
    }

    /// Returns the address or user id the bucket belongs to.
    #[must_use]
    pub fn raw_id(&self) -> &str {
        self.raw_id.as_str()
    }
}

impl Display for RateLimitKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}:{}:{}",
            self.endpoint.as_str(),
            self.caller.as_str(),
            self.raw_id
        )
    }
}

impl FromStr for RateLimitKey {
    type Err = AppError;

    /// Parses `"<endpoint>:<caller>:<raw_id>"`. The raw id keeps any further
    /// colons so IPv6 addresses survive.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(3, ':');
        let (Some(endpoint), Some(caller), Some(raw_id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AppError::Validation(format!(
                "rate limit identifier '{value}' must look like '<endpoint>:<caller>:<id>'"
            )));
        };

        Self::new(endpoint.parse()?, caller.parse()?, raw_id)
    }
}

/// Quota configuration shared by every endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    window: TimeDelta,
    max_anonymous: u32,
    max_authenticated: u32,
}

impl RateLimitPolicy {
    /// Creates a validated policy.
    pub fn new(window: TimeDelta, max_anonymous: u32, max_authenticated: u32) -> AppResult<Self> {
        if window <= TimeDelta::zero() {
            return Err(AppError::Validation(
                "rate limit window must be greater than zero".to_owned(),
            ));
        }

        if max_anonymous == 0 || max_authenticated == 0 {
            return Err(AppError::Validation(
                "rate limit quotas must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            window,
            max_anonymous,
            max_authenticated,
        })
    }

    /// Returns the window duration.
    #[must_use]
    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Returns the per-window allowance for the given caller class.
    #[must_use]
    pub fn max_for(&self, caller: CallerClass) -> u32 {
        match caller {
            CallerClass::Anonymous => self.max_anonymous,
            CallerClass::Authenticated => self.max_authenticated,
        }
    }
}

impl Default for RateLimitPolicy {
    /// One anonymous or five authenticated requests per five minutes.
    fn default() -> Self {
        Self {
            window: TimeDelta::minutes(5),
            max_anonymous: 1,
            max_authenticated: 5,
        }
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The request fits in the current window and was counted.
    Allowed,
    /// The quota for the current window is used up.
    Denied {
        /// When the window closes and the bucket starts over.
        reset_at: DateTime<Utc>,
    },
}

impl RateLimitDecision {
    /// Returns whether the request may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Returns the window reset time for denied decisions.
    #[must_use]
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Allowed => None,
            Self::Denied { reset_at } => Some(*reset_at),
        }
    }

    /// Whole seconds until the caller may retry, rounded up.
    #[must_use]
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> i64 {
        let Some(reset_at) = self.reset_at() else {
            return 0;
        };

        let millis = (reset_at - now).num_milliseconds();
        if millis <= 0 { 0 } else { (millis + 999) / 1000 }
    }
}

/// Counter for one bucket within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    count: u32,
    window_reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    /// Opens a new window that already counts the current request.
    #[must_use]
    pub fn open(now: DateTime<Utc>, policy: &RateLimitPolicy) -> Self {
        Self {
            count: 1,
            window_reset_at: now + policy.window(),
        }
    }

    /// Number of accepted requests in the current window.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// When the current window expires.
    #[must_use]
    pub fn window_reset_at(&self) -> DateTime<Utc> {
        self.window_reset_at
    }

    /// An expired entry must be treated exactly like an absent one.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_reset_at
    }

    /// Counts one more request if the limit allows it.
    pub fn admit(&mut self, limit: u32) -> RateLimitDecision {
        if self.count < limit {
            self.count += 1;
            RateLimitDecision::Allowed
        } else {
            RateLimitDecision::Denied {
                reset_at: self.window_reset_at,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("valid timestamp"))
    }

    #[test]
    fn key_display_is_namespaced_by_endpoint_and_caller() -> AppResult<()> {
        let post = RateLimitKey::authenticated(EndpointClass::Post, "42")?;
        let comment = RateLimitKey::authenticated(EndpointClass::Comment, "42")?;
        let anonymous = RateLimitKey::anonymous(EndpointClass::Comment, "42")?;

        assert_eq!(post.to_string(), "post:user:42");
        assert_eq!(comment.to_string(), "comment:user:42");
        assert_eq!(anonymous.to_string(), "comment:anonymous:42");
        assert_ne!(post, comment);
        assert_ne!(comment, anonymous);
        Ok(())
    }

    #[test]
    fn key_parse_keeps_ipv6_colons() -> AppResult<()> {
        let key: RateLimitKey = "post:anonymous:2001:db8::1".parse()?;
        assert_eq!(key.endpoint(), EndpointClass::Post);
        assert_eq!(key.caller(), CallerClass::Anonymous);
        assert_eq!(key.raw_id(), "2001:db8::1");
        Ok(())
    }

    #[test]
    fn key_rejects_empty_identifier() {
        assert!(RateLimitKey::anonymous(EndpointClass::Post, "  ").is_err());
        assert!("post:user:".parse::<RateLimitKey>().is_err());
        assert!("post".parse::<RateLimitKey>().is_err());
        assert!("upload:user:1".parse::<RateLimitKey>().is_err());
    }

    #[test]
    fn policy_rejects_zero_window_and_quota() {
        assert!(RateLimitPolicy::new(TimeDelta::zero(), 1, 5).is_err());
        assert!(RateLimitPolicy::new(TimeDelta::minutes(5), 0, 5).is_err());
        assert!(RateLimitPolicy::new(TimeDelta::minutes(5), 1, 0).is_err());
    }

    #[test]
    fn default_policy_matches_submission_quotas() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.window(), TimeDelta::seconds(300));
        assert_eq!(policy.max_for(CallerClass::Anonymous), 1);
        assert_eq!(policy.max_for(CallerClass::Authenticated), 5);
    }

    #[test]
    fn entry_expires_exactly_at_reset_time() {
        let policy = RateLimitPolicy::default();
        let entry = RateLimitEntry::open(start(), &policy);

        assert!(!entry.is_expired(start() + TimeDelta::seconds(299)));
        assert!(entry.is_expired(start() + TimeDelta::seconds(300)));
    }

    #[test]
    fn retry_after_rounds_up_partial_seconds() {
        let decision = RateLimitDecision::Denied {
            reset_at: start() + TimeDelta::milliseconds(290_001),
        };

        assert_eq!(decision.retry_after_seconds(start()), 291);
        assert_eq!(
            decision.retry_after_seconds(start() + TimeDelta::seconds(400)),
            0
        );
        assert_eq!(RateLimitDecision::Allowed.retry_after_seconds(start()), 0);
    }

    proptest! {
        #[test]
        fn entry_never_admits_more_than_limit(limit in 1_u32..20, attempts in 0_usize..60) {
            let policy = RateLimitPolicy::new(TimeDelta::minutes(5), limit, limit)
                .unwrap_or_else(|_| panic!("valid policy"));
            let mut entry = RateLimitEntry::open(start(), &policy);
            let mut allowed = 1_u32;

            for _ in 0..attempts {
                if entry.admit(limit).is_allowed() {
                    allowed += 1;
                }
            }

            prop_assert!(allowed <= limit);
            prop_assert!(entry.count() <= limit);
        }

        #[test]
        fn identifier_display_parses_back(raw in "[a-zA-Z0-9.:-]{1,40}") {
            let key = RateLimitKey::anonymous(EndpointClass::Comment, &raw)
                .unwrap_or_else(|_| panic!("non-empty identifier"));
            let parsed: RateLimitKey = key.to_string().parse()
                .unwrap_or_else(|_| panic!("display form parses"));
            prop_assert_eq!(parsed, key);
        }
    }
}
