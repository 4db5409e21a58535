//! HS256 bearer tokens.
//!
//! Expiry is checked against the injected [`Clock`] rather than inside
//! `jsonwebtoken`, so tests can move time.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rantboard_application::{Clock, IssuedToken, TokenService};
use rantboard_core::{AppError, AppResult, Role, UserIdentity};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum accepted signing secret length.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    login: String,
    role: String,
    iat: i64,
    exp: i64,
}

/// Token service signing HS256 JWTs with a shared secret.
#[derive(Clone)]
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    admin_ttl: TimeDelta,
    user_ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl JwtTokenService {
    /// Creates a token service. `secret` must be at least 32 bytes.
    pub fn new(
        secret: &str,
        admin_ttl: TimeDelta,
        user_ttl: TimeDelta,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AppError::Validation(format!(
                "token secret must be at least {MIN_SECRET_LENGTH} characters"
            )));
        }

        if admin_ttl <= TimeDelta::zero() || user_ttl <= TimeDelta::zero() {
            return Err(AppError::Validation(
                "token lifetimes must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            admin_ttl,
            user_ttl,
            clock,
        })
    }

    fn ttl_for(&self, role: Role) -> TimeDelta {
        match role {
            Role::Admin => self.admin_ttl,
            Role::User => self.user_ttl,
        }
    }
}

fn rejected() -> AppError {
    AppError::Unauthorized("invalid or expired token".to_owned())
}

impl TokenService for JwtTokenService {
    fn issue(&self, identity: &UserIdentity) -> AppResult<IssuedToken> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.ttl_for(identity.role());
        let claims = Claims {
            sub: identity.subject().to_owned(),
            login: identity.login().to_owned(),
            role: identity.role().as_str().to_owned(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign token: {error}")))?;

        Ok(IssuedToken {
            token,
            expires_at,
            identity: identity.clone(),
        })
    }

    fn verify(&self, token: &str) -> AppResult<UserIdentity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|error| {
                debug!(%error, "token rejected");
                rejected()
            })?
            .claims;

        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or_else(rejected)?;
        if self.clock.now() >= expires_at {
            return Err(rejected());
        }

        let role = claims.role.parse::<Role>().map_err(|_| rejected())?;
        Ok(UserIdentity::new(claims.sub, claims.login, role))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use rantboard_application::{Clock, TokenService};
    use rantboard_core::{AppError, AppResult, Role, UserIdentity};

    use super::JwtTokenService;

    const SECRET: &str = "an-adequately-long-signing-secret-value";

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, delta: TimeDelta) {
            if let Ok(mut now) = self.0.lock() {
                *now += delta;
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
                .lock()
                .map(|now| *now)
                .unwrap_or_else(|poisoned| *poisoned.into_inner())
        }
    }

    fn token_service(secret: &str) -> AppResult<(JwtTokenService, Arc<ManualClock>)> {
        let start = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("valid timestamp"));
        let clock = Arc::new(ManualClock(Mutex::new(start)));
        let service = JwtTokenService::new(
            secret,
            TimeDelta::hours(24),
            TimeDelta::days(7),
            clock.clone(),
        )?;
        Ok((service, clock))
    }

    #[test]
    fn issued_token_verifies_to_same_identity() -> AppResult<()> {
        let (service, _clock) = token_service(SECRET)?;
        let identity = UserIdentity::new("42", "sam@example.com", Role::User);

        let issued = service.issue(&identity)?;
        assert_eq!(service.verify(&issued.token)?, identity);
        Ok(())
    }

    #[test]
    fn admin_tokens_expire_after_a_day() -> AppResult<()> {
        let (service, clock) = token_service(SECRET)?;
        let issued = service.issue(&UserIdentity::new("admin", "admin", Role::Admin))?;

        clock.advance(TimeDelta::hours(23));
        assert!(service.verify(&issued.token).is_ok());

        clock.advance(TimeDelta::hours(1));
        assert!(matches!(
            service.verify(&issued.token),
            Err(AppError::Unauthorized(_))
        ));
        Ok(())
    }

    #[test]
    fn user_tokens_last_a_week() -> AppResult<()> {
        let (service, clock) = token_service(SECRET)?;
        let issued = service.issue(&UserIdentity::new("7", "lee@example.com", Role::User))?;

        clock.advance(TimeDelta::days(6));
        assert!(service.verify(&issued.token).is_ok());
        clock.advance(TimeDelta::days(1));
        assert!(service.verify(&issued.token).is_err());
        Ok(())
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() -> AppResult<()> {
        let (service, _clock) = token_service(SECRET)?;
        let (other, _clock) = token_service("a-completely-different-signing-secret")?;
        let issued = other.issue(&UserIdentity::new("admin", "admin", Role::Admin))?;

        assert!(service.verify(&issued.token).is_err());
        assert!(service.verify("not.a.jwt").is_err());
        Ok(())
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(matches!(
            token_service("too-short"),
            Err(AppError::Validation(_))
        ));
    }
}
