use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use rantboard_core::{AppError, AppResult};
use rantboard_domain::{LockoutPolicy, RateLimitPolicy};
use rantboard_infrastructure::MIN_SECRET_LENGTH;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub jwt_secret: String,
    pub admin_username: String,
    pub admin_password: String,
    pub admin_token_ttl: TimeDelta,
    pub user_token_ttl: TimeDelta,
    pub rate_limit_policy: RateLimitPolicy,
    pub rate_limit_sweep_interval: Duration,
    pub rate_limit_bypass_token: Option<String>,
    pub lockout_policy: LockoutPolicy,
    pub lockout_sweep_interval: Duration,
    pub password_reset_enabled: bool,
}

impl ApiConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let env = EnvReader { lookup };

        let jwt_secret = env.required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_SECRET_LENGTH {
            return Err(AppError::Validation(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LENGTH} characters"
            )));
        }

        let api_port = match env.optional("API_PORT") {
            Some(value) => value.parse::<u16>().map_err(|error| {
                AppError::Validation(format!("invalid API_PORT value '{value}': {error}"))
            })?,
            None => 3001,
        };

        let rate_limit_policy = RateLimitPolicy::new(
            TimeDelta::seconds(i64::from(env.positive_u32("RATE_LIMIT_WINDOW_SECONDS", 300)?)),
            env.positive_u32("RATE_LIMIT_MAX_ANONYMOUS", 1)?,
            env.positive_u32("RATE_LIMIT_MAX_AUTHENTICATED", 5)?,
        )?;

        let lockout_policy = LockoutPolicy::new(
            env.positive_u32("LOGIN_MAX_ATTEMPTS", 2)?,
            TimeDelta::seconds(i64::from(env.positive_u32("LOGIN_LOCKOUT_SECONDS", 86_400)?)),
        )?;

        Ok(Self {
            api_host: env
                .optional("API_HOST")
                .unwrap_or_else(|| "127.0.0.1".to_owned()),
            api_port,
            frontend_url: env
                .optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_owned()),
            jwt_secret,
            admin_username: env
                .optional("ADMIN_USERNAME")
                .unwrap_or_else(|| "admin".to_owned()),
            admin_password: env.required("ADMIN_PASSWORD")?,
            admin_token_ttl: TimeDelta::seconds(i64::from(
                env.positive_u32("ADMIN_TOKEN_TTL_SECONDS", 86_400)?,
            )),
            user_token_ttl: TimeDelta::seconds(i64::from(
                env.positive_u32("USER_TOKEN_TTL_SECONDS", 604_800)?,
            )),
            rate_limit_policy,
            rate_limit_sweep_interval: Duration::from_secs(u64::from(
                env.positive_u32("RATE_LIMIT_SWEEP_INTERVAL_SECONDS", 60)?,
            )),
            rate_limit_bypass_token: env.optional("RATE_LIMIT_BYPASS_TOKEN"),
            lockout_policy,
            lockout_sweep_interval: Duration::from_secs(u64::from(
                env.positive_u32("LOGIN_LOCKOUT_SWEEP_INTERVAL_SECONDS", 3_600)?,
            )),
            password_reset_enabled: env
                .optional("FEATURE_PASSWORD_RESET")
                .is_none_or(|value| !value.eq_ignore_ascii_case("false")),
        })
    }

    pub fn socket_address(&self) -> AppResult<SocketAddr> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    /// Trimmed value, with blank values treated as unset.
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> AppResult<String> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn positive_u32(&self, name: &str, default: u32) -> AppResult<u32> {
        let Some(value) = self.optional(name) else {
            return Ok(default);
        };

        let parsed = value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        })?;
        if parsed == 0 {
            return Err(AppError::Validation(format!(
                "{name} must be greater than zero"
            )));
        }

        Ok(parsed)
    }
}
