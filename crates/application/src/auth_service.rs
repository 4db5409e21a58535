//! Password login with per-source lockout, plus registration and bearer
//! token verification.
//!
//! Failure messages never say whether the login or the password was wrong.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use tracing::{debug, info, warn};

use rantboard_core::{AppError, AppResult, NonEmptyString, Role, UserIdentity};
use rantboard_domain::{EmailAddress, UserId, describe_duration, validate_password};

use crate::{FailureOutcome, LoginLockoutTracker};

#[cfg(test)]
mod tests;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Stored credential returned by repository queries.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    /// Stable subject placed in issued tokens.
    pub subject: String,
    /// Username (admins) or email (users) used to log in.
    pub login: String,
    /// Name shown next to the identity's content.
    pub display_name: String,
    /// Salted password hash.
    pub password_hash: String,
    /// Role granted to the identity.
    pub role: Role,
}

/// Credential to persist for a new identity.
#[derive(Debug, Clone)]
pub struct NewCredential {
    /// Stable subject placed in issued tokens.
    pub subject: String,
    /// Username or email used to log in.
    pub login: String,
    /// Name shown next to the identity's content.
    pub display_name: String,
    /// Salted password hash.
    pub password_hash: String,
    /// Role granted to the identity.
    pub role: Role,
}

/// Repository port for credential persistence.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Finds a credential by login (case-insensitive).
    async fn find_by_login(&self, login: &str) -> AppResult<Option<CredentialRecord>>;

    /// Stores a new credential. Fails with `Conflict` if the login is taken.
    async fn create(&self, credential: NewCredential) -> AppResult<CredentialRecord>;
}

/// Port for password hashing operations.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password with a fresh salt.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Signed bearer token handed to a client.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded token.
    pub token: String,
    /// When the token stops verifying.
    pub expires_at: DateTime<Utc>,
    /// Identity carried by the token.
    pub identity: UserIdentity,
}

/// Port for bearer token issuance and verification.
pub trait TokenService: Send + Sync {
    /// Signs a token for `identity`.
    fn issue(&self, identity: &UserIdentity) -> AppResult<IssuedToken>;

    /// Decodes a token, failing with `Unauthorized` when it is expired,
    /// tampered with or malformed.
    fn verify(&self, token: &str) -> AppResult<UserIdentity>;
}

// ---------------------------------------------------------------------------
// Outcomes and requests
// ---------------------------------------------------------------------------

/// Result of a login attempt. Rejections are values, not errors.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Credentials were valid and a token was issued.
    Authenticated(IssuedToken),
    /// Credentials were invalid and the source may try again.
    InvalidCredentials {
        /// Attempts left before the source is locked.
        remaining_attempts: u32,
    },
    /// The source is locked out.
    Locked {
        /// When the lock expires.
        locked_until: DateTime<Utc>,
        /// Lock duration when this attempt triggered the lock.
        locked_for: Option<TimeDelta>,
    },
}

impl LoginOutcome {
    /// User-facing description of a rejected attempt.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Authenticated(_) => "Login successful.".to_owned(),
            Self::InvalidCredentials { remaining_attempts } => {
                let plural = if *remaining_attempts == 1 { "" } else { "s" };
                format!("Invalid credentials. {remaining_attempts} attempt{plural} remaining.")
            }
            Self::Locked {
                locked_until,
                locked_for: Some(locked_for),
            } => format!(
                "Too many failed attempts. Account locked for {} until {}",
                describe_duration(*locked_for),
                format_timestamp(*locked_until)
            ),
            Self::Locked {
                locked_until,
                locked_for: None,
            } => format!(
                "Account locked. Try again after {}",
                format_timestamp(*locked_until)
            ),
        }
    }

    /// Lock expiry for locked outcomes.
    #[must_use]
    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Locked { locked_until, .. } => Some(*locked_until),
            Self::Authenticated(_) | Self::InvalidCredentials { .. } => None,
        }
    }
}

/// Parameters for user registration.
#[derive(Debug, Clone)]
pub struct RegisterParams {
    /// Email address used as the login.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Name shown next to the user's content.
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for one login realm (admin panel or user accounts).
///
/// Each realm owns its lockout tracker, so admin and user login failures
/// are counted separately.
#[derive(Clone)]
pub struct AuthService {
    realm: Role,
    credential_repository: Arc<dyn CredentialRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    token_service: Arc<dyn TokenService>,
    lockout: LoginLockoutTracker,
}

impl AuthService {
    /// Creates an auth service for the given realm.
    #[must_use]
    pub fn new(
        realm: Role,
        credential_repository: Arc<dyn CredentialRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        token_service: Arc<dyn TokenService>,
        lockout: LoginLockoutTracker,
    ) -> Self {
        Self {
            realm,
            credential_repository,
            password_hasher,
            token_service,
            lockout,
        }
    }

    /// Authenticates `login`/`password` coming from `source_ip`.
    ///
    /// A locked source is rejected before credentials are looked at and
    /// without counting the attempt.
    pub async fn login(
        &self,
        login: &str,
        password: &str,
        source_ip: &str,
    ) -> AppResult<LoginOutcome> {
        if let Some(locked_until) = self.lockout.active_lock(source_ip)? {
            warn!(
                realm = %self.realm,
                source_ip,
                %locked_until,
                "login rejected for locked source"
            );
            return Ok(LoginOutcome::Locked {
                locked_until,
                locked_for: None,
            });
        }

        let credential = self.credential_repository.find_by_login(login).await?;
        let verified = match credential {
            Some(credential) if credential.role == self.realm => self
                .password_hasher
                .verify_password(password, &credential.password_hash)?
                .then_some(credential),
            _ => {
                // Hash anyway so unknown logins cost the same as wrong passwords.
                if let Err(error) = self.password_hasher.hash_password(password) {
                    debug!(realm = %self.realm, %error, "equalising hash failed");
                }
                None
            }
        };

        let Some(credential) = verified else {
            return Ok(match self.lockout.record_failure(source_ip)? {
                FailureOutcome::Remaining { remaining_attempts } => {
                    LoginOutcome::InvalidCredentials { remaining_attempts }
                }
                FailureOutcome::Locked {
                    locked_until,
                    newly_locked,
                } => LoginOutcome::Locked {
                    locked_until,
                    locked_for: newly_locked.then(|| self.lockout.policy().lockout_duration()),
                },
            });
        };

        if let Some(locked_until) = self.lockout.record_success(source_ip)? {
            return Ok(LoginOutcome::Locked {
                locked_until,
                locked_for: None,
            });
        }

        let identity = UserIdentity::new(credential.subject, credential.login, credential.role);
        let issued = self.token_service.issue(&identity)?;

        info!(
            realm = %self.realm,
            subject = identity.subject(),
            source_ip,
            "login succeeded"
        );

        Ok(LoginOutcome::Authenticated(issued))
    }

    /// Registers a user account and issues its first token.
    pub async fn register(&self, params: RegisterParams) -> AppResult<IssuedToken> {
        if self.realm != Role::User {
            return Err(AppError::Forbidden(
                "registration is only available for user accounts".to_owned(),
            ));
        }

        let email = EmailAddress::new(&params.email)?;
        validate_password(&params.password)?;
        let display_name = NonEmptyString::new(params.display_name.trim())
            .map_err(|_| AppError::Validation("display name is required".to_owned()))?;

        let password_hash = self.password_hasher.hash_password(&params.password)?;
        let credential = self
            .credential_repository
            .create(NewCredential {
                subject: UserId::new().to_string(),
                login: email.as_str().to_owned(),
                display_name: display_name.into(),
                password_hash,
                role: Role::User,
            })
            .await?;

        info!(subject = %credential.subject, "user registered");

        let identity = UserIdentity::new(credential.subject, credential.login, credential.role);
        self.token_service.issue(&identity)
    }

    /// Verifies a bearer token issued for this realm.
    pub fn verify_token(&self, token: &str) -> AppResult<UserIdentity> {
        let identity = self.token_service.verify(token)?;
        if identity.role() != self.realm {
            return Err(AppError::Unauthorized("invalid or expired token".to_owned()));
        }

        Ok(identity)
    }

    /// Returns the lockout tracker for diagnostics and cleanup.
    #[must_use]
    pub fn lockout(&self) -> &LoginLockoutTracker {
        &self.lockout
    }
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
