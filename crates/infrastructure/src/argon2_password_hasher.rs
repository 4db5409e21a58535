//! Argon2id password hashing.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rantboard_application::PasswordHasher as PasswordHasherPort;
use rantboard_core::{AppError, AppResult};

/// Memory cost in KiB used by [`Argon2PasswordHasher::new`].
const DEFAULT_MEMORY_KIB: u32 = 19_456;

/// Iteration count used by [`Argon2PasswordHasher::new`].
const DEFAULT_ITERATIONS: u32 = 2;

/// Argon2id hasher producing PHC strings.
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    /// Creates a hasher with m=19 MiB, t=2, p=1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cost(DEFAULT_MEMORY_KIB, DEFAULT_ITERATIONS)
            .unwrap_or_else(|_| Self::from_params(Params::default()))
    }

    /// Creates a hasher with custom memory and time cost.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> AppResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|error| AppError::Validation(format!("invalid argon2 parameters: {error}")))?;
        Ok(Self::from_params(params))
    }

    fn from_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasherPort for Argon2PasswordHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|error| AppError::Internal(format!("failed to hash password: {error}")))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let stored = PasswordHash::new(hash)
            .map_err(|error| AppError::Internal(format!("stored password hash is malformed: {error}")))?;

        match self.argon2.verify_password(password.as_bytes(), &stored) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(error) => Err(AppError::Internal(format!(
                "password verification failed: {error}"
            ))),
        }
    }
}
