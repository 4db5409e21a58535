//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod in_memory_content_repository;
mod in_memory_credential_repository;
mod jwt_token_service;
mod system_clock;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_content_repository::InMemoryContentRepository;
pub use in_memory_credential_repository::InMemoryCredentialRepository;
pub use jwt_token_service::{JwtTokenService, MIN_SECRET_LENGTH};
pub use system_clock::SystemClock;
