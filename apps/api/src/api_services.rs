use std::sync::Arc;

use rantboard_application::{
    AuthService, Clock, ContentService, CredentialRepository, LoginLockoutTracker, NewCredential,
    PasswordHasher, RateLimitService, TokenService,
};
use rantboard_core::{AppResult, Role};
use rantboard_infrastructure::{
    InMemoryContentRepository, InMemoryCredentialRepository, JwtTokenService,
};
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Subject of the seeded administrator credential.
const ADMIN_SUBJECT: &str = "admin";

/// Wires repositories and services, seeding the administrator credential.
pub async fn build_app_state(
    config: &ApiConfig,
    clock: Arc<dyn Clock>,
    password_hasher: Arc<dyn PasswordHasher>,
) -> AppResult<AppState> {
    let credential_repository = Arc::new(InMemoryCredentialRepository::new());
    credential_repository
        .create(NewCredential {
            subject: ADMIN_SUBJECT.to_owned(),
            login: config.admin_username.clone(),
            display_name: "Administrator".to_owned(),
            password_hash: password_hasher.hash_password(&config.admin_password)?,
            role: Role::Admin,
        })
        .await?;
    info!(login = %config.admin_username, "administrator credential seeded");

    let token_service: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
        &config.jwt_secret,
        config.admin_token_ttl,
        config.user_token_ttl,
        clock.clone(),
    )?);

    let auth_service = |realm: Role| {
        AuthService::new(
            realm,
            credential_repository.clone(),
            password_hasher.clone(),
            token_service.clone(),
            LoginLockoutTracker::new(config.lockout_policy, clock.clone()),
        )
    };

    Ok(AppState {
        rate_limit_service: RateLimitService::new(config.rate_limit_policy, clock.clone()),
        admin_auth: auth_service(Role::Admin),
        user_auth: auth_service(Role::User),
        token_service: token_service.clone(),
        content_service: ContentService::new(
            Arc::new(InMemoryContentRepository::new()),
            clock.clone(),
        ),
        clock,
        rate_limit_bypass_token: config.rate_limit_bypass_token.clone(),
        password_reset_enabled: config.password_reset_enabled,
    })
}
