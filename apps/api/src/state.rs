use std::sync::Arc;

use rantboard_application::{AuthService, Clock, ContentService, RateLimitService, TokenService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub rate_limit_service: RateLimitService,
    pub admin_auth: AuthService,
    pub user_auth: AuthService,
    pub token_service: Arc<dyn TokenService>,
    pub content_service: ContentService,
    pub clock: Arc<dyn Clock>,
    pub rate_limit_bypass_token: Option<String>,
    pub password_reset_enabled: bool,
}
