use axum::Extension;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use rantboard_core::AppError;
use rantboard_domain::{
    CallerClass, EndpointClass, RateLimitDecision, RateLimitKey, RateLimitPolicy,
    describe_duration,
};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::request_context::{ClientAddress, bearer_token, bypass_granted};
use crate::state::AppState;

/// Counts the request against the quota of its endpoint class.
pub async fn throttle(
    State(state): State<AppState>,
    Extension(endpoint): Extension<EndpointClass>,
    ClientAddress(address): ClientAddress,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    enforce_quota(&state, endpoint, request.headers(), &address)?;
    Ok(next.run(request).await)
}

/// Spends one unit of the caller's `endpoint` quota, failing with
/// [`ApiError::QuotaExceeded`] once it is used up.
///
/// The caller is authenticated only by a verified bearer token; anything
/// else, including an invalid token, is throttled by client address.
pub fn enforce_quota(
    state: &AppState,
    endpoint: EndpointClass,
    headers: &HeaderMap,
    address: &str,
) -> ApiResult<()> {
    if bypass_granted(state.rate_limit_bypass_token.as_deref(), headers) {
        debug!(endpoint = endpoint.as_str(), "rate limit bypassed");
        return Ok(());
    }

    let identity = bearer_token(headers).and_then(|token| state.token_service.verify(token).ok());
    let key = match &identity {
        Some(identity) => RateLimitKey::authenticated(endpoint, identity.subject())?,
        None => RateLimitKey::anonymous(endpoint, address)?,
    };

    let decision = state.rate_limit_service.check(&key)?;
    if let RateLimitDecision::Denied { reset_at } = decision {
        return Err(ApiError::QuotaExceeded {
            message: quota_message(state.rate_limit_service.policy(), &key),
            retry_after_seconds: decision.retry_after_seconds(state.clock.now()),
            reset_at,
        });
    }

    Ok(())
}

/// Rejects requests without a valid admin bearer token and hands the
/// verified identity to the handler.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("admin authentication required".to_owned()))?;
    let identity = state.admin_auth.verify_token(token)?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn quota_message(policy: &RateLimitPolicy, key: &RateLimitKey) -> String {
    let noun = key.endpoint().noun();
    let window = describe_duration(policy.window());
    let limit = policy.max_for(key.caller());

    match key.caller() {
        CallerClass::Authenticated => {
            format!("Too many {noun}. You can submit {limit} every {window}.")
        }
        CallerClass::Anonymous => format!(
            "Too many {noun}. You can submit {limit} every {window}. Sign in to submit up to {} every {window}.",
            policy.max_for(CallerClass::Authenticated)
        ),
    }
}
