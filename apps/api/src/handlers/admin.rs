use axum::extract::{Path, State};
use axum::{Extension, Json};
use rantboard_core::UserIdentity;
use rantboard_domain::RateLimitKey;

use super::login_response;
use crate::dto::{
    AbuseDiagnosticsResponse, ClearedResponse, EntryRemovedResponse, IdentityResponse,
    LoginRequest, TokenResponse,
};
use crate::error::ApiResult;
use crate::request_context::ClientAddress;
use crate::state::AppState;

pub async fn admin_login_handler(
    State(state): State<AppState>,
    ClientAddress(address): ClientAddress,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let outcome = state
        .admin_auth
        .login(&payload.login, &payload.password, &address)
        .await?;

    login_response(outcome)
}

pub async fn admin_verify_handler(
    Extension(identity): Extension<UserIdentity>,
) -> Json<IdentityResponse> {
    Json(identity.into())
}

pub async fn abuse_diagnostics_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<AbuseDiagnosticsResponse>> {
    Ok(Json(AbuseDiagnosticsResponse {
        rate_limits: state.rate_limit_service.stats()?,
        admin_lockouts: state.admin_auth.lockout().stats()?,
        user_lockouts: state.user_auth.lockout().stats()?,
    }))
}

pub async fn clear_rate_limits_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<ClearedResponse>> {
    Ok(Json(ClearedResponse {
        removed: state.rate_limit_service.clear_all()?,
    }))
}

pub async fn reset_rate_limit_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<EntryRemovedResponse>> {
    let key = identifier.parse::<RateLimitKey>()?;
    let removed = state.rate_limit_service.reset(&key)?;

    Ok(Json(EntryRemovedResponse {
        identifier: key.to_string(),
        removed,
    }))
}

pub async fn clear_lockouts_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<ClearedResponse>> {
    let removed = state.admin_auth.lockout().clear_all()? + state.user_auth.lockout().clear_all()?;
    Ok(Json(ClearedResponse { removed }))
}

pub async fn clear_lockout_handler(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> ApiResult<Json<EntryRemovedResponse>> {
    let admin_removed = state.admin_auth.lockout().clear(&source)?;
    let user_removed = state.user_auth.lockout().clear(&source)?;

    Ok(Json(EntryRemovedResponse {
        identifier: source,
        removed: admin_removed || user_removed,
    }))
}
