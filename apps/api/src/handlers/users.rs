use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use rantboard_application::RegisterParams;
use rantboard_core::AppError;
use rantboard_domain::EmailAddress;
use tracing::info;

use super::login_response;
use crate::dto::{
    ForgotPasswordRequest, GenericMessageResponse, IdentityResponse, LoginRequest,
    RegisterRequest, TokenResponse,
};
use crate::error::ApiResult;
use crate::request_context::{ClientAddress, bearer_token};
use crate::state::AppState;

pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    let issued = state
        .user_auth
        .register(RegisterParams {
            email: payload.email,
            password: payload.password,
            display_name: payload.display_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(issued.into())))
}

pub async fn user_login_handler(
    State(state): State<AppState>,
    ClientAddress(address): ClientAddress,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let outcome = state
        .user_auth
        .login(&payload.login, &payload.password, &address)
        .await?;

    login_response(outcome)
}

pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<GenericMessageResponse>> {
    if !state.password_reset_enabled {
        return Err(AppError::NotFound("password reset is disabled".to_owned()).into());
    }

    EmailAddress::new(&payload.email)?;
    info!("password reset requested");

    Ok(Json(GenericMessageResponse {
        message: "If an account exists for that email, reset instructions have been sent."
            .to_owned(),
    }))
}

pub async fn verify_user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<IdentityResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("bearer token required".to_owned()))?;

    Ok(Json(state.user_auth.verify_token(token)?.into()))
}
