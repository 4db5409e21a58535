pub mod admin;
pub mod content;
pub mod health;
pub mod users;

use axum::Json;
use rantboard_application::LoginOutcome;

use crate::dto::TokenResponse;
use crate::error::{ApiError, ApiResult};

/// Maps a login outcome to the token response or a 401 rejection.
fn login_response(outcome: LoginOutcome) -> ApiResult<Json<TokenResponse>> {
    match outcome {
        LoginOutcome::Authenticated(issued) => Ok(Json(issued.into())),
        rejected => Err(ApiError::LoginRejected {
            message: rejected.message(),
            locked_until: rejected.locked_until(),
        }),
    }
}
