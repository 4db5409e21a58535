use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use rantboard_application::{CommentRecord, PostRecord};
use rantboard_domain::{CommentDraft, EndpointClass, PostDraft};

use crate::dto::{CreateCommentRequest, CreatePostRequest};
use crate::error::ApiResult;
use crate::middleware::enforce_quota;
use crate::request_context::ClientAddress;
use crate::state::AppState;

pub async fn create_post_handler(
    State(state): State<AppState>,
    ClientAddress(address): ClientAddress,
    Json(payload): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostRecord>)> {
    let draft = PostDraft::new(
        &payload.title,
        &payload.content,
        &payload.author,
        payload.tags,
    )?;
    let post = state.content_service.create_post(draft, &address).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Validates the comment before spending quota, so a rejected body leaves
/// the caller's allowance intact.
pub async fn create_comment_handler(
    State(state): State<AppState>,
    ClientAddress(address): ClientAddress,
    headers: HeaderMap,
    Json(payload): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentRecord>)> {
    let draft = CommentDraft::new(&payload.post_id, &payload.content, &payload.author)?;
    enforce_quota(&state, EndpointClass::Comment, &headers, &address)?;
    let comment = state.content_service.create_comment(draft, &address).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}
