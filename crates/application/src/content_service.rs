//! Complaint post and comment submission.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use rantboard_core::{AppError, AppResult};
use rantboard_domain::{CommentDraft, PostDraft};

use crate::Clock;

/// Stored complaint post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    /// Post identifier.
    pub id: String,
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
    /// Author display name.
    pub author: String,
    /// Normalised tags.
    pub tags: Vec<String>,
    /// Client address that submitted the post. Never returned to clients.
    #[serde(skip_serializing)]
    pub submitted_from: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Stored comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    /// Comment identifier.
    pub id: String,
    /// Post the comment belongs to.
    pub post_id: String,
    /// Comment body.
    pub content: String,
    /// Author display name.
    pub author: String,
    /// Client address that submitted the comment. Never returned to clients.
    #[serde(skip_serializing)]
    pub submitted_from: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Repository port for posts and comments.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Stores a post.
    async fn insert_post(&self, post: PostRecord) -> AppResult<()>;

    /// Returns whether a post with `post_id` exists.
    async fn post_exists(&self, post_id: &str) -> AppResult<bool>;

    /// Stores a comment.
    async fn insert_comment(&self, comment: CommentRecord) -> AppResult<()>;
}

/// Application service for content submission.
#[derive(Clone)]
pub struct ContentService {
    repository: Arc<dyn ContentRepository>,
    clock: Arc<dyn Clock>,
}

impl ContentService {
    /// Creates a new content service.
    #[must_use]
    pub fn new(repository: Arc<dyn ContentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Stores a validated post draft.
    pub async fn create_post(&self, draft: PostDraft, submitted_from: &str) -> AppResult<PostRecord> {
        let post = PostRecord {
            id: Uuid::new_v4().to_string(),
            title: draft.title().to_owned(),
            content: draft.content().to_owned(),
            author: draft.author().to_owned(),
            tags: draft.tags().to_vec(),
            submitted_from: submitted_from.to_owned(),
            created_at: self.clock.now(),
        };

        self.repository.insert_post(post.clone()).await?;
        info!(post_id = %post.id, "post created");

        Ok(post)
    }

    /// Stores a validated comment draft. Fails with `NotFound` when the post
    /// does not exist.
    pub async fn create_comment(
        &self,
        draft: CommentDraft,
        submitted_from: &str,
    ) -> AppResult<CommentRecord> {
        if !self.repository.post_exists(draft.post_id()).await? {
            return Err(AppError::NotFound(format!(
                "post '{}' does not exist",
                draft.post_id()
            )));
        }

        let comment = CommentRecord {
            id: Uuid::new_v4().to_string(),
            post_id: draft.post_id().to_owned(),
            content: draft.content().to_owned(),
            author: draft.author().to_owned(),
            submitted_from: submitted_from.to_owned(),
            created_at: self.clock.now(),
        };

        self.repository.insert_comment(comment.clone()).await?;
        info!(comment_id = %comment.id, post_id = %comment.post_id, "comment created");

        Ok(comment)
    }
}
