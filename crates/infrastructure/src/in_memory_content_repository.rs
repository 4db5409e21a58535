use std::collections::HashMap;

use async_trait::async_trait;
use rantboard_application::{CommentRecord, ContentRepository, PostRecord};
use rantboard_core::AppResult;
use tokio::sync::RwLock;

/// In-memory post and comment store.
#[derive(Default)]
pub struct InMemoryContentRepository {
    posts: RwLock<HashMap<String, PostRecord>>,
    comments: RwLock<Vec<CommentRecord>>,
}

impl InMemoryContentRepository {
    /// Creates an empty content store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the comments stored for `post_id`, oldest first.
    pub async fn comments_for(&self, post_id: &str) -> Vec<CommentRecord> {
        self.comments
            .read()
            .await
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn insert_post(&self, post: PostRecord) -> AppResult<()> {
        self.posts.write().await.insert(post.id.clone(), post);
        Ok(())
    }

    async fn post_exists(&self, post_id: &str) -> AppResult<bool> {
        Ok(self.posts.read().await.contains_key(post_id))
    }

    async fn insert_comment(&self, comment: CommentRecord) -> AppResult<()> {
        self.comments.write().await.push(comment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rantboard_application::{CommentRecord, ContentRepository, PostRecord};
    use rantboard_core::AppResult;

    use super::InMemoryContentRepository;

    #[tokio::test]
    async fn stores_posts_and_their_comments() -> AppResult<()> {
        let repository = InMemoryContentRepository::new();
        repository
            .insert_post(PostRecord {
                id: "p-1".to_owned(),
                title: "Title".to_owned(),
                content: "Body".to_owned(),
                author: "Pat".to_owned(),
                tags: Vec::new(),
                submitted_from: "10.0.0.1".to_owned(),
                created_at: Utc::now(),
            })
            .await?;

        assert!(repository.post_exists("p-1").await?);
        assert!(!repository.post_exists("p-2").await?);

        for (id, post_id) in [("c-1", "p-1"), ("c-2", "p-9"), ("c-3", "p-1")] {
            repository
                .insert_comment(CommentRecord {
                    id: id.to_owned(),
                    post_id: post_id.to_owned(),
                    content: "text".to_owned(),
                    author: "Lee".to_owned(),
                    submitted_from: "10.0.0.2".to_owned(),
                    created_at: Utc::now(),
                })
                .await?;
        }

        let ids: Vec<String> = repository
            .comments_for("p-1")
            .await
            .into_iter()
            .map(|comment| comment.id)
            .collect();
        assert_eq!(ids, vec!["c-1".to_owned(), "c-3".to_owned()]);
        Ok(())
    }
}
