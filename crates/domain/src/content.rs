//! Complaint post and comment drafts.

use std::collections::HashSet;

use rantboard_core::{AppError, AppResult, NonEmptyString};

/// Longest accepted post title.
pub const POST_TITLE_MAX_LENGTH: usize = 200;

/// Longest accepted post body.
pub const POST_CONTENT_MAX_LENGTH: usize = 5000;

/// Most tags a post may carry.
pub const POST_MAX_TAGS: usize = 10;

/// Longest accepted comment body.
pub const COMMENT_CONTENT_MAX_LENGTH: usize = 1000;

/// Longest accepted author display name.
pub const COMMENT_AUTHOR_MAX_LENGTH: usize = 100;

/// Validated input for a new complaint post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    title: NonEmptyString,
    content: NonEmptyString,
    author: NonEmptyString,
    tags: Vec<String>,
}

impl PostDraft {
    /// Validates and trims post fields.
    pub fn new(
        title: &str,
        content: &str,
        author: &str,
        tags: Vec<String>,
    ) -> AppResult<Self> {
        let tags: Vec<String> = tags
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();

        if tags.len() > POST_MAX_TAGS {
            return Err(AppError::Validation(format!(
                "a post may carry at most {POST_MAX_TAGS} tags"
            )));
        }

        Ok(Self {
            title: bounded("title", title, POST_TITLE_MAX_LENGTH)?,
            content: bounded("content", content, POST_CONTENT_MAX_LENGTH)?,
            author: bounded("author", author, COMMENT_AUTHOR_MAX_LENGTH)?,
            tags,
        })
    }

    /// Post title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Post body.
    #[must_use]
    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    /// Author display name.
    #[must_use]
    pub fn author(&self) -> &str {
        self.author.as_str()
    }

    /// Normalised lowercase tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Validated input for a new comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    post_id: NonEmptyString,
    content: NonEmptyString,
    author: NonEmptyString,
}

impl CommentDraft {
    /// Validates and trims comment fields.
    pub fn new(post_id: &str, content: &str, author: &str) -> AppResult<Self> {
        Ok(Self {
            post_id: NonEmptyString::new(post_id.trim())
                .map_err(|_| AppError::Validation("post id is required".to_owned()))?,
            content: bounded("content", content, COMMENT_CONTENT_MAX_LENGTH)?,
            author: bounded("author", author, COMMENT_AUTHOR_MAX_LENGTH)?,
        })
    }

    /// Post the comment belongs to.
    #[must_use]
    pub fn post_id(&self) -> &str {
        self.post_id.as_str()
    }

    /// Comment body.
    #[must_use]
    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    /// Author display name.
    #[must_use]
    pub fn author(&self) -> &str {
        self.author.as_str()
    }
}

fn bounded(field: &str, value: &str, max_length: usize) -> AppResult<NonEmptyString> {
    let invalid = || {
        AppError::Validation(format!(
            "{field} must be between 1 and {max_length} characters"
        ))
    };

    let trimmed = value.trim();
    if trimmed.chars().count() > max_length {
        return Err(invalid());
    }

    NonEmptyString::new(strip_markup(trimmed).trim()).map_err(|_| invalid())
}

/// Removes every HTML tag, dropping `script` and `style` bodies entirely.
fn strip_markup(value: &str) -> String {
    ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(value)
        .to_string()
}
