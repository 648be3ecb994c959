use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Publication state of a post.
///
/// `Scheduled` posts ("time capsules") carry a future `publish_at` and are
/// promoted to `Published` by the publication sweep once that instant passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "DRAFT",
            PostStatus::Scheduled => "SCHEDULED",
            PostStatus::Published => "PUBLISHED",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(PostStatus::Draft),
            "SCHEDULED" => Ok(PostStatus::Scheduled),
            "PUBLISHED" => Ok(PostStatus::Published),
            other => Err(DomainError::Validation(format!(
                "unknown post status: {other}"
            ))),
        }
    }
}

/// Post entity - a blog post with its lifecycle and engagement state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    /// Username snapshot taken at creation, kept for display.
    pub author_username: String,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    /// Present and future for `Scheduled`, present and past for `Published`,
    /// absent for `Draft`.
    pub publish_at: Option<DateTime<Utc>>,
    pub is_private: bool,
    pub liked_by: HashSet<Uuid>,
    pub likes_count: i32,
    pub comments_count: i32,
    /// Optimistic-concurrency token, bumped on every guarded write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post as a draft with empty engagement state.
    /// Status and publish_at are decided by the lifecycle rule afterwards.
    pub fn new(author_id: Uuid, author_username: String, title: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            author_username,
            title,
            content,
            status: PostStatus::Draft,
            publish_at: None,
            is_private: false,
            liked_by: HashSet::new(),
            likes_count: 0,
            comments_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_post_starts_with_empty_engagement_state() {
        let post = Post::new(
            Uuid::new_v4(),
            "alice".to_string(),
            "Title".to_string(),
            "Body".to_string(),
        );

        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.publish_at, None);
        assert_eq!(post.likes_count, 0);
        assert_eq!(post.comments_count, 0);
        assert!(post.liked_by.is_empty());
        assert_eq!(post.version, 0);
    }

    #[test]
    fn status_round_trips_through_string_form() {
        for status in [
            PostStatus::Draft,
            PostStatus::Scheduled,
            PostStatus::Published,
        ] {
            assert_eq!(status.as_str().parse::<PostStatus>().unwrap(), status);
        }
        assert!("published".parse::<PostStatus>().is_err());
    }
}
