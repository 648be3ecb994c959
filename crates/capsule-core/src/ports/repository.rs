use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Comment, Post, PostStatus, User};
use crate::error::RepoError;

/// A zero-based page request. `per_page` is clamped to 1..=100.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page,
            per_page: per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page * self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 10)
    }
}

/// One page of results plus the total row count behind it.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        self.total_items.div_ceil(self.per_page.max(1))
    }
}

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update), returning the stored row.
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Post repository - the durable-store query contract the core requires.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Compare-and-swap write: persists `post` only if the stored row still
    /// carries `post.version`, bumping the version on success. A lost race
    /// surfaces as [`RepoError::Conflict`] and the caller retries against a
    /// fresh read.
    async fn update_guarded(&self, post: Post) -> Result<Post, RepoError>;

    /// All posts with status `Scheduled` whose `publish_at` has elapsed.
    /// The core sweep query for the time-capsule feature.
    async fn find_scheduled_due(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError>;

    /// Non-private posts in any of `statuses`, newest publish time first.
    async fn find_public(
        &self,
        statuses: &[PostStatus],
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError>;

    /// Posts by one author, optionally narrowed by status and/or privacy,
    /// newest first.
    async fn find_by_author(
        &self,
        author_id: Uuid,
        statuses: Option<&[PostStatus]>,
        is_private: Option<bool>,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError>;

    async fn count_by_author_and_status(
        &self,
        author_id: Uuid,
        status: PostStatus,
    ) -> Result<u64, RepoError>;

    /// Unfiltered walk over all posts, oldest first. Used by the counter
    /// reconciliation pass.
    async fn list_page(&self, page: PageRequest) -> Result<Page<Post>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Comments on a post, newest first.
    async fn find_by_post_id(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    /// Cascade helper: remove every comment referencing `post_id`,
    /// returning how many were deleted.
    async fn delete_by_post_id(&self, post_id: Uuid) -> Result<u64, RepoError>;

    async fn count_by_post_id(&self, post_id: Uuid) -> Result<u64, RepoError>;
}

/// User repository with domain-specific lookups.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_per_page() {
        assert_eq!(PageRequest::new(0, 0).per_page, 1);
        assert_eq!(PageRequest::new(0, 500).per_page, 100);
        assert_eq!(PageRequest::new(3, 20).offset(), 60);
    }

    #[test]
    fn page_reports_total_pages() {
        let page: Page<u32> = Page {
            items: vec![],
            page: 0,
            per_page: 10,
            total_items: 21,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
