use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use capsule_core::domain::{Post, PostStatus};
use capsule_core::error::RepoError;
use capsule_core::ports::{BaseRepository, Page, PageRequest, PostRepository};

/// In-memory post store using a HashMap behind an async RwLock.
///
/// The guarded write checks the stored version under the write lock, which
/// gives the same lost-update protection the SQL compare-and-swap does.
#[derive(Default)]
pub struct InMemoryPostRepository {
    rows: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate(posts: Vec<Post>, page: PageRequest) -> Page<Post> {
    let total_items = posts.len() as u64;
    let items = posts
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.per_page as usize)
        .collect();

    Page {
        items,
        page: page.page,
        per_page: page.per_page,
        total_items,
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, mut entity: Post) -> Result<Post, RepoError> {
        entity.updated_at = Utc::now();
        self.rows.write().await.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        match self.rows.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn update_guarded(&self, mut post: Post) -> Result<Post, RepoError> {
        let mut rows = self.rows.write().await;
        let stored_version = match rows.get(&post.id) {
            Some(stored) => stored.version,
            // Row vanished between read and write: same signal as a moved
            // version, the caller re-reads and sees the absence.
            None => return Err(RepoError::Conflict),
        };
        if stored_version != post.version {
            return Err(RepoError::Conflict);
        }

        post.version += 1;
        post.updated_at = Utc::now();
        rows.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_scheduled_due(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|p| p.status == PostStatus::Scheduled && p.publish_at.is_some_and(|t| t <= now))
            .cloned()
            .collect())
    }

    async fn find_public(
        &self,
        statuses: &[PostStatus],
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let rows = self.rows.read().await;
        let mut posts: Vec<Post> = rows
            .values()
            .filter(|p| !p.is_private && statuses.contains(&p.status))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.publish_at.cmp(&a.publish_at));

        Ok(paginate(posts, page))
    }

    async fn find_by_author(
        &self,
        author_id: Uuid,
        statuses: Option<&[PostStatus]>,
        is_private: Option<bool>,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let rows = self.rows.read().await;
        let mut posts: Vec<Post> = rows
            .values()
            .filter(|p| p.author_id == author_id)
            .filter(|p| statuses.is_none_or(|s| s.contains(&p.status)))
            .filter(|p| is_private.is_none_or(|private| p.is_private == private))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(paginate(posts, page))
    }

    async fn count_by_author_and_status(
        &self,
        author_id: Uuid,
        status: PostStatus,
    ) -> Result<u64, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|p| p.author_id == author_id && p.status == status)
            .count() as u64)
    }

    async fn list_page(&self, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let rows = self.rows.read().await;
        let mut posts: Vec<Post> = rows.values().cloned().collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(paginate(posts, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Post {
        Post::new(
            Uuid::new_v4(),
            "alice".to_string(),
            "Title".to_string(),
            "Body".to_string(),
        )
    }

    #[tokio::test]
    async fn guarded_update_bumps_version() {
        let repo = InMemoryPostRepository::new();
        let saved = repo.save(post()).await.unwrap();

        let updated = repo.update_guarded(saved.clone()).await.unwrap();

        assert_eq!(updated.version, saved.version + 1);
    }

    #[tokio::test]
    async fn guarded_update_with_stale_version_conflicts() {
        let repo = InMemoryPostRepository::new();
        let saved = repo.save(post()).await.unwrap();

        // First writer wins, second still holds the old version.
        repo.update_guarded(saved.clone()).await.unwrap();
        let err = repo.update_guarded(saved).await.unwrap_err();

        assert!(matches!(err, RepoError::Conflict));
    }

    #[tokio::test]
    async fn guarded_update_of_missing_row_conflicts() {
        let repo = InMemoryPostRepository::new();
        let err = repo.update_guarded(post()).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict));
    }
}
