use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use capsule_core::domain::Comment;
use capsule_core::error::RepoError;
use capsule_core::ports::{BaseRepository, CommentRepository};

/// In-memory comment store.
#[derive(Default)]
pub struct InMemoryCommentRepository {
    rows: RwLock<HashMap<Uuid, Comment>>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, mut entity: Comment) -> Result<Comment, RepoError> {
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
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_post_id(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let rows = self.rows.read().await;
        let mut comments: Vec<Comment> = rows
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn delete_by_post_id(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, c| c.post_id != post_id);
        Ok((before - rows.len()) as u64)
    }

    async fn count_by_post_id(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|c| c.post_id == post_id).count() as u64)
    }
}
