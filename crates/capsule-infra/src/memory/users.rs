use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use capsule_core::domain::User;
use capsule_core::error::RepoError;
use capsule_core::ports::{BaseRepository, UserRepository};

/// In-memory user store.
#[derive(Default)]
pub struct InMemoryUserRepository {
    rows: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, mut entity: User) -> Result<User, RepoError> {
        entity.updated_at = Utc::now();
        let mut rows = self.rows.write().await;
        let taken = rows.values().any(|u| {
            u.id != entity.id && (u.username == entity.username || u.email == entity.email)
        });
        if taken {
            return Err(RepoError::Constraint(
                "username or email already taken".to_string(),
            ));
        }
        rows.insert(entity.id, entity.clone());
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
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows.values().find(|u| u.username == username).cloned())
    }
}
