//! PostgreSQL repository implementations.
//!
//! `save` is a plain upsert for the request path; counter and lifecycle
//! mutations go through `update_guarded`, a compare-and-swap on the post's
//! `version` column, so concurrent read-modify-write sequences surface as
//! [`RepoError::Conflict`] instead of lost updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DbConn, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select,
};
use uuid::Uuid;

use capsule_core::domain::{Comment, Post, PostStatus, User};
use capsule_core::error::RepoError;
use capsule_core::ports::{
    BaseRepository, CommentRepository, Page, PageRequest, PostRepository, UserRepository,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};

fn query_err(e: DbErr) -> RepoError {
    RepoError::Query(e.to_string())
}

/// PostgreSQL post repository.
pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    async fn fetch_page(
        &self,
        select: Select<PostEntity>,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let paginator = select.paginate(&self.db, page.per_page);
        let total_items = paginator.num_items().await.map_err(query_err)?;
        let models = paginator.fetch_page(page.page).await.map_err(query_err)?;
        let items = models
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page: page.page,
            per_page: page.per_page,
            total_items,
        })
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for PostgresPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let model = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(query_err)?;
        model.map(Post::try_from).transpose()
    }

    async fn save(&self, mut entity: Post) -> Result<Post, RepoError> {
        entity.updated_at = Utc::now();
        let exists = PostEntity::find_by_id(entity.id)
            .one(&self.db)
            .await
            .map_err(query_err)?
            .is_some();

        let active: post::ActiveModel = entity.into();
        let model = if exists {
            active.update(&self.db).await
        } else {
            active.insert(&self.db).await
        }
        .map_err(query_err)?;
        model.try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = PostEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn update_guarded(&self, post: Post) -> Result<Post, RepoError> {
        let expected = post.version;
        let mut next = post;
        next.version = expected + 1;
        next.updated_at = Utc::now();

        let mut active: post::ActiveModel = next.clone().into();
        // Never rewrite the key or the store-owned creation stamp.
        active.id = NotSet;
        active.created_at = NotSet;

        let result = PostEntity::update_many()
            .set(active)
            .filter(post::Column::Id.eq(next.id))
            .filter(post::Column::Version.eq(expected))
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        // Zero rows: the version moved under us, or the row is gone.
        if result.rows_affected == 0 {
            return Err(RepoError::Conflict);
        }
        Ok(next)
    }

    async fn find_scheduled_due(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
        let models = PostEntity::find()
            .filter(post::Column::Status.eq(PostStatus::Scheduled.as_str()))
            .filter(post::Column::PublishAt.lte(now))
            .all(&self.db)
            .await
            .map_err(query_err)?;

        models.into_iter().map(Post::try_from).collect()
    }

    async fn find_public(
        &self,
        statuses: &[PostStatus],
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let select = PostEntity::find()
            .filter(post::Column::IsPrivate.eq(false))
            .filter(post::Column::Status.is_in(statuses.iter().map(|s| s.as_str())))
            .order_by_desc(post::Column::PublishAt);

        self.fetch_page(select, page).await
    }

    async fn find_by_author(
        &self,
        author_id: Uuid,
        statuses: Option<&[PostStatus]>,
        is_private: Option<bool>,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let mut select = PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .order_by_desc(post::Column::CreatedAt);

        if let Some(statuses) = statuses {
            select = select.filter(post::Column::Status.is_in(statuses.iter().map(|s| s.as_str())));
        }
        if let Some(is_private) = is_private {
            select = select.filter(post::Column::IsPrivate.eq(is_private));
        }

        self.fetch_page(select, page).await
    }

    async fn count_by_author_and_status(
        &self,
        author_id: Uuid,
        status: PostStatus,
    ) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .filter(post::Column::Status.eq(status.as_str()))
            .count(&self.db)
            .await
            .map_err(query_err)
    }

    async fn list_page(&self, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let select = PostEntity::find().order_by_asc(post::Column::CreatedAt);
        self.fetch_page(select, page).await
    }
}

/// PostgreSQL comment repository.
pub struct PostgresCommentRepository {
    db: DbConn,
}

impl PostgresCommentRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for PostgresCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let model = CommentEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(query_err)?;
        Ok(model.map(Into::into))
    }

    async fn save(&self, mut entity: Comment) -> Result<Comment, RepoError> {
        entity.updated_at = Utc::now();
        let exists = CommentEntity::find_by_id(entity.id)
            .one(&self.db)
            .await
            .map_err(query_err)?
            .is_some();

        let active: comment::ActiveModel = entity.into();
        let model = if exists {
            active.update(&self.db).await
        } else {
            active.insert(&self.db).await
        }
        .map_err(query_err)?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = CommentEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn find_by_post_id(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let models = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn delete_by_post_id(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let result = CommentEntity::delete_many()
            .filter(comment::Column::PostId.eq(post_id))
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.rows_affected)
    }

    async fn count_by_post_id(&self, post_id: Uuid) -> Result<u64, RepoError> {
        CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .count(&self.db)
            .await
            .map_err(query_err)
    }
}

/// PostgreSQL user repository.
pub struct PostgresUserRepository {
    db: DbConn,
}

impl PostgresUserRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for PostgresUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let model = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(query_err)?;
        Ok(model.map(Into::into))
    }

    async fn save(&self, mut entity: User) -> Result<User, RepoError> {
        entity.updated_at = Utc::now();
        let exists = UserEntity::find_by_id(entity.id)
            .one(&self.db)
            .await
            .map_err(query_err)?
            .is_some();

        let active: user::ActiveModel = entity.into();
        let model = if exists {
            active.update(&self.db).await
        } else {
            active.insert(&self.db).await
        }
        .map_err(|e| {
            let err_str = e.to_string();
            if err_str.contains("duplicate") || err_str.contains("unique") {
                RepoError::Constraint("username or email already taken".to_string())
            } else {
                RepoError::Query(err_str)
            }
        })?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = UserEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        // Mask email for logging to avoid PII in logs
        let masked = match email.find('@') {
            Some(at_pos) => {
                let (local, domain) = email.split_at(at_pos);
                if local.len() > 1 {
                    format!("{}***{}", &local[..1], domain)
                } else {
                    format!("***{domain}")
                }
            }
            None => "***".to_string(),
        };
        tracing::debug!(user_email = %masked, "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.map(Into::into))
    }
}
