//! Post entity for SeaORM.

use std::collections::HashSet;

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use capsule_core::domain::{Post, PostStatus};
use capsule_core::error::RepoError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub status: String,
    pub publish_at: Option<DateTimeWithTimeZone>,
    pub is_private: bool,
    pub likes_count: i32,
    pub comments_count: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub liked_by: Json,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to Domain Post. Fails on corrupt rows
/// rather than coercing them to a default state.
impl TryFrom<Model> for Post {
    type Error = RepoError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status: PostStatus = model
            .status
            .parse()
            .map_err(|_| RepoError::Query(format!("corrupt status column: {}", model.status)))?;
        let liked_by: HashSet<Uuid> = serde_json::from_value(model.liked_by)
            .map_err(|e| RepoError::Query(format!("corrupt liked_by column: {e}")))?;

        Ok(Self {
            id: model.id,
            author_id: model.author_id,
            author_username: model.author_username,
            title: model.title,
            content: model.content,
            status,
            publish_at: model.publish_at.map(Into::into),
            is_private: model.is_private,
            liked_by,
            likes_count: model.likes_count,
            comments_count: model.comments_count,
            version: model.version,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }
}

/// Conversion from Domain Post to SeaORM ActiveModel.
impl From<Post> for ActiveModel {
    fn from(post: Post) -> Self {
        let liked_by = serde_json::to_value(&post.liked_by).unwrap_or(Json::Array(Vec::new()));
        Self {
            id: Set(post.id),
            author_id: Set(post.author_id),
            author_username: Set(post.author_username),
            title: Set(post.title),
            content: Set(post.content),
            status: Set(post.status.as_str().to_string()),
            publish_at: Set(post.publish_at.map(Into::into)),
            is_private: Set(post.is_private),
            likes_count: Set(post.likes_count),
            comments_count: Set(post.comments_count),
            liked_by: Set(liked_by),
            version: Set(post.version),
            created_at: Set(post.created_at.into()),
            updated_at: Set(post.updated_at.into()),
        }
    }
}
