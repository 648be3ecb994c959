use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250810_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(uuid(Posts::Id).primary_key())
                    .col(uuid(Posts::AuthorId))
                    .col(string(Posts::AuthorUsername))
                    .col(string(Posts::Title))
                    .col(text(Posts::Content))
                    .col(string_len(Posts::Status, 16))
                    .col(timestamp_with_time_zone_null(Posts::PublishAt))
                    .col(boolean(Posts::IsPrivate).default(false))
                    .col(integer(Posts::LikesCount).default(0))
                    .col(integer(Posts::CommentsCount).default(0))
                    .col(json_binary(Posts::LikedBy))
                    .col(big_integer(Posts::Version).default(0))
                    .col(timestamp_with_time_zone(Posts::CreatedAt))
                    .col(timestamp_with_time_zone(Posts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_posts_author")
                            .from(Posts::Table, Posts::AuthorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The sweep query scans by status + publish time.
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_status_publish_at")
                    .table(Posts::Table)
                    .col(Posts::Status)
                    .col(Posts::PublishAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_author_id")
                    .table(Posts::Table)
                    .col(Posts::AuthorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Posts {
    Table,
    Id,
    AuthorId,
    AuthorUsername,
    Title,
    Content,
    Status,
    PublishAt,
    IsPrivate,
    LikesCount,
    CommentsCount,
    LikedBy,
    Version,
    CreatedAt,
    UpdatedAt,
}
