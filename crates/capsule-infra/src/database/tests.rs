#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use capsule_core::domain::{Post, PostStatus};
    use capsule_core::error::RepoError;
    use capsule_core::ports::{BaseRepository, PostRepository};

    use crate::database::entity::post;
    use crate::database::postgres_repo::PostgresPostRepository;

    fn model(status: &str) -> post::Model {
        let now = Utc::now();
        post::Model {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_username: "alice".to_owned(),
            title: "Test Post".to_owned(),
            content: "Content".to_owned(),
            status: status.to_owned(),
            publish_at: Some((now - Duration::minutes(5)).into()),
            is_private: false,
            likes_count: 0,
            comments_count: 0,
            liked_by: serde_json::json!([]),
            version: 0,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn find_post_by_id_maps_to_domain() {
        let row = model("PUBLISHED");
        let post_id = row.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![row]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let post: Option<Post> = repo.find_by_id(post_id).await.unwrap();

        let post = post.unwrap();
        assert_eq!(post.id, post_id);
        assert_eq!(post.status, PostStatus::Published);
        assert_eq!(post.liked_by, HashSet::new());
    }

    #[tokio::test]
    async fn corrupt_status_column_is_a_query_error() {
        let row = model("UNKNOWN_STATE");
        let post_id = row.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![row]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let err = repo.find_by_id(post_id).await.unwrap_err();

        assert!(matches!(err, RepoError::Query(_)));
    }

    #[tokio::test]
    async fn scheduled_due_query_maps_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model("SCHEDULED")]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let due = repo.find_scheduled_due(Utc::now()).await.unwrap();

        assert_eq!(due.len(), 1);
        assert_eq!(due[0].status, PostStatus::Scheduled);
    }

    #[tokio::test]
    async fn guarded_update_of_a_moved_version_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let post = Post::try_from(model("PUBLISHED")).unwrap();

        let err = repo.update_guarded(post).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict));
    }
}
