//! Application state - shared across all handlers.

use std::sync::Arc;

use capsule_core::ports::{CommentRepository, PostRepository, UserRepository};
use capsule_core::service::PostService;
use capsule_infra::DatabaseConfig;
use capsule_infra::{InMemoryCommentRepository, InMemoryPostRepository, InMemoryUserRepository};

#[cfg(feature = "postgres")]
use capsule_infra::{
    DatabaseConnections, PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository,
};

type Repositories = (
    Arc<dyn PostRepository>,
    Arc<dyn CommentRepository>,
    Arc<dyn UserRepository>,
);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: PostService,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(db_config: Option<&DatabaseConfig>) -> Self {
        #[cfg(feature = "postgres")]
        let (posts, comments, users): Repositories = {
            if let Some(config) = db_config {
                match DatabaseConnections::init(config).await {
                    Ok(connections) => {
                        let db = connections.main;
                        (
                            Arc::new(PostgresPostRepository::new(db.clone())),
                            Arc::new(PostgresCommentRepository::new(db.clone())),
                            Arc::new(PostgresUserRepository::new(db)),
                        )
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                        Self::in_memory()
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                Self::in_memory()
            }
        };

        #[cfg(not(feature = "postgres"))]
        let (posts, comments, users): Repositories = {
            let _ = db_config;
            tracing::info!("Running without postgres feature - using in-memory repositories");
            Self::in_memory()
        };

        tracing::info!("Application state initialized");

        Self {
            service: PostService::new(posts, comments),
            users,
        }
    }

    fn in_memory() -> Repositories {
        (
            Arc::new(InMemoryPostRepository::new()),
            Arc::new(InMemoryCommentRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
        )
    }
}
