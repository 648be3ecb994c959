//! # Capsule Infrastructure
//!
//! Concrete implementations of the ports defined in `capsule-core`.
//! This crate contains the PostgreSQL repositories, their in-memory
//! fallbacks, and the authentication services.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - In-memory repositories only
//! - `postgres` - PostgreSQL database support via SeaORM

pub mod auth;
pub mod database;
pub mod memory;

pub use auth::{Argon2PasswordService, JwtTokenService};
pub use database::DatabaseConfig;
pub use memory::{InMemoryCommentRepository, InMemoryPostRepository, InMemoryUserRepository};

#[cfg(feature = "postgres")]
pub use database::{
    DatabaseConnections, PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository,
};
