//! In-memory repository implementations - used as fallback when the
//! database is not configured, and as the test double for the core service.
//!
//! Note: data is lost on process restart.

mod comments;
mod posts;
mod users;

pub use comments::InMemoryCommentRepository;
pub use posts::InMemoryPostRepository;
pub use users::InMemoryUserRepository;
