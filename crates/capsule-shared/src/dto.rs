//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request to login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response containing a user's public information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Create/update payload for a post.
///
/// `status` is one of `DRAFT | SCHEDULED | PUBLISHED`; `publish_at` is an
/// RFC 3339 timestamp. Both are optional: absent both, creation publishes
/// immediately while an update leaves the lifecycle state untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub publish_at: Option<String>,
    pub is_private: Option<bool>,
}

/// Payload for adding a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// Pagination query parameters, zero-based.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_per_page() -> u64 {
    10
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: default_per_page(),
        }
    }
}
