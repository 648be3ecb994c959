//! Comment handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use capsule_shared::dto::CommentRequest;

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/posts/{id}/comments
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .service
        .add_comment(
            path.into_inner(),
            identity.user_id,
            &identity.username,
            body.into_inner().content,
        )
        .await?;

    Ok(HttpResponse::Created().json(comment))
}

/// GET /api/posts/{id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let comments = state
        .service
        .comments_for_post(path.into_inner(), identity.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(comments))
}

/// DELETE /api/comments/{id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .service
        .delete_comment(path.into_inner(), identity.user_id)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
