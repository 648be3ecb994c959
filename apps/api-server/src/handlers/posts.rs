//! Post handlers: CRUD, feeds, likes and the manual publication trigger.

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use capsule_core::domain::PostStatus;
use capsule_core::ports::PageRequest;
use capsule_core::service::{PostInput, PostPatch};
use capsule_shared::dto::{PageParams, PostRequest};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn parse_status(raw: Option<&str>) -> AppResult<Option<PostStatus>> {
    raw.map(|s| {
        s.parse::<PostStatus>()
            .map_err(|_| AppError::BadRequest(format!("Unknown status: {s}")))
    })
    .transpose()
}

fn parse_publish_at(raw: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| AppError::BadRequest(format!("Invalid publish_at timestamp: {s}")))
    })
    .transpose()
}

/// POST /api/posts
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let input = PostInput {
        title: req.title.unwrap_or_default(),
        content: req.content.unwrap_or_default(),
        is_private: req.is_private.unwrap_or(false),
        status: parse_status(req.status.as_deref())?,
        publish_at: parse_publish_at(req.publish_at.as_deref())?,
    };

    let post = state
        .service
        .create_post(identity.user_id, &identity.username, input)
        .await?;

    Ok(HttpResponse::Created().json(post))
}

/// GET /api/posts/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let post = state
        .service
        .get_post(path.into_inner(), identity.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(post))
}

/// PUT /api/posts/{id}
pub async fn update_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let patch = PostPatch {
        title: req.title,
        content: req.content,
        is_private: req.is_private,
        status: parse_status(req.status.as_deref())?,
        publish_at: parse_publish_at(req.publish_at.as_deref())?,
    };

    let post = state
        .service
        .update_post(path.into_inner(), identity.user_id, patch)
        .await?;

    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .service
        .delete_post(path.into_inner(), identity.user_id)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/posts/public
pub async fn list_public(
    state: web::Data<AppState>,
    query: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let page = state
        .service
        .list_public(PageRequest::new(query.page, query.per_page))
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

/// Query parameters for the author dashboard listing.
#[derive(Debug, Deserialize)]
pub struct MyPostsQuery {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Narrow to one status: `DRAFT`, `SCHEDULED` or `PUBLISHED`.
    pub status: Option<String>,
    /// Narrow by privacy: `public` or `private`.
    pub visibility: Option<String>,
}

fn default_per_page() -> u64 {
    10
}

/// GET /api/posts/me
pub async fn my_posts(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<MyPostsQuery>,
) -> AppResult<HttpResponse> {
    let statuses = parse_status(query.status.as_deref())?.map(|status| vec![status]);
    let is_private = match query.visibility.as_deref() {
        None => None,
        Some("public") => Some(false),
        Some("private") => Some(true),
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Unknown visibility filter: {other}"
            )));
        }
    };

    let page = state
        .service
        .list_by_author(
            identity.user_id,
            statuses,
            is_private,
            PageRequest::new(query.page, query.per_page),
        )
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/posts/me/stats
pub async fn my_stats(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let stats = state.service.author_stats(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// POST /api/posts/{id}/like
pub async fn toggle_like(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = state
        .service
        .toggle_like(path.into_inner(), identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(post))
}

/// POST /api/posts/trigger-publish
///
/// Administrative trigger; runs the same sweep the periodic timer does.
pub async fn trigger_publish(
    state: web::Data<AppState>,
    _identity: Identity,
) -> AppResult<HttpResponse> {
    let report = state.service.publish_due(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(report))
}
