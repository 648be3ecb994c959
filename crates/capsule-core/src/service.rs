//! Application service - orchestrates the lifecycle engine, the visibility
//! resolver, the engagement ledger and the publication sweep over the
//! repository ports.
//!
//! Counter mutations use optimistic concurrency: load, mutate, then a
//! compare-and-swap write via [`PostRepository::update_guarded`], retried on
//! conflict. Set membership and its counter always change inside the same
//! guarded write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Comment, Post, PostStatus};
use crate::error::{DomainError, RepoError};
use crate::lifecycle;
use crate::ports::{BaseRepository, CommentRepository, Page, PageRequest, PostRepository};
use crate::visibility::{self, Access};

/// Retry budget for guarded writes. A failed CAS implies another writer
/// succeeded, so N contending writers need at most N-1 retries each.
const GUARDED_WRITE_RETRIES: usize = 16;

/// Fields accepted when creating a post.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    pub is_private: bool,
    pub status: Option<PostStatus>,
    pub publish_at: Option<DateTime<Utc>>,
}

/// Partial update; `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_private: Option<bool>,
    pub status: Option<PostStatus>,
    pub publish_at: Option<DateTime<Utc>>,
}

/// Outcome of one publication sweep.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepReport {
    pub due: usize,
    pub published: usize,
    pub failed: usize,
}

/// Outcome of one counter reconciliation pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub repaired: usize,
    pub failed: usize,
}

/// Per-status post counts for an author's dashboard.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AuthorStats {
    pub drafts: u64,
    pub scheduled: u64,
    pub published: u64,
}

/// The post lifecycle and engagement service.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, comments: Arc<dyn CommentRepository>) -> Self {
        Self { posts, comments }
    }

    /// Create a post for `author_id`. Status and publish time follow the
    /// lifecycle rule: absent both, the post is published immediately.
    pub async fn create_post(
        &self,
        author_id: Uuid,
        author_username: &str,
        input: PostInput,
    ) -> Result<Post, DomainError> {
        if input.title.trim().is_empty() {
            return Err(DomainError::Validation("title must not be empty".into()));
        }
        if input.content.trim().is_empty() {
            return Err(DomainError::Validation("content must not be empty".into()));
        }

        let transition = lifecycle::on_create(input.status, input.publish_at, Utc::now())?;

        let mut post = Post::new(
            author_id,
            author_username.to_string(),
            input.title,
            input.content,
        );
        post.is_private = input.is_private;
        post.status = transition.status;
        post.publish_at = transition.publish_at;

        let post = self.posts.save(post).await?;
        tracing::info!(post_id = %post.id, status = %post.status, "Post created");
        Ok(post)
    }

    /// Update a post. Author-only; absent status and publish time leave the
    /// lifecycle state untouched (partial-update semantics).
    pub async fn update_post(
        &self,
        id: Uuid,
        caller: Uuid,
        patch: PostPatch,
    ) -> Result<Post, DomainError> {
        let now = Utc::now();
        self.with_post(id, |post| {
            if post.author_id != caller {
                return Err(DomainError::Forbidden(
                    "you do not have permission to update this post".into(),
                ));
            }
            if let Some(title) = &patch.title {
                if title.trim().is_empty() {
                    return Err(DomainError::Validation("title must not be empty".into()));
                }
                post.title = title.clone();
            }
            if let Some(content) = &patch.content {
                if content.trim().is_empty() {
                    return Err(DomainError::Validation("content must not be empty".into()));
                }
                post.content = content.clone();
            }
            if let Some(is_private) = patch.is_private {
                post.is_private = is_private;
            }
            if let Some(transition) = lifecycle::on_update(patch.status, patch.publish_at, now)? {
                post.status = transition.status;
                post.publish_at = transition.publish_at;
            }
            Ok(())
        })
        .await
    }

    /// Delete a post and cascade to all of its comments. Author-only.
    pub async fn delete_post(&self, id: Uuid, caller: Uuid) -> Result<(), DomainError> {
        let Some(post) = self.posts.find_by_id(id).await? else {
            return Err(DomainError::not_found("post", id));
        };
        if post.author_id != caller {
            return Err(DomainError::Forbidden(
                "you do not have permission to delete this post".into(),
            ));
        }

        // Comments first: a crash here leaves a post with fewer comments, a
        // crash after leaves no orphans either way.
        let removed = self.comments.delete_by_post_id(id).await?;
        self.posts.delete(id).await?;
        tracing::info!(post_id = %id, comments_removed = removed, "Post deleted");
        Ok(())
    }

    /// Fetch a post, resolving visibility for `caller` (None = anonymous).
    pub async fn get_post(&self, id: Uuid, caller: Option<Uuid>) -> Result<Post, DomainError> {
        let post = self.posts.find_by_id(id).await?;
        let Some(post) = post else {
            return Err(DomainError::not_found("post", id));
        };
        match visibility::resolve(Some(&post), caller) {
            Access::Visible => Ok(post),
            Access::Forbidden => Err(DomainError::Forbidden(
                "this post is private and not accessible".into(),
            )),
            Access::NotFound => Err(DomainError::not_found("post", id)),
        }
    }

    /// The public feed: non-private posts, published or announced capsules.
    pub async fn list_public(&self, page: PageRequest) -> Result<Page<Post>, DomainError> {
        let statuses = [PostStatus::Published, PostStatus::Scheduled];
        Ok(self.posts.find_public(&statuses, page).await?)
    }

    /// An author's dashboard listing, optionally narrowed by status and/or
    /// privacy.
    pub async fn list_by_author(
        &self,
        author_id: Uuid,
        statuses: Option<Vec<PostStatus>>,
        is_private: Option<bool>,
        page: PageRequest,
    ) -> Result<Page<Post>, DomainError> {
        Ok(self
            .posts
            .find_by_author(author_id, statuses.as_deref(), is_private, page)
            .await?)
    }

    pub async fn author_stats(&self, author_id: Uuid) -> Result<AuthorStats, DomainError> {
        Ok(AuthorStats {
            drafts: self
                .posts
                .count_by_author_and_status(author_id, PostStatus::Draft)
                .await?,
            scheduled: self
                .posts
                .count_by_author_and_status(author_id, PostStatus::Scheduled)
                .await?,
            published: self
                .posts
                .count_by_author_and_status(author_id, PostStatus::Published)
                .await?,
        })
    }

    /// Toggle `caller`'s like on a post. Membership and counter change in
    /// one guarded write; toggling twice restores the original state.
    pub async fn toggle_like(&self, post_id: Uuid, caller: Uuid) -> Result<Post, DomainError> {
        self.with_post(post_id, |post| {
            // Privacy is re-checked on every retry; the author may flip it
            // between our read and the write.
            if visibility::resolve(Some(post), Some(caller)) != Access::Visible {
                return Err(DomainError::Forbidden(
                    "this post is private and not accessible".into(),
                ));
            }
            if post.liked_by.remove(&caller) {
                post.likes_count -= 1;
            } else {
                post.liked_by.insert(caller);
                post.likes_count += 1;
            }
            Ok(())
        })
        .await
    }

    /// Add a comment and bump the post's comment counter. The insert and the
    /// counter bump are separate writes; a crash in between is repaired by
    /// [`Self::reconcile_counters`].
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        author_username: &str,
        content: String,
    ) -> Result<Comment, DomainError> {
        if content.trim().is_empty() {
            return Err(DomainError::Validation("comment must not be empty".into()));
        }
        // Fail fast on missing or private posts before writing anything.
        self.get_post(post_id, Some(author_id)).await?;

        let comment = Comment::new(post_id, author_id, author_username.to_string(), content);
        let comment = self.comments.save(comment).await?;

        self.with_post(post_id, |post| {
            post.comments_count += 1;
            Ok(())
        })
        .await?;

        tracing::debug!(post_id = %post_id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    /// Comments on a post, newest first, visibility-resolved for `caller`.
    pub async fn comments_for_post(
        &self,
        post_id: Uuid,
        caller: Option<Uuid>,
    ) -> Result<Vec<Comment>, DomainError> {
        self.get_post(post_id, caller).await?;
        Ok(self.comments.find_by_post_id(post_id).await?)
    }

    /// Delete a comment. Only its author may do so. The counter decrement
    /// lands before the row delete; reconciliation restores the count if the
    /// delete is lost.
    pub async fn delete_comment(&self, comment_id: Uuid, caller: Uuid) -> Result<(), DomainError> {
        let Some(comment) = self.comments.find_by_id(comment_id).await? else {
            return Err(DomainError::not_found("comment", comment_id));
        };
        if comment.author_id != caller {
            return Err(DomainError::Forbidden(
                "you do not have permission to delete this comment".into(),
            ));
        }

        self.with_post(comment.post_id, |post| {
            post.comments_count = (post.comments_count - 1).max(0);
            Ok(())
        })
        .await?;

        self.comments.delete(comment_id).await?;
        Ok(())
    }

    /// One publication sweep: promote every scheduled post whose publish
    /// time has elapsed. Shared verbatim by the periodic timer and the
    /// administrative trigger.
    ///
    /// `publish_at` stays at the originally scheduled instant; the sweep
    /// only flips the status. Items fail independently.
    pub async fn publish_due(&self, now: DateTime<Utc>) -> Result<SweepReport, DomainError> {
        let due = self.posts.find_scheduled_due(now).await?;
        let mut report = SweepReport {
            due: due.len(),
            ..Default::default()
        };

        if due.is_empty() {
            tracing::info!("No scheduled posts due for publication");
            return Ok(report);
        }

        tracing::info!(count = due.len(), "Found scheduled post(s) to publish");
        for mut post in due {
            let post_id = post.id;
            post.status = PostStatus::Published;
            match self.posts.update_guarded(post).await {
                Ok(published) => {
                    report.published += 1;
                    tracing::info!(post_id = %published.id, title = %published.title, "Published scheduled post");
                }
                Err(e) => {
                    // One bad row must not block the rest of the batch; the
                    // next sweep picks it up again.
                    report.failed += 1;
                    tracing::warn!(post_id = %post_id, error = %e, "Failed to publish scheduled post");
                }
            }
        }
        Ok(report)
    }

    /// Repair pass for the denormalized engagement counters: recompute
    /// `likes_count` from the membership set and `comments_count` from the
    /// live comment rows.
    pub async fn reconcile_counters(&self) -> Result<ReconcileReport, DomainError> {
        let mut report = ReconcileReport::default();
        let mut page = PageRequest::new(0, 100);

        loop {
            let batch = self.posts.list_page(page).await?;
            let fetched = batch.items.len();

            for post in batch.items {
                report.scanned += 1;
                let live_comments = match self.comments.count_by_post_id(post.id).await {
                    Ok(n) => n as i32,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(post_id = %post.id, error = %e, "Skipping post during reconciliation");
                        continue;
                    }
                };
                let live_likes = post.liked_by.len() as i32;
                if post.likes_count == live_likes && post.comments_count == live_comments {
                    continue;
                }

                tracing::warn!(
                    post_id = %post.id,
                    stored_likes = post.likes_count,
                    live_likes,
                    stored_comments = post.comments_count,
                    live_comments,
                    "Repairing inconsistent engagement counters"
                );
                let outcome = self
                    .with_post(post.id, |p| {
                        p.likes_count = p.liked_by.len() as i32;
                        // The comment count was read outside this guarded
                        // write; a stale value is corrected on the next pass.
                        p.comments_count = live_comments;
                        Ok(())
                    })
                    .await;
                match outcome {
                    Ok(_) => report.repaired += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(post_id = %post.id, error = %e, "Failed to repair counters");
                    }
                }
            }

            if fetched < page.per_page as usize {
                break;
            }
            page.page += 1;
        }
        Ok(report)
    }

    /// Load, mutate, guarded-write loop with bounded retry on CAS conflict.
    async fn with_post<F>(&self, id: Uuid, mutate: F) -> Result<Post, DomainError>
    where
        F: Fn(&mut Post) -> Result<(), DomainError>,
    {
        for _ in 0..GUARDED_WRITE_RETRIES {
            let Some(mut post) = self.posts.find_by_id(id).await? else {
                return Err(DomainError::not_found("post", id));
            };
            mutate(&mut post)?;
            match self.posts.update_guarded(post).await {
                Ok(post) => return Ok(post),
                Err(RepoError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(DomainError::Conflict(format!(
            "post {id} kept changing under concurrent writes"
        )))
    }
}
