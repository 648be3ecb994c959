//! End-to-end tests for the post lifecycle, visibility, engagement and
//! sweep behavior, running the core service against the in-memory
//! repositories.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use capsule_core::domain::{Post, PostStatus};
use capsule_core::error::{DomainError, RepoError};
use capsule_core::ports::{BaseRepository, CommentRepository, Page, PageRequest, PostRepository};
use capsule_core::service::{PostInput, PostPatch, PostService};
use capsule_infra::{InMemoryCommentRepository, InMemoryPostRepository};

fn setup() -> (
    PostService,
    Arc<InMemoryPostRepository>,
    Arc<InMemoryCommentRepository>,
) {
    let posts = Arc::new(InMemoryPostRepository::new());
    let comments = Arc::new(InMemoryCommentRepository::new());
    let service = PostService::new(posts.clone(), comments.clone());
    (service, posts, comments)
}

fn author() -> Uuid {
    Uuid::new_v4()
}

fn input(title: &str) -> PostInput {
    PostInput {
        title: title.to_string(),
        content: "body".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_without_status_or_time_publishes_immediately() {
    let (service, _, _) = setup();
    let before = Utc::now();

    let post = service
        .create_post(author(), "alice", input("hello"))
        .await
        .unwrap();

    assert_eq!(post.status, PostStatus::Published);
    let publish_at = post.publish_at.unwrap();
    assert!(publish_at >= before && publish_at <= Utc::now());
}

#[tokio::test]
async fn capsule_is_promoted_by_a_later_sweep_with_publish_time_intact() {
    let (service, _, _) = setup();
    let now = Utc::now();
    let scheduled_for = now + Duration::hours(1);

    let post = service
        .create_post(
            author(),
            "alice",
            PostInput {
                publish_at: Some(scheduled_for),
                ..input("capsule")
            },
        )
        .await
        .unwrap();
    assert_eq!(post.status, PostStatus::Scheduled);

    let report = service.publish_due(now + Duration::hours(2)).await.unwrap();
    assert_eq!(report.due, 1);
    assert_eq!(report.published, 1);
    assert_eq!(report.failed, 0);

    let post = service.get_post(post.id, None).await.unwrap();
    assert_eq!(post.status, PostStatus::Published);
    // The sweep flips status only; the original intent is the record.
    assert_eq!(post.publish_at, Some(scheduled_for));
}

#[tokio::test]
async fn publish_then_reschedule_then_sweep_scenario() {
    let (service, _, _) = setup();
    let user = author();
    let now = Utc::now();

    // No status, no publish time: live immediately.
    let post = service.create_post(user, "alice", input("post")).await.unwrap();
    assert_eq!(post.status, PostStatus::Published);

    // Author turns it into a capsule opening in ten minutes.
    let rescheduled_for = now + Duration::minutes(10);
    let post = service
        .update_post(
            post.id,
            user,
            PostPatch {
                status: Some(PostStatus::Scheduled),
                publish_at: Some(rescheduled_for),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(post.status, PostStatus::Scheduled);

    // Not yet due: nothing to do.
    let report = service.publish_due(now + Duration::minutes(5)).await.unwrap();
    assert_eq!(report.due, 0);
    let post = service.get_post(post.id, Some(user)).await.unwrap();
    assert_eq!(post.status, PostStatus::Scheduled);

    // Past due: promoted.
    let report = service
        .publish_due(now + Duration::minutes(11))
        .await
        .unwrap();
    assert_eq!(report.published, 1);
    let post = service.get_post(post.id, Some(user)).await.unwrap();
    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.publish_at, Some(rescheduled_for));
}

#[tokio::test]
async fn update_without_lifecycle_fields_leaves_them_untouched() {
    let (service, _, _) = setup();
    let user = author();
    let scheduled_for = Utc::now() + Duration::hours(3);

    let post = service
        .create_post(
            user,
            "alice",
            PostInput {
                publish_at: Some(scheduled_for),
                ..input("capsule")
            },
        )
        .await
        .unwrap();

    let post = service
        .update_post(
            post.id,
            user,
            PostPatch {
                title: Some("renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(post.title, "renamed");
    assert_eq!(post.status, PostStatus::Scheduled);
    assert_eq!(post.publish_at, Some(scheduled_for));
}

#[tokio::test]
async fn scheduling_without_a_time_is_rejected() {
    let (service, _, _) = setup();

    let err = service
        .create_post(
            author(),
            "alice",
            PostInput {
                status: Some(PostStatus::Scheduled),
                ..input("broken capsule")
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::InvalidTransition(_)));
}

#[tokio::test]
async fn only_the_author_may_update_or_delete() {
    let (service, _, _) = setup();
    let owner = author();
    let intruder = author();

    let post = service.create_post(owner, "alice", input("mine")).await.unwrap();

    let err = service
        .update_post(
            post.id,
            intruder,
            PostPatch {
                title: Some("stolen".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let err = service.delete_post(post.id, intruder).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
}

#[tokio::test]
async fn private_posts_are_visible_only_to_their_author() {
    let (service, _, _) = setup();
    let owner = author();
    let stranger = author();

    let post = service
        .create_post(
            owner,
            "alice",
            PostInput {
                is_private: true,
                ..input("secret")
            },
        )
        .await
        .unwrap();

    assert!(service.get_post(post.id, Some(owner)).await.is_ok());
    assert!(matches!(
        service.get_post(post.id, Some(stranger)).await.unwrap_err(),
        DomainError::Forbidden(_)
    ));
    assert!(matches!(
        service.get_post(post.id, None).await.unwrap_err(),
        DomainError::Forbidden(_)
    ));
    assert!(matches!(
        service.get_post(Uuid::new_v4(), Some(owner)).await.unwrap_err(),
        DomainError::NotFound { .. }
    ));
}

#[tokio::test]
async fn toggling_a_like_twice_restores_the_original_state() {
    let (service, _, _) = setup();
    let reader = author();

    let post = service.create_post(author(), "alice", input("likeable")).await.unwrap();

    let liked = service.toggle_like(post.id, reader).await.unwrap();
    assert_eq!(liked.likes_count, 1);
    assert!(liked.liked_by.contains(&reader));
    assert_eq!(liked.likes_count as usize, liked.liked_by.len());

    let unliked = service.toggle_like(post.id, reader).await.unwrap();
    assert_eq!(unliked.likes_count, 0);
    assert!(unliked.liked_by.is_empty());
}

#[tokio::test]
async fn likes_on_a_private_post_are_author_only() {
    let (service, _, _) = setup();
    let owner = author();

    let post = service
        .create_post(
            owner,
            "alice",
            PostInput {
                is_private: true,
                ..input("secret")
            },
        )
        .await
        .unwrap();

    assert!(service.toggle_like(post.id, owner).await.is_ok());
    assert!(matches!(
        service.toggle_like(post.id, author()).await.unwrap_err(),
        DomainError::Forbidden(_)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_likes_from_distinct_users_all_land() {
    let (service, _, _) = setup();
    let post = service.create_post(author(), "alice", input("viral")).await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = service.clone();
            let post_id = post.id;
            tokio::spawn(async move { service.toggle_like(post_id, Uuid::new_v4()).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let post = service.get_post(post.id, None).await.unwrap();
    assert_eq!(post.likes_count, 10);
    assert_eq!(post.liked_by.len(), 10);
}

#[tokio::test]
async fn comment_counts_follow_adds_and_deletes() {
    let (service, _, comments) = setup();
    let owner = author();
    let commenter = author();

    let post = service.create_post(owner, "alice", input("discussed")).await.unwrap();

    let mut last = None;
    for i in 0..3 {
        let comment = service
            .add_comment(post.id, commenter, "bob", format!("comment {i}"))
            .await
            .unwrap();
        last = Some(comment);
    }

    let post_now = service.get_post(post.id, None).await.unwrap();
    assert_eq!(post_now.comments_count, 3);
    assert_eq!(comments.count_by_post_id(post.id).await.unwrap(), 3);

    let last = last.unwrap();
    let err = service.delete_comment(last.id, owner).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    service.delete_comment(last.id, commenter).await.unwrap();
    let post_now = service.get_post(post.id, None).await.unwrap();
    assert_eq!(post_now.comments_count, 2);
    assert_eq!(comments.count_by_post_id(post.id).await.unwrap(), 2);
}

#[tokio::test]
async fn deleting_a_post_cascades_to_its_comments() {
    let (service, _, comments) = setup();
    let owner = author();

    let post = service.create_post(owner, "alice", input("doomed")).await.unwrap();
    for i in 0..3 {
        service
            .add_comment(post.id, author(), "bob", format!("comment {i}"))
            .await
            .unwrap();
    }
    assert_eq!(comments.count_by_post_id(post.id).await.unwrap(), 3);

    service.delete_post(post.id, owner).await.unwrap();

    assert_eq!(comments.count_by_post_id(post.id).await.unwrap(), 0);
    assert!(matches!(
        service.get_post(post.id, Some(owner)).await.unwrap_err(),
        DomainError::NotFound { .. }
    ));
}

#[tokio::test]
async fn author_listings_filter_by_status_and_privacy() {
    let (service, _, _) = setup();
    let user = author();

    service.create_post(user, "alice", input("live")).await.unwrap();
    service
        .create_post(
            user,
            "alice",
            PostInput {
                publish_at: Some(Utc::now() + Duration::hours(1)),
                ..input("capsule")
            },
        )
        .await
        .unwrap();
    service
        .create_post(
            user,
            "alice",
            PostInput {
                is_private: true,
                ..input("diary")
            },
        )
        .await
        .unwrap();

    let all = service
        .list_by_author(user, None, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.total_items, 3);

    let capsules = service
        .list_by_author(
            user,
            Some(vec![PostStatus::Scheduled]),
            None,
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(capsules.total_items, 1);
    assert_eq!(capsules.items[0].title, "capsule");

    let private = service
        .list_by_author(user, None, Some(true), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(private.total_items, 1);
    assert_eq!(private.items[0].title, "diary");

    let stats = service.author_stats(user).await.unwrap();
    assert_eq!(stats.published, 2);
    assert_eq!(stats.scheduled, 1);
    assert_eq!(stats.drafts, 0);
}

#[tokio::test]
async fn public_feed_hides_private_posts_and_announces_capsules() {
    let (service, _, _) = setup();

    service.create_post(author(), "alice", input("live")).await.unwrap();
    service
        .create_post(
            author(),
            "bob",
            PostInput {
                publish_at: Some(Utc::now() + Duration::hours(1)),
                ..input("upcoming")
            },
        )
        .await
        .unwrap();
    service
        .create_post(
            author(),
            "carol",
            PostInput {
                is_private: true,
                ..input("hidden")
            },
        )
        .await
        .unwrap();

    let feed = service.list_public(PageRequest::default()).await.unwrap();
    assert_eq!(feed.total_items, 2);
    assert!(feed.items.iter().all(|p| !p.is_private));
}

#[tokio::test]
async fn reconciliation_repairs_corrupted_counters() {
    let (service, posts, _) = setup();
    let reader_a = author();
    let reader_b = author();

    let post = service.create_post(author(), "alice", input("drifted")).await.unwrap();
    service.toggle_like(post.id, reader_a).await.unwrap();
    service.toggle_like(post.id, reader_b).await.unwrap();
    service
        .add_comment(post.id, reader_a, "bob", "nice".to_string())
        .await
        .unwrap();

    // Simulate a partially applied write: counters drift from the records.
    let mut corrupted = posts.find_by_id(post.id).await.unwrap().unwrap();
    corrupted.likes_count = 99;
    corrupted.comments_count = 0;
    posts.save(corrupted).await.unwrap();

    let report = service.reconcile_counters().await.unwrap();
    assert_eq!(report.repaired, 1);
    assert_eq!(report.failed, 0);

    let repaired = service.get_post(post.id, None).await.unwrap();
    assert_eq!(repaired.likes_count, 2);
    assert_eq!(repaired.comments_count, 1);
}

/// Post repository wrapper that fails guarded writes for one designated
/// post, to prove sweep failures are isolated per item.
struct FailingPostRepository {
    inner: Arc<InMemoryPostRepository>,
    poisoned: Uuid,
}

#[async_trait]
impl BaseRepository<Post, Uuid> for FailingPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        self.inner.save(entity).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl PostRepository for FailingPostRepository {
    async fn update_guarded(&self, post: Post) -> Result<Post, RepoError> {
        if post.id == self.poisoned {
            return Err(RepoError::Query("simulated store failure".to_string()));
        }
        self.inner.update_guarded(post).await
    }

    async fn find_scheduled_due(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
        self.inner.find_scheduled_due(now).await
    }

    async fn find_public(
        &self,
        statuses: &[PostStatus],
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        self.inner.find_public(statuses, page).await
    }

    async fn find_by_author(
        &self,
        author_id: Uuid,
        statuses: Option<&[PostStatus]>,
        is_private: Option<bool>,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        self.inner
            .find_by_author(author_id, statuses, is_private, page)
            .await
    }

    async fn count_by_author_and_status(
        &self,
        author_id: Uuid,
        status: PostStatus,
    ) -> Result<u64, RepoError> {
        self.inner.count_by_author_and_status(author_id, status).await
    }

    async fn list_page(&self, page: PageRequest) -> Result<Page<Post>, RepoError> {
        self.inner.list_page(page).await
    }
}

#[tokio::test]
async fn a_failing_item_does_not_block_the_rest_of_the_sweep() {
    let inner = Arc::new(InMemoryPostRepository::new());
    let comments = Arc::new(InMemoryCommentRepository::new());
    let plain = PostService::new(inner.clone(), comments.clone());

    let now = Utc::now();
    let due_at = now - Duration::minutes(1);
    let healthy = plain
        .create_post(
            author(),
            "alice",
            PostInput {
                status: Some(PostStatus::Scheduled),
                publish_at: Some(due_at),
                ..input("healthy")
            },
        )
        .await
        .unwrap();
    let poisoned = plain
        .create_post(
            author(),
            "alice",
            PostInput {
                status: Some(PostStatus::Scheduled),
                publish_at: Some(due_at),
                ..input("poisoned")
            },
        )
        .await
        .unwrap();

    let failing = Arc::new(FailingPostRepository {
        inner: inner.clone(),
        poisoned: poisoned.id,
    });
    let service = PostService::new(failing, comments);

    let report = service.publish_due(now).await.unwrap();
    assert_eq!(report.due, 2);
    assert_eq!(report.published, 1);
    assert_eq!(report.failed, 1);

    let healthy = inner.find_by_id(healthy.id).await.unwrap().unwrap();
    assert_eq!(healthy.status, PostStatus::Published);
    let poisoned = inner.find_by_id(poisoned.id).await.unwrap().unwrap();
    assert_eq!(poisoned.status, PostStatus::Scheduled);
}
