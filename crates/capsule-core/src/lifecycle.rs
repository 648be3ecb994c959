//! Lifecycle engine - the status/publish-time state machine.
//!
//! One transition rule is shared by post creation, author updates, and the
//! publication sweep. There is no terminal state: an author edit may move a
//! post from any status to any other.

use chrono::{DateTime, Utc};

use crate::domain::PostStatus;
use crate::error::DomainError;

/// Outcome of applying the transition rule: the status to persist and the
/// publish instant that goes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: PostStatus,
    pub publish_at: Option<DateTime<Utc>>,
}

/// Resolve the transition for a newly created post.
///
/// With neither a status nor a publish time requested, creation publishes
/// immediately.
pub fn on_create(
    requested_status: Option<PostStatus>,
    requested_publish_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Transition, DomainError> {
    match resolve(requested_status, requested_publish_at, now)? {
        Some(transition) => Ok(transition),
        None => Ok(Transition {
            status: PostStatus::Published,
            publish_at: Some(now),
        }),
    }
}

/// Resolve the transition for an author update.
///
/// Returns `None` when neither a status nor a publish time was supplied:
/// partial-update semantics leave the existing status and publish time
/// untouched.
pub fn on_update(
    requested_status: Option<PostStatus>,
    requested_publish_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<Transition>, DomainError> {
    resolve(requested_status, requested_publish_at, now)
}

fn resolve(
    requested_status: Option<PostStatus>,
    requested_publish_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<Transition>, DomainError> {
    if let Some(status) = requested_status {
        let transition = match status {
            // Drafts carry no publish date.
            PostStatus::Draft => Transition {
                status: PostStatus::Draft,
                publish_at: None,
            },
            // Publishing takes effect immediately, overriding any prior
            // scheduled instant.
            PostStatus::Published => Transition {
                status: PostStatus::Published,
                publish_at: Some(now),
            },
            PostStatus::Scheduled => {
                let publish_at = requested_publish_at.ok_or_else(|| {
                    DomainError::InvalidTransition(
                        "SCHEDULED requires a publish_at timestamp".to_string(),
                    )
                })?;
                Transition {
                    status: PostStatus::Scheduled,
                    publish_at: Some(publish_at),
                }
            }
        };
        return Ok(Some(transition));
    }

    // No explicit status: infer from the requested publish time.
    match requested_publish_at {
        None => Ok(None),
        Some(publish_at) if publish_at > now => Ok(Some(Transition {
            status: PostStatus::Scheduled,
            publish_at: Some(publish_at),
        })),
        // A past or immediate instant short-circuits straight to published;
        // the requested instant is discarded in favor of the commit time.
        Some(_) => Ok(Some(Transition {
            status: PostStatus::Published,
            publish_at: Some(now),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn explicit_draft_clears_publish_time() {
        let at = now();
        let t = on_create(Some(PostStatus::Draft), Some(at + Duration::hours(1)), at).unwrap();
        assert_eq!(t.status, PostStatus::Draft);
        assert_eq!(t.publish_at, None);
    }

    #[test]
    fn explicit_published_stamps_commit_time() {
        let at = now();
        let t = on_create(Some(PostStatus::Published), Some(at + Duration::hours(1)), at).unwrap();
        assert_eq!(t.status, PostStatus::Published);
        assert_eq!(t.publish_at, Some(at));
    }

    #[test]
    fn explicit_scheduled_keeps_requested_instant() {
        let at = now();
        let later = at + Duration::hours(6);
        let t = on_create(Some(PostStatus::Scheduled), Some(later), at).unwrap();
        assert_eq!(t.status, PostStatus::Scheduled);
        assert_eq!(t.publish_at, Some(later));
    }

    #[test]
    fn scheduled_without_time_is_rejected() {
        let err = on_create(Some(PostStatus::Scheduled), None, now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn create_with_nothing_publishes_immediately() {
        let at = now();
        let t = on_create(None, None, at).unwrap();
        assert_eq!(t.status, PostStatus::Published);
        assert_eq!(t.publish_at, Some(at));
    }

    #[test]
    fn future_time_infers_scheduled() {
        let at = now();
        let later = at + Duration::minutes(10);
        let t = on_create(None, Some(later), at).unwrap();
        assert_eq!(t.status, PostStatus::Scheduled);
        assert_eq!(t.publish_at, Some(later));
    }

    #[test]
    fn past_time_publishes_now_and_discards_requested_instant() {
        let at = now();
        let earlier = at - Duration::minutes(10);
        let t = on_create(None, Some(earlier), at).unwrap();
        assert_eq!(t.status, PostStatus::Published);
        assert_eq!(t.publish_at, Some(at));
    }

    #[test]
    fn update_with_nothing_leaves_state_untouched() {
        assert_eq!(on_update(None, None, now()).unwrap(), None);
    }

    #[test]
    fn update_can_reschedule() {
        let at = now();
        let later = at + Duration::minutes(30);
        let t = on_update(None, Some(later), at).unwrap().unwrap();
        assert_eq!(t.status, PostStatus::Scheduled);
        assert_eq!(t.publish_at, Some(later));
    }
}
