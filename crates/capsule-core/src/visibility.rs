//! Visibility resolver - decides whether a caller may read a post.
//!
//! A pure read-time predicate, re-evaluated on every read; an author may
//! flip privacy between two reads, so the outcome is never cached.

use uuid::Uuid;

use crate::domain::Post;

/// Outcome of resolving a caller against a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Visible,
    Forbidden,
    NotFound,
}

/// Resolve read access for `caller` (None = anonymous) to `post`.
///
/// Public posts are visible to anyone; private posts only to their author.
pub fn resolve(post: Option<&Post>, caller: Option<Uuid>) -> Access {
    let Some(post) = post else {
        return Access::NotFound;
    };

    if !post.is_private {
        return Access::Visible;
    }

    match caller {
        Some(id) if id == post.author_id => Access::Visible,
        _ => Access::Forbidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Post;

    fn post(author: Uuid, is_private: bool) -> Post {
        let mut post = Post::new(
            author,
            "alice".to_string(),
            "Title".to_string(),
            "Body".to_string(),
        );
        post.is_private = is_private;
        post
    }

    #[test]
    fn missing_post_is_not_found() {
        assert_eq!(resolve(None, Some(Uuid::new_v4())), Access::NotFound);
    }

    #[test]
    fn public_post_is_visible_to_anyone() {
        let p = post(Uuid::new_v4(), false);
        assert_eq!(resolve(Some(&p), None), Access::Visible);
        assert_eq!(resolve(Some(&p), Some(Uuid::new_v4())), Access::Visible);
    }

    #[test]
    fn private_post_is_visible_only_to_author() {
        let author = Uuid::new_v4();
        let p = post(author, true);
        assert_eq!(resolve(Some(&p), Some(author)), Access::Visible);
        assert_eq!(resolve(Some(&p), Some(Uuid::new_v4())), Access::Forbidden);
        assert_eq!(resolve(Some(&p), None), Access::Forbidden);
    }
}
