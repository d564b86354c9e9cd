//! Blog posts shown on the marketing site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::{BlogPostId, UserId};

/// Longest accepted blog post title.
pub const MAX_TITLE_LEN: usize = 200;

/// A published blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    /// Post ID.
    pub id: BlogPostId,
    /// Title.
    pub title: String,
    /// Body (markdown).
    pub content: String,
    /// Author.
    pub author_id: UserId,
    /// Publication time.
    pub created_at: DateTime<Utc>,
}

impl BlogPost {
    /// Build a new post after validating title and content.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptyField` for a blank title or body and
    /// `CoreError::TooLong` for an oversized title.
    pub fn new(title: &str, content: &str, author_id: UserId) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::EmptyField { field: "title" });
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(CoreError::TooLong {
                field: "title",
                max: MAX_TITLE_LEN,
            });
        }
        if content.trim().is_empty() {
            return Err(CoreError::EmptyField { field: "content" });
        }

        Ok(Self {
            id: BlogPostId::generate(),
            title: title.to_string(),
            content: content.to_string(),
            author_id,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_is_rejected() {
        let err = BlogPost::new("   ", "body", UserId::generate()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyField { field: "title" }));
    }

    #[test]
    fn long_title_is_rejected() {
        let title = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(BlogPost::new(&title, "body", UserId::generate()).is_err());
    }

    #[test]
    fn title_is_trimmed() {
        let post = BlogPost::new("  Lead generation 101 ", "Tips", UserId::generate()).unwrap();
        assert_eq!(post.title, "Lead generation 101");
    }
}
