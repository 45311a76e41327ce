//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;
use crate::cache::Identified;

/// A photo attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostImage {
    /// Server ID
    pub id: u64,
    /// Full-size image URL
    pub image: String,
    /// Pets tagged in this photo
    #[serde(default)]
    pub tagged_pets: Vec<String>,
}

/// A post in a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Server ID
    pub id: u64,
    /// Who posted it
    pub author: UserSummary,
    /// Caption text
    #[serde(default)]
    pub caption: String,
    /// Attached photos, in display order
    #[serde(default)]
    pub images: Vec<PostImage>,
    /// Number of likes
    #[serde(default)]
    pub like_count: u32,
    /// Number of comments
    #[serde(default)]
    pub comment_count: u32,
    /// Whether the signed-in user liked it
    #[serde(default)]
    pub is_liked: bool,
    /// When it was posted
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Copy of this post with the like toggled and the count adjusted.
    #[must_use]
    pub fn toggled_like(&self) -> Self {
        let mut post = self.clone();
        if post.is_liked {
            post.like_count = post.like_count.saturating_sub(1);
        } else {
            post.like_count += 1;
        }
        post.is_liked = !post.is_liked;
        post
    }

    /// Get a short preview of the caption (for list display)
    pub fn preview(&self, max_chars: usize) -> String {
        let caption = self.caption.replace('\n', " ");
        if caption.chars().count() <= max_chars {
            caption
        } else {
            let cut: String = caption.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{cut}...")
        }
    }
}

impl Identified for Post {
    fn item_id(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: u64) -> Post {
        Post {
            id,
            author: UserSummary {
                id: 1,
                username: "rex".to_string(),
                avatar: None,
            },
            caption: String::new(),
            images: Vec::new(),
            like_count: 0,
            comment_count: 0,
            is_liked: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_toggled_like() {
        let liked = post(1).toggled_like();
        assert!(liked.is_liked);
        assert_eq!(liked.like_count, 1);

        let unliked = liked.toggled_like();
        assert!(!unliked.is_liked);
        assert_eq!(unliked.like_count, 0);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let mut p = post(1);
        p.caption = "Zoomies at the park 🐕🐕🐕\nbest day".to_string();
        assert_eq!(p.preview(100), "Zoomies at the park 🐕🐕🐕 best day");
        assert_eq!(p.preview(10), "Zoomies...");
    }

    #[test]
    fn test_deserialize_minimal_post() {
        let json = r#"{
            "id": 9,
            "author": {"id": 2, "username": "mittens"},
            "created_at": "2026-01-05T10:00:00Z"
        }"#;
        let p: Post = serde_json::from_str(json).unwrap();
        assert_eq!(p.item_id(), "9");
        assert_eq!(p.author.username, "mittens");
        assert!(p.images.is_empty());
    }
}
