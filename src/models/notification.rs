//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;
use crate::cache::Identified;

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone liked a post
    Like,
    /// Someone commented on a post
    Comment,
    /// Someone followed the user
    Follow,
    /// The user's pet was tagged in a photo
    Tag,
    /// Anything this client does not know about yet
    #[serde(other)]
    Other,
}

impl NotificationKind {
    /// Short verb phrase for list display
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Like => "liked your post",
            Self::Comment => "commented on your post",
            Self::Follow => "started following you",
            Self::Tag => "tagged your pet",
            Self::Other => "interacted with you",
        }
    }
}

/// An entry in the notifications list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Server ID
    pub id: u64,
    /// Type of event
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Who caused it
    pub actor: UserSummary,
    /// Post involved, if any
    #[serde(default)]
    pub post_id: Option<u64>,
    /// Whether the user has seen it
    #[serde(default)]
    pub is_read: bool,
    /// When it happened
    pub created_at: DateTime<Utc>,
}

impl Identified for Notification {
    fn item_id(&self) -> String {
        self.id.to_string()
    }
}
