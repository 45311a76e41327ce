//! User profile models

use serde::{Deserialize, Serialize};

use crate::cache::Identified;

/// Minimal user info embedded in posts and notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Server ID
    pub id: u64,
    /// Handle, without the leading `@`
    pub username: String,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserSummary {
    /// Handle with the leading `@`
    pub fn handle(&self) -> String {
        format!("@{}", self.username)
    }
}

impl Identified for UserSummary {
    fn item_id(&self) -> String {
        self.id.to_string()
    }
}

/// A stored profile picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileImage {
    /// Server ID
    pub id: u64,
    /// Image URL
    pub image: String,
}
