//! Wire types shared by every endpoint

use serde::{Deserialize, Serialize};

/// Tokens returned by login and refresh
///
/// The refresh endpoint only includes `refresh` when it rotated the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// New access token
    pub access: String,
    /// New refresh token, if one was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

/// Body of the refresh request
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Body of the login request
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items in server order
    pub results: Vec<T>,
    /// URL of the next page, `None` on the last page
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the previous page
    #[serde(default)]
    pub previous: Option<String>,
    /// Total number of items across all pages
    #[serde(default)]
    pub count: u64,
    /// Endpoint-specific extra payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<serde_json::Value>,
}

impl<T> Paginated<T> {
    /// A single page with no cursor.
    pub fn single(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            results,
            next: None,
            previous: None,
            extra_data: None,
        }
    }

    /// Set the next-page cursor.
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Set the total count.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }
}
