//! HTTP client for the OnlyPaws REST API

mod error;
pub mod session;
mod types;

pub use error::ApiError;
pub use session::Session;
pub use types::{Paginated, TokenPair};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use types::{LoginRequest, RefreshRequest};

/// Default API root, overridden by `Config::api_base_url`
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Endpoint paths relative to the API root
pub mod endpoints {
    /// Username/password login
    pub const LOGIN: &str = "/auth/login/";
    /// Refresh token exchange
    pub const TOKEN_REFRESH: &str = "/auth/token/refresh/";
    /// Home feed
    pub const FEED: &str = "/posts/feed/";
    /// Notifications for the signed-in user
    pub const NOTIFICATIONS: &str = "/notifications/";

    /// Posts by one user
    pub fn user_posts(username: &str) -> String {
        format!("/users/{}/posts/", urlencoding::encode(username))
    }
}

/// Token endpoints
#[allow(async_fn_in_trait)]
pub trait AuthApi {
    /// Exchange a refresh token for a new access token
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;

    /// Exchange credentials for a token pair
    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError>;
}

/// Authenticated JSON reads
#[allow(async_fn_in_trait)]
pub trait JsonApi {
    /// GET `url` (absolute, or relative to the API root) and decode the body
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<T, ApiError>;
}

/// reqwest-backed API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given API root
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// API root without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint. Absolute URLs, such as `next` cursors, pass
    /// through untouched.
    pub fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        bearer: Option<&str>,
    ) -> Result<T, ApiError> {
        let request = match bearer {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl AuthApi for ApiClient {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let request = self
            .client
            .post(self.url(endpoints::TOKEN_REFRESH))
            .json(&RefreshRequest {
                refresh: refresh_token,
            });
        self.send(request, None).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let request = self
            .client
            .post(self.url(endpoints::LOGIN))
            .json(&LoginRequest { username, password });
        self.send(request, None).await
    }
}

impl JsonApi for ApiClient {
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<T, ApiError> {
        let request = self.client.get(self.url(url));
        self.send(request, bearer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_endpoints_join_base() {
        let api = ApiClient::new("https://example.test/api/");
        assert_eq!(api.base_url(), "https://example.test/api");
        assert_eq!(api.url(endpoints::FEED), "https://example.test/api/posts/feed/");
        assert_eq!(api.url("notifications/"), "https://example.test/api/notifications/");
    }

    #[test]
    fn test_absolute_cursor_passes_through() {
        let api = ApiClient::new("https://example.test/api");
        let cursor = "https://cdn.example.test/api/posts/feed/?cursor=abc";
        assert_eq!(api.url(cursor), cursor);
    }

    #[test]
    fn test_user_posts_path_is_encoded() {
        assert_eq!(endpoints::user_posts("rex the dog"), "/users/rex%20the%20dog/posts/");
    }
}
