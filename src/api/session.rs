//! Authenticated requests with transparent token refresh

use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::{ApiClient, ApiError, AuthApi, JsonApi, Paginated};
use crate::auth::{RefreshOutcome, SecureStore, TokenRefresher, TokenStore};

/// The signed-in session
///
/// Every authenticated request goes through [`Session::get_json`]. A 401
/// triggers one coordinated token refresh and a single retry; when the refresh
/// fails the tokens are cleared and the caller sees [`ApiError::Unauthorized`].
pub struct Session<S, A = ApiClient> {
    tokens: Arc<TokenStore<S>>,
    refresher: TokenRefresher<S, A>,
}

impl<S: SecureStore> Session<S, ApiClient> {
    /// Session against the given API root
    pub fn connect(base_url: &str, storage: S) -> Self {
        Self::new(ApiClient::new(base_url), storage)
    }
}

impl<S, A> Session<S, A>
where
    S: SecureStore,
    A: AuthApi + JsonApi,
{
    /// Create a session from an API implementation and token storage.
    pub fn new(api: A, storage: S) -> Self {
        let tokens = Arc::new(TokenStore::new(storage));
        let refresher = TokenRefresher::new(Arc::clone(&tokens), api);
        Self { tokens, refresher }
    }

    /// The token store
    pub fn tokens(&self) -> &TokenStore<S> {
        &self.tokens
    }

    /// The refresh coordinator
    pub fn refresher(&self) -> &TokenRefresher<S, A> {
        &self.refresher
    }

    fn api(&self) -> &A {
        self.refresher.api()
    }

    /// Log in and persist the returned tokens.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let pair = self.api().login(username, password).await?;
        self.tokens.set_access_token(&pair.access).await?;
        if let Some(refresh) = &pair.refresh {
            self.tokens.set_refresh_token(refresh).await?;
        }
        tracing::info!("Logged in as {username}");
        Ok(())
    }

    /// Forget the stored tokens.
    pub async fn logout(&self) -> anyhow::Result<()> {
        self.tokens.clear_tokens().await
    }

    /// Whether an access token is available.
    pub async fn is_logged_in(&self) -> bool {
        matches!(self.tokens.get_access_token().await, Ok(Some(_)))
    }

    /// Refresh the access token using the stored refresh token.
    ///
    /// Clears the tokens when no refresh token is stored or the refresh fails.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ApiError> {
        let Some(refresh_token) = self.tokens.get_refresh_token().await? else {
            tracing::debug!("No refresh token stored");
            self.tokens.clear_tokens().await?;
            return Ok(RefreshOutcome::from(None));
        };

        let outcome = self.refresher.refresh_access_token(&refresh_token).await;
        if !outcome.success {
            tracing::warn!("Session expired, clearing tokens");
            self.tokens.clear_tokens().await?;
        }
        Ok(outcome)
    }

    /// GET an authenticated JSON resource.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let token = self.tokens.get_access_token().await?;
        match self.api().get_json(url, token.as_deref()).await {
            Err(ApiError::Unauthorized) => {}
            other => return other,
        }

        let outcome = self.refresh().await?;
        let Some(token) = outcome.access_token else {
            return Err(ApiError::Unauthorized);
        };
        self.api().get_json(url, Some(&token)).await
    }

    /// GET one page of a list endpoint.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Paginated<T>, ApiError> {
        self.get_json(url).await
    }
}
