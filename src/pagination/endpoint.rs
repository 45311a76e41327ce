//! Page source backed by an authenticated list endpoint

use anyhow::Result;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::PageFetcher;
use crate::api::{ApiClient, AuthApi, JsonApi, Paginated, Session};
use crate::auth::SecureStore;

/// Pages of one REST list endpoint, fetched through a [`Session`]
pub struct EndpointPages<S, A = ApiClient> {
    session: Arc<Session<S, A>>,
    endpoint: String,
    page_size: Option<usize>,
}

impl<S, A> EndpointPages<S, A> {
    /// Pages of `endpoint`, e.g. [`endpoints::FEED`](crate::api::endpoints::FEED)
    pub fn new(session: Arc<Session<S, A>>, endpoint: impl Into<String>) -> Self {
        Self {
            session,
            endpoint: endpoint.into(),
            page_size: None,
        }
    }

    /// Ask the server for `page_size` items per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// URL of the first page
    pub fn first_url(&self) -> String {
        match self.page_size {
            Some(size) => {
                let separator = if self.endpoint.contains('?') { '&' } else { '?' };
                format!("{}{separator}page_size={size}", self.endpoint)
            }
            None => self.endpoint.clone(),
        }
    }
}

impl<T, S, A> PageFetcher<T> for EndpointPages<S, A>
where
    T: DeserializeOwned,
    S: SecureStore,
    A: AuthApi + JsonApi,
{
    async fn fetch_first(&self) -> Result<Paginated<T>> {
        Ok(self.session.fetch_page(&self.first_url()).await?)
    }

    async fn fetch_url(&self, url: &str) -> Result<Paginated<T>> {
        Ok(self.session.fetch_page(url).await?)
    }
}
