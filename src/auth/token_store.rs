//! Access and refresh token persistence with an in-memory access token cache.

use anyhow::{Result, anyhow};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SecureStore};
use crate::sync::SingleFlight;

/// Token persistence for the single signed-in session
///
/// The access token is read on every request, so it is cached in memory after
/// the first storage read. Concurrent first reads share one storage call.
pub struct TokenStore<S> {
    storage: S,
    access: Mutex<Option<String>>,
    // Bumped by `clear_tokens` so a storage read started before the clear
    // cannot repopulate the cache.
    epoch: AtomicU64,
    reads: SingleFlight<(), Result<Option<String>, String>>,
}

impl<S: SecureStore> TokenStore<S> {
    /// Wrap a secure store.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            access: Mutex::new(None),
            epoch: AtomicU64::new(0),
            reads: SingleFlight::new(),
        }
    }

    /// The underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn cached(&self) -> Option<String> {
        self.access
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current access token, from memory when possible.
    pub async fn get_access_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.cached() {
            return Ok(Some(token));
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        // `None` means the caller leading the read was dropped; read again.
        let read = loop {
            let shared = self
                .reads
                .run((), || async {
                    self.storage
                        .get_item(ACCESS_TOKEN_KEY)
                        .await
                        .map_err(|e| format!("{e:#}"))
                })
                .await;
            if let Some(read) = shared {
                break read;
            }
        };
        let stored = read.map_err(|e| anyhow!("Failed to read access token: {e}"))?;

        let mut access = self.access.lock().unwrap_or_else(PoisonError::into_inner);
        if access.is_none() && self.epoch.load(Ordering::SeqCst) == epoch {
            access.clone_from(&stored);
        }
        // A token set while the read was pending wins over the stored one.
        Ok(access.clone().or(stored))
    }

    /// Replace the access token. The cache is updated before the storage
    /// write starts, so later reads see the new token immediately.
    pub async fn set_access_token(&self, token: &str) -> Result<()> {
        *self.access.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        self.storage.set_item(ACCESS_TOKEN_KEY, token).await
    }

    /// Current refresh token, always read from storage.
    pub async fn get_refresh_token(&self) -> Result<Option<String>> {
        self.storage.get_item(REFRESH_TOKEN_KEY).await
    }

    /// Replace the refresh token.
    pub async fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.storage.set_item(REFRESH_TOKEN_KEY, token).await
    }

    /// Forget both tokens, in memory and in storage.
    pub async fn clear_tokens(&self) -> Result<()> {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.access.lock().unwrap_or_else(PoisonError::into_inner) = None;

        let access = self.storage.delete_item(ACCESS_TOKEN_KEY).await;
        let refresh = self.storage.delete_item(REFRESH_TOKEN_KEY).await;
        tracing::debug!("Cleared stored tokens");
        access.and(refresh)
    }
}
