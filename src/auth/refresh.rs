//! Single-flight access token refresh.
//!
//! When several requests fail with 401 at once, each of them asks for a
//! refresh. Only the first one talks to the backend; the rest queue up and
//! receive the leader's result once it is known.

use std::sync::Arc;

use super::jwt;
use super::storage::SecureStore;
use super::token_store::TokenStore;
use crate::api::AuthApi;
use crate::sync::SingleFlight;

/// Whether a refresh is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No refresh running
    Idle,
    /// A leader is talking to the refresh endpoint
    Refreshing,
}

/// Result of a refresh attempt, shared by the leader and every queued caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Whether a new access token was obtained
    pub success: bool,
    /// The new access token
    pub access_token: Option<String>,
}

impl From<Option<String>> for RefreshOutcome {
    fn from(access_token: Option<String>) -> Self {
        Self {
            success: access_token.is_some(),
            access_token,
        }
    }
}

/// Coordinates refresh calls so at most one is in flight
pub struct TokenRefresher<S, A> {
    tokens: Arc<TokenStore<S>>,
    api: A,
    flight: SingleFlight<(), Option<String>>,
}

impl<S: SecureStore, A: AuthApi> TokenRefresher<S, A> {
    /// Create a coordinator persisting into `tokens`.
    pub fn new(tokens: Arc<TokenStore<S>>, api: A) -> Self {
        Self {
            tokens,
            api,
            flight: SingleFlight::new(),
        }
    }

    /// The API used for refresh calls
    pub fn api(&self) -> &A {
        &self.api
    }

    /// The token store refreshed tokens are written to
    pub fn tokens(&self) -> &Arc<TokenStore<S>> {
        &self.tokens
    }

    /// Current state
    pub fn state(&self) -> RefreshState {
        if self.flight.is_in_flight(&()) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Obtain a new access token.
    ///
    /// Callers arriving while a refresh is running do not issue their own
    /// call; they get the running call's outcome, in arrival order, before the
    /// leader itself returns. Failures of any kind (expired refresh token,
    /// network error, rejection) yield an unsuccessful outcome and are never
    /// retried here.
    ///
    /// If the leader's future is dropped before it finishes, the queued
    /// callers start over and one of them leads the next attempt.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> RefreshOutcome {
        loop {
            if let Some(token) = self.flight.run((), || self.lead(refresh_token)).await {
                return RefreshOutcome::from(token);
            }
            tracing::debug!("Refresh leader went away, retrying");
        }
    }

    async fn lead(&self, refresh_token: &str) -> Option<String> {
        if !jwt::is_refresh_token_valid(refresh_token) {
            tracing::debug!("Refresh token expired or unreadable, skipping refresh call");
            return None;
        }

        tracing::debug!("Refreshing access token");
        let pair = match self.api.refresh_token(refresh_token).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("Token refresh failed: {e}");
                return None;
            }
        };

        if let Err(e) = self.tokens.set_access_token(&pair.access).await {
            tracing::warn!("Failed to persist refreshed access token: {e:#}");
            return None;
        }
        if let Some(rotated) = &pair.refresh {
            if let Err(e) = self.tokens.set_refresh_token(rotated).await {
                tracing::warn!("Failed to persist rotated refresh token: {e:#}");
                return None;
            }
        }

        Some(pair.access)
    }
}
