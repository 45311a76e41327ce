//! # OnlyPaws 🐾
//!
//! Client core for the OnlyPaws pet social network.
//!
//! ## Overview
//!
//! This crate holds the non-UI half of an OnlyPaws client: keeping the user
//! signed in, paging through feeds, patching cached lists after local
//! changes and preloading ads for list slots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Screens / CLI                        │
//! │      Render feeds, react to likes, deletes and logouts      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │   Pagination    │ │      Cache      │ │       Ads       │
//! │                 │ │                 │ │                 │
//! │ • Initial load  │ │ • Update by id  │ │ • Preload slots │
//! │ • Fetch next    │ │ • Remove        │ │ • Evict oldest  │
//! │ • Refresh       │ │ • Upsert        │ │ • Expire        │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │       API       │ │      Auth       │ │      Sync       │
//! │                 │ │                 │ │                 │
//! │ • HTTP client   │─▶ • Token store   │─▶ • Single-flight │
//! │ • Session       │ │ • Refresh       │ │                 │
//! │ • 401 retry     │ │ • Encrypted file│ │                 │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ads`] - Ad preload cache
//! - [`api`] - REST client and authenticated session
//! - [`auth`] - Token storage and refresh coordination
//! - [`cache`] - Updating cached infinite lists in place
//! - [`config`] - Configuration management and data directory
//! - [`models`] - Data models (Post, Notification, images)
//! - [`pagination`] - Cursor-based infinite lists
//! - [`sync`] - Single-flight request sharing
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use onlypaws::api::endpoints;
//! use onlypaws::auth::EncryptedFileStore;
//! use onlypaws::models::Post;
//! use onlypaws::pagination::{EndpointPages, PaginatedFetch};
//! use onlypaws::Session;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let session = Arc::new(Session::connect(
//!     "https://api.onlypaws.test",
//!     EncryptedFileStore::open()?,
//! ));
//! session.login("rex", "woof").await?;
//!
//! let feed: PaginatedFetch<Post, _> =
//!     PaginatedFetch::new(EndpointPages::new(session, endpoints::FEED));
//! feed.load().await;
//! feed.fetch_next().await;
//! println!("{} posts", feed.state().data.len());
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/onlypaws/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::future_not_send)]

pub mod ads;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod pagination;
pub mod sync;

// Re-export main types for convenience
pub use ads::{AdCacheConfig, AdPreloadCache};
pub use api::{ApiClient, ApiError, Paginated, Session};
pub use auth::{EncryptedFileStore, TokenRefresher, TokenStore};
pub use cache::{Identified, InfiniteData, InfiniteQueryCache};
pub use config::Config;
pub use models::{Notification, Post};
pub use pagination::{FeedState, PaginatedFetch};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
