//! Authentication: token storage and refresh coordination
//!
//! Tokens live in an encrypted file ([`EncryptedFileStore`]) behind the
//! [`SecureStore`] trait. [`TokenStore`] caches the access token in memory and
//! [`TokenRefresher`] makes sure only one refresh call runs at a time.

pub mod jwt;
pub mod refresh;
pub mod storage;
pub mod token_store;

pub use jwt::is_refresh_token_valid;
pub use refresh::{RefreshOutcome, RefreshState, TokenRefresher};
pub use storage::{
    ACCESS_TOKEN_KEY, EncryptedFileStore, MemoryStore, REFRESH_TOKEN_KEY, SecureStore,
};
pub use token_store::TokenStore;
