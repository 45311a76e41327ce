//! Secure key-value storage for tokens.
//!
//! [`EncryptedFileStore`] keeps values encrypted with AES-256-GCM in
//! ~/.config/onlypaws/credentials.enc. The encryption key is derived from
//! machine-specific identifiers.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result, anyhow};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::config;

/// Storage key holding the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key holding the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

const NONCE_SIZE: usize = 12;

/// Async key-value storage for secrets
#[allow(async_fn_in_trait)]
pub trait SecureStore {
    /// Read a value
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    async fn delete_item(&self, key: &str) -> Result<()>;
}

/// In-process store, used by tests and when no disk storage is wanted
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// Encrypted file on disk holding every secret as one JSON map
pub struct EncryptedFileStore {
    path: PathBuf,
    key: [u8; 32],
    // Serializes read-modify-write cycles on the file.
    write_lock: tokio::sync::Mutex<()>,
}

impl EncryptedFileStore {
    /// Default location (~/.config/onlypaws/credentials.enc)
    pub fn default_path() -> Result<PathBuf> {
        Ok(config::data_dir()?.join("credentials.enc"))
    }

    /// Open the store at the default credentials path.
    pub fn open() -> Result<Self> {
        Ok(Self::at_path(Self::default_path()?))
    }

    /// Open the store at a specific path, keyed to this machine.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self::with_key(path, derive_key())
    }

    /// Open the store at a specific path with an explicit key.
    pub fn with_key(path: impl Into<PathBuf>, key: [u8; 32]) -> Self {
        Self {
            path: path.into(),
            key,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Location of the encrypted file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|_| anyhow!("Invalid key length"))
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        let encrypted = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e).context("Failed to read credentials file"),
        };

        if encrypted.len() < NONCE_SIZE {
            return Ok(HashMap::new());
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt credentials"))?;

        serde_json::from_slice(&plaintext).context("Invalid credentials payload")
    }

    async fn save(&self, items: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec(items)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), json.as_slice())
            .map_err(|_| anyhow!("Failed to encrypt credentials"))?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create credentials directory")?;
        }
        tokio::fs::write(&self.path, output)
            .await
            .context("Failed to write credentials file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        Ok(())
    }
}

impl SecureStore for EncryptedFileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items).await
    }

    async fn delete_item(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await?;
        if items.remove(key).is_some() {
            self.save(&items).await?;
        }
        Ok(())
    }
}

/// Machine identifier for key derivation, falling back to the home directory
fn machine_id() -> String {
    #[cfg(target_os = "linux")]
    {
        for candidate in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(id) = std::fs::read_to_string(candidate) {
                return id.trim().to_string();
            }
        }
    }

    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "onlypaws-fallback-key".to_string())
}

/// Derive the file encryption key from machine-specific data
fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(machine_id().as_bytes());
    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }
    hasher.update(b"onlypaws-secure-store-v1");
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item(ACCESS_TOKEN_KEY).await.unwrap(), None);

        store.set_item(ACCESS_TOKEN_KEY, "A1").await.unwrap();
        assert_eq!(store.get_item(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A1"));

        store.delete_item(ACCESS_TOKEN_KEY).await.unwrap();
        store.delete_item(ACCESS_TOKEN_KEY).await.unwrap();
        assert_eq!(store.get_item(ACCESS_TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.enc");
        let store = EncryptedFileStore::with_key(&path, [7u8; 32]);

        store.set_item(ACCESS_TOKEN_KEY, "A1").await.unwrap();
        store.set_item(REFRESH_TOKEN_KEY, "R1").await.unwrap();

        // A second handle on the same file sees the same values.
        let reopened = EncryptedFileStore::with_key(&path, [7u8; 32]);
        assert_eq!(reopened.get_item(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A1"));
        assert_eq!(reopened.get_item(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("R1"));

        reopened.delete_item(ACCESS_TOKEN_KEY).await.unwrap();
        assert_eq!(store.get_item(ACCESS_TOKEN_KEY).await.unwrap(), None);
        assert_eq!(store.get_item(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_file_store_is_not_plaintext() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        let store = EncryptedFileStore::with_key(&path, [1u8; 32]);
        store.set_item(ACCESS_TOKEN_KEY, "very-secret-token").await.unwrap();

        let raw = std::fs::read(&path).unwrap();
        let haystack = String::from_utf8_lossy(&raw);
        assert!(!haystack.contains("very-secret-token"));
    }

    #[tokio::test]
    async fn test_file_store_wrong_key_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        EncryptedFileStore::with_key(&path, [1u8; 32])
            .set_item(ACCESS_TOKEN_KEY, "A1")
            .await
            .unwrap();

        let other = EncryptedFileStore::with_key(&path, [2u8; 32]);
        assert!(other.get_item(ACCESS_TOKEN_KEY).await.is_err());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        let owner = EncryptedFileStore::with_key(&path, [1u8; 32]);
        owner.set_item(REFRESH_TOKEN_KEY, "R1").await.unwrap();
        let before = std::fs::read(&path).unwrap();

        let other = EncryptedFileStore::with_key(&path, [2u8; 32]);
        assert!(other.set_item(ACCESS_TOKEN_KEY, "A1").await.is_err());
        assert!(other.delete_item(REFRESH_TOKEN_KEY).await.is_err());

        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(owner.get_item(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = EncryptedFileStore::with_key(dir.path().join("absent.enc"), [3u8; 32]);
        assert_eq!(store.get_item(REFRESH_TOKEN_KEY).await.unwrap(), None);
        store.delete_item(REFRESH_TOKEN_KEY).await.unwrap();
    }
}
