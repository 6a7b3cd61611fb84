//! Client-side token cache
//!
//! Holds the current [`TokenPair`] between requests. No expiry logic lives
//! here; the server decides when a token is no longer good.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::models::TokenPair;

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Result<Option<TokenPair>, StorageError>;

    async fn set(&self, tokens: &TokenPair) -> Result<(), StorageError>;

    /// Forget both tokens; clearing an empty store is not an error
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Process-local store, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Result<Option<TokenPair>, StorageError> {
        Ok(self.tokens.read().await.clone())
    }

    async fn set(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        *self.tokens.write().await = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.tokens.write().await = None;
        Ok(())
    }
}

/// JSON file store that survives restarts
///
/// Writes go to a sibling temp file and are renamed into place, so a crash
/// never leaves half a token pair behind.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<Option<TokenPair>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, serde_json::to_vec(tokens)?).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(n: u32) -> TokenPair {
        TokenPair {
            access_token: format!("access-{}", n),
            refresh_token: format!("refresh-{}", n),
        }
    }

    #[tokio::test]
    async fn test_memory_store_set_get_clear() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get().await.unwrap(), None);

        store.set(&pair(1)).await.unwrap();
        store.set(&pair(2)).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(pair(2)));

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("tokens.json");

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get().await.unwrap(), None);
        store.set(&pair(1)).await.unwrap();

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get().await.unwrap(), Some(pair(1)));

        reopened.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = FileTokenStore::new(&path);
        assert!(matches!(store.get().await, Err(StorageError::Corrupt(_))));
    }
}
