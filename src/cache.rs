use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{ClientError, Result};

/// Cache for downloaded font binaries, keyed by family name
///
/// Sits in front of the backend's font endpoint so scrolling back to an
/// already-previewed family never refetches the woff2 payload.
#[async_trait]
pub trait FontBinaryCache: Send + Sync {
    /// Cached woff2 payload for a family, if any
    async fn get(&self, family: &str) -> Result<Option<Bytes>>;

    /// Store a family's woff2 payload
    async fn set(&self, family: &str, data: Bytes) -> Result<()>;
}

/// In-memory cache, lifetime = session
pub struct MemoryFontCache {
    store: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryFontCache {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryFontCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FontBinaryCache for MemoryFontCache {
    async fn get(&self, family: &str) -> Result<Option<Bytes>> {
        let store = self.store.read().await;
        Ok(store.get(family).cloned())
    }

    async fn set(&self, family: &str, data: Bytes) -> Result<()> {
        let mut store = self.store.write().await;
        store.insert(family.to_string(), data);
        Ok(())
    }
}

/// Disk-backed cache that survives restarts
///
/// Entries land as flat `.woff2` files so the cache directory can be
/// pointed at by a local font viewer or cleaned with a glob.
pub struct DiskFontCache {
    root_dir: PathBuf,
}

impl DiskFontCache {
    pub async fn new(root_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root_dir).await?;
        Ok(Self { root_dir })
    }

    /// File name for a family: readable slug plus a short digest
    ///
    /// The slug keeps the family recognizable on disk; the digest tail
    /// separates families whose slugs collide ("Fira Sans" vs "Fira+Sans").
    fn entry_path(&self, family: &str) -> PathBuf {
        use sha2::{Digest, Sha256};

        let slug: String = family
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let slug = slug.trim_matches('-');

        let digest = Sha256::digest(family.as_bytes());
        let tail = format!("{:x}", digest);

        self.root_dir.join(format!("{}-{}.woff2", slug, &tail[..8]))
    }
}

#[async_trait]
impl FontBinaryCache for DiskFontCache {
    async fn get(&self, family: &str) -> Result<Option<Bytes>> {
        let path = self.entry_path(family);

        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::Cache {
                message: format!("font cache read failed for '{}': {}", family, e),
            }),
        }
    }

    async fn set(&self, family: &str, data: Bytes) -> Result<()> {
        let path = self.entry_path(family);

        fs::write(&path, &data).await.map_err(|e| ClientError::Cache {
            message: format!("font cache write failed for '{}': {}", family, e),
        })
    }
}
