//! 键值存储

use async_trait::async_trait;
use screener_core::{Result, ScreenerError};
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// 本地持久化键值存储接口
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 读取键值，不存在时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入键值（单次整体替换）
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// 删除键，键不存在时不报错
    async fn remove(&self, key: &str) -> Result<()>;
}

/// 内存键值存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// 文件键值存储
///
/// 每个键对应数据目录下的一个 `<key>.json` 文件。
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ScreenerError::Validation(format!("invalid storage key: {:?}", key)));
        }
        Ok(self.base_path.join(format!("{}.json", key)))
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> ScreenerError {
    ScreenerError::Storage(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(&path, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| storage_error(&self.base_path, e))?;

        // 每次写入使用独立的临时文件再整体替换，并发写入时后写者覆盖
        let dir = self.base_path.clone();
        let target = path.clone();
        let contents = value.to_owned();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(contents.as_bytes())?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| ScreenerError::Storage(format!("write task failed: {}", e)))?
        .map_err(|e| storage_error(&path, e))?;

        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&path, e)),
        }
    }
}
