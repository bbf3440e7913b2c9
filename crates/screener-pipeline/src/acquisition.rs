//! 影像获取
//!
//! 相机、相册等设备能力由调用方实现 [`ImageSource`]，流程本身只消费其产出的影像引用。

use async_trait::async_trait;
use screener_core::{ImageHandle, Result, ScreenerError};
use std::path::PathBuf;
use tracing::{debug, warn};

/// 影像来源接口
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// 来源名称，用于日志
    fn name(&self) -> &str;

    /// 获取一张影像
    ///
    /// 权限被拒绝返回 `PermissionDenied`，用户取消返回 `Cancelled`。
    async fn acquire(&self) -> Result<ImageHandle>;
}

/// 本地文件来源
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageSource for LocalFileSource {
    fn name(&self) -> &str {
        "local-file"
    }

    async fn acquire(&self) -> Result<ImageHandle> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| {
            warn!("Image not accessible at {}: {}", self.path.display(), e);
            ScreenerError::Io(format!("{}: {}", self.path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(ScreenerError::Io(format!(
                "{} is not a regular file",
                self.path.display()
            )));
        }

        debug!("Acquired image {} ({} bytes)", self.path.display(), metadata.len());
        Ok(ImageHandle::new(self.path.to_string_lossy().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_file_source_returns_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retina.jpg");
        std::fs::write(&path, b"\xff\xd8\xff").unwrap();

        let source = LocalFileSource::new(&path);
        let handle = source.acquire().await.unwrap();
        assert_eq!(crate::encoder::local_path(&handle).unwrap(), path);
    }

    #[tokio::test]
    async fn test_local_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalFileSource::new(dir.path().join("missing.jpg"));
        let err = source.acquire().await.unwrap_err();
        assert!(matches!(err, ScreenerError::Io(_)));
    }

    #[tokio::test]
    async fn test_local_file_source_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalFileSource::new(dir.path());
        let err = source.acquire().await.unwrap_err();
        assert!(matches!(err, ScreenerError::Io(_)));
    }
}
