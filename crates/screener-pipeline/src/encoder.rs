//! 影像编码

use base64::Engine as _;
use reqwest::Url;
use screener_core::{EncodedImage, ImageHandle, Result, ScreenerError};
use std::path::PathBuf;
use tracing::{debug, error};

/// 把影像引用解析为本地路径
///
/// `file://` URI 按 URL 规则解析并做百分号解码，其他值视为普通路径。
pub fn local_path(image: &ImageHandle) -> Result<PathBuf> {
    if !image.is_file_uri() {
        return Ok(PathBuf::from(image.uri()));
    }
    let url = Url::parse(image.uri())
        .map_err(|e| ScreenerError::Io(format!("{}: {}", image, e)))?;
    url.to_file_path()
        .map_err(|_| ScreenerError::Io(format!("{} is not a local file URI", image)))
}

/// 读取本地影像并编码为 Base64
pub async fn encode_image(image: &ImageHandle) -> Result<EncodedImage> {
    let path = local_path(image)?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        error!("Failed to read image {}: {}", path.display(), e);
        ScreenerError::Io(format!("{}: {}", path.display(), e))
    })?;

    let encoded = encode_bytes(&bytes);
    debug!("Image converted to base64, {} characters", encoded.len());
    Ok(encoded)
}

pub fn encode_bytes(bytes: &[u8]) -> EncodedImage {
    EncodedImage::new(base64::engine::general_purpose::STANDARD.encode(bytes))
}
