//! 配置管理
//!
//! 配置来源按优先级从低到高：内置默认值、TOML 配置文件、`SCREENER__` 前缀的环境变量。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 默认的分类服务地址
const DEFAULT_CLASSIFIER_ENDPOINT: &str =
    "https://serverless.roboflow.com/diabetic-retinopathy-gmqiq/2";

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<ScreenerConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// 分类服务配置
    pub classifier: ClassifierConfig,
    /// 本地存储配置
    pub storage: StorageConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 分类服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// 推理端点
    pub endpoint: String,
    /// API Key，作为查询参数发送
    pub api_key: String,
    /// 请求超时（秒），不设置时沿用传输层默认
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// 本地存储配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 数据目录
    pub data_dir: String,
}

impl StorageConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志过滤指令，例如 "info" 或 "screener_pipeline=debug"
    pub level: String,
    /// 是否输出颜色
    pub ansi: bool,
    /// 是否输出模块路径
    pub show_target: bool,
}

/// 配置验证规则
#[derive(Debug)]
struct ValidationRule {
    field_path: String,
    validator: fn(&ScreenerConfig) -> Result<()>,
    error_message: String,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

impl ConfigManager {
    /// 创建新的配置管理器
    ///
    /// `config_path` 指向的文件不存在时只使用默认值和环境变量。
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 加载配置
    fn load_config(config_path: Option<&str>) -> Result<ScreenerConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("SCREENER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: ScreenerConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取配置
    pub async fn get_config(&self) -> ScreenerConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 重新加载配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.validator.validate(&new_config)?;

        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded");
        Ok(())
    }

    /// 验证配置
    pub async fn validate_config(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }

    /// 写出一份默认配置文件
    pub async fn write_default(path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(&ScreenerConfig::default())
            .context("Failed to serialize configuration")?;

        tokio::fs::write(path, config_str)
            .await
            .with_context(|| format!("Failed to write configuration file {}", path))?;

        info!("Default configuration written to: {}", path);
        Ok(())
    }
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "classifier.endpoint".to_string(),
                validator: |config| {
                    let endpoint = &config.classifier.endpoint;
                    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!("Endpoint must be an http(s) URL, got {:?}", endpoint))
                    }
                },
                error_message: "Invalid classifier endpoint".to_string(),
            },
            ValidationRule {
                field_path: "classifier.timeout_secs".to_string(),
                validator: |config| {
                    if config.classifier.timeout_secs == Some(0) {
                        Err(anyhow::anyhow!("Timeout cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid classifier timeout".to_string(),
            },
            ValidationRule {
                field_path: "storage.data_dir".to_string(),
                validator: |config| {
                    if config.storage.data_dir.trim().is_empty() {
                        Err(anyhow::anyhow!("Data directory cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid storage directory".to_string(),
            },
            ValidationRule {
                field_path: "logging.level".to_string(),
                validator: |config| {
                    EnvFilter::try_new(&config.logging.level)
                        .map(|_| ())
                        .map_err(|e| anyhow::anyhow!("{}", e))
                },
                error_message: "Invalid logging level".to_string(),
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &ScreenerConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        if config.classifier.api_key.is_empty() {
            warn!("No classifier API key configured; requests will likely be rejected");
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CLASSIFIER_ENDPOINT.to_string(),
            api_key: String::new(),
            timeout_secs: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
            show_target: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let manager = ConfigManager::new(Some(missing.to_str().unwrap())).unwrap();

        let config = manager.get_config().await;
        assert_eq!(config.classifier.endpoint, DEFAULT_CLASSIFIER_ENDPOINT);
        assert_eq!(config.classifier.timeout(), None);
        assert_eq!(config.storage.data_dir, "./data");
    }

    #[tokio::test]
    async fn test_file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screener.toml");
        std::fs::write(
            &path,
            r#"
[classifier]
api_key = "file-key"
timeout_secs = 30

[storage]
data_dir = "/var/lib/screener"
"#,
        )
        .unwrap();

        let manager = ConfigManager::new(Some(path.to_str().unwrap())).unwrap();
        let config = manager.get_config().await;
        assert_eq!(config.classifier.api_key, "file-key");
        assert_eq!(config.classifier.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.classifier.endpoint, DEFAULT_CLASSIFIER_ENDPOINT);
        assert_eq!(config.storage.data_path(), PathBuf::from("/var/lib/screener"));
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screener.toml");
        std::fs::write(&path, "[logging]\nshow_target = false\n").unwrap();

        // 其他测试不读取该字段，避免并行测试间互相干扰
        std::env::set_var("SCREENER__LOGGING__SHOW_TARGET", "true");
        let result = ConfigManager::new(Some(path.to_str().unwrap()));
        std::env::remove_var("SCREENER__LOGGING__SHOW_TARGET");

        let config = result.unwrap().get_config().await;
        assert!(config.logging.show_target);
    }

    #[test]
    fn test_validator_rejects_bad_values() {
        let validator = ConfigValidator::new();
        assert!(validator.validate(&ScreenerConfig::default()).is_ok());

        let mut config = ScreenerConfig::default();
        config.classifier.endpoint = "ftp://example.com".to_string();
        assert!(validator.validate(&config).is_err());

        let mut config = ScreenerConfig::default();
        config.classifier.timeout_secs = Some(0);
        assert!(validator.validate(&config).is_err());

        let mut config = ScreenerConfig::default();
        config.storage.data_dir = "  ".to_string();
        assert!(validator.validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_write_default_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screener.toml");
        ConfigManager::write_default(path.to_str().unwrap()).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[classifier]"));

        let manager = ConfigManager::new(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(manager.get_config().await.storage.data_dir, "./data");
    }
}
