//! 错误定义模块

use std::fmt;
use thiserror::Error;

/// 分析失败的具体来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisFailureKind {
    /// 未收到任何响应（连接失败、传输中断）
    Network,
    /// 服务返回了非成功状态码
    HttpStatus(u16),
    /// 响应体无法解析
    MalformedResponse,
}

impl fmt::Display for AnalysisFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::HttpStatus(code) => write!(f, "http {}", code),
            Self::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

/// 筛查系统统一错误类型
#[derive(Error, Debug)]
pub enum ScreenerError {
    #[error("权限被拒绝: {0}")]
    PermissionDenied(String),

    #[error("用户取消了操作")]
    Cancelled,

    #[error("IO错误: {0}")]
    Io(String),

    #[error("分析失败 ({kind}): {message}")]
    Analysis {
        kind: AnalysisFailureKind,
        message: String,
    },

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("认证错误 [{code}]: {message}")]
    Auth { code: String, message: String },

    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },
}

impl ScreenerError {
    /// 构造分析错误
    pub fn analysis(kind: AnalysisFailureKind, message: impl Into<String>) -> Self {
        Self::Analysis {
            kind,
            message: message.into(),
        }
    }

    /// 是否允许用户手动重试
    ///
    /// 只有分类请求失败可以重试；重试会从头重新运行整个流程。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Analysis { .. })
    }

    /// 面向用户的提示文本
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied(what) => {
                format!("Permission Required: {} access is needed.", what)
            }
            Self::Cancelled => "No image selected.".to_string(),
            Self::Io(message) => format!("Could not read the image: {}", message),
            Self::Analysis { message, .. } => format!("Analysis failed: {}", message),
            Self::Storage(_) | Self::Serialization(_) => "Failed to save result".to_string(),
            Self::Auth { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ScreenerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// 筛查系统统一结果类型
pub type Result<T> = std::result::Result<T, ScreenerError>;
