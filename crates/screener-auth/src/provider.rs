//! 身份服务接口

use async_trait::async_trait;
use screener_core::{AuthUser, ProfileUpdate, UserProfile};
use std::fmt;

/// 身份服务返回的错误，`code` 形如 `auth/wrong-password`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for ProviderError {}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// 托管身份服务接口
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// 注册账户，并创建 `{uid, email, displayName, createdAt}` 资料记录
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> ProviderResult<AuthUser>;

    async fn sign_in(&self, email: &str, password: &str) -> ProviderResult<AuthUser>;

    async fn sign_out(&self) -> ProviderResult<()>;

    /// 发送重置密码邮件
    async fn reset_password(&self, email: &str) -> ProviderResult<()>;

    async fn get_profile(&self, uid: &str) -> ProviderResult<Option<UserProfile>>;

    /// 合并更新资料
    async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> ProviderResult<()>;
}
