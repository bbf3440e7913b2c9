//! 认证服务
//!
//! 包装注入的身份服务，记录每次操作，并把错误码映射为用户提示。

use crate::messages::auth_error_message;
use crate::provider::{AuthProvider, ProviderError};
use regex::Regex;
use screener_core::{AuthUser, ProfileUpdate, Result, ScreenerError, UserProfile};
use std::sync::Arc;
use tracing::{error, info};

pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    email_pattern: Regex,
}

fn map_provider_error(operation: &str, err: ProviderError) -> ScreenerError {
    error!("{} failed: {}", operation, err);
    ScreenerError::Auth {
        message: auth_error_message(&err.code).to_string(),
        code: err.code,
    }
}

fn local_error(code: &str) -> ScreenerError {
    ScreenerError::Auth {
        code: code.to_string(),
        message: auth_error_message(code).to_string(),
    }
}

impl AuthService {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            email_pattern: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"),
        }
    }

    /// 在请求身份服务前检查明显无效的输入
    fn check_credentials(&self, email: &str, password: &str) -> Result<()> {
        if !self.email_pattern.is_match(email.trim()) {
            return Err(local_error("auth/invalid-email"));
        }
        if password.is_empty() {
            return Err(local_error("auth/missing-password"));
        }
        Ok(())
    }

    pub async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<AuthUser> {
        info!("Sign up started for {}", email);
        self.check_credentials(email, password)?;

        let user = self
            .provider
            .sign_up(email.trim(), password, display_name)
            .await
            .map_err(|e| map_provider_error("Sign up", e))?;

        info!("User account created: {}", user.uid);
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        info!("Sign in started for {}", email);
        self.check_credentials(email, password)?;

        let user = self
            .provider
            .sign_in(email.trim(), password)
            .await
            .map_err(|e| map_provider_error("Sign in", e))?;

        info!("User logged in: {}", user.uid);
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.provider
            .sign_out()
            .await
            .map_err(|e| map_provider_error("Sign out", e))?;
        info!("User logged out");
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        info!("Password reset requested for {}", email);
        if !self.email_pattern.is_match(email.trim()) {
            return Err(local_error("auth/invalid-email"));
        }

        self.provider
            .reset_password(email.trim())
            .await
            .map_err(|e| map_provider_error("Password reset", e))?;
        info!("Password reset email sent");
        Ok(())
    }

    pub async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.provider
            .get_profile(uid)
            .await
            .map_err(|e| map_provider_error("Fetch profile", e))
    }

    pub async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<()> {
        self.provider
            .update_profile(uid, update)
            .await
            .map_err(|e| map_provider_error("Update profile", e))?;
        info!("User profile updated: {}", uid);
        Ok(())
    }
}
