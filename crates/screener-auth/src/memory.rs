//! 内存身份服务
//!
//! 行为与托管身份服务的错误码保持一致，用于测试和演示。

use crate::provider::{AuthProvider, ProviderError, ProviderResult};
use async_trait::async_trait;
use chrono::Utc;
use screener_core::{AuthUser, ProfileUpdate, UserProfile};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// 连续登录失败达到该次数后拒绝请求
const MAX_FAILED_ATTEMPTS: u32 = 5;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    password: String,
    display_name: String,
    disabled: bool,
    failed_attempts: u32,
}

impl Account {
    fn user(&self) -> AuthUser {
        AuthUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAuthProvider {
    accounts: RwLock<HashMap<String, Account>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
    session: RwLock<Option<AuthUser>>,
    reset_requests: RwLock<Vec<String>>,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current_user(&self) -> Option<AuthUser> {
        self.session.read().await.clone()
    }

    /// 已发送重置邮件的地址
    pub async fn password_reset_requests(&self) -> Vec<String> {
        self.reset_requests.read().await.clone()
    }

    /// 停用账户
    pub async fn disable(&self, email: &str) -> bool {
        match self.accounts.write().await.get_mut(&email.to_lowercase()) {
            Some(account) => {
                account.disabled = true;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> ProviderResult<AuthUser> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(ProviderError::new(
                "auth/weak-password",
                "Password should be at least 6 characters",
            ));
        }

        let key = email.to_lowercase();
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(ProviderError::new(
                "auth/email-already-in-use",
                "The email address is already in use by another account",
            ));
        }

        let account = Account {
            uid: Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            password: password.to_string(),
            display_name: display_name.to_string(),
            disabled: false,
            failed_attempts: 0,
        };
        let user = account.user();
        accounts.insert(key, account);
        drop(accounts);

        self.profiles.write().await.insert(
            user.uid.clone(),
            UserProfile {
                uid: user.uid.clone(),
                email: user.email.clone(),
                display_name: user.display_name.clone(),
                specialty: None,
                phone: None,
                created_at: Utc::now(),
            },
        );
        *self.session.write().await = Some(user.clone());

        debug!("Created in-memory account {}", user.uid);
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> ProviderResult<AuthUser> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&email.to_lowercase())
            .ok_or_else(|| ProviderError::new("auth/user-not-found", "There is no user record"))?;

        if account.disabled {
            return Err(ProviderError::new("auth/user-disabled", "The user account has been disabled"));
        }
        if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
            return Err(ProviderError::new(
                "auth/too-many-requests",
                "Access temporarily disabled due to many failed login attempts",
            ));
        }
        if account.password != password {
            account.failed_attempts += 1;
            return Err(ProviderError::new("auth/wrong-password", "The password is invalid"));
        }

        account.failed_attempts = 0;
        let user = account.user();
        drop(accounts);

        *self.session.write().await = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> ProviderResult<()> {
        *self.session.write().await = None;
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> ProviderResult<()> {
        if !self.accounts.read().await.contains_key(&email.to_lowercase()) {
            return Err(ProviderError::new("auth/user-not-found", "There is no user record"));
        }
        self.reset_requests.write().await.push(email.to_string());
        Ok(())
    }

    async fn get_profile(&self, uid: &str) -> ProviderResult<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(uid).cloned())
    }

    async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> ProviderResult<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| ProviderError::new("not-found", "No profile document for user"))?;
        profile.apply(update);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let provider = InMemoryAuthProvider::new();
        let err = provider.sign_up("a@b.com", "123", "A").await.unwrap_err();
        assert_eq!(err.code, "auth/weak-password");
    }

    #[tokio::test]
    async fn test_throttles_after_repeated_failures() {
        let provider = InMemoryAuthProvider::new();
        provider.sign_up("a@b.com", "secret123", "A").await.unwrap();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            let err = provider.sign_in("a@b.com", "nope").await.unwrap_err();
            assert_eq!(err.code, "auth/wrong-password");
        }
        let err = provider.sign_in("a@b.com", "secret123").await.unwrap_err();
        assert_eq!(err.code, "auth/too-many-requests");
    }

    #[tokio::test]
    async fn test_disabled_account() {
        let provider = InMemoryAuthProvider::new();
        provider.sign_up("a@b.com", "secret123", "A").await.unwrap();
        assert!(provider.disable("A@B.com").await);

        let err = provider.sign_in("a@b.com", "secret123").await.unwrap_err();
        assert_eq!(err.code, "auth/user-disabled");
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let provider = InMemoryAuthProvider::new();
        provider.sign_up("Doc@Hospital.com", "secret123", "A").await.unwrap();
        assert!(provider.sign_in("doc@hospital.com", "secret123").await.is_ok());
    }
}
