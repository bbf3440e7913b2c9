//! 首次启动引导标记

use crate::kv::KeyValueStore;
use screener_core::Result;
use std::sync::Arc;

/// 引导完成标记的存储键
pub const ONBOARDING_KEY: &str = "hasLaunched";

pub struct OnboardingFlag {
    store: Arc<dyn KeyValueStore>,
}

impl OnboardingFlag {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn is_complete(&self) -> Result<bool> {
        Ok(self.store.get(ONBOARDING_KEY).await?.as_deref() == Some("true"))
    }

    pub async fn mark_complete(&self) -> Result<()> {
        self.store.set(ONBOARDING_KEY, "true").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[tokio::test]
    async fn test_onboarding_flag() {
        let kv = Arc::new(MemoryStore::new());
        let flag = OnboardingFlag::new(kv.clone());
        assert!(!flag.is_complete().await.unwrap());

        flag.mark_complete().await.unwrap();
        assert!(flag.is_complete().await.unwrap());
        assert_eq!(kv.get(ONBOARDING_KEY).await.unwrap().as_deref(), Some("true"));
    }
}
