//! 本地用户资料缓存

use crate::kv::KeyValueStore;
use screener_core::{LocalProfile, Result, ScreenerError};
use std::sync::Arc;
use tracing::info;

/// 用户资料的存储键
pub const PROFILE_KEY: &str = "user_profile";

pub struct ProfileCache {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Option<LocalProfile>> {
        match self.store.get(PROFILE_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                ScreenerError::Storage(format!("profile could not be parsed: {}", e))
            }),
            None => Ok(None),
        }
    }

    pub async fn save(&self, profile: &LocalProfile) -> Result<()> {
        let serialized = serde_json::to_string(profile)?;
        self.store.set(PROFILE_KEY, &serialized).await?;
        info!("Profile updated for {}", profile.email);
        Ok(())
    }

    /// 退出登录时清除缓存
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(PROFILE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let cache = ProfileCache::new(Arc::new(MemoryStore::new()));
        assert_eq!(cache.load().await.unwrap(), None);

        let profile = LocalProfile {
            name: "Dr. Muhammad".to_string(),
            email: "muhammad@hospital.com".to_string(),
            phone: "+1 234 567 8900".to_string(),
            specialty: "Ophthalmology".to_string(),
        };
        cache.save(&profile).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), Some(profile));

        cache.clear().await.unwrap();
        assert_eq!(cache.load().await.unwrap(), None);
    }
}
