//! # 筛查存储模块
//!
//! 负责本地持久化：键值存储、筛查历史、用户资料缓存和引导完成标记。

pub mod history;
pub mod kv;
pub mod onboarding;
pub mod profile;

pub use history::{History, HistoryStore, HistorySummary, MonthGroup, HISTORY_KEY};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use onboarding::{OnboardingFlag, ONBOARDING_KEY};
pub use profile::{ProfileCache, PROFILE_KEY};
