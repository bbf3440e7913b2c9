//! 筛查历史存储
//!
//! 历史记录以单个 JSON 数组保存在键值存储中，最新的结果排在最前。

use crate::kv::KeyValueStore;
use chrono::{DateTime, Utc};
use screener_core::{Result, ScreenerError, ScreeningResult, SeverityLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// 历史记录的存储键
pub const HISTORY_KEY: &str = "dr_history";

/// 有序的筛查历史，最新在前
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<ScreeningResult>,
}

/// 按月份分组的历史记录
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGroup {
    /// 例如 "December 2025"
    pub label: String,
    pub entries: Vec<ScreeningResult>,
}

/// 历史统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total: usize,
    pub by_severity: BTreeMap<SeverityLevel, usize>,
    /// 分类器返回未知标签的记录数
    pub unmapped: usize,
    pub referrals: usize,
    pub latest: Option<DateTime<Utc>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ScreeningResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScreeningResult> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ScreeningResult> {
        self.entries.first()
    }

    pub fn get(&self, id: &str) -> Option<&ScreeningResult> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// 插入到最前
    pub fn prepend(&mut self, result: ScreeningResult) {
        self.entries.insert(0, result);
    }

    /// 按月份分组，保持原有顺序
    pub fn group_by_month(&self) -> Vec<MonthGroup> {
        let mut groups: Vec<MonthGroup> = Vec::new();
        for entry in &self.entries {
            let label = entry.date.format("%B %Y").to_string();
            match groups.iter_mut().find(|group| group.label == label) {
                Some(group) => group.entries.push(entry.clone()),
                None => groups.push(MonthGroup {
                    label,
                    entries: vec![entry.clone()],
                }),
            }
        }
        groups
    }

    pub fn summary(&self) -> HistorySummary {
        let mut summary = HistorySummary {
            total: self.entries.len(),
            latest: self.entries.iter().map(|e| e.date).max(),
            ..Default::default()
        };

        for entry in &self.entries {
            match entry.severity.level() {
                Some(level) => {
                    *summary.by_severity.entry(level).or_insert(0) += 1;
                    if level.requires_referral() {
                        summary.referrals += 1;
                    }
                }
                None => summary.unmapped += 1,
            }
        }
        summary
    }
}

impl From<Vec<ScreeningResult>> for History {
    fn from(entries: Vec<ScreeningResult>) -> Self {
        Self { entries }
    }
}

/// 筛查历史存储
///
/// 同一实例上的保存操作串行执行；多个实例共享同一底层存储时仍是后写覆盖。
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// 读取历史，不存在时返回空历史
    pub async fn load(&self) -> Result<History> {
        let Some(raw) = self.store.get(HISTORY_KEY).await? else {
            debug!("No stored history, starting empty");
            return Ok(History::new());
        };

        serde_json::from_str(&raw).map_err(|e| {
            ScreenerError::Storage(format!("history blob could not be parsed: {}", e))
        })
    }

    /// 读取历史，失败时记录日志并按空历史处理
    pub async fn load_or_empty(&self) -> History {
        match self.load().await {
            Ok(history) => history,
            Err(e) => {
                error!("Failed to load history: {}", e);
                History::new()
            }
        }
    }

    /// 保存一条结果到历史最前
    pub async fn save(&self, result: ScreeningResult) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut history = self.load().await?;
        let id = result.id.clone();
        history.prepend(result);

        let serialized = serde_json::to_string(&history)?;
        self.store.set(HISTORY_KEY, &serialized).await?;

        info!("Saved screening result {} ({} in history)", id, history.len());
        Ok(())
    }
}
