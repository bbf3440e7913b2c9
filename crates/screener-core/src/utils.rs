//! 通用工具函数

use chrono::Utc;
use uuid::Uuid;

/// 生成筛查结果ID
///
/// 毫秒时间戳加随机后缀，同一毫秒内生成的ID也不会冲突。
pub fn generate_result_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// 从结果ID中取出毫秒时间戳
pub fn result_id_timestamp(id: &str) -> Option<i64> {
    id.split('-').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_result_id_is_time_based() {
        let before = Utc::now().timestamp_millis();
        let id = generate_result_id();
        let after = Utc::now().timestamp_millis();

        let ts = result_id_timestamp(&id).unwrap();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_generate_result_id_unique_in_burst() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_result_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_result_id_timestamp_handles_legacy_ids() {
        assert_eq!(result_id_timestamp("1765706400000"), Some(1765706400000));
        assert_eq!(result_id_timestamp("not-a-number"), None);
    }
}
