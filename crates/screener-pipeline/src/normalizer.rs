//! 分类结果归一化
//!
//! 把分类服务的类别词表映射为五级严重程度，置信度换算为保留一位小数的百分比。

use screener_core::{ClassificationResponse, Severity, SeverityLevel};
use tracing::{info, warn};

/// 分类服务标签到严重程度的精确映射表
const SEVERITY_MAPPING: &[(&str, SeverityLevel)] = &[
    ("No_DR", SeverityLevel::NoDR),
    ("Mild", SeverityLevel::Mild),
    ("Moderate", SeverityLevel::Moderate),
    ("Severe", SeverityLevel::Severe),
    ("Proliferative_DR", SeverityLevel::ProliferativeDR),
    // 服务偶尔返回的另一种拼写
    ("Proliferate_DR", SeverityLevel::ProliferativeDR),
];

/// 归一化后的分类结果
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedClassification {
    pub severity: Severity,
    pub confidence_percent: f64,
}

/// 按映射表查找标签
pub fn map_label(label: &str) -> Option<SeverityLevel> {
    SEVERITY_MAPPING
        .iter()
        .find(|(raw, _)| *raw == label)
        .map(|(_, level)| *level)
}

/// 置信度 [0, 1] 换算为百分比，四舍五入到一位小数
pub fn to_confidence_percent(confidence: f64) -> f64 {
    (confidence * 1000.0).round() / 10.0
}

/// 归一化分类响应
///
/// 未知标签不会报错，而是原样透传。
pub fn normalize(response: &ClassificationResponse) -> NormalizedClassification {
    let confidence_percent = to_confidence_percent(response.confidence);

    let severity = match map_label(&response.top) {
        Some(level) => {
            info!(
                "Classified as {} ({}%), raw label {}",
                level, confidence_percent, response.top
            );
            Severity::Known(level)
        }
        None => {
            warn!(
                "Unmapped classifier label '{}' ({}%), passing through unchanged",
                response.top, confidence_percent
            );
            Severity::Unmapped(response.top.clone())
        }
    };

    NormalizedClassification {
        severity,
        confidence_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vocabulary() {
        let cases = [
            ("No_DR", SeverityLevel::NoDR),
            ("Mild", SeverityLevel::Mild),
            ("Moderate", SeverityLevel::Moderate),
            ("Severe", SeverityLevel::Severe),
            ("Proliferative_DR", SeverityLevel::ProliferativeDR),
            ("Proliferate_DR", SeverityLevel::ProliferativeDR),
        ];

        for (label, expected) in cases {
            let normalized = normalize(&ClassificationResponse::new(label, 0.9));
            assert_eq!(normalized.severity, Severity::Known(expected), "label {}", label);
        }
    }

    #[test]
    fn test_proliferative_aliases_match() {
        assert_eq!(map_label("Proliferative_DR"), map_label("Proliferate_DR"));
    }

    #[test]
    fn test_lookup_is_exact_match() {
        assert_eq!(map_label("mild"), None);
        assert_eq!(map_label("No DR"), None);
        assert_eq!(map_label(" Severe"), None);
    }

    #[test]
    fn test_unmapped_label_passes_through() {
        let normalized = normalize(&ClassificationResponse::new("Unknown_Class", 0.42));
        assert_eq!(normalized.severity, Severity::Unmapped("Unknown_Class".to_string()));
        assert_eq!(normalized.severity.label(), "Unknown_Class");
        assert_eq!(normalized.confidence_percent, 42.0);
    }

    #[test]
    fn test_confidence_rounding() {
        assert_eq!(to_confidence_percent(0.875), 87.5);
        assert_eq!(to_confidence_percent(0.8751), 87.5);
        assert_eq!(to_confidence_percent(0.8755), 87.6);
        assert_eq!(to_confidence_percent(0.623), 62.3);
        assert_eq!(to_confidence_percent(0.9999), 100.0);
        assert_eq!(to_confidence_percent(0.0), 0.0);
        assert_eq!(to_confidence_percent(1.0), 100.0);
    }
}
