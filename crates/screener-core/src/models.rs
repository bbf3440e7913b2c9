//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::generate_result_id;

/// 本地影像引用（文件路径或 `file://` URI）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    uri: String,
}

impl ImageHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_file_uri(&self) -> bool {
        self.uri.starts_with("file://")
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Base64 编码后的影像，仅在一次分类请求期间存在
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn new(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

// 编码内容可能有数MB，调试输出只保留长度
impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedImage({} chars)", self.0.len())
    }
}

/// 影像尺寸
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// 单个类别的预测分数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrediction {
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(default)]
    pub class_id: Option<i64>,
    pub confidence: f64,
}

/// 远程分类服务的原始响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    #[serde(default)]
    pub inference_id: Option<String>,
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub image: Option<ImageDimensions>,
    #[serde(default)]
    pub predictions: Vec<ClassPrediction>,
    /// 得分最高的类别标签
    pub top: String,
    /// 最高类别的置信度，范围 [0, 1]
    pub confidence: f64,
}

impl ClassificationResponse {
    /// 仅包含 top 和 confidence 的响应，主要用于测试和演示
    pub fn new(top: impl Into<String>, confidence: f64) -> Self {
        Self {
            inference_id: None,
            time: None,
            image: None,
            predictions: Vec::new(),
            top: top.into(),
            confidence,
        }
    }
}

/// 糖尿病视网膜病变严重程度（按病程排序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityLevel {
    NoDR,
    Mild,
    Moderate,
    Severe,
    ProliferativeDR,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 5] = [
        SeverityLevel::NoDR,
        SeverityLevel::Mild,
        SeverityLevel::Moderate,
        SeverityLevel::Severe,
        SeverityLevel::ProliferativeDR,
    ];

    /// 展示与持久化使用的标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoDR => "No DR",
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
            Self::ProliferativeDR => "Proliferative DR",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.label() == label)
    }

    /// 除无病变外都需要转诊眼科医生
    pub fn requires_referral(&self) -> bool {
        *self != Self::NoDR
    }

    /// 需要紧急处理
    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::Severe | Self::ProliferativeDR)
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 筛查结果中携带的严重程度
///
/// 分类器返回未知标签时原样透传，保证字段始终有值。
///
/// 持久化形式是纯字符串标签，读取时按显示标签识别等级。透传的原始标签若恰好
/// 等于某个显示标签（例如 `"No DR"`），重新读取后会变为对应的 `Known` 等级。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Known(SeverityLevel),
    Unmapped(String),
}

impl Severity {
    pub fn level(&self) -> Option<SeverityLevel> {
        match self {
            Self::Known(level) => Some(*level),
            Self::Unmapped(_) => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Known(level) => level.label(),
            Self::Unmapped(raw) => raw,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl From<SeverityLevel> for Severity {
    fn from(level: SeverityLevel) -> Self {
        Self::Known(level)
    }
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        match SeverityLevel::from_label(&label) {
            Some(level) => Self::Known(level),
            None => Self::Unmapped(label),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Known(level) => level.label().to_string(),
            Severity::Unmapped(raw) => raw,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 一次筛查的最终结果，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningResult {
    pub id: String,
    pub image_uri: String,
    pub severity: Severity,
    /// 0-100，保留一位小数
    pub confidence: f64,
    pub date: DateTime<Utc>,
}

impl ScreeningResult {
    pub fn new(image_uri: impl Into<String>, severity: Severity, confidence: f64) -> Self {
        Self {
            id: generate_result_id(),
            image_uri: image_uri.into(),
            severity,
            confidence,
            date: Utc::now(),
        }
    }

    /// 分享面板使用的文本
    pub fn share_message(&self) -> String {
        format!(
            "DR Screening Result:\nSeverity: {}\nConfidence: {}%\nDate: {}",
            self.severity,
            self.confidence,
            self.date.format("%Y-%m-%d")
        )
    }
}

/// 本地缓存的用户资料
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub specialty: String,
}

/// 身份服务中保存的用户资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 用户资料的部分更新（合并语义）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UserProfile {
    /// 合并部分更新，未提供的字段保持不变
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(display_name) = update.display_name {
            self.display_name = display_name;
        }
        if let Some(specialty) = update.specialty {
            self.specialty = Some(specialty);
        }
        if let Some(phone) = update.phone {
            self.phone = Some(phone);
        }
    }
}

/// 已登录用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: String,
}
