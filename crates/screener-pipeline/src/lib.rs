//! # 筛查流程模块
//!
//! 负责一次筛查从取图到出结果的完整流程：
//! - 影像获取：从设备来源得到本地影像引用
//! - 编码：读取影像并转为 Base64 文本
//! - 远程分类：调用托管的分类服务
//! - 结果归一化：映射为五级严重程度和百分制置信度
//! - 流程状态机：管理单次筛查尝试的生命周期

pub mod acquisition;
pub mod classifier;
pub mod encoder;
pub mod engine;
pub mod normalizer;
pub mod state_machine;

// 重新导出主要类型
pub use acquisition::{ImageSource, LocalFileSource};
pub use classifier::{
    parse_response, validate_response, ClassifierClient, MockClassifier, RoboflowClient,
    DEFAULT_ENDPOINT,
};
pub use encoder::{encode_bytes, encode_image, local_path};
pub use engine::{ProgressCallback, ScreeningSession};
pub use normalizer::{normalize, to_confidence_percent, NormalizedClassification};
pub use state_machine::{ScreeningEvent, ScreeningState, ScreeningStateMachine};
