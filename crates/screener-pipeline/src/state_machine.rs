//! 筛查流程状态机
//!
//! 管理单次筛查尝试的生命周期状态转换

use screener_core::{Result, ScreenerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 筛查尝试状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ScreeningState {
    Idle,          // 等待开始
    EncodingImage, // 读取并编码影像
    Submitting,    // 等待分类服务响应
    Processing,    // 归一化结果
    Complete,      // 已得到结果
    Failed,        // 失败（终态）
}

impl ScreeningState {
    /// 是否处于进行中
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::EncodingImage | Self::Submitting | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// 展示给用户的进度文字
    pub fn progress_message(&self) -> Option<&'static str> {
        match self {
            Self::EncodingImage => Some("Converting image to base64..."),
            Self::Submitting => Some("Sending to AI model..."),
            Self::Processing => Some("Processing results..."),
            _ => None,
        }
    }
}

impl fmt::Display for ScreeningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ScreeningEvent {
    Start,
    Encoded,
    ResponseReceived,
    Normalized,
    Error,
    Retry,
    Reset,
}

/// 筛查状态机
#[derive(Debug)]
pub struct ScreeningStateMachine {
    transitions: HashMap<(ScreeningState, ScreeningEvent), ScreeningState>,
}

impl ScreeningStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        use ScreeningEvent as E;
        use ScreeningState as S;

        let mut transitions = HashMap::new();

        // 正常流程
        transitions.insert((S::Idle, E::Start), S::EncodingImage);
        transitions.insert((S::EncodingImage, E::Encoded), S::Submitting);
        transitions.insert((S::Submitting, E::ResponseReceived), S::Processing);
        transitions.insert((S::Processing, E::Normalized), S::Complete);

        // 任一进行中状态都可能失败
        transitions.insert((S::EncodingImage, E::Error), S::Failed);
        transitions.insert((S::Submitting, E::Error), S::Failed);
        transitions.insert((S::Processing, E::Error), S::Failed);

        // 用户重试从头开始，完成后可开始新的筛查
        transitions.insert((S::Failed, E::Retry), S::Idle);
        transitions.insert((S::Complete, E::Reset), S::Idle);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: ScreeningState, event: ScreeningEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: ScreeningState, event: ScreeningEvent) -> Result<ScreeningState> {
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(ScreenerError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: ScreeningState) -> Vec<ScreeningEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current_state)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for ScreeningStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
