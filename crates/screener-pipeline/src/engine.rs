//! 筛查流程编排
//!
//! 协调编码、远程分类和归一化，由状态机记录单次筛查尝试的进度。
//! 保存到历史是完成后的独立显式操作。

use crate::{
    classifier::{validate_response, ClassifierClient},
    encoder::encode_image,
    normalizer::normalize,
    state_machine::{ScreeningEvent, ScreeningState, ScreeningStateMachine},
};
use screener_core::{ImageHandle, Result, ScreenerError, ScreeningResult};
use screener_storage::HistoryStore;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 状态进入回调
pub type ProgressCallback = Box<dyn Fn(ScreeningState) + Send + Sync>;

/// 单次筛查会话
pub struct ScreeningSession {
    classifier: Arc<dyn ClassifierClient>,
    state_machine: ScreeningStateMachine,
    state: ScreeningState,
    image: Option<ImageHandle>,
    result: Option<ScreeningResult>,
    last_error: Option<String>,
    /// 当前结果是否已写入历史
    saved: bool,
    on_progress: Option<ProgressCallback>,
}

impl ScreeningSession {
    pub fn new(classifier: Arc<dyn ClassifierClient>) -> Self {
        Self {
            classifier,
            state_machine: ScreeningStateMachine::new(),
            state: ScreeningState::Idle,
            image: None,
            result: None,
            last_error: None,
            saved: false,
            on_progress: None,
        }
    }

    /// 注册进度回调
    pub fn with_progress(mut self, callback: impl Fn(ScreeningState) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> ScreeningState {
        self.state
    }

    pub fn result(&self) -> Option<&ScreeningResult> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        self.image.as_ref()
    }

    fn apply(&mut self, event: ScreeningEvent) -> Result<()> {
        let next = self.state_machine.transition(self.state, event)?;
        self.state = next;
        if let Some(callback) = &self.on_progress {
            callback(next);
        }
        Ok(())
    }

    /// 对一张影像运行完整流程
    ///
    /// 只能在 `Idle` 状态下调用。任一步骤失败都会进入 `Failed`，不会保留部分结果。
    pub async fn run(&mut self, image: ImageHandle) -> Result<ScreeningResult> {
        if self.state != ScreeningState::Idle {
            return Err(ScreenerError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                event: format!("{:?}", ScreeningEvent::Start),
            });
        }

        info!("Screening started for {}", image);
        self.result = None;
        self.last_error = None;
        self.saved = false;
        self.image = Some(image.clone());
        self.apply(ScreeningEvent::Start)?;

        match self.execute(&image).await {
            Ok(result) => {
                info!(
                    "Screening completed: {} ({}%)",
                    result.severity, result.confidence
                );
                self.result = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                error!("Screening failed in {:?}: {}", self.state, e);
                self.last_error = Some(e.user_message());
                // 只有进行中状态能转到 Failed；状态转换本身出错时保持原状态
                if self.state.is_in_progress() {
                    self.apply(ScreeningEvent::Error)?;
                }
                Err(e)
            }
        }
    }

    async fn execute(&mut self, image: &ImageHandle) -> Result<ScreeningResult> {
        let encoded = encode_image(image).await?;
        self.apply(ScreeningEvent::Encoded)?;

        let response = self.classifier.classify(&encoded).await?;
        drop(encoded);
        self.apply(ScreeningEvent::ResponseReceived)?;

        // 置信度必须是 [0, 1] 内的有限值
        validate_response(&response)?;

        let normalized = normalize(&response);
        let result = ScreeningResult::new(
            image.uri(),
            normalized.severity,
            normalized.confidence_percent,
        );
        self.apply(ScreeningEvent::Normalized)?;
        Ok(result)
    }

    /// 用户手动重试：回到 `Idle` 后对同一影像从头运行
    pub async fn retry(&mut self) -> Result<ScreeningResult> {
        let image = self.image.clone().ok_or_else(|| {
            ScreenerError::Validation("no previous screening to retry".to_string())
        })?;
        warn!("Retrying screening for {}", image);
        self.apply(ScreeningEvent::Retry)?;
        self.run(image).await
    }

    /// 完成后重置，准备新的筛查
    pub fn reset(&mut self) -> Result<()> {
        self.apply(ScreeningEvent::Reset)?;
        self.image = None;
        self.result = None;
        self.last_error = None;
        self.saved = false;
        Ok(())
    }

    /// 把已完成的结果保存到历史
    ///
    /// 每个结果只能保存一次，重复保存返回 `Validation`。
    pub async fn save(&mut self, history: &HistoryStore) -> Result<()> {
        let result = match (&self.state, &self.result) {
            (ScreeningState::Complete, Some(result)) => result,
            _ => {
                return Err(ScreenerError::Validation(format!(
                    "cannot save a screening in state {:?}",
                    self.state
                )))
            }
        };
        if self.saved {
            warn!("Screening result {} already saved", result.id);
            return Err(ScreenerError::Validation(format!(
                "screening result {} is already saved",
                result.id
            )));
        }

        history.save(result.clone()).await?;
        self.saved = true;
        Ok(())
    }
}
