//! # 认证模块
//!
//! 身份认证完全委托给托管的身份服务，本模块提供：
//! - 身份服务接口及其错误码
//! - 错误码到用户提示的映射表
//! - 带日志和错误映射的认证服务
//! - 用于测试和演示的内存实现

pub mod memory;
pub mod messages;
pub mod provider;
pub mod service;

pub use memory::InMemoryAuthProvider;
pub use messages::{auth_error_message, DEFAULT_AUTH_ERROR_MESSAGE};
pub use provider::{AuthProvider, ProviderError};
pub use service::AuthService;
