//! Nameforge - 链上名称注册交易编排
//!
//! 从校验过的注册请求出发，依次完成钱包 Provider 发现、目标链对齐、余额检查、
//! 代币授权（可选）、预检模拟、提交与确认，最终得到确定的 `TransactionOutcome`。
//! 公共边界上不抛错误：失败以分类后的数据返回。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{ErrorCategory, StageFailure};
pub use service::RegistrationSession;

pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{PaymentMode, RegistrationParams, TransactionOutcome, WalletAccount},
        error::ErrorCategory,
        service::{ProviderSlot, ProviderSource, RegistrationSession},
    };
}
