//! Domain 模块
//!
//! 注册流程的核心数据模型

pub mod chain_guard_state;
pub mod network;
pub mod outcome;
pub mod payment_mode;
pub mod registration;
pub mod wallet_account;

// 重新导出常用类型
pub use chain_guard_state::ChainGuardState;
pub use network::{NativeCurrency, NetworkDefinition, CELO_ALFAJORES_CHAIN_ID, CELO_MAINNET_CHAIN_ID};
pub use outcome::{PipelineStage, TransactionOutcome};
pub use payment_mode::PaymentMode;
pub use registration::{full_name, RegistrationParams, ValidationError};
pub use wallet_account::WalletAccount;
