pub mod approval_coordinator;
pub mod balance_verifier;
pub mod chain_guard; // 目标链对齐（切换 / 添加网络）
pub mod error_classifier;
pub mod gas_estimator;
pub mod provider_resolver;
pub mod receipt_waiter;
pub mod registration_executor; // 注册流水线核心
pub mod registration_session;
pub mod registry_client;
pub mod revert_decoder;
pub mod wallet_connector;

pub use approval_coordinator::{ApprovalCoordinator, ApprovalFailed, ApprovalState};
pub use balance_verifier::{BalanceCheck, BalanceVerifier};
pub use chain_guard::{ChainConfirmation, ChainGuard, ChainMismatchError};
pub use error_classifier::classify;
pub use gas_estimator::{GasEstimate, GasEstimator};
pub use provider_resolver::{ProviderError, ProviderResolver, ProviderSlot, ProviderSource, ResolvedProvider};
pub use receipt_waiter::{ConfirmationError, ReceiptWaiter};
pub use registration_executor::RegistrationExecutor;
pub use registration_session::RegistrationSession;
pub use registry_client::{DomainInfo, RegistryAbiVariant, RegistryClient, RegistryError};
