//! 错误分类体系
//!
//! 注册流程对外只暴露封闭的错误分类 `ErrorCategory`，每个分类对应唯一的
//! 用户提示模板。内部各阶段用 `StageFailure` 配合 `?` 传播，最终在会话层
//! 折叠为 `TransactionOutcome`，不会以 `Err` 形式越过公共边界。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::PipelineStage;

/// 错误分类（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ValidationError,
    ProviderUnavailable,
    ChainMismatch,
    /// 原生币不足（价格 + gas）
    InsufficientFunds,
    /// 代币余额不足
    InsufficientBalance,
    ApprovalFailed,
    NameUnavailable,
    InvalidIdentity,
    ContractRevertGeneric,
    ConfirmationFailed,
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 11] = [
        Self::ValidationError,
        Self::ProviderUnavailable,
        Self::ChainMismatch,
        Self::InsufficientFunds,
        Self::InsufficientBalance,
        Self::ApprovalFailed,
        Self::NameUnavailable,
        Self::InvalidIdentity,
        Self::ContractRevertGeneric,
        Self::ConfirmationFailed,
        Self::Unknown,
    ];

    /// 稳定的错误码（与 serde 表示一致）
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ChainMismatch => "chain_mismatch",
            Self::InsufficientFunds => "insufficient_funds",
            Self::InsufficientBalance => "insufficient_balance",
            Self::ApprovalFailed => "approval_failed",
            Self::NameUnavailable => "name_unavailable",
            Self::InvalidIdentity => "invalid_identity",
            Self::ContractRevertGeneric => "contract_revert_generic",
            Self::ConfirmationFailed => "confirmation_failed",
            Self::Unknown => "unknown",
        }
    }

    /// 用户提示模板
    ///
    /// 占位符：`{price}` `{symbol}` `{network}` `{name}` `{detail}`
    pub fn message_template(&self) -> &'static str {
        match self {
            Self::ValidationError => "Invalid registration details: {detail}",
            Self::ProviderUnavailable => {
                "No wallet provider found. Open this app inside a wallet or connect a browser wallet."
            }
            Self::ChainMismatch => {
                "Wallet is not on {network}. Please switch your wallet to {network} and try again."
            }
            Self::InsufficientFunds => {
                "Insufficient funds. You need {price} {symbol} plus gas fees. Please check your wallet balance."
            }
            Self::InsufficientBalance => {
                "Insufficient token balance. You need at least {price} to register."
            }
            Self::ApprovalFailed => "Token approval failed: {detail}",
            Self::NameUnavailable => {
                "The name \"{name}\" is not available. It may already be claimed."
            }
            Self::InvalidIdentity => {
                "The Farcaster ID is invalid or already has a registered name."
            }
            Self::ContractRevertGeneric => {
                "Transaction reverted. Please check your parameters and try again."
            }
            Self::ConfirmationFailed => {
                "Transaction was sent but could not be confirmed: {detail}"
            }
            Self::Unknown => "Registration failed: {detail}",
        }
    }

    /// 用上下文填充模板
    pub fn render(&self, ctx: &MessageContext) -> String {
        self.message_template()
            .replace("{price}", &ctx.price)
            .replace("{symbol}", &ctx.symbol)
            .replace("{network}", &ctx.network)
            .replace("{name}", &ctx.name)
            .replace("{detail}", &ctx.detail)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 提示模板的填充值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContext {
    pub price: String,
    pub symbol: String,
    pub network: String,
    pub name: String,
    pub detail: String,
}

impl MessageContext {
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// 流水线内部失败：哪个阶段、什么分类、原始信息
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failed [{category}]: {message}")]
pub struct StageFailure {
    pub stage: PipelineStage,
    pub category: ErrorCategory,
    /// 原始错误文本（未经模板化）
    pub message: String,
    /// 已广播交易的哈希（确认阶段失败时保留）
    pub tx_hash: Option<String>,
}

impl StageFailure {
    pub fn new(stage: PipelineStage, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            stage,
            category,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            PipelineStage::Validation,
            ErrorCategory::ValidationError,
            message,
        )
    }

    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }
}
