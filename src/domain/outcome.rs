//! 注册结果
//!
//! 每次执行恰好产生一个 `TransactionOutcome`，生成后不可变。
//! 成功与失败都以数据形式返回给调用方。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCategory;

/// 流水线阶段（失败发生的位置）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Validation,
    Provider,
    ChainCheck,
    Balance,
    Approval,
    Availability,
    Simulation,
    Submission,
    Confirmation,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Provider => "provider",
            Self::ChainCheck => "chain_check",
            Self::Balance => "balance",
            Self::Approval => "approval",
            Self::Availability => "availability",
            Self::Simulation => "simulation",
            Self::Submission => "submission",
            Self::Confirmation => "confirmation",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 注册结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// 失败阶段；成功时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<PipelineStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl TransactionOutcome {
    pub fn succeeded(tx_hash: impl Into<String>, block_number: u64, full_name: impl Into<String>) -> Self {
        Self {
            success: true,
            tx_hash: Some(tx_hash.into()),
            block_number: Some(block_number),
            full_name: Some(full_name.into()),
            error_category: None,
            error_message: None,
            stage: None,
            approval_tx_hash: None,
            explorer_url: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(stage: PipelineStage, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_hash: None,
            block_number: None,
            full_name: None,
            error_category: Some(category),
            error_message: Some(message.into()),
            stage: Some(stage),
            approval_tx_hash: None,
            explorer_url: None,
            finished_at: Utc::now(),
        }
    }

    pub fn with_tx_hash(mut self, tx_hash: Option<String>) -> Self {
        if tx_hash.is_some() {
            self.tx_hash = tx_hash;
        }
        self
    }

    pub fn with_approval_tx_hash(mut self, tx_hash: Option<String>) -> Self {
        self.approval_tx_hash = tx_hash;
        self
    }

    pub fn with_explorer_url(mut self, url: Option<String>) -> Self {
        self.explorer_url = url;
        self
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcome() {
        let outcome = TransactionOutcome::succeeded("0xabc", 42, "alice.farcaster.celo");
        assert!(outcome.success);
        assert_eq!(outcome.block_number, Some(42));
        assert!(outcome.error_category.is_none());
        assert!(outcome.stage.is_none());
    }

    #[test]
    fn test_failed_outcome_serializes_camel_case() {
        let outcome = TransactionOutcome::failed(
            PipelineStage::Simulation,
            ErrorCategory::NameUnavailable,
            "taken",
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errorCategory"], "name_unavailable");
        assert_eq!(json["stage"], "simulation");
        assert!(json.get("txHash").is_none());
    }

    #[test]
    fn test_with_tx_hash_keeps_existing_on_none() {
        let outcome = TransactionOutcome::succeeded("0xabc", 1, "a.farcaster.celo").with_tx_hash(None);
        assert_eq!(outcome.tx_hash.as_deref(), Some("0xabc"));
    }
}
