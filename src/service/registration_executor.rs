//! 注册执行器
//!
//! 校验 → 可用性预检 → 预检模拟 → 提交 → 等待一次确认。
//! 每一步都可以短路后续步骤；所有失败都被分类后折叠进 `TransactionOutcome`。
//! 两种支付方式共用同一条流程，只在交易 value 上有差别。

use ethers::types::{Bytes, U256};

use crate::{
    domain::{NetworkDefinition, PaymentMode, PipelineStage, RegistrationParams, TransactionOutcome},
    error::{ErrorCategory, MessageContext, StageFailure},
    infrastructure::WalletSigner,
    service::{
        chain_guard::ChainConfirmation,
        error_classifier::classify,
        receipt_waiter::{ConfirmationError, ReceiptWaiter},
        registry_client::RegistryClient,
        revert_decoder::{annotate, revert_reason},
    },
    utils::{short_address, wei_to_native},
};

/// 失败回执的固定描述，交给分类器归入 revert 类
const RECEIPT_REVERTED: &str = "Register transaction failed or was reverted";

pub struct RegistrationExecutor {
    registry: RegistryClient,
    receipt_waiter: ReceiptWaiter,
    network: NetworkDefinition,
    name_suffix: String,
    price: U256,
}

impl RegistrationExecutor {
    pub fn new(
        registry: RegistryClient,
        receipt_waiter: ReceiptWaiter,
        network: NetworkDefinition,
        name_suffix: impl Into<String>,
        price: U256,
    ) -> Self {
        Self {
            registry,
            receipt_waiter,
            network,
            name_suffix: name_suffix.into(),
            price,
        }
    }

    pub fn price(&self) -> U256 {
        self.price
    }

    pub fn name_suffix(&self) -> &str {
        &self.name_suffix
    }

    /// 交易 value：原生币模式为价格，代币模式为 0
    pub fn call_value(&self, mode: &PaymentMode) -> U256 {
        match mode {
            PaymentMode::NativeCurrency => self.price,
            PaymentMode::FungibleToken(_) => U256::zero(),
        }
    }

    /// 用户提示模板的填充上下文
    pub fn message_context(&self, name: &str) -> MessageContext {
        let currency = &self.network.native_currency;
        let price = wei_to_native(self.price, currency.decimals)
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("{} wei", self.price));
        MessageContext {
            price,
            symbol: currency.symbol.clone(),
            network: self.network.chain_name.clone(),
            name: name.to_string(),
            detail: String::new(),
        }
    }

    /// 执行一次注册；不会返回 `Err`
    pub async fn execute(
        &self,
        params: &RegistrationParams,
        mode: &PaymentMode,
        signer: &WalletSigner,
        confirmation: &ChainConfirmation,
    ) -> TransactionOutcome {
        let full_name = params.full_name(&self.name_suffix);
        match self.run(params, mode, signer, confirmation, &full_name).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                let outcome = outcome_from_failure(failure, &self.message_context(&full_name));
                if params.validate().is_ok() {
                    outcome.with_full_name(full_name)
                } else {
                    outcome
                }
            }
        }
    }

    async fn run(
        &self,
        params: &RegistrationParams,
        mode: &PaymentMode,
        signer: &WalletSigner,
        confirmation: &ChainConfirmation,
        full_name: &str,
    ) -> Result<TransactionOutcome, StageFailure> {
        // 1. 本地校验，不访问网络
        params
            .validate()
            .map_err(|e| StageFailure::validation(e.problems.join(", ")))?;

        // 链确认必须针对当前签名账户与目标链
        if confirmation.account() != signer.address()
            || confirmation.chain_id() != self.network.chain_id
        {
            return Err(StageFailure::new(
                PipelineStage::ChainCheck,
                ErrorCategory::ChainMismatch,
                format!(
                    "chain confirmation is for {} on chain {}, signer is {} on chain {}",
                    short_address(&confirmation.account()),
                    confirmation.chain_id(),
                    short_address(&signer.address()),
                    self.network.chain_id
                ),
            ));
        }

        let calldata = self
            .registry
            .register_calldata(full_name, params)
            .map_err(|e| StageFailure::validation(e.to_string()))?;
        let value = self.call_value(mode);

        // 2. 可用性预检（尽力而为）
        self.check_availability(full_name).await?;

        // 3. 预检模拟
        self.simulate(signer, &calldata, value, full_name).await?;

        // 4. 提交
        let tx_hash = signer
            .send_transaction(self.registry.contract(), &calldata, value)
            .await
            .map_err(|e| {
                let raw = annotate(&e.raw_text(), e.revert_data().as_deref());
                tracing::error!(name = %full_name, error = %raw, "Register submission failed");
                StageFailure::new(PipelineStage::Submission, classify(&raw), raw)
            })?;

        tracing::info!(
            name = %full_name,
            tx_hash = %tx_hash,
            mode = %mode,
            "Register transaction sent"
        );

        // 5. 等待一次确认
        let receipt = self
            .receipt_waiter
            .wait(&tx_hash)
            .await
            .map_err(|e| confirmation_failure(e, full_name))?;

        if !receipt.is_success() {
            tracing::error!(
                name = %full_name,
                tx_hash = %tx_hash,
                status = ?receipt.status,
                "Register transaction reverted"
            );
            return Err(StageFailure::new(
                PipelineStage::Confirmation,
                classify(RECEIPT_REVERTED),
                RECEIPT_REVERTED,
            )
            .with_tx_hash(tx_hash));
        }

        let block_number = receipt.block_number.unwrap_or_default();
        tracing::info!(
            name = %full_name,
            tx_hash = %tx_hash,
            block_number,
            "Registration confirmed"
        );

        Ok(TransactionOutcome::succeeded(tx_hash, block_number, full_name)
            .with_explorer_url(self.network.explorer_tx_url(&receipt.tx_hash)))
    }

    async fn check_availability(&self, full_name: &str) -> Result<(), StageFailure> {
        match self.registry.is_available(full_name).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::info!(name = %full_name, "Name reported unavailable by registry");
                Err(StageFailure::new(
                    PipelineStage::Availability,
                    ErrorCategory::NameUnavailable,
                    format!("{} is not available", full_name),
                ))
            }
            Err(e) => {
                // 合约才是最终裁决者
                tracing::warn!(name = %full_name, error = %e, "Availability check failed, proceeding");
                Ok(())
            }
        }
    }

    async fn simulate(
        &self,
        signer: &WalletSigner,
        calldata: &Bytes,
        value: U256,
        full_name: &str,
    ) -> Result<(), StageFailure> {
        let error = match self
            .registry
            .simulate_register(signer.address(), calldata, value)
            .await
        {
            Ok(()) => {
                tracing::debug!(name = %full_name, "Preflight simulation succeeded");
                return Ok(());
            }
            Err(e) => e,
        };

        let raw = annotate(&error.raw_text(), error.revert_data());
        // 只有合约给出的不可用原因才硬停止，节点自身的错误文本不算
        let unavailable = revert_reason(&error.raw_text(), error.revert_data())
            .map_or(false, |reason| reason.is_name_unavailable());
        if unavailable {
            tracing::info!(name = %full_name, reason = %raw, "Simulation says name unavailable");
            return Err(StageFailure::new(
                PipelineStage::Simulation,
                ErrorCategory::NameUnavailable,
                raw,
            ));
        }

        crate::metrics::inc_simulation_bypassed();
        tracing::warn!(
            name = %full_name,
            reason = %raw,
            "Preflight simulation failed, submitting anyway"
        );
        Ok(())
    }
}

fn confirmation_failure(error: ConfirmationError, full_name: &str) -> StageFailure {
    let raw = error.to_string();
    tracing::error!(name = %full_name, tx_hash = %error.tx_hash(), error = %raw, "Confirmation failed");
    let category = match classify(&raw) {
        ErrorCategory::Unknown => ErrorCategory::ConfirmationFailed,
        other => other,
    };
    StageFailure::new(PipelineStage::Confirmation, category, raw).with_tx_hash(error.tx_hash())
}

/// 把内部失败折叠为对外结果，错误信息使用分类模板
pub fn outcome_from_failure(failure: StageFailure, ctx: &MessageContext) -> TransactionOutcome {
    let message = failure
        .category
        .render(&ctx.clone().with_detail(failure.message.clone()));
    tracing::debug!(
        stage = %failure.stage,
        category = %failure.category,
        raw = %failure.message,
        "Registration attempt failed"
    );
    TransactionOutcome::failed(failure.stage, failure.category, message).with_tx_hash(failure.tx_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_failure_renders_template() {
        let ctx = MessageContext {
            price: "0.01".into(),
            symbol: "CELO".into(),
            network: "Celo Mainnet".into(),
            name: "alice.farcaster.celo".into(),
            detail: String::new(),
        };

        let outcome = outcome_from_failure(
            StageFailure::new(
                PipelineStage::Simulation,
                ErrorCategory::NameUnavailable,
                "execution reverted: Domain not available",
            ),
            &ctx,
        );
        assert!(!outcome.success);
        assert_eq!(outcome.stage, Some(PipelineStage::Simulation));
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("The name \"alice.farcaster.celo\" is not available. It may already be claimed.")
        );

        let outcome = outcome_from_failure(
            StageFailure::new(
                PipelineStage::Confirmation,
                ErrorCategory::ConfirmationFailed,
                "timed out",
            )
            .with_tx_hash("0xabc"),
            &ctx,
        );
        assert_eq!(outcome.tx_hash.as_deref(), Some("0xabc"));
        assert!(outcome.error_message.unwrap().ends_with("timed out"));
    }

    #[test]
    fn test_confirmation_failure_keeps_hash() {
        let failure = confirmation_failure(
            ConfirmationError::TimedOut {
                tx_hash: "0xbeef".into(),
                waited: std::time::Duration::from_secs(5),
            },
            "alice.farcaster.celo",
        );
        assert_eq!(failure.category, ErrorCategory::ConfirmationFailed);
        assert_eq!(failure.tx_hash.as_deref(), Some("0xbeef"));
    }

    #[test]
    fn test_reverted_receipt_is_generic_revert() {
        assert_eq!(classify(RECEIPT_REVERTED), ErrorCategory::ContractRevertGeneric);
    }
}
