//! 代币授权协调
//!
//! 仅在代币支付模式下使用。先读取 allowance，足够则零写入直接返回；
//! 否则 approve 恰好 `amount`，等待一次确认，并重新读取 allowance 作为后置条件。

use std::sync::Arc;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    infrastructure::{abi, CallRequest, ChainRpc, RpcError, WalletSigner},
    service::receipt_waiter::ReceiptWaiter,
    utils::short_address,
};

/// 授权状态（每次检查都重新读取，不跨调用缓存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalState {
    /// 最近一次实际读到的额度；approve 后重新读取失败时为 None
    pub allowance: Option<U256>,
    pub required: U256,
    pub sufficient: bool,
    /// 发生了 approve 写入时的交易哈希
    pub approval_tx_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Approval failed: {message}")]
pub struct ApprovalFailed {
    pub message: String,
    pub tx_hash: Option<String>,
}

impl ApprovalFailed {
    fn new(message: impl Into<String>, tx_hash: Option<String>) -> Self {
        Self {
            message: message.into(),
            tx_hash,
        }
    }
}

pub struct ApprovalCoordinator {
    rpc: Arc<dyn ChainRpc>,
    receipt_waiter: ReceiptWaiter,
}

impl ApprovalCoordinator {
    pub fn new(rpc: Arc<dyn ChainRpc>, receipt_waiter: ReceiptWaiter) -> Self {
        Self {
            rpc,
            receipt_waiter,
        }
    }

    pub async fn read_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, RpcError> {
        let request = CallRequest::new(token, abi::erc20_allowance(owner, spender));
        let data = self.rpc.call(&request).await?;
        abi::decode_uint(&data).map_err(|e| RpcError::Malformed(e.to_string()))
    }

    pub async fn ensure_approval(
        &self,
        signer: &WalletSigner,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<ApprovalState, ApprovalFailed> {
        let owner = signer.address();

        // 1. 读取当前授权额度
        match self.read_allowance(token, owner, spender).await {
            Ok(allowance) if allowance >= amount => {
                tracing::debug!(
                    owner = %short_address(&owner),
                    allowance = %allowance,
                    required = %amount,
                    "Existing allowance covers amount, skipping approve"
                );
                return Ok(ApprovalState {
                    allowance: Some(allowance),
                    required: amount,
                    sufficient: true,
                    approval_tx_hash: None,
                });
            }
            Ok(allowance) => {
                tracing::info!(
                    owner = %short_address(&owner),
                    allowance = %allowance,
                    required = %amount,
                    "Allowance below amount, requesting approve"
                );
            }
            Err(e) => {
                tracing::warn!(
                    owner = %short_address(&owner),
                    error = %e,
                    "Allowance read failed, requesting approve"
                );
            }
        }

        // 2. approve 恰好 amount
        let data = abi::erc20_approve(spender, amount);
        let tx_hash = signer
            .send_transaction(token, &data, U256::zero())
            .await
            .map_err(|e| ApprovalFailed::new(e.raw_text(), None))?;
        crate::metrics::inc_approval_write();
        tracing::info!(tx_hash = %tx_hash, "Approval transaction sent");

        // 3. 等待一次确认
        let receipt = self
            .receipt_waiter
            .wait(&tx_hash)
            .await
            .map_err(|e| ApprovalFailed::new(e.to_string(), Some(tx_hash.clone())))?;
        if !receipt.is_success() {
            return Err(ApprovalFailed::new(
                "Approval transaction failed",
                Some(tx_hash),
            ));
        }

        // 4. 后置条件：重新读取 allowance
        match self.read_allowance(token, owner, spender).await {
            Ok(allowance) if allowance >= amount => Ok(ApprovalState {
                allowance: Some(allowance),
                required: amount,
                sufficient: true,
                approval_tx_hash: Some(tx_hash),
            }),
            Ok(allowance) => Err(ApprovalFailed::new(
                format!(
                    "allowance {} still below required {} after approval",
                    allowance, amount
                ),
                Some(tx_hash),
            )),
            Err(e) => {
                // 回执已成功，读取失败不推翻确认结果
                tracing::warn!(
                    tx_hash = %tx_hash,
                    error = %e,
                    "Allowance re-read failed after confirmed approval"
                );
                Ok(ApprovalState {
                    allowance: None,
                    required: amount,
                    sufficient: true,
                    approval_tx_hash: Some(tx_hash),
                })
            }
        }
    }
}
