//! 交易确认等待
//!
//! 按固定间隔轮询 `eth_getTransactionReceipt`，直到出现回执（一次确认）。
//! 可选超时；连续 RPC 错误超过上限时放弃，交易哈希始终保留在错误里。

use std::{sync::Arc, time::Duration};

use crate::infrastructure::{ChainRpc, RpcError, TransactionReceipt};

const MAX_CONSECUTIVE_ERRORS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmationError {
    #[error("Timed out after {waited:?} waiting for receipt of {tx_hash}")]
    TimedOut { tx_hash: String, waited: Duration },

    #[error("Failed to fetch receipt of {tx_hash}: {source}")]
    Rpc {
        tx_hash: String,
        #[source]
        source: RpcError,
    },
}

impl ConfirmationError {
    pub fn tx_hash(&self) -> &str {
        match self {
            Self::TimedOut { tx_hash, .. } | Self::Rpc { tx_hash, .. } => tx_hash,
        }
    }
}

#[derive(Clone)]
pub struct ReceiptWaiter {
    rpc: Arc<dyn ChainRpc>,
    interval: Duration,
    timeout: Option<Duration>,
}

impl ReceiptWaiter {
    pub fn new(rpc: Arc<dyn ChainRpc>, interval: Duration) -> Self {
        Self {
            rpc,
            interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn wait(&self, tx_hash: &str) -> Result<TransactionReceipt, ConfirmationError> {
        self.wait_with_timeout(tx_hash, self.timeout).await
    }

    /// 调用方可显式传入超时覆盖默认值
    pub async fn wait_with_timeout(
        &self,
        tx_hash: &str,
        timeout: Option<Duration>,
    ) -> Result<TransactionReceipt, ConfirmationError> {
        match timeout {
            None => self.poll(tx_hash).await,
            Some(limit) => match tokio::time::timeout(limit, self.poll(tx_hash)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(tx_hash = %tx_hash, timeout = ?limit, "Receipt wait timed out");
                    Err(ConfirmationError::TimedOut {
                        tx_hash: tx_hash.to_string(),
                        waited: limit,
                    })
                }
            },
        }
    }

    async fn poll(&self, tx_hash: &str) -> Result<TransactionReceipt, ConfirmationError> {
        let mut consecutive_errors = 0u32;
        loop {
            match self.rpc.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    tracing::debug!(
                        tx_hash = %tx_hash,
                        block_number = ?receipt.block_number,
                        status = ?receipt.status,
                        "Receipt received"
                    );
                    return Ok(receipt);
                }
                Ok(None) => consecutive_errors = 0,
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        tx_hash = %tx_hash,
                        error = %e,
                        consecutive_errors,
                        "Receipt poll failed"
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(ConfirmationError::Rpc {
                            tx_hash: tx_hash.to_string(),
                            source: e,
                        });
                    }
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
