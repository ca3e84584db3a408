//! 余额充足性检查
//!
//! 原生币：余额 >= 价格 + 固定 gas 余量（含边界）。
//! 代币：代币余额 >= 价格，不加 gas 余量（gas 另以原生币支付）。
//! 读取失败时按"充足"返回，不阻塞流程，由合约做最终裁决。

use std::sync::Arc;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    domain::PaymentMode,
    infrastructure::{abi, CallRequest, ChainRpc, RpcError},
    utils::short_address,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceCheck {
    pub sufficient: bool,
    /// 读取失败时为 None
    pub balance: Option<U256>,
    /// 比较用的门槛（原生币模式包含 gas 余量）
    pub required: U256,
}

impl BalanceCheck {
    pub fn read_failed(&self) -> bool {
        self.balance.is_none()
    }
}

pub struct BalanceVerifier {
    rpc: Arc<dyn ChainRpc>,
    native_gas_buffer: U256,
}

impl BalanceVerifier {
    pub fn new(rpc: Arc<dyn ChainRpc>, native_gas_buffer: U256) -> Self {
        Self {
            rpc,
            native_gas_buffer,
        }
    }

    /// 门槛：原生币 = 价格 + 余量；代币 = 价格
    pub fn threshold(&self, mode: &PaymentMode, required_amount: U256) -> U256 {
        match mode {
            PaymentMode::NativeCurrency => required_amount.saturating_add(self.native_gas_buffer),
            PaymentMode::FungibleToken(_) => required_amount,
        }
    }

    pub async fn check_sufficient(
        &self,
        account: Address,
        mode: &PaymentMode,
        required_amount: U256,
    ) -> BalanceCheck {
        let required = self.threshold(mode, required_amount);

        let balance = match mode {
            PaymentMode::NativeCurrency => self.rpc.native_balance(account).await,
            PaymentMode::FungibleToken(token) => self.token_balance(*token, account).await,
        };

        match balance {
            Ok(balance) => {
                let sufficient = balance >= required;
                tracing::debug!(
                    account = %short_address(&account),
                    mode = %mode,
                    balance = %balance,
                    required = %required,
                    sufficient,
                    "Balance checked"
                );
                BalanceCheck {
                    sufficient,
                    balance: Some(balance),
                    required,
                }
            }
            Err(e) => {
                crate::metrics::inc_balance_read_failure();
                tracing::warn!(
                    account = %short_address(&account),
                    mode = %mode,
                    error = %e,
                    "Balance read failed, assuming sufficient"
                );
                BalanceCheck {
                    sufficient: true,
                    balance: None,
                    required,
                }
            }
        }
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, RpcError> {
        let request = CallRequest::new(token, abi::erc20_balance_of(owner));
        let data = self.rpc.call(&request).await?;
        abi::decode_uint(&data).map_err(|e| RpcError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ethers::{abi::Token, types::Bytes};

    use super::*;
    use crate::infrastructure::TransactionReceipt;

    const PRICE: u64 = 10_000_000_000_000_000;
    const BUFFER: u64 = 100_000_000_000_000_000;

    /// 固定余额的 RPC 桩；None 表示读取失败
    struct BalanceRpc {
        native: Option<U256>,
        token: Option<U256>,
    }

    #[async_trait]
    impl ChainRpc for BalanceRpc {
        async fn gas_price(&self) -> Result<U256, RpcError> {
            Ok(U256::one())
        }

        async fn native_balance(&self, _address: Address) -> Result<U256, RpcError> {
            self.native
                .ok_or_else(|| RpcError::Transport("connection reset".into()))
        }

        async fn call(&self, request: &CallRequest) -> Result<Bytes, RpcError> {
            assert_eq!(&request.data[..4], &abi::selector(abi::ERC20_BALANCE_OF));
            let balance = self
                .token
                .ok_or_else(|| RpcError::Transport("connection reset".into()))?;
            Ok(Bytes::from(ethers::abi::encode(&[Token::Uint(balance)])))
        }

        async fn transaction_receipt(&self, _tx_hash: &str) -> Result<Option<TransactionReceipt>, RpcError> {
            Ok(None)
        }
    }

    fn verifier(native: Option<U256>, token: Option<U256>) -> BalanceVerifier {
        BalanceVerifier::new(Arc::new(BalanceRpc { native, token }), U256::from(BUFFER))
    }

    fn account() -> Address {
        Address::repeat_byte(0x01)
    }

    #[tokio::test]
    async fn test_zero_native_balance_insufficient() {
        let check = verifier(Some(U256::zero()), None)
            .check_sufficient(account(), &PaymentMode::NativeCurrency, U256::from(PRICE))
            .await;
        assert!(!check.sufficient);
        assert_eq!(check.required, U256::from(PRICE + BUFFER));
    }

    #[tokio::test]
    async fn test_native_boundary_inclusive() {
        let exact = U256::from(PRICE + BUFFER);
        let check = verifier(Some(exact), None)
            .check_sufficient(account(), &PaymentMode::NativeCurrency, U256::from(PRICE))
            .await;
        assert!(check.sufficient);

        let one_short = verifier(Some(exact - 1), None)
            .check_sufficient(account(), &PaymentMode::NativeCurrency, U256::from(PRICE))
            .await;
        assert!(!one_short.sufficient);
    }

    #[tokio::test]
    async fn test_token_mode_has_no_buffer() {
        let token = PaymentMode::FungibleToken(Address::repeat_byte(0x77));
        let check = verifier(Some(U256::zero()), Some(U256::from(PRICE)))
            .check_sufficient(account(), &token, U256::from(PRICE))
            .await;
        assert!(check.sufficient);
        assert_eq!(check.required, U256::from(PRICE));

        let short = verifier(None, Some(U256::from(PRICE - 1)))
            .check_sufficient(account(), &token, U256::from(PRICE))
            .await;
        assert!(!short.sufficient);
    }

    #[tokio::test]
    async fn test_read_failure_assumes_sufficient() {
        let check = verifier(None, None)
            .check_sufficient(account(), &PaymentMode::NativeCurrency, U256::from(PRICE))
            .await;
        assert!(check.sufficient);
        assert!(check.read_failed());

        let token = PaymentMode::FungibleToken(Address::repeat_byte(0x77));
        let check = verifier(None, None)
            .check_sufficient(account(), &token, U256::from(PRICE))
            .await;
        assert!(check.sufficient);
        assert!(check.balance.is_none());
    }
}
