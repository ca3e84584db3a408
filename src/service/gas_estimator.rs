// Gas 费预估服务
// 尽力而为：读取当前 gas 价格，失败或为零时使用固定默认价格，永不失败

use std::sync::Arc;

use ethers::types::U256;
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::{Deserialize, Serialize};

use crate::{config::Config, infrastructure::ChainRpc, utils::wei_to_native};

/// Gas 费预估结果（不持久化，按需重算）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub gas_units: u64,
    pub gas_price_wei: U256,
    pub total_cost_wei: U256,
    /// 原生币数量（18 位小数换算）
    pub total_cost_native: Decimal,
    /// 近似法币价值（固定汇率，仅展示用）
    pub total_cost_fiat_approx: Decimal,
    /// 是否回退到了默认 gas 价格
    pub used_default_price: bool,
}

pub struct GasEstimator {
    rpc: Arc<dyn ChainRpc>,
    gas_units: u64,
    default_gas_price: U256,
    native_usd_rate: f64,
    decimals: u8,
}

impl GasEstimator {
    pub fn new(rpc: Arc<dyn ChainRpc>, gas_units: u64, default_gas_price: U256, native_usd_rate: f64) -> Self {
        Self {
            rpc,
            gas_units,
            default_gas_price,
            native_usd_rate,
            decimals: 18,
        }
    }

    pub fn from_config(rpc: Arc<dyn ChainRpc>, config: &Config) -> Self {
        let mut estimator = Self::new(
            rpc,
            config.registrar.gas_units,
            config.default_gas_price(),
            config.registrar.native_usd_rate,
        );
        estimator.decimals = config.network_definition().native_currency.decimals;
        estimator
    }

    pub async fn estimate(&self) -> GasEstimate {
        let (gas_price, used_default_price) = match self.rpc.gas_price().await {
            Ok(price) if !price.is_zero() => (price, false),
            Ok(_) => {
                tracing::warn!(
                    default_gas_price = %self.default_gas_price,
                    "Network returned zero gas price, using default"
                );
                crate::metrics::inc_gas_price_fallback();
                (self.default_gas_price, true)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    default_gas_price = %self.default_gas_price,
                    "Failed to read gas price, using default"
                );
                crate::metrics::inc_gas_price_fallback();
                (self.default_gas_price, true)
            }
        };

        self.compute(gas_price, used_default_price)
    }

    fn compute(&self, gas_price: U256, used_default_price: bool) -> GasEstimate {
        let total_cost_wei = gas_price.saturating_mul(U256::from(self.gas_units));
        let total_cost_native = wei_to_native(total_cost_wei, self.decimals).unwrap_or(Decimal::MAX);
        let rate = Decimal::from_f64(self.native_usd_rate).unwrap_or(Decimal::ZERO);
        let total_cost_fiat_approx = total_cost_native
            .checked_mul(rate)
            .map(|v| v.round_dp(6))
            .unwrap_or(Decimal::MAX);

        GasEstimate {
            gas_units: self.gas_units,
            gas_price_wei: gas_price,
            total_cost_wei,
            total_cost_native,
            total_cost_fiat_approx,
            used_default_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use async_trait::async_trait;
    use ethers::types::{Address, Bytes};

    use super::*;
    use crate::infrastructure::{CallRequest, RpcError, TransactionReceipt};

    /// 只实现 gas_price 的 RPC 桩
    struct GasPriceRpc(Result<U256, RpcError>);

    #[async_trait]
    impl ChainRpc for GasPriceRpc {
        async fn gas_price(&self) -> Result<U256, RpcError> {
            self.0.clone()
        }

        async fn native_balance(&self, _address: Address) -> Result<U256, RpcError> {
            Err(RpcError::Transport("unused".into()))
        }

        async fn call(&self, _request: &CallRequest) -> Result<Bytes, RpcError> {
            Err(RpcError::Transport("unused".into()))
        }

        async fn transaction_receipt(&self, _tx_hash: &str) -> Result<Option<TransactionReceipt>, RpcError> {
            Ok(None)
        }
    }

    fn estimator(result: Result<U256, RpcError>) -> GasEstimator {
        GasEstimator::new(
            Arc::new(GasPriceRpc(result)),
            120_000,
            U256::from(1_000_000_000u64),
            2.0,
        )
    }

    /// Test 1: 正常读取 gas 价格
    #[tokio::test]
    async fn test_live_gas_price() {
        let estimate = estimator(Ok(U256::from(5_000_000_000u64))).estimate().await;
        assert!(!estimate.used_default_price);
        assert_eq!(estimate.total_cost_wei, U256::from(600_000_000_000_000u64));
        assert_eq!(estimate.total_cost_native, Decimal::from_str("0.0006").unwrap());
        assert_eq!(estimate.total_cost_fiat_approx, Decimal::from_str("0.0012").unwrap());
    }

    /// Test 2: 读取失败回退默认价格
    #[tokio::test]
    async fn test_rpc_failure_uses_default() {
        let estimate = estimator(Err(RpcError::Transport("down".into()))).estimate().await;
        assert!(estimate.used_default_price);
        assert_eq!(estimate.gas_price_wei, U256::from(1_000_000_000u64));
        assert_eq!(estimate.total_cost_native, Decimal::from_str("0.00012").unwrap());
        assert_eq!(estimate.total_cost_fiat_approx, Decimal::from_str("0.00024").unwrap());
    }

    /// Test 3: 零价格视为缺失
    #[tokio::test]
    async fn test_zero_price_uses_default() {
        let estimate = estimator(Ok(U256::zero())).estimate().await;
        assert!(estimate.used_default_price);
        assert_eq!(estimate.gas_units, 120_000);
    }

    /// Test 4: 极端价格不溢出
    #[tokio::test]
    async fn test_huge_price_is_total() {
        let estimate = estimator(Ok(U256::MAX)).estimate().await;
        assert_eq!(estimate.total_cost_wei, U256::MAX);
        assert_eq!(estimate.total_cost_native, Decimal::MAX);
    }
}
