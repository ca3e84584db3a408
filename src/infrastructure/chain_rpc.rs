//! 链 RPC 客户端
//!
//! 独立于钱包的只读 JSON-RPC 端点：gas 价格、余额、合约只读调用、交易回执。
//! 不需要已连接的钱包即可使用。

use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::hex_address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        /// 节点附带的 revert 数据（0x 十六进制）
        data: Option<String>,
    },

    #[error("Malformed RPC response: {0}")]
    Malformed(String),
}

impl RpcError {
    /// 从 JSON-RPC `error` 对象构造
    pub fn from_error_object(error: &Value) -> Self {
        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown RPC error")
            .to_string();
        let data = extract_revert_data(error.get("data"));
        Self::Rpc {
            code,
            message,
            data,
        }
    }

    pub fn revert_data(&self) -> Option<&str> {
        match self {
            Self::Rpc { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    /// 供分类器使用的原始文本（消息 + revert 数据）
    pub fn raw_text(&self) -> String {
        match self {
            Self::Rpc {
                message,
                data: Some(data),
                ..
            } => format!("{} (data: {})", message, data),
            other => other.to_string(),
        }
    }
}

/// revert 数据可能是字符串，也可能嵌套在 `{ data: "0x.." }` 里
pub(crate) fn extract_revert_data(data: Option<&Value>) -> Option<String> {
    match data? {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("data")
            .or_else(|| map.get("originalError").and_then(|o| o.get("data")))
            .and_then(|d| d.as_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// 合约只读调用参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
}

impl CallRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            data: data.into(),
            value: None,
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    /// JSON-RPC 交易对象
    pub fn to_json(&self) -> Value {
        let mut tx = serde_json::json!({
            "to": hex_address(&self.to),
            "data": format!("0x{}", hex::encode(&self.data)),
        });
        if let Some(from) = &self.from {
            tx["from"] = Value::String(hex_address(from));
        }
        if let Some(value) = &self.value {
            tx["value"] = Value::String(format!("{:#x}", value));
        }
        tx
    }
}

/// 交易回执
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    pub gas_used: Option<u64>,
    pub effective_gas_price: Option<String>, // Wei as string
    pub status: Option<u8>,                  // 1 = success, 0 = failed
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == Some(1)
    }

    /// 解析 `eth_getTransactionReceipt` 的 result；null 表示尚未打包
    pub fn from_json(tx_hash: &str, receipt_json: &Value) -> Option<Self> {
        if receipt_json.is_null() {
            return None;
        }

        let gas_used = receipt_json
            .get("gasUsed")
            .and_then(|v| v.as_str())
            .and_then(parse_u64_quantity);

        let effective_gas_price = receipt_json
            .get("effectiveGasPrice")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let block_number = receipt_json
            .get("blockNumber")
            .and_then(|v| v.as_str())
            .and_then(parse_u64_quantity);

        let block_hash = receipt_json
            .get("blockHash")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let status = receipt_json
            .get("status")
            .and_then(|v| v.as_str())
            .and_then(parse_u64_quantity)
            .and_then(|s| u8::try_from(s).ok());

        Some(Self {
            tx_hash: tx_hash.to_string(),
            block_number,
            block_hash,
            gas_used,
            effective_gas_price,
            status,
        })
    }
}

/// 解析 0x 十六进制数量
pub fn parse_quantity(s: &str) -> Option<U256> {
    let digits = s.trim_start_matches("0x");
    if digits.is_empty() {
        return Some(U256::zero());
    }
    U256::from_str_radix(digits, 16).ok()
}

pub fn parse_u64_quantity(s: &str) -> Option<u64> {
    let digits = s.trim_start_matches("0x");
    if digits.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(digits, 16).ok()
}

pub fn parse_bytes(s: &str) -> Option<Bytes> {
    hex::decode(s.trim_start_matches("0x")).ok().map(Bytes::from)
}

/// 只读链访问接口
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// `eth_gasPrice`
    async fn gas_price(&self) -> Result<U256, RpcError>;

    /// `eth_getBalance(address, "latest")`
    async fn native_balance(&self, address: Address) -> Result<U256, RpcError>;

    /// `eth_call(request, "latest")`，revert 以 `RpcError::Rpc` 返回
    async fn call(&self, request: &CallRequest) -> Result<Bytes, RpcError>;

    /// `eth_getTransactionReceipt`，未打包返回 `Ok(None)`
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, RpcError>;
}

/// 基于 reqwest 的 JSON-RPC 实现
pub struct JsonRpcChainClient {
    http_client: reqwest::Client,
    rpc_url: String,
}

impl JsonRpcChainClient {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client: client,
            rpc_url: rpc_url.into(),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RpcError::Transport(format!(
                "RPC request failed with status {}: {}",
                status, body
            )));
        }

        let mut json: Value = serde_json::from_str(&body)
            .map_err(|e| RpcError::Malformed(format!("invalid JSON: {}", e)))?;

        // 检查 JSON-RPC 错误
        if let Some(error) = json.get("error") {
            let err = RpcError::from_error_object(error);
            tracing::debug!(method = %method, error = %err, "RPC call returned error");
            return Err(err);
        }

        match json.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(RpcError::Malformed(format!(
                "missing result field for {}",
                method
            ))),
        }
    }

    fn expect_str<'a>(method: &str, value: &'a Value) -> Result<&'a str, RpcError> {
        value
            .as_str()
            .ok_or_else(|| RpcError::Malformed(format!("{} result is not a string", method)))
    }
}

#[async_trait]
impl ChainRpc for JsonRpcChainClient {
    async fn gas_price(&self) -> Result<U256, RpcError> {
        let result = self.request("eth_gasPrice", serde_json::json!([])).await?;
        let raw = Self::expect_str("eth_gasPrice", &result)?;
        parse_quantity(raw).ok_or_else(|| RpcError::Malformed(format!("bad gas price {}", raw)))
    }

    async fn native_balance(&self, address: Address) -> Result<U256, RpcError> {
        let result = self
            .request(
                "eth_getBalance",
                serde_json::json!([hex_address(&address), "latest"]),
            )
            .await?;
        let raw = Self::expect_str("eth_getBalance", &result)?;
        parse_quantity(raw).ok_or_else(|| RpcError::Malformed(format!("bad balance {}", raw)))
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, RpcError> {
        let result = self
            .request("eth_call", serde_json::json!([request.to_json(), "latest"]))
            .await?;
        let raw = Self::expect_str("eth_call", &result)?;
        parse_bytes(raw).ok_or_else(|| RpcError::Malformed(format!("bad call result {}", raw)))
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, RpcError> {
        let result = self
            .request("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await?;
        Ok(TransactionReceipt::from_json(tx_hash, &result))
    }
}
