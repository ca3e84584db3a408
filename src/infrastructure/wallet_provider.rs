//! 钱包 Provider 能力抽象（EIP-1193 形状）
//!
//! `request(method, params)` 请求/响应 + 账户/链变更事件订阅。
//! 迷你应用钱包桥和通用注入钱包都以该接口接入。

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::utils::hex_address;

/// 钱包 RPC 方法名
pub mod methods {
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const GET_BALANCE: &str = "eth_getBalance";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
    pub const SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const REVOKE_PERMISSIONS: &str = "wallet_revokePermissions";
}

/// Provider 返回的错误（EIP-1193 / EIP-1474 错误码）
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl ProviderRpcError {
    /// 用户拒绝请求
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    /// 钱包不认识该链（需要先 wallet_addEthereumChain）
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const INTERNAL: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// 部分钱包把 4902 包在 data.originalError 里，或只在消息中说明
    pub fn is_unrecognized_chain(&self) -> bool {
        if self.code == Self::UNRECOGNIZED_CHAIN {
            return true;
        }
        let nested = self
            .data
            .as_ref()
            .and_then(|d| d.get("originalError"))
            .and_then(|o| o.get("code"))
            .and_then(|c| c.as_i64());
        if nested == Some(Self::UNRECOGNIZED_CHAIN) {
            return true;
        }
        let msg = self.message.to_lowercase();
        msg.contains("unrecognized chain") || msg.contains("unrecognized network")
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    /// revert 数据（0x 十六进制），用于解码合约错误
    pub fn revert_data(&self) -> Option<String> {
        crate::infrastructure::chain_rpc::extract_revert_data(self.data.as_ref())
    }

    /// 分类器使用的原始文本
    pub fn raw_text(&self) -> String {
        match self.revert_data() {
            Some(data) => format!("{} (data: {})", self.message, data),
            None => self.message.clone(),
        }
    }
}

/// Provider 事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
    Disconnect,
}

/// 钱包 Provider 能力
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    /// 订阅账户/链变更事件
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// 链 ID 可能以 "0xa4ec"、"42220" 或数字形式返回
pub fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

/// 读取钱包当前链 ID
pub async fn current_chain_id(provider: &dyn WalletProvider) -> Result<u64, ProviderRpcError> {
    let value = provider
        .request(methods::CHAIN_ID, serde_json::json!([]))
        .await?;
    parse_chain_id(&value).ok_or_else(|| {
        ProviderRpcError::new(
            ProviderRpcError::INTERNAL,
            format!("unexpected eth_chainId result: {}", value),
        )
    })
}

/// 以已连接账户身份通过钱包发送交易
#[derive(Clone)]
pub struct WalletSigner {
    provider: Arc<dyn WalletProvider>,
    address: Address,
}

impl WalletSigner {
    pub fn new(provider: Arc<dyn WalletProvider>, address: Address) -> Self {
        Self { provider, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    /// `eth_sendTransaction`，返回交易哈希
    pub async fn send_transaction(
        &self,
        to: Address,
        data: &Bytes,
        value: U256,
    ) -> Result<String, ProviderRpcError> {
        let tx = serde_json::json!({
            "from": hex_address(&self.address),
            "to": hex_address(&to),
            "data": format!("0x{}", hex::encode(data)),
            "value": format!("{:#x}", value),
        });

        let result = self
            .provider
            .request(methods::SEND_TRANSACTION, serde_json::json!([tx]))
            .await?;

        result.as_str().map(|s| s.to_string()).ok_or_else(|| {
            ProviderRpcError::new(
                ProviderRpcError::INTERNAL,
                format!("eth_sendTransaction returned no hash: {}", result),
            )
        })
    }
}
