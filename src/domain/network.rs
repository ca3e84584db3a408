//! 网络定义
//!
//! 目标链的元数据：链 ID、RPC、原生币描述、区块浏览器。
//! 钱包不认识目标链时，ChainGuard 用它构造 `wallet_addEthereumChain` 参数（EIP-3085）。

use serde::{Deserialize, Serialize};

/// Celo 主网链 ID
pub const CELO_MAINNET_CHAIN_ID: u64 = 42220;
/// Celo Alfajores 测试网链 ID
pub const CELO_ALFAJORES_CHAIN_ID: u64 = 44787;

/// 原生币描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn celo() -> Self {
        Self {
            name: "Celo".to_string(),
            symbol: "CELO".to_string(),
            decimals: 18,
        }
    }
}

/// 网络定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
}

impl NetworkDefinition {
    pub fn celo_mainnet() -> Self {
        Self {
            chain_id: CELO_MAINNET_CHAIN_ID,
            chain_name: "Celo Mainnet".to_string(),
            rpc_urls: vec!["https://forno.celo.org".to_string()],
            native_currency: NativeCurrency::celo(),
            block_explorer_urls: vec!["https://explorer.celo.org".to_string()],
        }
    }

    pub fn celo_alfajores() -> Self {
        Self {
            chain_id: CELO_ALFAJORES_CHAIN_ID,
            chain_name: "Celo Alfajores Testnet".to_string(),
            rpc_urls: vec!["https://alfajores-forno.celo-testnet.org".to_string()],
            native_currency: NativeCurrency::celo(),
            block_explorer_urls: vec!["https://explorer.celo.org/alfajores".to_string()],
        }
    }

    /// 按链 ID 查找内置网络
    pub fn known(chain_id: u64) -> Option<Self> {
        match chain_id {
            CELO_MAINNET_CHAIN_ID => Some(Self::celo_mainnet()),
            CELO_ALFAJORES_CHAIN_ID => Some(Self::celo_alfajores()),
            _ => None,
        }
    }

    /// EIP-695/3326 要求的 0x 十六进制链 ID
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    /// `wallet_addEthereumChain` 参数（EIP-3085）
    pub fn add_chain_params(&self) -> serde_json::Value {
        serde_json::json!([{
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "rpcUrls": self.rpc_urls,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "blockExplorerUrls": self.block_explorer_urls,
        }])
    }

    /// `wallet_switchEthereumChain` 参数
    pub fn switch_chain_params(&self) -> serde_json::Value {
        serde_json::json!([{ "chainId": self.chain_id_hex() }])
    }

    pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
        self.block_explorer_urls
            .first()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}
