//! 配置管理模块
//! 支持从环境变量和配置文件加载配置，会话内视为不可变

use std::{path::Path, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{NativeCurrency, NetworkDefinition, PaymentMode},
    service::registry_client::RegistryAbiVariant,
    utils::{gwei_to_wei, AddressValidator},
};

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registrar: RegistrarConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 注册合约与费用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    pub contract_address: String,
    /// 配置后使用代币支付，否则使用原生币
    pub fee_token_address: Option<String>,
    /// 注册价格（wei）
    pub price_wei: u64,
    pub name_suffix: String,
    pub abi_variant: RegistryAbiVariant,
    /// 注册调用的预估 gas 用量
    pub gas_units: u64,
    pub default_gas_price_gwei: u64,
    /// 原生币 → USD 近似汇率（仅用于展示）
    pub native_usd_rate: f64,
    /// 原生币支付时额外要求的 gas 余量（wei）
    pub native_gas_buffer_wei: u64,
}

/// 网络与轮询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub rpc_timeout_secs: u64,
    pub provider_poll_interval_ms: u64,
    pub provider_poll_max_attempts: u32,
    pub receipt_poll_interval_ms: u64,
    /// 确认等待超时；None 表示一直等待
    pub confirmation_timeout_secs: Option<u64>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            contract_address: std::env::var("NAMEFORGE_CONTRACT_ADDRESS").unwrap_or_default(),
            fee_token_address: std::env::var("NAMEFORGE_FEE_TOKEN_ADDRESS")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            price_wei: env_parse("NAMEFORGE_PRICE_WEI", 10_000_000_000_000_000), // 0.01 CELO
            name_suffix: std::env::var("NAMEFORGE_NAME_SUFFIX")
                .unwrap_or_else(|_| "farcaster.celo".into()),
            abi_variant: env_parse("NAMEFORGE_ABI_VARIANT", RegistryAbiVariant::MetadataOnly),
            gas_units: env_parse("NAMEFORGE_GAS_UNITS", 120_000),
            default_gas_price_gwei: env_parse("NAMEFORGE_DEFAULT_GAS_PRICE_GWEI", 1),
            native_usd_rate: env_parse("NAMEFORGE_NATIVE_USD_RATE", 2.0),
            native_gas_buffer_wei: env_parse(
                "NAMEFORGE_NATIVE_GAS_BUFFER_WEI",
                100_000_000_000_000_000, // 0.1 CELO
            ),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: env_parse("NAMEFORGE_CHAIN_ID", crate::domain::CELO_MAINNET_CHAIN_ID),
            chain_name: std::env::var("NAMEFORGE_CHAIN_NAME")
                .unwrap_or_else(|_| "Celo Mainnet".into()),
            rpc_url: std::env::var("NAMEFORGE_RPC_URL")
                .unwrap_or_else(|_| "https://forno.celo.org".into()),
            explorer_url: std::env::var("NAMEFORGE_EXPLORER_URL")
                .unwrap_or_else(|_| "https://explorer.celo.org".into()),
            rpc_timeout_secs: env_parse("NAMEFORGE_RPC_TIMEOUT_SECS", 30),
            provider_poll_interval_ms: env_parse("NAMEFORGE_PROVIDER_POLL_INTERVAL_MS", 100),
            provider_poll_max_attempts: env_parse("NAMEFORGE_PROVIDER_POLL_MAX_ATTEMPTS", 50),
            receipt_poll_interval_ms: env_parse("NAMEFORGE_RECEIPT_POLL_INTERVAL_MS", 1_000),
            confirmation_timeout_secs: std::env::var("NAMEFORGE_CONFIRMATION_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            registrar: RegistrarConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    /// 从配置文件加载配置（缺失字段回落到环境变量/默认值）
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        self.contract_address()?;
        self.payment_mode()?;

        if self.registrar.price_wei == 0 {
            anyhow::bail!("NAMEFORGE_PRICE_WEI must be positive");
        }
        if self.registrar.gas_units == 0 {
            anyhow::bail!("NAMEFORGE_GAS_UNITS must be positive");
        }
        if self.registrar.default_gas_price_gwei == 0 {
            anyhow::bail!("NAMEFORGE_DEFAULT_GAS_PRICE_GWEI must be positive");
        }
        if !(self.registrar.native_usd_rate.is_finite() && self.registrar.native_usd_rate >= 0.0) {
            anyhow::bail!("NAMEFORGE_NATIVE_USD_RATE must be a non-negative number");
        }
        if self.registrar.name_suffix.trim_matches('.').is_empty() {
            anyhow::bail!("NAMEFORGE_NAME_SUFFIX must not be empty");
        }

        if self.network.chain_id == 0 {
            anyhow::bail!("NAMEFORGE_CHAIN_ID must be positive");
        }
        for (key, url) in [
            ("NAMEFORGE_RPC_URL", &self.network.rpc_url),
            ("NAMEFORGE_EXPLORER_URL", &self.network.explorer_url),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("{} must start with http:// or https://", key);
            }
        }
        if self.network.provider_poll_max_attempts == 0 {
            anyhow::bail!("NAMEFORGE_PROVIDER_POLL_MAX_ATTEMPTS must be positive");
        }
        if self.network.receipt_poll_interval_ms == 0 {
            anyhow::bail!("NAMEFORGE_RECEIPT_POLL_INTERVAL_MS must be positive");
        }

        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }

    pub fn contract_address(&self) -> Result<Address> {
        let raw = self.registrar.contract_address.trim();
        if raw.is_empty() {
            anyhow::bail!("NAMEFORGE_CONTRACT_ADDRESS is not configured");
        }
        AddressValidator::parse_evm_address(raw)
            .with_context(|| format!("Invalid NAMEFORGE_CONTRACT_ADDRESS: {}", raw))
    }

    /// 支付方式由是否配置费用代币决定
    pub fn payment_mode(&self) -> Result<PaymentMode> {
        let token = match self.registrar.fee_token_address.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                AddressValidator::parse_evm_address(raw)
                    .with_context(|| format!("Invalid NAMEFORGE_FEE_TOKEN_ADDRESS: {}", raw))?,
            ),
        };
        Ok(PaymentMode::from_fee_token(token))
    }

    pub fn price(&self) -> U256 {
        U256::from(self.registrar.price_wei)
    }

    pub fn native_gas_buffer(&self) -> U256 {
        U256::from(self.registrar.native_gas_buffer_wei)
    }

    pub fn default_gas_price(&self) -> U256 {
        gwei_to_wei(self.registrar.default_gas_price_gwei)
    }

    /// 目标网络定义：内置网络叠加配置中的 RPC / 浏览器地址
    pub fn network_definition(&self) -> NetworkDefinition {
        let mut def = NetworkDefinition::known(self.network.chain_id).unwrap_or_else(|| {
            NetworkDefinition {
                chain_id: self.network.chain_id,
                chain_name: self.network.chain_name.clone(),
                rpc_urls: Vec::new(),
                native_currency: NativeCurrency::celo(),
                block_explorer_urls: Vec::new(),
            }
        });
        def.rpc_urls = vec![self.network.rpc_url.clone()];
        def.block_explorer_urls = vec![self.network.explorer_url.clone()];
        def
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.network.rpc_timeout_secs)
    }

    pub fn provider_poll_interval(&self) -> Duration {
        Duration::from_millis(self.network.provider_poll_interval_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.network.receipt_poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.network.confirmation_timeout_secs.map(Duration::from_secs)
    }
}
