//! 名称注册合约客户端
//!
//! 只读查询走独立的链 RPC（无需连接钱包），注册调用只负责生成 calldata，
//! 由钱包签名发送。

use std::{fmt, str::FromStr, sync::Arc};

use ethers::{
    abi::{ParamType, Token},
    types::{Address, Bytes, U256},
};
use serde::{Deserialize, Serialize};

use crate::{
    domain::RegistrationParams,
    infrastructure::{abi, CallRequest, ChainRpc, RpcError},
};

pub const IS_AVAILABLE: &str = "isAvailable(string)";
pub const GET_DOMAIN_INFO: &str = "getDomainInfo(string)";

/// 注册方法的 ABI 形态（由部署的合约版本决定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryAbiVariant {
    /// `registerDomain(name, bio, socialLinks)`
    #[default]
    MetadataOnly,
    /// `registerDomain(name, fid, bio, socialLinks)`
    WithIdentity,
}

impl RegistryAbiVariant {
    pub fn register_signature(&self) -> &'static str {
        match self {
            Self::MetadataOnly => "registerDomain(string,string,string)",
            Self::WithIdentity => "registerDomain(string,uint256,string,string)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetadataOnly => "metadata_only",
            Self::WithIdentity => "with_identity",
        }
    }
}

impl fmt::Display for RegistryAbiVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistryAbiVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metadata_only" | "metadata" => Ok(Self::MetadataOnly),
            "with_identity" | "identity" => Ok(Self::WithIdentity),
            other => Err(format!("unknown registry ABI variant: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("unexpected contract response: {0}")]
    Decode(String),

    #[error("identity id is required by the registry ABI")]
    MissingIdentity,
}

/// `getDomainInfo` 的返回
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainInfo {
    pub owner: Address,
    pub token_id: U256,
    pub expires_at: U256,
    pub bio: String,
    pub social_links: String,
}

impl DomainInfo {
    /// 零地址所有者表示尚未注册
    pub fn is_registered(&self) -> bool {
        !self.owner.is_zero()
    }
}

#[derive(Clone)]
pub struct RegistryClient {
    rpc: Arc<dyn ChainRpc>,
    contract: Address,
    variant: RegistryAbiVariant,
}

impl RegistryClient {
    pub fn new(rpc: Arc<dyn ChainRpc>, contract: Address, variant: RegistryAbiVariant) -> Self {
        Self {
            rpc,
            contract,
            variant,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn variant(&self) -> RegistryAbiVariant {
        self.variant
    }

    pub async fn is_available(&self, full_name: &str) -> Result<bool, RegistryError> {
        let data = abi::encode_call(IS_AVAILABLE, &[Token::String(full_name.to_string())]);
        let out = self.rpc.call(&CallRequest::new(self.contract, data)).await?;
        abi::decode_bool(&out).map_err(|e| RegistryError::Decode(e.to_string()))
    }

    pub async fn domain_info(&self, full_name: &str) -> Result<DomainInfo, RegistryError> {
        let data = abi::encode_call(GET_DOMAIN_INFO, &[Token::String(full_name.to_string())]);
        let out = self.rpc.call(&CallRequest::new(self.contract, data)).await?;

        let tokens = abi::decode_tokens(
            &[
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::String,
                ParamType::String,
            ],
            &out,
        )
        .map_err(|e| RegistryError::Decode(e.to_string()))?;

        match tokens.as_slice() {
            [Token::Address(owner), Token::Uint(token_id), Token::Uint(expires_at), Token::String(bio), Token::String(social_links)] => {
                Ok(DomainInfo {
                    owner: *owner,
                    token_id: *token_id,
                    expires_at: *expires_at,
                    bio: bio.clone(),
                    social_links: social_links.clone(),
                })
            }
            other => Err(RegistryError::Decode(format!(
                "getDomainInfo returned {:?}",
                other
            ))),
        }
    }

    /// 以 `from` 身份、携带 `value` 对注册调用做一次 eth_call，不改变状态
    pub async fn simulate_register(
        &self,
        from: Address,
        calldata: &Bytes,
        value: U256,
    ) -> Result<(), RpcError> {
        let request = CallRequest::new(self.contract, calldata.clone())
            .with_from(from)
            .with_value(value);
        self.rpc.call(&request).await.map(|_| ())
    }

    /// 与 ABI 变体相关的本地参数检查，不访问网络
    pub fn check_params(&self, params: &RegistrationParams) -> Result<(), RegistryError> {
        match self.variant {
            RegistryAbiVariant::WithIdentity if params.identity_id.is_none() => {
                Err(RegistryError::MissingIdentity)
            }
            _ => Ok(()),
        }
    }

    /// 注册调用的 calldata；预检模拟与真实提交使用同一份
    pub fn register_calldata(
        &self,
        full_name: &str,
        params: &RegistrationParams,
    ) -> Result<Bytes, RegistryError> {
        let name = Token::String(full_name.to_string());
        let bio = Token::String(params.bio_or_empty().to_string());
        let links = Token::String(params.social_links_or_empty().to_string());

        let args = match self.variant {
            RegistryAbiVariant::MetadataOnly => vec![name, bio, links],
            RegistryAbiVariant::WithIdentity => {
                let fid = params.identity_id.ok_or(RegistryError::MissingIdentity)?;
                vec![name, Token::Uint(U256::from(fid)), bio, links]
            }
        };

        Ok(abi::encode_call(self.variant.register_signature(), &args))
    }
}
