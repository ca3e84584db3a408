//! 支付方式
//! 由配置决定（是否配置了费用代币地址），不接受用户输入

use std::fmt;

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::utils::hex_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "token", rename_all = "snake_case")]
pub enum PaymentMode {
    /// 以链原生币支付（交易 value = 价格）
    NativeCurrency,
    /// 以 ERC-20 代币支付（需先 approve，交易 value = 0）
    FungibleToken(Address),
}

impl PaymentMode {
    pub fn from_fee_token(fee_token: Option<Address>) -> Self {
        match fee_token {
            Some(token) if !token.is_zero() => Self::FungibleToken(token),
            _ => Self::NativeCurrency,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::NativeCurrency)
    }

    pub fn token(&self) -> Option<Address> {
        match self {
            Self::NativeCurrency => None,
            Self::FungibleToken(token) => Some(*token),
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativeCurrency => f.write_str("native"),
            Self::FungibleToken(token) => write!(f, "token:{}", hex_address(token)),
        }
    }
}
