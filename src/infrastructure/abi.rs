//! 最小 ABI 编解码工具
//!
//! 函数选择器 + `ethers::abi` 参数编码；只覆盖注册流程用到的调用。

use ethers::{
    abi::{decode, encode, ParamType, Token},
    types::{Address, Bytes, U256},
};

pub const ERC20_BALANCE_OF: &str = "balanceOf(address)";
pub const ERC20_ALLOWANCE: &str = "allowance(address,address)";
pub const ERC20_APPROVE: &str = "approve(address,uint256)";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ABI decode failed: {0}")]
pub struct AbiDecodeError(pub String);

/// 4 字节函数选择器
pub fn selector(sig: &str) -> [u8; 4] {
    let hash = ethers::utils::keccak256(sig.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn encode_call(sig: &str, args: &[Token]) -> Bytes {
    let mut out = Vec::with_capacity(4 + 32 * args.len());
    out.extend_from_slice(&selector(sig));
    out.extend_from_slice(&encode(args));
    Bytes::from(out)
}

pub fn decode_tokens(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiDecodeError> {
    decode(types, data).map_err(|e| AbiDecodeError(e.to_string()))
}

pub fn decode_uint(data: &[u8]) -> Result<U256, AbiDecodeError> {
    match decode_tokens(&[ParamType::Uint(256)], data)?.into_iter().next() {
        Some(Token::Uint(v)) => Ok(v),
        other => Err(AbiDecodeError(format!("expected uint256, got {:?}", other))),
    }
}

pub fn decode_bool(data: &[u8]) -> Result<bool, AbiDecodeError> {
    match decode_tokens(&[ParamType::Bool], data)?.into_iter().next() {
        Some(Token::Bool(v)) => Ok(v),
        other => Err(AbiDecodeError(format!("expected bool, got {:?}", other))),
    }
}

pub fn erc20_balance_of(owner: Address) -> Bytes {
    encode_call(ERC20_BALANCE_OF, &[Token::Address(owner)])
}

pub fn erc20_allowance(owner: Address, spender: Address) -> Bytes {
    encode_call(
        ERC20_ALLOWANCE,
        &[Token::Address(owner), Token::Address(spender)],
    )
}

pub fn erc20_approve(spender: Address, amount: U256) -> Bytes {
    encode_call(ERC20_APPROVE, &[Token::Address(spender), Token::Uint(amount)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(selector(ERC20_BALANCE_OF)), "70a08231");
        assert_eq!(hex::encode(selector(ERC20_ALLOWANCE)), "dd62ed3e");
        assert_eq!(hex::encode(selector(ERC20_APPROVE)), "095ea7b3");
    }

    #[test]
    fn test_approve_layout() {
        let data = erc20_approve(Address::repeat_byte(0x22), U256::from(16u64));
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &selector(ERC20_APPROVE));
        assert_eq!(data[4 + 63], 16);
    }

    #[test]
    fn test_decode_helpers() {
        let encoded = encode(&[Token::Uint(U256::from(42u64))]);
        assert_eq!(decode_uint(&encoded).unwrap(), U256::from(42u64));

        let encoded = encode(&[Token::Bool(true)]);
        assert!(decode_bool(&encoded).unwrap());

        assert!(decode_uint(&[]).is_err());
    }
}
